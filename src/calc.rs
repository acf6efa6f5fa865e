//! Calculation pages: daily recommended numbers plus the two statistics tables.
//!
//! The daily lists come from a forward line scan with one active [`Section`]
//! at a time. The frequency and 30-draw tables are located independently by
//! their header phrases.

use core::fmt;
use std::sync::LazyLock;

use hashbrown::HashSet;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::LotteryType,
    util::{UniqueList, is_digits},
};

pub const MAX_LIST: usize = 15;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Header text that drives the scan. All matches are substring matches.
#[derive(Debug, Clone)]
pub struct CalcHeaders {
    pub top3: &'static [&'static str],
    pub bottom2: &'static [&'static str],
    pub running: &'static [&'static str],
    pub full_set: &'static [&'static str],
    /// Lines that close whatever list is open.
    pub terminators: &'static [&'static str],
    pub recommend_markers: &'static [&'static str],
    pub frequency: &'static str,
    pub frequency_end: &'static str,
    pub stats_bottom2: &'static str,
    pub stats_top3: &'static str,
}

pub const THAI_HEADERS: CalcHeaders = CalcHeaders {
    top3: &["3 ตัวบน", "สามตัวบน"],
    bottom2: &["2 ตัวล่าง", "สองตัวล่าง"],
    running: &["เลขวิ่ง", "วิ่งบน"],
    full_set: &["เลขรูด", "รูดหน้าหลัง"],
    terminators: &["สถิติ", "ความถี่"],
    recommend_markers: &["แนะนำ", "เด่น", "★"],
    frequency: "ความถี่ตัวเลข",
    frequency_end: "สถิติ",
    stats_bottom2: "สถิติ 2 ตัวล่าง",
    stats_top3: "สถิติ 3 ตัวบน",
};

impl Default for CalcHeaders {
    fn default() -> Self {
        THAI_HEADERS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    None,
    Top3List,
    Bottom2List,
    RunningNumber,
    FullSetNumber,
    /// Inside a statistics or frequency table. Its column headers repeat the
    /// list labels, so only the single-digit headers leave it.
    Table,
}

fn contains_any(line: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| line.contains(n))
}

impl Section {
    /// The section a header line switches to from `self`, or `None` for a
    /// content line. Terminators are checked first, then the single-digit
    /// sections.
    pub fn transition(self, line: &str, headers: &CalcHeaders) -> Option<Self> {
        if contains_any(line, headers.terminators) {
            Some(Self::Table)
        } else if contains_any(line, headers.running) {
            Some(Self::RunningNumber)
        } else if contains_any(line, headers.full_set) {
            Some(Self::FullSetNumber)
        } else if self == Self::Table {
            None
        } else if contains_any(line, headers.top3) {
            Some(Self::Top3List)
        } else if contains_any(line, headers.bottom2) {
            Some(Self::Bottom2List)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyCalculation {
    #[serde(deserialize_with = "lenient::list3")]
    pub top3: Vec<String>,
    #[serde(deserialize_with = "lenient::list3")]
    pub top3_recommended: Vec<String>,
    #[serde(deserialize_with = "lenient::list2")]
    pub bottom2: Vec<String>,
    #[serde(deserialize_with = "lenient::list2")]
    pub bottom2_recommended: Vec<String>,
    #[serde(deserialize_with = "lenient::single_digit")]
    pub running_number: Option<String>,
    #[serde(deserialize_with = "lenient::single_digit")]
    pub full_set_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitFrequency {
    pub digit: u8,
    pub top3_count: u32,
    pub bottom2_count: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberCount {
    pub number: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics30 {
    #[serde(deserialize_with = "lenient::stats2")]
    pub bottom2: Vec<NumberCount>,
    #[serde(deserialize_with = "lenient::stats3")]
    pub top3: Vec<NumberCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationTables {
    pub daily_calculation: DailyCalculation,
    #[serde(deserialize_with = "lenient::frequency")]
    pub digit_frequency: Vec<DigitFrequency>,
    pub statistics_30_draws: Statistics30,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationSnapshot {
    pub lottery_type: LotteryType,
    pub lottery_name: String,
    #[serde(flatten)]
    pub tables: CalculationTables,
}

/// Field readers for tables decoded from a vision reply. Numbers may come as
/// JSON numbers or strings; entries that fit neither are dropped.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{DigitFrequency, NumberCount, parse_count};
    use crate::format::digits;

    fn items(value: Value) -> Vec<Value> {
        match value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    fn count_of(value: &Value) -> Option<u32> {
        match value {
            Value::Number(n) => n.as_u64()?.try_into().ok(),
            Value::String(s) => parse_count(s.trim()),
            _ => None,
        }
    }

    fn list<'de, D: Deserializer<'de>>(d: D, width: usize) -> Result<Vec<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(items(value).iter().filter_map(|v| digits(v, width)).collect())
    }

    pub fn list3<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        list(d, 3)
    }

    pub fn list2<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        list(d, 2)
    }

    pub fn single_digit<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(digits(&Value::deserialize(d)?, 1))
    }

    pub fn frequency<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<DigitFrequency>, D::Error> {
        let rows = items(Value::deserialize(d)?)
            .iter()
            .filter_map(|row| {
                let field = |key: &str| row.get(key).and_then(count_of);
                Some(DigitFrequency {
                    digit: u8::try_from(field("digit")?).ok()?,
                    top3_count: field("top3_count")?,
                    bottom2_count: field("bottom2_count")?,
                    total: field("total")?,
                })
            })
            .collect();
        Ok(rows)
    }

    fn stats<'de, D: Deserializer<'de>>(d: D, width: usize) -> Result<Vec<NumberCount>, D::Error> {
        let rows = items(Value::deserialize(d)?)
            .iter()
            .filter_map(|row| {
                Some(NumberCount {
                    number: digits(row.get("number")?, width)?,
                    count: count_of(row.get("count")?)?,
                })
            })
            .collect();
        Ok(rows)
    }

    pub fn stats3<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NumberCount>, D::Error> {
        stats(d, 3)
    }

    pub fn stats2<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NumberCount>, D::Error> {
        stats(d, 2)
    }
}

impl CalculationSnapshot {
    pub fn new(lottery_type: LotteryType, tables: CalculationTables) -> Self {
        Self {
            lottery_type,
            lottery_name: lottery_type.name().to_owned(),
            tables,
        }
    }
}

/// Collects one list section: values, plus the ones on recommended lines.
struct ListCollector {
    width: usize,
    all: UniqueList,
    recommended: UniqueList,
}

impl ListCollector {
    fn new(width: usize) -> Self {
        Self {
            width,
            all: UniqueList::with_cap(MAX_LIST),
            recommended: UniqueList::with_cap(MAX_LIST),
        }
    }

    fn scan(&mut self, line: &str, recommended: bool) {
        let zero = "0".repeat(self.width);
        for m in NUMBER.find_iter(line) {
            let token = m.as_str();
            if token.len() != self.width || token == zero {
                continue;
            }
            if self.all.push(token) && recommended {
                self.recommended.push(token);
            }
        }
    }

    fn finish(self) -> (Vec<String>, Vec<String>) {
        (self.all.into_vec(), self.recommended.into_vec())
    }
}

fn single_digit(line: &str) -> Option<String> {
    is_digits(line, 1).then(|| line.to_owned())
}

pub fn scan_daily(text: &str, headers: &CalcHeaders) -> DailyCalculation {
    let mut state = Section::None;
    let mut top3 = ListCollector::new(3);
    let mut bottom2 = ListCollector::new(2);
    let mut running_number = None;
    let mut full_set_number = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(next) = state.transition(line, headers) {
            tracing::trace!(target: "calc", "{state:?} -> {next:?} at {line:?}");
            state = next;
            continue;
        }
        let recommended = contains_any(line, headers.recommend_markers);
        match state {
            Section::None | Section::Table => {}
            Section::Top3List => top3.scan(line, recommended),
            Section::Bottom2List => bottom2.scan(line, recommended),
            Section::RunningNumber => {
                if let Some(digit) = single_digit(line) {
                    running_number.get_or_insert(digit);
                    state = Section::None;
                }
            }
            Section::FullSetNumber => {
                if let Some(digit) = single_digit(line) {
                    full_set_number.get_or_insert(digit);
                    state = Section::None;
                }
            }
        }
    }

    let (top3, top3_recommended) = top3.finish();
    let (bottom2, bottom2_recommended) = bottom2.finish();
    DailyCalculation {
        top3,
        top3_recommended,
        bottom2,
        bottom2_recommended,
        running_number,
        full_set_number,
    }
}

/// Lines after the first line containing `header`, up to (not including) the
/// first line containing any of `stops`.
fn table_lines<'a>(
    text: &'a str,
    header: &str,
    stops: &[&str],
) -> impl Iterator<Item = &'a str> + use<'a> {
    let mut lines = text.lines();
    let found = lines.by_ref().any(|line| line.contains(header));
    let stops = stops.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>();
    lines
        .filter(move |_| found)
        .take_while(move |line| !stops.iter().any(|s| line.contains(s.as_str())))
        .map(str::trim)
}

fn parse_count(token: &str) -> Option<u32> {
    token.replace(',', "").parse().ok()
}

pub fn scan_digit_frequency(text: &str, headers: &CalcHeaders) -> Vec<DigitFrequency> {
    let mut seen = HashSet::new();
    let mut rows = table_lines(text, headers.frequency, &[headers.frequency_end])
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let digit = tokens.next().filter(|t| is_digits(t, 1))?.parse().ok()?;
            let mut counts = tokens.filter_map(parse_count);
            Some(DigitFrequency {
                digit,
                top3_count: counts.next()?,
                bottom2_count: counts.next()?,
                total: counts.next()?,
            })
        })
        .filter(|row| seen.insert(row.digit))
        .collect::<Vec<_>>();
    rows.sort_by_key(|row| row.digit);
    rows
}

fn parse_stats(text: &str, header: &str, width: usize, stops: &[&str]) -> Vec<NumberCount> {
    table_lines(text, header, stops)
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let number = tokens.next().filter(|t| is_digits(t, width))?;
            let count = tokens.find_map(parse_count)?;
            Some(NumberCount {
                number: number.to_owned(),
                count,
            })
        })
        .collect()
}

pub fn scan_statistics(text: &str, headers: &CalcHeaders) -> Statistics30 {
    let stops = [headers.stats_bottom2, headers.stats_top3, headers.frequency];
    Statistics30 {
        bottom2: parse_stats(text, headers.stats_bottom2, 2, &stops),
        top3: parse_stats(text, headers.stats_top3, 3, &stops),
    }
}

pub fn extract_calculation(text: &str, headers: &CalcHeaders) -> CalculationTables {
    CalculationTables {
        daily_calculation: scan_daily(text, headers),
        digit_frequency: scan_digit_frequency(text, headers),
        statistics_30_draws: scan_statistics(text, headers),
    }
}

impl CalculationTables {
    pub fn is_empty(&self) -> bool {
        let d = &self.daily_calculation;
        d.top3.is_empty()
            && d.bottom2.is_empty()
            && d.running_number.is_none()
            && d.full_set_number.is_none()
            && self.digit_frequency.is_empty()
            && self.statistics_30_draws.top3.is_empty()
            && self.statistics_30_draws.bottom2.is_empty()
    }

    /// Re-applies the width, sentinel, dedup and cap rules to tables that came
    /// from somewhere other than the text scan.
    #[must_use]
    pub fn sanitized(self) -> Self {
        fn list(values: Vec<String>, width: usize, parent: Option<&UniqueList>) -> UniqueList {
            let zero = "0".repeat(width);
            let mut out = UniqueList::with_cap(MAX_LIST);
            for v in &values {
                let v = v.trim();
                if is_digits(v, width) && v != zero && parent.is_none_or(|p| p.contains(v)) {
                    out.push(v);
                }
            }
            out
        }
        fn stats(rows: Vec<NumberCount>, width: usize) -> Vec<NumberCount> {
            rows.into_iter().filter(|r| is_digits(&r.number, width)).collect()
        }

        let d = self.daily_calculation;
        let top3 = list(d.top3, 3, None);
        let bottom2 = list(d.bottom2, 2, None);
        let top3_recommended = list(d.top3_recommended, 3, Some(&top3)).into_vec();
        let bottom2_recommended = list(d.bottom2_recommended, 2, Some(&bottom2)).into_vec();

        let mut seen = HashSet::new();
        let mut digit_frequency = self
            .digit_frequency
            .into_iter()
            .filter(|row| row.digit <= 9 && seen.insert(row.digit))
            .collect::<Vec<_>>();
        digit_frequency.sort_by_key(|row| row.digit);

        Self {
            daily_calculation: DailyCalculation {
                top3: top3.into_vec(),
                top3_recommended,
                bottom2: bottom2.into_vec(),
                bottom2_recommended,
                running_number: d.running_number.filter(|s| is_digits(s, 1)),
                full_set_number: d.full_set_number.filter(|s| is_digits(s, 1)),
            },
            digit_frequency,
            statistics_30_draws: Statistics30 {
                bottom2: stats(self.statistics_30_draws.bottom2, 2),
                top3: stats(self.statistics_30_draws.top3, 3),
            },
        }
    }

    pub fn summary(&self) -> Summary {
        let d = &self.daily_calculation;
        Summary {
            top3: d.top3.len(),
            bottom2: d.bottom2.len(),
            running_number: d.running_number.is_some(),
            full_set_number: d.full_set_number.is_some(),
            digit_frequency: self.digit_frequency.len(),
            stats_bottom2: self.statistics_30_draws.bottom2.len(),
            stats_top3: self.statistics_30_draws.top3.len(),
        }
    }
}

/// Per-field counts for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub top3: usize,
    pub bottom2: usize,
    pub running_number: bool,
    pub full_set_number: bool,
    pub digit_frequency: usize,
    pub stats_bottom2: usize,
    pub stats_top3: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "top3 {}, bottom2 {}, running {}, full set {}, frequency rows {}, 30-draw rows {}/{}",
            self.top3,
            self.bottom2,
            self.running_number,
            self.full_set_number,
            self.digit_frequency,
            self.stats_bottom2,
            self.stats_top3,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: &CalcHeaders = &THAI_HEADERS;

    #[test]
    fn transition_table() {
        use Section::*;

        let cases = [
            ("เลขเด่น 3 ตัวบน", Some(Top3List)),
            ("สามตัวบน", Some(Top3List)),
            ("2 ตัวล่าง", Some(Bottom2List)),
            ("เลขวิ่ง", Some(RunningNumber)),
            ("เลขวิ่ง 3 ตัวบน", Some(RunningNumber)),
            ("รูดหน้าหลัง", Some(FullSetNumber)),
            ("สถิติ 3 ตัวบน 30 งวด", Some(Table)),
            ("ความถี่ตัวเลข", Some(Table)),
            ("123 456", Option::None),
        ];
        for (line, expected) in cases {
            assert_eq!(None.transition(line, H), expected, "{line}");
        }
    }

    #[test]
    fn headers_switch_from_every_state() {
        use Section::*;

        let openers = [
            ("3 ตัวบน", Top3List),
            ("2 ตัวล่าง", Bottom2List),
            ("เลขวิ่ง", RunningNumber),
            ("เลขรูด", FullSetNumber),
            ("สถิติ", Table),
        ];
        for (from_header, from) in openers {
            for (to_header, to) in openers {
                let text = format!("{from_header}\n{to_header}\n");
                let mut state = None;
                for line in text.lines() {
                    if let Some(next) = state.transition(line, H) {
                        state = next;
                    }
                }
                let expected = match (from, to) {
                    (Table, Top3List | Bottom2List) => Table,
                    _ => to,
                };
                assert_eq!(state, expected, "{from_header} -> {to_header}");
            }
        }
    }

    #[test]
    fn table_column_headers_do_not_reopen_lists() {
        let text = "3 ตัวบน\n123 456\nสถิติ 3 ตัวบน 30 งวด\nเลข 3 ตัวบน จำนวน\n999 3\n888 2\n\
                    2 ตัวล่าง\n55 4\nเลขวิ่ง\n5\n2 ตัวล่าง\n12\n";
        let daily = scan_daily(text, H);
        assert_eq!(daily.top3, ["123", "456"]);
        assert_eq!(daily.running_number.as_deref(), Some("5"));
        assert_eq!(daily.bottom2, ["12"]);
    }

    #[test]
    fn lists_are_deduplicated_capped_and_skip_zero() {
        let mut text = String::from("3 ตัวบน\n000 123 123\n");
        for n in 100..130 {
            text.push_str(&format!("{n} {n}\n"));
        }
        text.push_str("2 ตัวล่าง\n00 12 12 345 6\n");

        let daily = scan_daily(&text, H);
        assert_eq!(daily.top3.len(), MAX_LIST);
        assert_eq!(daily.top3[0], "123");
        assert_eq!(daily.top3[1], "100");
        assert!(!daily.top3.contains(&"000".to_owned()));
        let unique = daily.top3.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), daily.top3.len());
        assert_eq!(daily.bottom2, ["12"]);
    }

    #[test]
    fn recommended_is_a_marked_subset() {
        let text = "3 ตัวบน\n123 456\nแนะนำ 789 123\n2 ตัวล่าง\n★ 45\n67\n";
        let daily = scan_daily(text, H);
        assert_eq!(daily.top3, ["123", "456", "789"]);
        assert_eq!(daily.top3_recommended, ["789", "123"]);
        assert_eq!(daily.bottom2, ["45", "67"]);
        assert_eq!(daily.bottom2_recommended, ["45"]);
    }

    #[test]
    fn single_digit_sections_take_first_qualifying_line() {
        let text = "เลขวิ่ง\nไม่มี\n7\n8\nเลขรูด\n12\n3\nเลขวิ่ง\n9\n";
        let daily = scan_daily(text, H);
        assert_eq!(daily.running_number.as_deref(), Some("7"));
        assert_eq!(daily.full_set_number.as_deref(), Some("3"));
    }

    #[test]
    fn digit_frequency_table() {
        let mut text = String::from("ความถี่ตัวเลข\nเลข บน ล่าง รวม\n");
        for d in (0..10).rev() {
            text.push_str(&format!("{d} {} {} {}\n", d * 2, d, d * 3));
        }
        text.push_str("10 1 1 2\nxx\nสถิติ 2 ตัวล่าง 30 งวด\n5 9 9 9\n");

        let rows = scan_digit_frequency(&text, H);
        assert_eq!(rows.len(), 10);
        assert!(rows.iter().enumerate().all(|(i, r)| usize::from(r.digit) == i));
        assert_eq!(rows[4], DigitFrequency { digit: 4, top3_count: 8, bottom2_count: 4, total: 12 });
    }

    #[test]
    fn statistics_tables_end_at_next_header() {
        let text = "สถิติ 2 ตัวล่าง 30 งวด\n\
                    เลข จำนวน\n\
                    12 5\n\
                    123 4\n\
                    07 3 ครั้ง\n\
                    สถิติ 3 ตัวบน 30 งวด\n\
                    456 2\n\
                    45 1\n\
                    089 1,0\n";
        let stats = scan_statistics(text, H);
        assert_eq!(
            stats.bottom2,
            [
                NumberCount { number: "12".into(), count: 5 },
                NumberCount { number: "07".into(), count: 3 },
            ]
        );
        assert_eq!(stats.top3.len(), 2);
        assert_eq!(stats.top3[1], NumberCount { number: "089".into(), count: 10 });
    }

    #[test]
    fn missing_tables_are_empty() {
        let tables = extract_calculation("nothing here", H);
        assert!(tables.is_empty());
    }

    #[test]
    fn sanitize_applies_list_rules() {
        let mut tables = CalculationTables::default();
        tables.daily_calculation.top3 = ["123", "123", "000", "12", "456"].map(String::from).to_vec();
        tables.daily_calculation.top3_recommended = ["456", "999"].map(String::from).to_vec();
        tables.daily_calculation.running_number = Some("12".into());
        tables.digit_frequency = vec![
            DigitFrequency { digit: 3, top3_count: 1, bottom2_count: 1, total: 2 },
            DigitFrequency { digit: 11, top3_count: 1, bottom2_count: 1, total: 2 },
            DigitFrequency { digit: 0, top3_count: 1, bottom2_count: 1, total: 2 },
        ];
        let tables = tables.sanitized();
        assert_eq!(tables.daily_calculation.top3, ["123", "456"]);
        assert_eq!(tables.daily_calculation.top3_recommended, ["456"]);
        assert_eq!(tables.daily_calculation.running_number, None);
        assert_eq!(tables.digit_frequency.iter().map(|r| r.digit).collect::<Vec<_>>(), [0, 3]);
    }

    #[test]
    fn snapshot_shape() {
        let snapshot = CalculationSnapshot::new(LotteryType::Gsb, CalculationTables::default());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["lottery_type"], "gsb");
        assert!(json["daily_calculation"]["top3"].is_array());
        assert!(json["statistics_30_draws"]["bottom2"].is_array());
        assert!(json["daily_calculation"]["running_number"].is_null());
    }
}
