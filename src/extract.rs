//! Pattern A: regex mining of a rendered results page.

pub mod dom;

use std::sync::LazyLock;

use hashbrown::HashSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    catalog::{Catalog, LotteryType, TIMED_WINDOW},
    thai_date,
    util::advance_chars,
};

static DRAW_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{1,2})[:.](\d{2})\s*น\.?").unwrap());

/// The result fields of one draw. Strings keep leading zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom2: Option<String>,
}

impl Numbers {
    pub const fn is_empty(&self) -> bool {
        self.full_number.is_none() && self.top3.is_none() && self.bottom2.is_none()
    }
}

/// Hit from the per-section scan; the date phrase is not resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDraw {
    pub lottery_type: LotteryType,
    pub date_text: Option<String>,
    pub numbers: Numbers,
}

/// Hit from the multi-draw-per-day scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedDraw {
    pub lottery_type: LotteryType,
    pub draw_date: Option<String>,
    pub date_text: Option<String>,
    pub draw_time: String,
    pub numbers: Numbers,
}

/// Every intermediate shape a draw can arrive in before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Section(SectionDraw),
    Timed(TimedDraw),
    /// Object from the DOM or vision path; result fields may sit at any depth.
    Loose(Value),
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Pieces of `text` starting at each section marker. Text with no marker is
/// one section; text before the first marker is dropped.
pub fn split_sections<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
    let starts = text.match_indices(marker).map(|(i, _)| i).collect::<Vec<_>>();
    if starts.is_empty() {
        return vec![text];
    }
    starts
        .iter()
        .enumerate()
        .map(|(k, &start)| &text[start..starts.get(k + 1).copied().unwrap_or(text.len())])
        .collect()
}

/// Reads one section with the first catalog entry that recognizes it.
pub fn match_section(section: &str, catalog: &Catalog) -> Option<SectionDraw> {
    let def = catalog.detect(section)?;
    let numbers = Numbers {
        full_number: capture(&def.full, section),
        top3: capture(&catalog.top3, section),
        bottom2: capture(&catalog.bottom2, section),
    };
    if numbers.is_empty() {
        tracing::debug!(target: "results", "{} detected without digits", def.lottery_type);
        return None;
    }

    Some(SectionDraw {
        lottery_type: def.lottery_type,
        date_text: thai_date::find_phrase(section).map(|p| p.phrase.to_owned()),
        numbers,
    })
}

pub fn scan_sections(text: &str, catalog: &Catalog) -> Vec<SectionDraw> {
    let mut seen = HashSet::new();
    split_sections(text, catalog.section_marker)
        .into_iter()
        .filter_map(|section| match_section(section, catalog))
        .filter(|draw| {
            let fresh = seen.insert(draw.lottery_type);
            if !fresh {
                tracing::debug!(target: "results", "dropping repeated {}", draw.lottery_type);
            }
            fresh
        })
        .collect()
}

/// Scans the whole text for the named multi-draw variants. They share the
/// first date phrase after the heading.
///
/// A variant name can appear more than once (menus, tabs); each occurrence's
/// window ends at the next occurrence of any variant, and the first window
/// that holds digits wins.
pub fn scan_timed(text: &str, catalog: &Catalog) -> Vec<TimedDraw> {
    let date = text
        .find(catalog.timed_heading)
        .and_then(|at| thai_date::find_phrase(&text[at..]));

    let mut hits = catalog
        .timed
        .iter()
        .flat_map(|def| def.name.find_iter(text).map(move |m| (m.start(), m.end(), def)))
        .collect::<Vec<_>>();
    hits.sort_unstable_by_key(|&(start, ..)| start);

    let mut seen = HashSet::new();
    let mut draws = Vec::new();
    for (k, &(_, end, def)) in hits.iter().enumerate() {
        if seen.contains(&def.lottery_type) {
            continue;
        }
        let limit = advance_chars(text, end, TIMED_WINDOW);
        let stop = hits
            .get(k + 1)
            .map_or(limit, |&(next, ..)| next.max(end).min(limit));
        let window = &text[end..stop];

        let numbers = Numbers {
            full_number: None,
            top3: capture(&catalog.top3, window),
            bottom2: capture(&catalog.bottom2, window),
        };
        if numbers.is_empty() {
            continue;
        }

        let draw_time = DRAW_TIME
            .captures(window)
            .and_then(|c| Some(format!("{:0>2}:{}", c.get(1)?.as_str(), c.get(2)?.as_str())))
            .unwrap_or_else(|| def.default_time.to_owned());

        seen.insert(def.lottery_type);
        draws.push(TimedDraw {
            lottery_type: def.lottery_type,
            draw_date: date.as_ref().map(thai_date::DatePhrase::to_iso),
            date_text: date.as_ref().map(|p| p.phrase.to_owned()),
            draw_time,
            numbers,
        });
    }
    draws
}

/// Both scans over one rendered page; each lottery type appears at most once.
pub fn extract_text(text: &str, catalog: &Catalog) -> Vec<Candidate> {
    let sections = scan_sections(text, catalog);
    let mut seen = sections.iter().map(|d| d.lottery_type).collect::<HashSet<_>>();
    let timed = scan_timed(text, catalog)
        .into_iter()
        .filter(|d| seen.insert(d.lottery_type));

    sections
        .into_iter()
        .map(Candidate::Section)
        .chain(timed.map(Candidate::Timed))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    #[test]
    fn government_section() {
        let text = "ผลหวยรัฐบาลไทย งวดวันที่ 16 ธันวาคม 2567 ผลรางวัล 123456 รางวัลเลขหน้า 3 ตัวบน 456 และ 2 ตัวล่าง 78";
        let draws = scan_sections(text, &catalog());
        assert_eq!(draws.len(), 1);
        let d = &draws[0];
        assert_eq!(d.lottery_type, LotteryType::ThaiGovernment);
        assert_eq!(d.date_text.as_deref(), Some("16 ธันวาคม 2567"));
        assert_eq!(d.numbers.full_number.as_deref(), Some("123456"));
        assert_eq!(d.numbers.top3.as_deref(), Some("456"));
        assert_eq!(d.numbers.bottom2.as_deref(), Some("78"));
    }

    #[test]
    fn split_keeps_marker() {
        let parts = split_sections("intro ผลหวยA 1 ผลหวยB 2", "ผลหวย");
        assert_eq!(parts, ["ผลหวยA 1 ", "ผลหวยB 2"]);
        assert_eq!(split_sections("no marker", "ผลหวย"), ["no marker"]);
    }

    #[test]
    fn first_section_of_a_type_wins() {
        let text = "ผลหวยออมสิน ผลรางวัล 111111 ผลหวยออมสิน ผลรางวัล 222222";
        let draws = scan_sections(text, &catalog());
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].numbers.full_number.as_deref(), Some("111111"));
    }

    #[test]
    fn detected_section_without_digits_is_skipped() {
        let text = "ผลหวยมาเลย์ รอผล ผลหวยออมสิน 3 ตัวบน 321";
        let draws = scan_sections(text, &catalog());
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].lottery_type, LotteryType::Gsb);
        assert_eq!(draws[0].date_text, None);
    }

    #[test]
    fn width_follows_lottery_type() {
        let text = "ผลหวยมาเลย์ 2 มกราคม 2568 ผลรางวัล 0457";
        let draws = scan_sections(text, &catalog());
        assert_eq!(draws[0].numbers.full_number.as_deref(), Some("0457"));
    }

    #[test]
    fn hanoi_variants_share_a_date() {
        let text = "หวยฮานอย 5 มีนาคม 2568\n\
                    ฮานอยพิเศษ 17:10 น. 3 ตัวบน 123 2 ตัวล่าง 45\n\
                    ฮานอยปกติ 3 ตัวบน 678 2 ตัวล่าง 90\n\
                    ฮานอย VIP 3 ตัวบน 012 2 ตัวล่าง 34";
        let draws = scan_timed(text, &catalog());
        assert_eq!(draws.len(), 3);
        assert!(draws.iter().all(|d| d.draw_date.as_deref() == Some("2025-03-05")));
        let times = draws.iter().map(|d| d.draw_time.as_str()).collect::<Vec<_>>();
        assert_eq!(times, ["17:10", "18:30", "19:30"]);
        assert_eq!(draws[1].numbers.top3.as_deref(), Some("678"));
        assert_eq!(draws[2].lottery_type, LotteryType::HanoiVip);
        assert_eq!(draws[2].numbers.bottom2.as_deref(), Some("34"));
    }

    #[test]
    fn hanoi_window_does_not_bleed() {
        let text = "ฮานอยพิเศษ รอผล ฮานอยปกติ 3 ตัวบน 678 2 ตัวล่าง 90";
        let draws = scan_timed(text, &catalog());
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].lottery_type, LotteryType::HanoiNormal);
        assert_eq!(draws[0].draw_date, None);
    }

    #[test]
    fn menu_mentions_do_not_steal_results() {
        let text = "หวยฮานอยพิเศษ หวยฮานอยปกติ หวยฮานอย VIP\n\
                    ผลหวยฮานอย 16 ธันวาคม 2567\n\
                    ฮานอยพิเศษ 3 ตัวบน 482 2 ตัวล่าง 19\n\
                    ฮานอยปกติ 3 ตัวบน 730 2 ตัวล่าง 66\n\
                    ฮานอย VIP 3 ตัวบน 215 2 ตัวล่าง 08";
        let draws = scan_timed(text, &catalog());
        let got = draws
            .iter()
            .map(|d| (d.lottery_type, d.numbers.top3.as_deref(), d.numbers.bottom2.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(
            got,
            [
                (LotteryType::HanoiSpecial, Some("482"), Some("19")),
                (LotteryType::HanoiNormal, Some("730"), Some("66")),
                (LotteryType::HanoiVip, Some("215"), Some("08")),
            ]
        );
        assert!(draws.iter().all(|d| d.draw_date.as_deref() == Some("2024-12-16")));
    }

    #[test]
    fn extract_text_combines_both_scans() {
        let text = "ผลหวยลาวพัฒนา 1 ก.พ. 2568 ผลรางวัล 5012 ผลหวยฮานอย 1 ก.พ. 2568 ฮานอยปกติ 3 ตัวบน 111 2 ตัวล่าง 22";
        let candidates = extract_text(text, &catalog());
        assert_eq!(candidates.len(), 2);
        assert!(matches!(&candidates[0], Candidate::Section(d) if d.lottery_type == LotteryType::LaoPattana));
        assert!(matches!(&candidates[1], Candidate::Timed(d) if d.lottery_type == LotteryType::HanoiNormal));
    }
}
