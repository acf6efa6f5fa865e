//! Thai date phrases (`15 มกราคม 2567`) to ISO dates.

use std::sync::LazyLock;

use regex::Regex;

/// Buddhist Era years are written above this value.
const BE_THRESHOLD: i32 = 2500;
const BE_OFFSET: i32 = 543;

#[rustfmt::skip]
pub const MONTHS: [(&str, &str); 12] = [
    ("มกราคม", "ม.ค."),
    ("กุมภาพันธ์", "ก.พ."),
    ("มีนาคม", "มี.ค."),
    ("เมษายน", "เม.ย."),
    ("พฤษภาคม", "พ.ค."),
    ("มิถุนายน", "มิ.ย."),
    ("กรกฎาคม", "ก.ค."),
    ("สิงหาคม", "ส.ค."),
    ("กันยายน", "ก.ย."),
    ("ตุลาคม", "ต.ค."),
    ("พฤศจิกายน", "พ.ย."),
    ("ธันวาคม", "ธ.ค."),
];

static KNOWN: LazyLock<Regex> = LazyLock::new(|| {
    let names = MONTHS
        .iter()
        .flat_map(|(full, short)| [regex::escape(full), regex::escape(short)])
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(
        r"(?:^|\D)(\d{{1,2}})\s*({names})\s*(?:พ\.ศ\.\s*)?(\d{{4}})(?:\D|$)"
    ))
    .unwrap()
});

static LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{1,2})\s*(\p{L}[^\s\d]*)\s*(\d{4})(?:\D|$)").unwrap());

static ISO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// A date phrase located inside a larger text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePhrase<'a> {
    pub phrase: &'a str,
    pub day: u32,
    pub month: Option<u32>,
    pub year: i32,
}

impl DatePhrase<'_> {
    /// Unrecognized month names fall back to January.
    pub fn to_iso(&self) -> String {
        let year = if self.year > BE_THRESHOLD {
            self.year - BE_OFFSET
        } else {
            self.year
        };
        format!("{year:04}-{:02}-{:02}", self.month.unwrap_or(1), self.day)
    }
}

pub fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|(full, short)| token == *full || token == *short)
        .map(|i| i as u32 + 1)
}

/// Locates the first `<day> <month> <year>` phrase, preferring known month
/// names over any other word in the month slot.
pub fn find_phrase(text: &str) -> Option<DatePhrase<'_>> {
    let caps = KNOWN.captures(text).or_else(|| LOOSE.captures(text))?;
    let (day, month, year) = (caps.get(1)?, caps.get(2)?, caps.get(3)?);

    Some(DatePhrase {
        phrase: &text[day.start()..year.end()],
        day: day.as_str().parse().ok()?,
        month: month_number(month.as_str()),
        year: year.as_str().parse().ok()?,
    })
}

/// `"15 มกราคม 2567"` → `"2024-01-15"`.
pub fn normalize(text: &str) -> Option<String> {
    find_phrase(text).map(|p| p.to_iso())
}

pub fn is_iso(text: &str) -> bool {
    ISO.is_match(text)
}

/// Like [`normalize`], but an ISO date passes through untouched.
pub fn resolve_date(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if is_iso(trimmed) {
        Some(trimmed.to_owned())
    } else {
        normalize(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buddhist_era_is_converted() {
        assert_eq!(normalize("15 มกราคม 2567").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize("งวดวันที่ 1 ธันวาคม 2566").as_deref(), Some("2023-12-01"));
    }

    #[test]
    fn every_month_is_recognized() {
        for (i, (full, short)) in MONTHS.iter().enumerate() {
            let expected = format!("2024-{:02}-07", i + 1);
            assert_eq!(normalize(&format!("7 {full} 2567")), Some(expected.clone()));
            assert_eq!(normalize(&format!("7 {short} 2567")), Some(expected));
        }
    }

    #[test]
    fn common_era_year_is_kept() {
        assert_eq!(normalize("3 มีนาคม 2024").as_deref(), Some("2024-03-03"));
    }

    #[test]
    fn era_prefix_and_missing_spaces() {
        assert_eq!(normalize("16 ก.ย. พ.ศ. 2568").as_deref(), Some("2025-09-16"));
        assert_eq!(normalize("16กันยายน2568").as_deref(), Some("2025-09-16"));
    }

    #[test]
    fn unknown_month_falls_back_to_january() {
        assert_eq!(normalize("15 ตุลาคมม 2567").as_deref(), Some("2024-01-15"));
        assert_eq!(normalize("9 foo 2567").as_deref(), Some("2024-01-09"));
    }

    #[test]
    fn numeric_dates_are_not_phrases() {
        assert_eq!(normalize("งวดวันที่ 16/12/2567"), None);
        assert_eq!(normalize("16-12-2567"), None);
    }

    #[test]
    fn no_phrase() {
        assert_eq!(normalize("ผลหวยรัฐบาลไทย ผลรางวัล 123456"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn phrase_is_kept_for_audit() {
        let p = find_phrase("ประจำงวด 16 สิงหาคม 2567 ผลรางวัล").unwrap();
        assert_eq!(p.phrase, "16 สิงหาคม 2567");
        assert_eq!(p.month, Some(8));
    }

    #[test]
    fn resolve_is_idempotent() {
        let once = resolve_date("15 มกราคม 2567").unwrap();
        assert_eq!(resolve_date(&once).as_deref(), Some(once.as_str()));
        assert_eq!(resolve_date("2024-01-15").as_deref(), Some("2024-01-15"));
        assert_eq!(resolve_date("15 มกราคม 2567"), resolve_date("15 มกราคม 2567"));
    }
}
