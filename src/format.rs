//! Maps every [`Candidate`] shape onto the one output record.

use core::fmt;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    catalog::LotteryType,
    extract::{Candidate, Numbers, SectionDraw, TimedDraw},
    thai_date,
    util::is_digits,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub lottery_type: LotteryType,
    pub lottery_name: String,
    pub draw_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_date_source_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_time: Option<String>,
    pub results: Numbers,
}

/// Depth-first search for the first value stored under `key`.
fn find_field<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .filter(|v| !v.is_null())
            .or_else(|| map.values().find_map(|v| find_field(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_field(v, key)),
        _ => None,
    }
}

fn find_str<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    find_field(value, key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Fixed-width digit string from a JSON string or number. Numbers lose
/// leading zeros on the way in, so they are padded back.
pub(crate) fn digits(value: &Value, width: usize) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            is_digits(s, width).then(|| s.to_owned())
        }
        Value::Number(n) => {
            let s = format!("{:0width$}", n.as_u64()?);
            (s.len() == width).then_some(s)
        }
        _ => None,
    }
}

fn loose_numbers(value: &Value, lottery_type: LotteryType) -> Numbers {
    let pick = |key, width| find_field(value, key).and_then(|v| digits(v, width));
    Numbers {
        full_number: pick("full_number", lottery_type.full_width()),
        top3: pick("top3", 3),
        bottom2: pick("bottom2", 2),
    }
}

fn from_section(draw: SectionDraw) -> DrawRecord {
    DrawRecord {
        lottery_type: draw.lottery_type,
        lottery_name: draw.lottery_type.name().to_owned(),
        draw_date: draw.date_text.as_deref().and_then(thai_date::resolve_date),
        draw_date_source_text: draw.date_text,
        draw_time: None,
        results: draw.numbers,
    }
}

fn from_timed(draw: TimedDraw) -> DrawRecord {
    let draw_date = draw
        .draw_date
        .as_deref()
        .and_then(thai_date::resolve_date)
        .or_else(|| draw.date_text.as_deref().and_then(thai_date::normalize));
    DrawRecord {
        lottery_type: draw.lottery_type,
        lottery_name: draw.lottery_type.name().to_owned(),
        draw_date,
        draw_date_source_text: draw.date_text,
        draw_time: Some(draw.draw_time),
        results: draw.numbers,
    }
}

fn from_loose(value: &Value) -> Option<DrawRecord> {
    let Some(lottery_type) = find_str(value, "lottery_type").and_then(|s| s.parse::<LotteryType>().ok()) else {
        tracing::warn!(target: "format", "dropping candidate without a known lottery_type: {value}");
        return None;
    };

    let source_text = find_str(value, "draw_date_source_text").map(ToOwned::to_owned);
    let draw_date = find_str(value, "draw_date")
        .and_then(thai_date::resolve_date)
        .or_else(|| source_text.as_deref().and_then(thai_date::normalize));

    Some(DrawRecord {
        lottery_type,
        lottery_name: find_str(value, "lottery_name")
            .unwrap_or(lottery_type.name())
            .to_owned(),
        draw_date,
        draw_date_source_text: source_text,
        draw_time: find_str(value, "draw_time")
            .filter(|_| lottery_type.is_timed())
            .map(ToOwned::to_owned),
        results: loose_numbers(value, lottery_type),
    })
}

pub fn normalize(candidate: Candidate) -> Option<DrawRecord> {
    match candidate {
        Candidate::Section(draw) => Some(from_section(draw)),
        Candidate::Timed(draw) => Some(from_timed(draw)),
        Candidate::Loose(value) => from_loose(&value),
    }
}

/// Formats all candidates, keeping the first record per lottery type and
/// dropping records without any result field.
pub fn merge(candidates: impl IntoIterator<Item = Candidate>) -> Vec<DrawRecord> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(normalize)
        .filter(|record| !record.results.is_empty())
        .filter(|record| seen.insert(record.lottery_type))
        .collect()
}

/// Splits a vision reply into loose candidates: a bare array, an object
/// holding an array of draws, or a single draw object.
pub fn loose_candidates(value: Value) -> Vec<Candidate> {
    match value {
        Value::Array(items) => items.into_iter().map(Candidate::Loose).collect(),
        Value::Object(mut map) => {
            for key in ["results", "draws", "lotteries"] {
                if map.get(key).is_some_and(Value::is_array)
                    && let Some(Value::Array(items)) = map.remove(key)
                {
                    return items.into_iter().map(Candidate::Loose).collect();
                }
            }
            vec![Candidate::Loose(Value::Object(map))]
        }
        _ => Vec::new(),
    }
}

/// Per-field counts over one run's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub draw_date: usize,
    pub full_number: usize,
    pub top3: usize,
    pub bottom2: usize,
}

impl Summary {
    pub fn of(records: &[DrawRecord]) -> Self {
        records.iter().fold(Self::default(), |mut s, r| {
            s.records += 1;
            s.draw_date += usize::from(r.draw_date.is_some());
            s.full_number += usize::from(r.results.full_number.is_some());
            s.top3 += usize::from(r.results.top3.is_some());
            s.bottom2 += usize::from(r.results.bottom2.is_some());
            s
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records (draw_date {}, full_number {}, top3 {}, bottom2 {})",
            self.records, self.draw_date, self.full_number, self.top3, self.bottom2
        )
    }
}
