use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{
    calc::CalculationSnapshot,
    catalog::LotteryType,
    format::{DrawRecord, Summary},
};

pub const RESULTS_FILE: &str = "lottery_results.json";
pub const CALCULATIONS_FILE: &str = "calculations.json";
pub const VISION_FILE: &str = "vision_results.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Partial,
    Empty,
}

impl RunStatus {
    pub const fn of(succeeded: usize, total: usize) -> Self {
        if succeeded == 0 {
            Self::Empty
        } else if succeeded < total {
            Self::Partial
        } else {
            Self::Ok
        }
    }
}

/// Which extraction path produced the records of a results run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Text,
    Dom,
    Vision,
    None,
}

#[derive(Debug, Serialize)]
pub struct ResultsReport {
    pub scraped_at: DateTime<Local>,
    pub status: RunStatus,
    pub source_url: String,
    pub strategy: Strategy,
    pub summary: Summary,
    pub results: Vec<DrawRecord>,
}

impl ResultsReport {
    pub fn new(source_url: String, strategy: Strategy, results: Vec<DrawRecord>) -> Self {
        Self {
            scraped_at: Local::now(),
            status: if results.is_empty() { RunStatus::Empty } else { RunStatus::Ok },
            source_url,
            strategy,
            summary: Summary::of(&results),
            results,
        }
    }
}

/// Combined file of a multi-source run; a failed source is `null`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub scraped_at: DateTime<Local>,
    pub status: RunStatus,
    pub sources: BTreeMap<String, Option<CalculationSnapshot>>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn new(sources: BTreeMap<String, Option<CalculationSnapshot>>) -> Self {
        let total = sources.len();
        let succeeded = sources.values().filter(|s| s.is_some()).count();
        Self {
            scraped_at: Local::now(),
            status: RunStatus::of(succeeded, total),
            sources,
            summary: RunSummary {
                total,
                succeeded,
                failed: total - succeeded,
            },
        }
    }
}

/// Files `snapshot` under its lottery type. A type listed twice keeps its
/// first successful snapshot.
pub fn record_source(
    sources: &mut BTreeMap<String, Option<CalculationSnapshot>>,
    lottery_type: LotteryType,
    snapshot: Option<CalculationSnapshot>,
) {
    let slot = sources.entry(lottery_type.key().to_owned()).or_default();
    if slot.is_none() {
        *slot = snapshot;
    }
}

pub fn per_source_file(prefix: &str, snapshot: &CalculationSnapshot) -> String {
    format!("{prefix}_{}.json", snapshot.lottery_type.key())
}

/// Writes `value` as pretty-printed JSON to `dir/name`, creating `dir`.
pub fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    tracing::info!(target: "output", "\x1b[36mwrote\x1b[0m {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::calc::CalculationTables;

    #[test]
    fn status_from_counts() {
        assert_eq!(RunStatus::of(0, 0), RunStatus::Empty);
        assert_eq!(RunStatus::of(0, 3), RunStatus::Empty);
        assert_eq!(RunStatus::of(2, 3), RunStatus::Partial);
        assert_eq!(RunStatus::of(3, 3), RunStatus::Ok);
    }

    #[test]
    fn failed_source_is_null() {
        let mut sources = BTreeMap::new();
        let snapshot = CalculationSnapshot::new(LotteryType::Gsb, CalculationTables::default());
        assert_eq!(per_source_file("calc", &snapshot), "calc_gsb.json");
        sources.insert("gsb".to_owned(), Some(snapshot));
        sources.insert("baac".to_owned(), None);

        let report = serde_json::to_value(RunReport::new(sources)).unwrap();
        assert_eq!(report["status"], "partial");
        assert_eq!(report["sources"]["baac"], Value::Null);
        assert_eq!(report["sources"]["gsb"]["lottery_type"], "gsb");
        assert_eq!(report["summary"]["failed"], 1);
    }

    #[test]
    fn repeated_source_keeps_first_success() {
        let snapshot = || CalculationSnapshot::new(LotteryType::Gsb, CalculationTables::default());
        let mut sources = BTreeMap::new();
        record_source(&mut sources, LotteryType::Baac, None);
        record_source(&mut sources, LotteryType::Gsb, Some(snapshot()));
        record_source(&mut sources, LotteryType::Gsb, None);
        record_source(&mut sources, LotteryType::Baac, Some(snapshot()));

        assert_eq!(sources.len(), 2);
        assert!(sources["gsb"].is_some());
        assert!(sources["baac"].is_some());

        let report = RunReport::new(sources);
        assert_eq!(report.status, RunStatus::Ok);
    }

    #[test]
    fn writes_into_a_new_directory() {
        let dir = std::env::temp_dir()
            .join(format!("lotto-scraper-{}", std::process::id()))
            .join("nested");
        let report = ResultsReport::new("https://example.test".to_owned(), Strategy::None, Vec::new());
        let path = write_json(&dir, RESULTS_FILE, &report).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["status"], "empty");
        assert_eq!(written["strategy"], "none");
        assert_eq!(written["results"], Value::Array(Vec::new()));

        std::fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }
}
