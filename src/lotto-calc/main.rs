#![warn(clippy::pedantic, clippy::nursery)]

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use headless_chrome::Tab;
use lscr::{
    calc::{self, CalcHeaders, CalculationSnapshot},
    config::{CommonArgs, SourceArgs, SourceConfig, VisionConfig},
    output::{self, RunReport, RunStatus},
    scrape::{self, puppeteer},
    vision::VisionReader,
};

/// Scrapes the daily calculation page of each lottery.
#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    sources: SourceArgs,
}

async fn scrape_source(
    tab: &Arc<Tab>,
    source: &SourceConfig,
    headers: &CalcHeaders,
    reader: Option<&VisionReader>,
    settle: Duration,
) -> anyhow::Result<CalculationSnapshot> {
    let text = puppeteer::render_text(tab, &source.url, settle).await?;
    let tables = calc::extract_calculation(&text, headers);
    if !tables.is_empty() {
        return Ok(CalculationSnapshot::new(source.lottery_type, tables));
    }

    let Some(reader) = reader else {
        anyhow::bail!("no calculation tables in page text");
    };
    tracing::info!(target: "calc", "page text of {} has no tables, reading a screenshot", source.lottery_type);
    let png = puppeteer::screenshot(tab, source.selector.clone()).await?;
    let tables = reader.read_tables(&png).await?;
    if tables.is_empty() {
        anyhow::bail!("no calculation tables in screenshot");
    }
    Ok(CalculationSnapshot::new(source.lottery_type, tables))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let sources = args.sources.sources(SourceConfig::calc_table)?;
    let headers = CalcHeaders::default();

    let vision = VisionConfig::from_env(args.common.retry());
    let reader = if vision.is_configured() {
        Some(vision.into_reader(&scrape::basic()?)?)
    } else {
        tracing::info!(target: "calc", "no vision credential, screenshot fallback disabled");
        None
    };

    let browser = scrape::puppeteer(args.common.headless, args.common.proxy.as_deref())?;
    let tab = scrape::first_tab(&browser)?;

    let mut snapshots = BTreeMap::new();
    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(args.common.delay()).await;
        }

        let snapshot = match scrape_source(&tab, source, &headers, reader.as_ref(), args.common.settle()).await {
            Ok(snapshot) => {
                tracing::info!(target: "calc", "\x1b[36m{}\x1b[0m: {}", source.lottery_type, snapshot.tables.summary());
                let name = output::per_source_file("calc", &snapshot);
                if let Err(e) = output::write_json(&args.common.output_dir, &name, &snapshot) {
                    tracing::error!(target: "output", "\x1b[31mcannot write {name}\x1b[0m: {e:#}");
                }
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(target: "calc", "\x1b[31m{} failed\x1b[0m: {e:#}", source.lottery_type);
                None
            }
        };
        output::record_source(&mut snapshots, source.lottery_type, snapshot);
    }

    let report = RunReport::new(snapshots);
    tracing::info!(
        target: "calc",
        "{}/{} sources succeeded",
        report.summary.succeeded,
        report.summary.total,
    );
    if report.status == RunStatus::Empty {
        tracing::warn!(target: "calc", "\x1b[31mno calculation tables extracted\x1b[0m");
    }
    output::write_json(&args.common.output_dir, output::CALCULATIONS_FILE, &report)?;

    Ok(())
}
