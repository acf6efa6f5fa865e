#![warn(clippy::pedantic, clippy::nursery)]

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use headless_chrome::Tab;
use lscr::{
    calc::CalculationSnapshot,
    config::{CommonArgs, SourceArgs, SourceConfig, VisionConfig},
    output::{self, RunReport, RunStatus},
    scrape::{self, puppeteer},
    vision::VisionReader,
};

/// Reads calculation tables from screenshots through the vision backends.
#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    sources: SourceArgs,
}

async fn read_source(
    tab: &Arc<Tab>,
    source: &SourceConfig,
    reader: &VisionReader,
    settle: Duration,
) -> anyhow::Result<CalculationSnapshot> {
    puppeteer::load(tab, &source.url, settle).await?;
    let png = puppeteer::screenshot(tab, source.selector.clone()).await?;
    tracing::debug!(target: "vision", "screenshot of {}: {} bytes", source.lottery_type, png.len());

    let tables = reader.read_tables(&png).await?;
    if tables.is_empty() {
        anyhow::bail!("reply held no calculation tables");
    }
    Ok(CalculationSnapshot::new(source.lottery_type, tables))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let sources = args.sources.sources(SourceConfig::vision_table)?;
    let reader = VisionConfig::from_env(args.common.retry()).into_reader(&scrape::basic()?)?;
    tracing::info!(target: "vision", "providers: {}", reader.provider_names().join(", "));

    let browser = scrape::puppeteer(args.common.headless, args.common.proxy.as_deref())?;
    let tab = scrape::first_tab(&browser)?;

    let mut snapshots = BTreeMap::new();
    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(args.common.delay()).await;
        }

        let snapshot = match read_source(&tab, source, &reader, args.common.settle()).await {
            Ok(snapshot) => {
                tracing::info!(target: "vision", "\x1b[36m{}\x1b[0m: {}", source.lottery_type, snapshot.tables.summary());
                let name = output::per_source_file("vision", &snapshot);
                if let Err(e) = output::write_json(&args.common.output_dir, &name, &snapshot) {
                    tracing::error!(target: "output", "\x1b[31mcannot write {name}\x1b[0m: {e:#}");
                }
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(target: "vision", "\x1b[31m{} failed\x1b[0m: {e:#}", source.lottery_type);
                None
            }
        };
        output::record_source(&mut snapshots, source.lottery_type, snapshot);
    }

    let report = RunReport::new(snapshots);
    tracing::info!(
        target: "vision",
        "{}/{} sources succeeded",
        report.summary.succeeded,
        report.summary.total,
    );
    if report.status == RunStatus::Empty {
        tracing::warn!(target: "vision", "\x1b[31mno tables read\x1b[0m");
    }
    output::write_json(&args.common.output_dir, output::VISION_FILE, &report)?;

    Ok(())
}
