#![warn(clippy::pedantic, clippy::nursery)]

use std::sync::Arc;

use headless_chrome::Tab;
use lscr::{
    catalog::Catalog,
    config::{CommonArgs, VisionConfig, constants},
    extract::{self, dom::DomExtractor},
    format::{self, DrawRecord, Summary},
    output::{self, ResultsReport, RunStatus, Strategy},
    scrape::{self, puppeteer},
};

/// Scrapes the latest draw of every known lottery from one results page.
#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, env = "LOTTO_RESULTS_URL", default_value = constants::RESULTS_URL)]
    url: String,
}

/// Text scan, then the DOM, then a screenshot; the first that yields records wins.
async fn collect(
    tab: &Arc<Tab>,
    args: &Args,
    catalog: &Catalog,
) -> anyhow::Result<(Strategy, Vec<DrawRecord>)> {
    let text = puppeteer::render_text(tab, &args.url, args.common.settle()).await?;
    let records = format::merge(extract::extract_text(&text, catalog));
    if !records.is_empty() {
        return Ok((Strategy::Text, records));
    }

    tracing::info!(target: "results", "text scan found nothing, trying result blocks");
    let html = puppeteer::outer_html(tab).await?;
    let records = format::merge(DomExtractor::new(catalog)?.extract(&html));
    if !records.is_empty() {
        return Ok((Strategy::Dom, records));
    }

    let vision = VisionConfig::from_env(args.common.retry());
    if !vision.is_configured() {
        tracing::warn!(target: "results", "no vision credential, skipping the screenshot reading");
        return Ok((Strategy::None, Vec::new()));
    }

    tracing::info!(target: "results", "result blocks found nothing, reading a screenshot");
    let reader = vision.into_reader(&scrape::basic()?)?;
    let png = puppeteer::screenshot(tab, None).await?;
    let records = reader.read_results(&png).await?;
    let strategy = if records.is_empty() { Strategy::None } else { Strategy::Vision };
    Ok((strategy, records))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let catalog = Catalog::builtin()?;

    let browser = scrape::puppeteer(args.common.headless, args.common.proxy.as_deref())?;
    let tab = scrape::first_tab(&browser)?;

    let (strategy, records) = match collect(&tab, &args, &catalog).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(target: "results", "\x1b[31m{} failed\x1b[0m: {e:#}", args.url);
            (Strategy::None, Vec::new())
        }
    };

    tracing::info!(target: "results", "{strategy:?}: {}", Summary::of(&records));
    for record in &records {
        tracing::info!(
            target: "results",
            "{} {} {:?}",
            record.lottery_name,
            record.draw_date.as_deref().unwrap_or("-"),
            record.results,
        );
    }

    let report = ResultsReport::new(args.url.clone(), strategy, records);
    if report.status == RunStatus::Empty {
        tracing::warn!(target: "results", "\x1b[31mno results extracted\x1b[0m");
    }
    output::write_json(&args.common.output_dir, output::RESULTS_FILE, &report)?;

    Ok(())
}
