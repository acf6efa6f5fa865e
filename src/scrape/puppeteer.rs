use std::{ffi::OsStr, sync::Arc, time::Duration};

use headless_chrome::{
    Browser, LaunchOptions, Tab, browser::tab::NoElementFound,
    protocol::cdp::Page::CaptureScreenshotFormatOption,
};
use serde_json::Value;
use tokio::{task::spawn_blocking, time::sleep};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

const INNER_TEXT: &str = "document.body ? document.body.innerText : ''";
const OUTER_HTML: &str = "document.documentElement.outerHTML";
const SCROLL_BOTTOM: &str =
    "window.scrollTo(0, document.body ? document.body.scrollHeight : 0); true";

pub fn puppeteer(headless: bool, proxy: Option<&str>) -> anyhow::Result<Browser> {
    Browser::new(LaunchOptions {
        args: vec![OsStr::new("--disable-blink-features=AutomationControlled")],
        headless,
        window_size: Some((1366, 2400)),
        idle_browser_timeout: const { Duration::from_secs(300) },
        proxy_server: proxy,
        ..LaunchOptions::default()
    })
}

#[allow(clippy::significant_drop_tightening)]
pub fn first_tab(browser: &Browser) -> anyhow::Result<Arc<Tab>> {
    let tab = browser.new_tab()?;
    tab.set_default_timeout(NAVIGATION_TIMEOUT);

    {
        let tabs_guard = browser
            .get_tabs()
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        for remain in &*tabs_guard {
            if !Arc::ptr_eq(&tab, remain) {
                remain.close(true)?;
            }
        }
    }

    Ok(tab)
}

pub async fn navigate_to(tab: &Arc<Tab>, url: String) -> anyhow::Result<()> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || -> anyhow::Result<()> {
        tab.navigate_to(&url)?.wait_until_navigated()?;
        Ok(())
    })
    .await?
}

async fn evaluate(tab: &Arc<Tab>, js: &'static str) -> anyhow::Result<Value> {
    let tab = Arc::clone(tab);

    let ret = spawn_blocking(move || tab.evaluate(js, false)).await??;
    ret.value.ok_or_else(|| anyhow::anyhow!("`{js}` returned nothing"))
}

async fn evaluate_string(tab: &Arc<Tab>, js: &'static str) -> anyhow::Result<String> {
    match evaluate(tab, js).await? {
        Value::String(s) => Ok(s),
        value => anyhow::bail!("not a string: {value}"),
    }
}

/// Navigates, lets client-side rendering settle, then scrolls to the bottom
/// once so lazy sections load before anything is read.
pub async fn load(tab: &Arc<Tab>, url: &str, settle: Duration) -> anyhow::Result<()> {
    tracing::info!(target: "browser", "\x1b[36mloading\x1b[0m {url} ...");
    navigate_to(tab, url.to_owned()).await?;
    sleep(settle).await;
    evaluate(tab, SCROLL_BOTTOM).await?;
    sleep(settle).await;
    Ok(())
}

pub async fn inner_text(tab: &Arc<Tab>) -> anyhow::Result<String> {
    let text = evaluate_string(tab, INNER_TEXT).await?;
    tracing::debug!(target: "browser", "page text: {} chars", text.chars().count());
    Ok(text)
}

pub async fn outer_html(tab: &Arc<Tab>) -> anyhow::Result<String> {
    evaluate_string(tab, OUTER_HTML).await
}

pub async fn render_text(tab: &Arc<Tab>, url: &str, settle: Duration) -> anyhow::Result<String> {
    load(tab, url, settle).await?;
    inner_text(tab).await
}

/// PNG of the element matching `selector`, or of the viewport when there is
/// no selector or nothing matches.
pub async fn screenshot(tab: &Arc<Tab>, selector: Option<String>) -> anyhow::Result<Vec<u8>> {
    let tab = Arc::clone(tab);

    spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
        if let Some(selector) = selector {
            match tab.find_element(&selector) {
                Ok(element) => {
                    element.scroll_into_view()?;
                    return element.capture_screenshot(CaptureScreenshotFormatOption::Png);
                }
                Err(err) if err.is::<NoElementFound>() => {
                    tracing::warn!(target: "browser", "{selector} not found, capturing the viewport");
                }
                Err(err) => return Err(err),
            }
        }
        tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
    })
    .await?
}
