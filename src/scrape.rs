pub mod puppeteer;

use core::time::Duration;

use reqwest::Client;

pub use puppeteer::{first_tab, puppeteer};

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// HTTP client for the vision backends.
pub fn basic() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(const { Duration::from_secs(8) })
        .timeout(const { Duration::from_secs(120) })
        .user_agent(USER_AGENT)
        .build()
}
