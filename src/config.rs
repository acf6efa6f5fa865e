use core::time::Duration;
use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    catalog::LotteryType,
    vision::{RetryPolicy, VisionProvider, VisionReader, gemini::Gemini, openai::OpenAi},
};

pub mod constants {
    macro_rules! env_or_default {
        ($name:expr, $default:expr) => {
            if let Some(s) = option_env!($name) {
                s
            } else {
                $default
            }
        };
    }

    pub const RESULTS_URL: &str =
        env_or_default!("LOTTO_RESULTS_URL", "https://news.sanook.com/lotto/");
    pub const CALC_BASE_URL: &str =
        env_or_default!("LOTTO_CALC_BASE_URL", "https://www.huaythai.com");
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no vision credential: set GEMINI_API_KEY or OPENAI_API_KEY")]
    NoVisionCredential,

    #[error("cannot read sources file {}: {source}", path.display())]
    SourcesRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid sources file {}: {source}", path.display())]
    SourcesParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Calculation pages: lottery type and path under the calculation base URL.
#[rustfmt::skip]
pub const CALC_SOURCES: [(LotteryType, &str); 7] = [
    (LotteryType::ThaiGovernment, "/calc/thai"),
    (LotteryType::Gsb, "/calc/gsb"),
    (LotteryType::Baac, "/calc/baac"),
    (LotteryType::LaoPattana, "/calc/lao"),
    (LotteryType::HanoiSpecial, "/calc/hanoi-special"),
    (LotteryType::HanoiNormal, "/calc/hanoi"),
    (LotteryType::HanoiVip, "/calc/hanoi-vip"),
];

/// Pages read through screenshots: type, path and the element to capture.
#[rustfmt::skip]
pub const VISION_SOURCES: [(LotteryType, &str, &str); 4] = [
    (LotteryType::Malaysia, "/calc/malaysia", "#calc-table"),
    (LotteryType::LaoHd, "/calc/lao-hd", "#calc-table"),
    (LotteryType::LaoStar, "/calc/lao-star", "#calc-table"),
    (LotteryType::HanoiVip, "/calc/hanoi-vip", "#calc-table"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub lottery_type: LotteryType,
    pub url: String,
    #[serde(default)]
    pub selector: Option<String>,
}

impl SourceConfig {
    fn join(base: &str, path: &str) -> String {
        format!("{}{path}", base.trim_end_matches('/'))
    }

    pub fn calc_table(base: &str) -> Vec<Self> {
        CALC_SOURCES
            .iter()
            .map(|&(lottery_type, path)| Self {
                lottery_type,
                url: Self::join(base, path),
                selector: None,
            })
            .collect()
    }

    pub fn vision_table(base: &str) -> Vec<Self> {
        VISION_SOURCES
            .iter()
            .map(|&(lottery_type, path, selector)| Self {
                lottery_type,
                url: Self::join(base, path),
                selector: Some(selector.to_owned()),
            })
            .collect()
    }

    /// A JSON array of sources replacing the built-in table.
    pub fn load(path: &Path) -> Result<Vec<Self>, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::SourcesRead {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::SourcesParse {
            path: path.to_owned(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub api_key: String,
    pub model: String,
}

/// Provider credentials; a backend without a key is left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionConfig {
    pub gemini: Option<Credential>,
    pub openai: Option<Credential>,
    pub openai_base_url: String,
    pub retry: RetryPolicy,
}

impl VisionConfig {
    pub fn from_env(retry: RetryPolicy) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), retry)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, retry: RetryPolicy) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let credential = |key: &str, model: &str, default: &str| {
            non_empty(key).map(|api_key| Credential {
                api_key,
                model: non_empty(model).unwrap_or_else(|| default.to_owned()),
            })
        };

        Self {
            gemini: credential("GEMINI_API_KEY", "GEMINI_MODEL", crate::vision::gemini::DEFAULT_MODEL),
            openai: credential("OPENAI_API_KEY", "OPENAI_MODEL", crate::vision::openai::DEFAULT_MODEL),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| crate::vision::openai::DEFAULT_BASE_URL.to_owned()),
            retry,
        }
    }

    pub const fn is_configured(&self) -> bool {
        self.gemini.is_some() || self.openai.is_some()
    }

    pub fn into_reader(self, client: &Client) -> Result<VisionReader, ConfigError> {
        let mut providers: Vec<Box<dyn VisionProvider>> = Vec::with_capacity(2);
        if let Some(c) = self.gemini {
            providers.push(Box::new(Gemini::new(client.clone(), c.api_key, c.model)));
        }
        if let Some(c) = self.openai {
            providers.push(Box::new(OpenAi::new(
                client.clone(),
                c.api_key,
                c.model,
                &self.openai_base_url,
            )));
        }
        VisionReader::new(providers, self.retry)
    }
}

/// Options shared by every binary.
#[derive(Debug, Clone, clap::Args)]
pub struct CommonArgs {
    /// Directory the JSON files are written to
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Pause between two sources, in milliseconds
    #[arg(long, env = "SOURCE_DELAY_MS", default_value_t = 3000)]
    pub delay_ms: u64,

    /// Wait after navigation and after scrolling, in milliseconds
    #[arg(long, env = "PAGE_SETTLE_MS", default_value_t = 4000)]
    pub settle_ms: u64,

    #[arg(long, env = "HEADLESS", default_value_t = true, action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Total tries per vision provider while it is rate limited
    #[arg(long, env = "VISION_MAX_ATTEMPTS", default_value_t = 3)]
    pub vision_max_attempts: u32,

    #[arg(long, env = "VISION_BACKOFF_MS", default_value_t = 5000)]
    pub vision_backoff_ms: u64,

    #[arg(long, env = "PROXY_SERVER")]
    pub proxy: Option<String>,
}

impl CommonArgs {
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.vision_max_attempts,
            Duration::from_millis(self.vision_backoff_ms),
        )
    }
}

/// Source-table options for the calculation and vision binaries.
#[derive(Debug, Clone, clap::Args)]
pub struct SourceArgs {
    #[arg(long, env = "LOTTO_CALC_BASE_URL", default_value = constants::CALC_BASE_URL)]
    pub base_url: String,

    /// JSON array of `{lottery_type, url, selector?}` replacing the built-in table
    #[arg(long, env = "SOURCES_FILE")]
    pub sources_file: Option<PathBuf>,
}

impl SourceArgs {
    pub fn sources(
        &self,
        builtin: fn(&str) -> Vec<SourceConfig>,
    ) -> Result<Vec<SourceConfig>, ConfigError> {
        match &self.sources_file {
            Some(path) => SourceConfig::load(path),
            None => Ok(builtin(&self.base_url)),
        }
    }
}
