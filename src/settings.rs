use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use reqwest::Url;
use serde::Deserialize;

const CONFIG_FILE: &str = "advisories";
const ENV_PREFIX: &str = "ADVISORY";

pub const DEFAULT_BASE_URL: &str = "https://www.cisa.gov";
pub const DEFAULT_LISTING_URL: &str =
    "https://www.cisa.gov/news-events/cybersecurity-advisories?f%5B0%5D=advisory_type%3A94&page={page}";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    /// Listing page URL with a `{page}` placeholder for the zero-based index.
    pub listing_url: String,
    pub output_root: PathBuf,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub catalog_file: String,
}

impl Settings {
    /// Defaults, then `advisories.toml` if present, then `ADVISORY_*` env vars.
    pub fn load() -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("listing_url", DEFAULT_LISTING_URL)?
            .set_default("output_root", "data/advisories")?
            .set_default("concurrency", 8)?
            .set_default("timeout_secs", 30)?
            .set_default("user_agent", concat!("advisory_scraper/", env!("CARGO_PKG_VERSION")))?
            .set_default("catalog_file", "catalog.sqlite")?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.base()?;
        if !self.listing_url.contains("{page}") {
            bail!("listing_url must contain a {{page}} placeholder: {}", self.listing_url);
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        Ok(())
    }

    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid base_url {:?}", self.base_url))
    }

    pub fn listing_page_url(&self, page: usize) -> String {
        self.listing_url.replace("{page}", &page.to_string())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.output_root.join(&self.catalog_file)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_url: DEFAULT_LISTING_URL.to_string(),
            output_root: PathBuf::from("data/advisories"),
            concurrency: 8,
            timeout_secs: 30,
            user_agent: concat!("advisory_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            catalog_file: "catalog.sqlite".to_string(),
        }
    }
}

// ── Tests ──
