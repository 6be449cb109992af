use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub const BOOK_PAGES_FILE: &str = "book_pages.txt";
pub const BOOK_SITES_FILE: &str = "book_sites.txt";
pub const FAILURES_FILE: &str = "failures.jsonl";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub number_of_parallelism: usize,
    pub data_dir: PathBuf,
    pub resource_root: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            number_of_parallelism: 4,
            data_dir: PathBuf::from("data"),
            resource_root: PathBuf::from("resources"),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub root: String,
    pub from_page: i64,
    pub to_page: i64,
    pub subpath: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: "http://www.allitebooks.com".to_owned(),
            from_page: 1,
            to_page: 852,
            subpath: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// One browser identity for every request.
    #[default]
    Fixed,
    /// A random identity from the pool per request.
    Rotate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub identity: IdentityMode,
    pub timeout_secs: Option<u64>,
    pub retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            identity: IdentityMode::Fixed,
            timeout_secs: None,
            retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every parsed record becomes a new row, even for a detail URL seen before.
    #[default]
    AlwaysInsert,
    /// Drop a record whose detail URL already has a row from the same source.
    SkipExistingUrl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/books.db".to_owned(),
            max_connections: 8,
            duplicate_policy: DuplicatePolicy::AlwaysInsert,
        }
    }
}

impl Config {
    /// Loads the YAML config. A missing file, an empty file or a file without any
    /// top-level section is an error: nothing useful can run without it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse config: {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let blank = raw.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            anyhow::bail!("config has no sections");
        }

        let value: serde_yaml::Value = serde_yaml::from_str(raw).context("parse yaml")?;
        let sections = match &value {
            serde_yaml::Value::Mapping(map) => map.len(),
            _ => 0,
        };
        if sections == 0 {
            anyhow::bail!("config has no sections");
        }

        let config: Self = serde_yaml::from_value(value).context("deserialize config")?;
        if config.app.number_of_parallelism == 0 {
            anyhow::bail!("app.number_of_parallelism must be >= 1");
        }
        Ok(config)
    }

    pub fn book_pages_path(&self) -> PathBuf {
        self.app.data_dir.join(BOOK_PAGES_FILE)
    }

    pub fn book_sites_path(&self) -> PathBuf {
        self.app.data_dir.join(BOOK_SITES_FILE)
    }

    pub fn failures_path(&self) -> PathBuf {
        self.app.data_dir.join(FAILURES_FILE)
    }
}
