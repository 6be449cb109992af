use std::sync::Arc;

use crate::config::Config;
use crate::fetch::{Fetcher, HttpFetcher};

/// Shared, read-only state handed to every stage.
#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn Fetcher>,
    pub concurrency: usize,
}

impl RunContext {
    pub fn new(config: Config, concurrency: Option<usize>) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher), concurrency))
    }

    pub fn with_fetcher(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        concurrency: Option<usize>,
    ) -> Self {
        let concurrency = concurrency
            .unwrap_or(config.app.number_of_parallelism)
            .max(1);
        Self {
            config: Arc::new(config),
            fetcher,
            concurrency,
        }
    }
}
