use std::path::{Path, PathBuf};

use anyhow::Context as _;
use url::Url;

use crate::cli::DownloadResourcesArgs;
use crate::config::IdentityMode;
use crate::context::RunContext;
use crate::error::DownloadError;
use crate::fetch::Fetcher;
use crate::formats::{AssetKind, AssetSet, FailureRecord, SOURCE_ALLITEBOOKS, Stage};
use crate::pool::{Outcome, StageReport};
use crate::store::BookStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
}

#[derive(Debug)]
pub struct AssetResult {
    pub kind: AssetKind,
    pub url: String,
    pub result: Result<AssetOutcome, DownloadError>,
}

/// Target file name: the last segment of the URL path, percent-decoded.
pub fn asset_file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let name = urlencoding::decode(segment).ok()?;
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return None;
    }
    Some(name.into_owned())
}

/// Fetches each non-blank asset of one book into `<root>/<id>/`, leaving files
/// that already exist untouched. Assets are independent: one failing does not
/// stop the others.
pub async fn download_assets(
    fetcher: &dyn Fetcher,
    resource_root: &Path,
    assets: &AssetSet,
) -> Vec<AssetResult> {
    let dir = resource_root.join(assets.id.trim());
    let dir_result = tokio::fs::create_dir_all(&dir).await;

    let mut results = Vec::new();
    for (kind, url) in assets.urls() {
        if url.trim().is_empty() {
            continue;
        }
        let result = match &dir_result {
            Ok(()) => download_one(fetcher, &dir, url).await,
            Err(err) => Err(DownloadError::Io {
                path: dir.clone(),
                source: std::io::Error::new(err.kind(), err.to_string()),
            }),
        };
        results.push(AssetResult {
            kind,
            url: url.to_owned(),
            result,
        });
    }
    results
}

async fn download_one(
    fetcher: &dyn Fetcher,
    dir: &Path,
    url: &str,
) -> Result<AssetOutcome, DownloadError> {
    let file_name = asset_file_name(url).ok_or_else(|| DownloadError::NoFileName {
        url: url.to_owned(),
    })?;
    let path = dir.join(&file_name);

    let exists = tokio::fs::try_exists(&path)
        .await
        .map_err(|source| DownloadError::Io {
            path: path.clone(),
            source,
        })?;
    if exists {
        tracing::info!(path = %path.display(), "asset already present");
        return Ok(AssetOutcome::AlreadyPresent(path));
    }

    tracing::info!(url, path = %path.display(), "download asset");
    let body = fetcher.fetch_bytes(url.trim(), IdentityMode::Rotate).await?;

    // Write under a temporary name so an interrupted run never leaves a partial
    // file that later runs would treat as present.
    let part = dir.join(format!("{file_name}.part"));
    tokio::fs::write(&part, &body)
        .await
        .map_err(|source| DownloadError::Io {
            path: part.clone(),
            source,
        })?;
    tokio::fs::rename(&part, &path)
        .await
        .map_err(|source| DownloadError::Io {
            path: path.clone(),
            source,
        })?;
    Ok(AssetOutcome::Downloaded(path))
}

pub async fn run(
    ctx: &RunContext,
    store: &BookStore,
    args: DownloadResourcesArgs,
) -> anyhow::Result<StageReport> {
    let sets = store
        .asset_sets(SOURCE_ALLITEBOOKS, args.limit)
        .await
        .context("load asset urls")?;
    let resource_root = ctx.config.app.resource_root.clone();
    tracing::info!(
        books = sets.len(),
        root = %resource_root.display(),
        concurrency = ctx.concurrency,
        "download resources: start"
    );

    let results = crate::pool::run_bounded(sets.clone(), ctx.concurrency, |assets| {
        let fetcher = ctx.fetcher.clone();
        let root = resource_root.clone();
        async move { download_assets(fetcher.as_ref(), &root, &assets).await }
    })
    .await;

    let mut report = StageReport::default();
    let mut failures = Vec::new();
    let mut fail = |url: String, error: String| {
        tracing::warn!(stage = %Stage::DownloadResources, url = %url, %error, "asset failed");
        failures.push(FailureRecord {
            stage: Stage::DownloadResources,
            url,
            error,
            at: chrono::Utc::now().to_rfc3339(),
        });
    };

    for (assets, result) in sets.iter().zip(results) {
        match result {
            Ok(asset_results) => {
                for asset in asset_results {
                    match asset.result {
                        Ok(AssetOutcome::Downloaded(_)) => report.record(Outcome::Done),
                        Ok(AssetOutcome::AlreadyPresent(_)) => report.record(Outcome::Skipped),
                        Err(err) => {
                            report.record(Outcome::Failed);
                            fail(asset.url, err.to_string());
                        }
                    }
                }
            }
            Err(error) => {
                report.record(Outcome::Failed);
                fail(format!("book:{}", assets.id), error.to_string());
            }
        }
    }

    crate::checkpoint::append_failures(&ctx.config.failures_path(), &failures)
        .context("record failures")?;
    tracing::info!(
        downloaded = report.succeeded,
        present = report.skipped,
        failed = report.failed,
        "download resources: done"
    );
    Ok(report)
}
