use anyhow::Context as _;

use crate::cli::{CrawlBooksArgs, CrawlPagesArgs, DownloadResourcesArgs, HarvestArgs};
use crate::context::RunContext;
use crate::pool::StageReport;
use crate::store::BookStore;

/// generate-pages → crawl-pages → crawl-books → download-resources, each stage
/// reading the checkpoint the previous one wrote.
pub async fn run(ctx: &RunContext, args: HarvestArgs) -> anyhow::Result<StageReport> {
    let mut report = StageReport::default();

    tracing::info!("harvest: generate pages");
    let pages = crate::pages::run(&ctx.config, args.pages).context("generate pages")?;
    if pages.is_empty() {
        tracing::warn!("harvest: no pages to crawl");
        return Ok(report);
    }

    tracing::info!("harvest: crawl pages");
    let listing = crate::listing::run(ctx, CrawlPagesArgs::default())
        .await
        .context("crawl pages")?;
    report.merge(listing.report);

    let store = BookStore::connect(&ctx.config.store)
        .await
        .context("open book store")?;

    tracing::info!("harvest: crawl books");
    let books = crate::detail::run(ctx, &store, CrawlBooksArgs::default())
        .await
        .context("crawl books")?;
    report.merge(books);

    if args.skip_downloads {
        return Ok(report);
    }

    tracing::info!("harvest: download resources");
    let downloads = crate::download::run(
        ctx,
        &store,
        DownloadResourcesArgs {
            limit: args.download_limit,
        },
    )
    .await
    .context("download resources")?;
    report.merge(downloads);

    Ok(report)
}
