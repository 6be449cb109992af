use std::process::ExitCode;

use anyhow::Context as _;
use bookcrawl::cli::{Cli, Command};
use bookcrawl::context::RunContext;
use bookcrawl::pool::StageReport;
use bookcrawl::store::BookStore;
use clap::Parser as _;

/// The stage ran to completion but some units of work failed.
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(report) if report.has_failures() => ExitCode::from(EXIT_PARTIAL),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<StageReport> {
    let cli = Cli::parse();
    let config = bookcrawl::config::Config::load(&cli.config).context("load config")?;
    let _log_guard =
        bookcrawl::logging::init(config.app.log_file.as_deref()).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let ctx = RunContext::new(config, cli.concurrency).context("build run context")?;

    let report = match cli.command {
        Command::GeneratePages(args) => {
            bookcrawl::pages::run(&ctx.config, args).context("generate pages")?;
            StageReport::default()
        }
        Command::CrawlPages(args) => {
            bookcrawl::listing::run(&ctx, args)
                .await
                .context("crawl pages")?
                .report
        }
        Command::CrawlBooks(args) => {
            let store = open_store(&ctx).await?;
            bookcrawl::detail::run(&ctx, &store, args)
                .await
                .context("crawl books")?
        }
        Command::CrawlBook(args) => {
            let store = open_store(&ctx).await?;
            bookcrawl::detail::crawl_book(&ctx, &store, &args.url)
                .await
                .with_context(|| format!("crawl book: {}", args.url))?;
            StageReport {
                succeeded: 1,
                ..StageReport::default()
            }
        }
        Command::DownloadResources(args) => {
            let store = open_store(&ctx).await?;
            bookcrawl::download::run(&ctx, &store, args)
                .await
                .context("download resources")?
        }
        Command::Harvest(args) => bookcrawl::harvest::run(&ctx, args)
            .await
            .context("harvest")?,
    };

    tracing::info!(
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        "program finished"
    );
    Ok(report)
}

async fn open_store(ctx: &RunContext) -> anyhow::Result<BookStore> {
    BookStore::connect(&ctx.config.store)
        .await
        .context("open book store")
}
