use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, default_value = "bookcrawl.yaml")]
    pub config: PathBuf,

    /// Worker pool width (overrides `app.number_of_parallelism`).
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the listing-page URLs to the page checkpoint.
    GeneratePages(GeneratePagesArgs),
    /// Collect detail-page URLs from every listing page in the page checkpoint.
    CrawlPages(CrawlPagesArgs),
    /// Parse and store every detail page in the detail-URL checkpoint.
    CrawlBooks(CrawlBooksArgs),
    /// Parse and store a single detail page.
    CrawlBook(CrawlBookArgs),
    /// Download cover images and book files for stored books.
    DownloadResources(DownloadResourcesArgs),
    /// Run every stage in order.
    Harvest(HarvestArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct GeneratePagesArgs {
    /// First listing page (default: `site.from_page`).
    #[arg(long)]
    pub from: Option<i64>,

    /// Last listing page, inclusive (default: `site.to_page`).
    #[arg(long)]
    pub to: Option<i64>,

    /// Category path such as `/web-development` (default: `site.subpath`).
    #[arg(long)]
    pub subpath: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CrawlPagesArgs {
    /// Only crawl the first N listing pages.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CrawlBooksArgs {
    /// Only crawl the first N detail pages.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct CrawlBookArgs {
    /// Detail page URL.
    #[arg(long)]
    pub url: String,
}

#[derive(Debug, Clone, Args)]
pub struct DownloadResourcesArgs {
    /// Maximum number of stored books to process.
    #[arg(long, default_value_t = 10)]
    pub limit: i64,
}

#[derive(Debug, Clone, Args)]
pub struct HarvestArgs {
    #[command(flatten)]
    pub pages: GeneratePagesArgs,

    /// Maximum number of stored books to download assets for.
    #[arg(long, default_value_t = 10)]
    pub download_limit: i64,

    /// Stop after storing books.
    #[arg(long)]
    pub skip_downloads: bool,
}
