use std::sync::LazyLock;

use anyhow::Context as _;
use scraper::{ElementRef, Html, Selector};
use uuid::Uuid;

use crate::cli::CrawlBooksArgs;
use crate::context::RunContext;
use crate::error::ParseError;
use crate::formats::{BookRecord, FailureRecord, SOURCE_ALLITEBOOKS, Stage};
use crate::pool::{Outcome, StageReport};
use crate::store::{BookStore, InsertOutcome};

macro_rules! selector {
    ($css:literal) => {
        LazyLock::new(|| Selector::parse($css).expect(concat!("valid selector: ", $css)))
    };
}

static ARTICLE: LazyLock<Selector> = selector!("article.single-post");
static HEADER: LazyLock<Selector> = selector!("header.entry-header");
static TITLE: LazyLock<Selector> = selector!("h1.single-title");
static SUBTITLE: LazyLock<Selector> = selector!("h4");
static CONTENT: LazyLock<Selector> = selector!("div.entry-content");
static THUMBNAIL: LazyLock<Selector> = selector!("img.attachment-post-thumbnail");
static BOOK_DETAIL: LazyLock<Selector> = selector!("div.book-detail");
static TERM: LazyLock<Selector> = selector!("dt");
static VALUE: LazyLock<Selector> = selector!("dd");
static DOWNLOAD_LINKS: LazyLock<Selector> = selector!("span.download-links");
static NEW_TAB_ANCHOR: LazyLock<Selector> = selector!(r#"a[target="_blank"]"#);

#[derive(Debug, Default, PartialEq, Eq)]
struct Metadata {
    author_name: String,
    isbn_10: String,
    publication_year: i64,
    pages: i64,
    language: String,
    file_size: String,
    file_format: String,
    category_name: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DownloadLinks {
    pdf: String,
    epub: String,
    mobi: String,
    all: Vec<String>,
}

/// Parses one book-detail page. Any structural mismatch or malformed number
/// fails the whole record.
pub fn parse_book(body: &str, detail_url: &str) -> Result<BookRecord, ParseError> {
    let document = Html::parse_document(body);
    let article = document
        .select(&ARTICLE)
        .next()
        .ok_or(ParseError::MissingElement {
            what: "article.single-post",
        })?;
    let header = article
        .select(&HEADER)
        .next()
        .ok_or(ParseError::MissingElement {
            what: "header.entry-header",
        })?;

    let title = header
        .select(&TITLE)
        .next()
        .map(|el| text_of(el).trim().to_owned())
        .ok_or(ParseError::MissingElement {
            what: "h1.single-title",
        })?;

    let short_description = header
        .select(&SUBTITLE)
        .next()
        .map(|el| strip_blank_lines(&text_of(el)))
        .unwrap_or_default();

    let description = article
        .select(&CONTENT)
        .next()
        .map(|el| strip_blank_lines(&text_of(el)))
        .ok_or(ParseError::MissingElement {
            what: "div.entry-content",
        })?;

    let img_url = header
        .select(&THUMBNAIL)
        .next()
        .ok_or(ParseError::MissingElement {
            what: "img.attachment-post-thumbnail",
        })?
        .value()
        .attr("src")
        .ok_or(ParseError::MissingAttribute {
            what: "img.attachment-post-thumbnail[src]",
        })?
        .to_owned();

    let detail_box = header
        .select(&BOOK_DETAIL)
        .next()
        .ok_or(ParseError::MissingElement {
            what: "div.book-detail",
        })?;
    let terms = detail_box.select(&TERM).map(text_of).collect::<Vec<_>>();
    let values = detail_box.select(&VALUE).map(text_of).collect::<Vec<_>>();
    let metadata = map_metadata(&terms, &values)?;

    let downloads = classify_download_links(article)?;

    Ok(BookRecord {
        id: Uuid::new_v4(),
        detail_url: detail_url.to_owned(),
        title,
        author_name: metadata.author_name,
        isbn_10: metadata.isbn_10,
        publication_year: metadata.publication_year,
        pages: metadata.pages,
        language: metadata.language,
        file_size: metadata.file_size,
        file_format: metadata.file_format,
        category_name: metadata.category_name,
        short_description,
        description,
        img_url,
        download_url_pdf: downloads.pdf,
        download_url_epub: downloads.epub,
        download_url_mobi: downloads.mobi,
        download_urls: downloads.all,
        source: SOURCE_ALLITEBOOKS,
        created: chrono::Utc::now(),
    })
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Drops empty and whitespace-only lines, rejoining the rest with `\n`.
pub fn strip_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pairs the i-th term with the i-th value and keeps only known terms.
/// Term labels must match exactly, trailing colon included.
fn map_metadata(terms: &[String], values: &[String]) -> Result<Metadata, ParseError> {
    if terms.len() != values.len() {
        return Err(ParseError::MetadataMismatch {
            terms: terms.len(),
            values: values.len(),
        });
    }

    let mut metadata = Metadata::default();
    for (term, value) in terms.iter().zip(values) {
        let value = value.trim();
        match term.as_str() {
            "Author:" => metadata.author_name = value.to_owned(),
            "ISBN-10:" => metadata.isbn_10 = value.to_owned(),
            "Year:" => metadata.publication_year = parse_number("Year:", value)?,
            "Pages:" => metadata.pages = parse_number("Pages:", value)?,
            "Language:" => metadata.language = value.to_owned(),
            "File size:" => metadata.file_size = value.to_owned(),
            "File format:" => metadata.file_format = value.to_owned(),
            "Category:" => metadata.category_name = value.to_owned(),
            other => tracing::trace!(term = other, "ignore unknown metadata term"),
        }
    }
    Ok(metadata)
}

fn parse_number(field: &'static str, value: &str) -> Result<i64, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: value.to_owned(),
    })
}

/// Later links of the same format replace earlier ones.
fn classify_download_links(article: ElementRef<'_>) -> Result<DownloadLinks, ParseError> {
    let mut links = DownloadLinks::default();
    for item in article.select(&DOWNLOAD_LINKS) {
        let href = item
            .select(&NEW_TAB_ANCHOR)
            .next()
            .ok_or(ParseError::MissingElement {
                what: "span.download-links a[target=_blank]",
            })?
            .value()
            .attr("href")
            .ok_or(ParseError::MissingAttribute {
                what: "span.download-links a[href]",
            })?
            .to_owned();

        if href.contains(".pdf") {
            links.pdf = href.clone();
        } else if href.contains(".epub") {
            links.epub = href.clone();
        } else if href.contains(".mobi") {
            links.mobi = href.clone();
        }
        links.all.push(href);
    }
    Ok(links)
}

/// Fetch, parse and store one detail page.
pub async fn crawl_book(
    ctx: &RunContext,
    store: &BookStore,
    detail_url: &str,
) -> anyhow::Result<InsertOutcome> {
    let body = ctx
        .fetcher
        .fetch_text(detail_url, ctx.config.http.identity)
        .await?;
    let record = parse_book(&body, detail_url)?;
    tracing::debug!(url = detail_url, title = %record.title, "book parsed");

    let outcome = store.insert(&record).await?;
    match outcome {
        InsertOutcome::Inserted => {
            tracing::info!(url = detail_url, id = %record.id, "crawl success")
        }
        InsertOutcome::SkippedDuplicate => {
            tracing::info!(url = detail_url, "book already stored; skipped")
        }
    }
    Ok(outcome)
}

pub async fn run(
    ctx: &RunContext,
    store: &BookStore,
    args: CrawlBooksArgs,
) -> anyhow::Result<StageReport> {
    let sites_path = ctx.config.book_sites_path();
    let mut detail_urls = crate::checkpoint::read_urls(&sites_path).context("read detail url list")?;
    if let Some(limit) = args.limit {
        detail_urls.truncate(limit);
    }
    tracing::info!(
        books = detail_urls.len(),
        concurrency = ctx.concurrency,
        duplicate_policy = ?store.duplicate_policy(),
        "crawl books: start"
    );

    let results = crate::pool::run_bounded(detail_urls.clone(), ctx.concurrency, |url| {
        let ctx = ctx.clone();
        let store = store.clone();
        async move { crawl_book(&ctx, &store, &url).await }
    })
    .await;

    let mut report = StageReport::default();
    let mut failures = Vec::new();
    for (url, result) in detail_urls.iter().zip(results) {
        match result.map_err(anyhow::Error::from).and_then(|r| r) {
            Ok(InsertOutcome::Inserted) => report.record(Outcome::Done),
            Ok(InsertOutcome::SkippedDuplicate) => report.record(Outcome::Skipped),
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(stage = %Stage::CrawlBooks, url = %url, %error, "book failed");
                report.record(Outcome::Failed);
                failures.push(FailureRecord {
                    stage: Stage::CrawlBooks,
                    url: url.clone(),
                    error,
                    at: chrono::Utc::now().to_rfc3339(),
                });
            }
        }
    }

    crate::checkpoint::append_failures(&ctx.config.failures_path(), &failures)
        .context("record failures")?;

    let stored = store.count_books(SOURCE_ALLITEBOOKS).await?;
    tracing::info!(
        inserted = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        stored,
        "crawl books: done"
    );
    Ok(report)
}
