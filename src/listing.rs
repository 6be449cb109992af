use std::sync::LazyLock;

use anyhow::Context as _;
use scraper::{Html, Selector};
use url::Url;

use crate::cli::CrawlPagesArgs;
use crate::context::RunContext;
use crate::error::ParseError;
use crate::formats::{FailureRecord, Stage};
use crate::pool::{Outcome, StageReport};

static MAIN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main").expect("valid selector: main"));
static BOOKMARK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[rel~="bookmark"]"#).expect("valid selector: bookmark anchor")
});

/// Detail-page URLs on one listing page, in document order.
///
/// Each book is rendered as a pair of bookmark anchors (thumbnail, then title),
/// so only the first anchor of every pair is used; a trailing unpaired anchor is
/// ignored. Relative hrefs are resolved against `page_url`.
pub fn extract_detail_urls(body: &str, page_url: &Url) -> Result<Vec<String>, ParseError> {
    let document = Html::parse_document(body);
    let main = document
        .select(&MAIN)
        .next()
        .ok_or(ParseError::MissingElement { what: "main" })?;

    let anchors = main.select(&BOOKMARK).collect::<Vec<_>>();
    let urls = anchors
        .chunks_exact(2)
        .filter_map(|pair| pair[0].value().attr("href"))
        .filter_map(|href| match page_url.join(href.trim()) {
            Ok(url) => Some(url.to_string()),
            Err(err) => {
                tracing::debug!(href, %err, "skip unparsable bookmark href");
                None
            }
        })
        .collect();
    Ok(urls)
}

#[derive(Debug)]
pub struct CrawlPagesOutput {
    pub detail_urls: Vec<String>,
    pub report: StageReport,
}

/// Fetches every listing page, merges the detail URLs in page order and writes
/// them to the detail-URL checkpoint.
pub async fn run(ctx: &RunContext, args: CrawlPagesArgs) -> anyhow::Result<CrawlPagesOutput> {
    let pages_path = ctx.config.book_pages_path();
    let mut pages = crate::checkpoint::read_urls(&pages_path).context("read page list")?;
    if let Some(limit) = args.limit {
        pages.truncate(limit);
    }
    tracing::info!(
        pages = pages.len(),
        concurrency = ctx.concurrency,
        "crawl pages: start"
    );

    let identity = ctx.config.http.identity;
    let results = crate::pool::run_bounded(pages.clone(), ctx.concurrency, |page| {
        let fetcher = ctx.fetcher.clone();
        async move {
            let page_url = Url::parse(&page).with_context(|| format!("parse page url: {page}"))?;
            let body = fetcher.fetch_text(page.as_str(), identity).await?;
            let urls = extract_detail_urls(&body, &page_url)?;
            tracing::debug!(page = %page, found = urls.len(), "listing page parsed");
            anyhow::Ok(urls)
        }
    })
    .await;

    let mut report = StageReport::default();
    let mut failures = Vec::new();
    let mut detail_urls = Vec::new();
    for (page, result) in pages.iter().zip(results) {
        match result.map_err(anyhow::Error::from).and_then(|r| r) {
            Ok(urls) => {
                report.record(Outcome::Done);
                detail_urls.extend(urls);
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(stage = %Stage::CrawlPages, url = %page, %error, "listing page failed");
                report.record(Outcome::Failed);
                failures.push(FailureRecord {
                    stage: Stage::CrawlPages,
                    url: page.clone(),
                    error,
                    at: chrono::Utc::now().to_rfc3339(),
                });
            }
        }
    }

    let sites_path = ctx.config.book_sites_path();
    crate::checkpoint::write_urls(&sites_path, &detail_urls).context("write detail url list")?;
    crate::checkpoint::append_failures(&ctx.config.failures_path(), &failures)
        .context("record failures")?;

    tracing::info!(
        pages_ok = report.succeeded,
        pages_failed = report.failed,
        detail_urls = detail_urls.len(),
        path = %sites_path.display(),
        "crawl pages: done"
    );
    Ok(CrawlPagesOutput {
        detail_urls,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("http://www.allitebooks.com/page/1").unwrap()
    }

    fn listing(anchors: &str) -> String {
        format!(
            r#"<!doctype html><html><body>
<header><a rel="bookmark" href="http://www.allitebooks.com/header-link/">x</a></header>
<main id="main-content">{anchors}</main>
</body></html>"#
        )
    }

    #[test]
    fn two_books_four_anchors() -> anyhow::Result<()> {
        let body = listing(
            r#"
<article><a rel="bookmark" href="http://www.allitebooks.com/book-one/"><img src="1.jpg"></a>
<h2><a rel="bookmark" href="http://www.allitebooks.com/book-one/">Book One</a></h2></article>
<article><a rel="bookmark" href="http://www.allitebooks.com/book-two/"><img src="2.jpg"></a>
<h2><a rel="bookmark" href="http://www.allitebooks.com/book-two/">Book Two</a></h2></article>"#,
        );

        let urls = extract_detail_urls(&body, &page_url())?;
        assert_eq!(
            urls,
            vec![
                "http://www.allitebooks.com/book-one/",
                "http://www.allitebooks.com/book-two/",
            ]
        );
        Ok(())
    }

    #[test]
    fn count_is_half_of_anchor_count() -> anyhow::Result<()> {
        for n in 0..9 {
            let anchors = (0..n)
                .map(|i| format!(r#"<a rel="bookmark" href="/b{}/">b</a>"#, i / 2))
                .collect::<String>();
            let urls = extract_detail_urls(&listing(&anchors), &page_url())?;
            assert_eq!(urls.len(), n / 2, "anchors: {n}");
        }
        Ok(())
    }

    #[test]
    fn anchors_without_href_are_skipped() -> anyhow::Result<()> {
        let body = listing(
            r#"<a rel="bookmark">no href</a><a rel="bookmark" href="/a/">a</a>
<a rel="bookmark" href="/b/">b</a><a rel="bookmark" href="/b/">b</a>"#,
        );
        let urls = extract_detail_urls(&body, &page_url())?;
        assert_eq!(urls, vec!["http://www.allitebooks.com/b/"]);
        Ok(())
    }

    #[test]
    fn other_rel_values_are_ignored() -> anyhow::Result<()> {
        let body = listing(
            r#"<a rel="nofollow" href="/ad/">ad</a>
<a rel="bookmark" href="/a/">a</a><a rel="bookmark" href="/a/">a</a>"#,
        );
        let urls = extract_detail_urls(&body, &page_url())?;
        assert_eq!(urls, vec!["http://www.allitebooks.com/a/"]);
        Ok(())
    }

    #[test]
    fn missing_main_is_a_parse_error() {
        let body = r#"<html><body><a rel="bookmark" href="/a/">a</a></body></html>"#;
        let err = extract_detail_urls(body, &page_url()).unwrap_err();
        assert_eq!(err, ParseError::MissingElement { what: "main" });
    }
}
