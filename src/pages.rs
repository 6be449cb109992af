use anyhow::Context as _;

use crate::cli::GeneratePagesArgs;
use crate::config::Config;

/// Listing URLs for pages `from..=to` under `subpath`. Anything but `0 < from < to`
/// yields an empty list rather than an error.
pub fn generate_pages(root: &str, from: i64, to: i64, subpath: &str) -> Vec<String> {
    if !(0 < from && from < to) {
        return Vec::new();
    }
    (from..=to)
        .map(|page| format!("{root}{subpath}/page/{page}"))
        .collect()
}

pub fn run(config: &Config, args: GeneratePagesArgs) -> anyhow::Result<Vec<String>> {
    let from = args.from.unwrap_or(config.site.from_page);
    let to = args.to.unwrap_or(config.site.to_page);
    let subpath = args.subpath.unwrap_or_else(|| config.site.subpath.clone());

    let pages = generate_pages(&config.site.root, from, to, &subpath);
    if pages.is_empty() {
        tracing::warn!(from, to, "page range is empty; writing empty page list");
    }

    let path = config.book_pages_path();
    crate::checkpoint::write_urls(&path, &pages).context("write page list")?;
    tracing::info!(
        pages = pages.len(),
        path = %path.display(),
        "generate pages: done"
    );
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "http://www.allitebooks.com";

    fn page_number(url: &str) -> i64 {
        url.rsplit('/').next().unwrap().parse().unwrap()
    }

    #[test]
    fn range_is_inclusive_and_ascending() {
        let pages = generate_pages(ROOT, 3, 7, "");
        assert_eq!(pages.len(), 5);
        assert_eq!(pages[0], "http://www.allitebooks.com/page/3");
        assert_eq!(pages[4], "http://www.allitebooks.com/page/7");

        let numbers = pages.iter().map(|p| page_number(p)).collect::<Vec<_>>();
        assert!(numbers.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn subpath_is_inserted_before_page_segment() {
        let pages = generate_pages(ROOT, 1, 2, "/web-development");
        assert_eq!(
            pages,
            vec![
                "http://www.allitebooks.com/web-development/page/1",
                "http://www.allitebooks.com/web-development/page/2",
            ]
        );
    }

    #[test]
    fn invalid_ranges_are_empty() {
        assert!(generate_pages(ROOT, 0, 5, "").is_empty());
        assert!(generate_pages(ROOT, -2, 5, "").is_empty());
        assert!(generate_pages(ROOT, 5, 5, "").is_empty());
        assert!(generate_pages(ROOT, 6, 5, "").is_empty());
    }

    #[test]
    fn count_matches_range_width() {
        for (from, to) in [(1, 2), (1, 852), (40, 41), (10, 99)] {
            assert_eq!(generate_pages(ROOT, from, to, "").len() as i64, to - from + 1);
        }
    }
}
