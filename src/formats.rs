use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Origin site identifier stored with every row written by this crawler.
pub const SOURCE_ALLITEBOOKS: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: Uuid,
    pub detail_url: String,
    pub title: String,
    pub author_name: String,
    pub isbn_10: String,
    pub publication_year: i64,
    pub pages: i64,
    pub language: String,
    pub file_size: String,
    pub file_format: String,
    pub category_name: String,
    pub short_description: String,
    pub description: String,
    pub img_url: String,
    pub download_url_pdf: String,
    pub download_url_epub: String,
    pub download_url_mobi: String,
    /// Every download href found on the page, including unrecognized formats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub download_urls: Vec<String>,
    pub source: i64,
    pub created: DateTime<Utc>,
}

/// The four asset URLs of one stored book.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AssetSet {
    pub id: String,
    pub img_url: String,
    pub download_url_pdf: String,
    pub download_url_epub: String,
    pub download_url_mobi: String,
}

impl AssetSet {
    pub fn urls(&self) -> [(AssetKind, &str); 4] {
        [
            (AssetKind::Image, self.img_url.as_str()),
            (AssetKind::Pdf, self.download_url_pdf.as_str()),
            (AssetKind::Epub, self.download_url_epub.as_str()),
            (AssetKind::Mobi, self.download_url_mobi.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Pdf,
    Epub,
    Mobi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CrawlPages,
    CrawlBooks,
    DownloadResources,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CrawlPages => "crawl_pages",
            Self::CrawlBooks => "crawl_books",
            Self::DownloadResources => "download_resources",
        };
        f.write_str(name)
    }
}

/// One line of `failures.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub stage: Stage,
    pub url: String,
    pub error: String,
    pub at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_record_json_keeps_id_and_omits_empty_link_list() -> anyhow::Result<()> {
        let record = BookRecord {
            id: Uuid::nil(),
            detail_url: "http://www.allitebooks.com/example-book/".to_owned(),
            title: "Example Book".to_owned(),
            author_name: "Jane".to_owned(),
            isbn_10: String::new(),
            publication_year: 2020,
            pages: 300,
            language: "English".to_owned(),
            file_size: "1 MB".to_owned(),
            file_format: "PDF".to_owned(),
            category_name: String::new(),
            short_description: String::new(),
            description: "About".to_owned(),
            img_url: String::new(),
            download_url_pdf: String::new(),
            download_url_epub: String::new(),
            download_url_mobi: String::new(),
            download_urls: Vec::new(),
            source: SOURCE_ALLITEBOOKS,
            created: DateTime::<Utc>::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&record)?;
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert!(json.get("download_urls").is_none());

        let back: BookRecord = serde_json::from_value(json)?;
        assert_eq!(back, record);
        Ok(())
    }
}
