use std::str::FromStr as _;

use anyhow::Context as _;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::config::{DuplicatePolicy, StoreConfig};
use crate::error::PersistError;
use crate::formats::{AssetSet, BookRecord};

const CREATE_BOOKS: &str = r"
    CREATE TABLE IF NOT EXISTS books (
        id TEXT PRIMARY KEY,
        detail_url TEXT NOT NULL DEFAULT '',
        title TEXT NOT NULL,
        author_name TEXT NOT NULL DEFAULT '',
        isbn_10 TEXT NOT NULL DEFAULT '',
        publication_year INTEGER NOT NULL DEFAULT 0,
        pages INTEGER NOT NULL DEFAULT 0,
        language TEXT NOT NULL DEFAULT '',
        file_size TEXT NOT NULL DEFAULT '',
        file_format TEXT NOT NULL DEFAULT '',
        category_name TEXT NOT NULL DEFAULT '',
        short_description TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        img_url TEXT NOT NULL DEFAULT '',
        download_url_pdf TEXT NOT NULL DEFAULT '',
        download_url_epub TEXT NOT NULL DEFAULT '',
        download_url_mobi TEXT NOT NULL DEFAULT '',
        source INTEGER NOT NULL,
        created DATETIME NOT NULL
    )
";

const CREATE_SOURCE_URL_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_books_source_detail_url ON books (source, detail_url)";

const INSERT_COLUMNS: &str = "id, detail_url, title, author_name, isbn_10, publication_year, pages, \
     language, file_size, file_format, category_name, short_description, description, img_url, \
     download_url_pdf, download_url_epub, download_url_mobi, source, created";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    SkippedDuplicate,
}

/// Handle to the book table. Cloning is cheap; every clone shares one pool
/// and each statement checks out its own connection.
#[derive(Debug, Clone)]
pub struct BookStore {
    pool: SqlitePool,
    duplicate_policy: DuplicatePolicy,
}

impl BookStore {
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("parse database url: {}", config.database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        if let Some(parent) = options
            .get_filename()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create database dir: {}", parent.display()))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("connect to store: {}", config.database_url))?;

        let store = Self {
            pool,
            duplicate_policy: config.duplicate_policy,
        };
        store.ensure_schema().await.context("ensure books table")?;

        let version: String = sqlx::query_scalar("SELECT sqlite_version()")
            .fetch_one(&store.pool)
            .await
            .context("query store version")?;
        tracing::info!(url = %config.database_url, sqlite = %version, "connected to store");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), PersistError> {
        sqlx::query(CREATE_BOOKS).execute(&self.pool).await?;
        sqlx::query(CREATE_SOURCE_URL_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Writes one row, committed on its own.
    pub async fn insert(&self, record: &BookRecord) -> Result<InsertOutcome, PersistError> {
        let sql = match self.duplicate_policy {
            DuplicatePolicy::AlwaysInsert => format!(
                "INSERT INTO books ({INSERT_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            // Single statement so concurrent workers cannot both pass the check.
            DuplicatePolicy::SkipExistingUrl => format!(
                "INSERT INTO books ({INSERT_COLUMNS}) \
                 SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ? \
                 WHERE NOT EXISTS (SELECT 1 FROM books WHERE source = ?18 AND detail_url = ?2)"
            ),
        };

        let result = sqlx::query(&sql)
            .bind(record.id.to_string())
            .bind(&record.detail_url)
            .bind(&record.title)
            .bind(&record.author_name)
            .bind(&record.isbn_10)
            .bind(record.publication_year)
            .bind(record.pages)
            .bind(&record.language)
            .bind(&record.file_size)
            .bind(&record.file_format)
            .bind(&record.category_name)
            .bind(&record.short_description)
            .bind(&record.description)
            .bind(&record.img_url)
            .bind(&record.download_url_pdf)
            .bind(&record.download_url_epub)
            .bind(&record.download_url_mobi)
            .bind(record.source)
            .bind(record.created)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::SkippedDuplicate);
        }
        Ok(InsertOutcome::Inserted)
    }

    /// Asset URLs of up to `limit` books from `source`, oldest first.
    pub async fn asset_sets(&self, source: i64, limit: i64) -> Result<Vec<AssetSet>, PersistError> {
        let rows = sqlx::query_as::<_, AssetSet>(
            "SELECT id, img_url, download_url_pdf, download_url_epub, download_url_mobi \
             FROM books WHERE source = ? ORDER BY created, id LIMIT ?",
        )
        .bind(source)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_books(&self, source: i64) -> Result<i64, PersistError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE source = ?")
            .bind(source)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
