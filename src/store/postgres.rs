//! PostgreSQL record store
//!
//! Descriptive article data is stored as a JSON document in a `TEXT` column;
//! the OCR name history is a `TEXT[]` so new spellings can be appended
//! without rewriting the row.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use super::RecordStore;
use crate::config::StoreConfig;
use crate::model::{
    ArticleDetails, ArticleId, CanonicalArticle, CanonicalSupplier, NewArticle, SupplierId,
};

/// Record store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `config` and make sure the schema exists
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        info!(max_connections = config.max_connections, "Connecting to record store");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;
        init_database_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_supplier(&self, name: &str) -> Result<SupplierId> {
        let row = sqlx::query("INSERT INTO suppliers (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .context("Failed to insert supplier")?;
        let id: SupplierId = row.get("id");
        debug!(supplier_id = id, name, "Created supplier");
        Ok(id)
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing record store schema");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS suppliers (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create suppliers table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS articles (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            supplier_id BIGINT NOT NULL REFERENCES suppliers(id),
            supplier_article_number TEXT,
            bundle_price DOUBLE PRECISION,
            ocr_name_history TEXT[] NOT NULL DEFAULT '{}',
            details TEXT NOT NULL DEFAULT '{}',
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create articles table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS articles_supplier_idx ON articles (supplier_id)")
        .execute(pool)
        .await
        .context("Failed to create supplier index")?;

    info!("Record store schema initialized");
    Ok(())
}

fn article_from_row(row: &PgRow) -> Result<CanonicalArticle> {
    let details: String = row.try_get("details")?;
    let details: ArticleDetails =
        serde_json::from_str(&details).context("Failed to decode article details")?;
    let history: Vec<String> = row.try_get("ocr_name_history")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(CanonicalArticle {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        supplier_id: row.try_get("supplier_id")?,
        supplier_article_number: row.try_get("supplier_article_number")?,
        bundle_price: row.try_get("bundle_price")?,
        ocr_name_history: history.into_iter().collect::<BTreeSet<_>>(),
        details,
        updated_at: Some(updated_at),
    })
}

const ARTICLE_COLUMNS: &str = "id, name, supplier_id, supplier_article_number, bundle_price, \
                               ocr_name_history, details, updated_at";

#[async_trait]
impl RecordStore for PgStore {
    async fn list_articles(&self, supplier_id: Option<SupplierId>) -> Result<Vec<CanonicalArticle>> {
        let sql = match supplier_id {
            Some(_) => format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE supplier_id = $1 ORDER BY id"),
            None => format!("SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY id"),
        };
        let mut query = sqlx::query(&sql);
        if let Some(id) = supplier_id {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list articles")?;

        rows.iter().map(article_from_row).collect()
    }

    async fn list_suppliers(&self) -> Result<Vec<CanonicalSupplier>> {
        let rows = sqlx::query("SELECT id, name FROM suppliers ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list suppliers")?;

        rows.iter()
            .map(|row| -> Result<CanonicalSupplier> {
                Ok(CanonicalSupplier {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn save_articles(&self, articles: &[NewArticle]) -> Result<Vec<ArticleId>> {
        let mut tx = self.pool.begin().await.context("Failed to start transaction")?;
        let mut ids = Vec::with_capacity(articles.len());

        for article in articles {
            let details =
                serde_json::to_string(&article.details).context("Failed to encode article details")?;
            let history: Vec<String> = article.ocr_name_history.iter().cloned().collect();

            let row = sqlx::query(
                "INSERT INTO articles
                    (name, supplier_id, supplier_article_number, bundle_price, ocr_name_history, details)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id",
            )
            .bind(&article.name)
            .bind(article.supplier_id)
            .bind(&article.supplier_article_number)
            .bind(article.bundle_price)
            .bind(&history)
            .bind(&details)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert article '{}'", article.name))?;

            ids.push(row.get::<i64, _>("id"));
        }

        tx.commit().await.context("Failed to commit articles")?;
        info!(count = ids.len(), "Saved articles");
        Ok(ids)
    }

    async fn append_ocr_name(&self, article_id: ArticleId, ocr_name: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE articles
             SET ocr_name_history = array_append(ocr_name_history, $2), updated_at = NOW()
             WHERE id = $1 AND NOT ($2 = ANY(ocr_name_history))",
        )
        .bind(article_id)
        .bind(ocr_name)
        .execute(&self.pool)
        .await
        .context("Failed to append OCR name")?;

        let appended = result.rows_affected() > 0;
        debug!(article_id, ocr_name, appended, "Appended OCR name");
        Ok(appended)
    }
}
