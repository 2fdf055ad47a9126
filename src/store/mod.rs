//! Record store access
//!
//! The engine never talks to storage while it resolves. Callers load a
//! [`CatalogSnapshot`] once, run the algorithms against it, then write the
//! accepted results back through a [`RecordStore`]:
//! - `memory`: in-process store for tests and embedding
//! - `postgres`: PostgreSQL store built on sqlx

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::model::{ArticleId, CanonicalArticle, CanonicalSupplier, NewArticle, SupplierId};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Read/write access to stored articles and suppliers
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All articles, or those of one supplier
    async fn list_articles(&self, supplier_id: Option<SupplierId>) -> Result<Vec<CanonicalArticle>>;

    async fn list_suppliers(&self) -> Result<Vec<CanonicalSupplier>>;

    /// Insert articles atomically, returning their ids in input order
    async fn save_articles(&self, articles: &[NewArticle]) -> Result<Vec<ArticleId>>;

    /// Add a raw OCR spelling to an article's history
    ///
    /// Returns `false` if the article does not exist or already knows the name.
    async fn append_ocr_name(&self, article_id: ArticleId, ocr_name: &str) -> Result<bool>;
}

/// Immutable copy of the catalog the algorithms run against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub articles: Vec<CanonicalArticle>,
    pub suppliers: Vec<CanonicalSupplier>,
}

impl CatalogSnapshot {
    pub fn new(articles: Vec<CanonicalArticle>, suppliers: Vec<CanonicalSupplier>) -> Self {
        Self {
            articles,
            suppliers,
        }
    }

    /// Read every article and supplier from `store`
    pub async fn load(store: &dyn RecordStore) -> Result<Self> {
        let suppliers = store.list_suppliers().await?;
        let articles = store.list_articles(None).await?;
        debug!(
            articles = articles.len(),
            suppliers = suppliers.len(),
            "Loaded catalog snapshot"
        );
        Ok(Self::new(articles, suppliers))
    }

    pub fn article(&self, id: ArticleId) -> Option<&CanonicalArticle> {
        self.articles.iter().find(|a| a.id == id)
    }

    pub fn supplier(&self, id: SupplierId) -> Option<&CanonicalSupplier> {
        self.suppliers.iter().find(|s| s.id == id)
    }
}
