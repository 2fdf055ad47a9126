//! In-memory record store

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::RecordStore;
use crate::model::{ArticleId, CanonicalArticle, CanonicalSupplier, NewArticle, SupplierId};

#[derive(Debug, Default)]
struct Inner {
    articles: Vec<CanonicalArticle>,
    suppliers: Vec<CanonicalSupplier>,
    next_article_id: ArticleId,
    next_supplier_id: SupplierId,
}

/// Record store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records; new ids continue after the highest one
    pub fn with_records(articles: Vec<CanonicalArticle>, suppliers: Vec<CanonicalSupplier>) -> Self {
        let next_article_id = articles.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let next_supplier_id = suppliers.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        Self {
            inner: Mutex::new(Inner {
                articles,
                suppliers,
                next_article_id,
                next_supplier_id,
            }),
        }
    }

    pub async fn create_supplier(&self, name: &str) -> SupplierId {
        let mut inner = self.inner.lock().await;
        inner.next_supplier_id = inner.next_supplier_id.max(1);
        let id = inner.next_supplier_id;
        inner.next_supplier_id += 1;
        inner.suppliers.push(CanonicalSupplier::new(id, name));
        debug!(supplier_id = id, name, "Created supplier");
        id
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn list_articles(&self, supplier_id: Option<SupplierId>) -> Result<Vec<CanonicalArticle>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .articles
            .iter()
            .filter(|a| supplier_id.map_or(true, |id| a.supplier_id == id))
            .cloned()
            .collect())
    }

    async fn list_suppliers(&self) -> Result<Vec<CanonicalSupplier>> {
        Ok(self.inner.lock().await.suppliers.clone())
    }

    async fn save_articles(&self, articles: &[NewArticle]) -> Result<Vec<ArticleId>> {
        let mut inner = self.inner.lock().await;
        if let Some(orphan) = articles
            .iter()
            .find(|a| !inner.suppliers.iter().any(|s| s.id == a.supplier_id))
        {
            bail!("Unknown supplier {} for article '{}'", orphan.supplier_id, orphan.name);
        }

        inner.next_article_id = inner.next_article_id.max(1);
        let mut ids = Vec::with_capacity(articles.len());
        for article in articles {
            let id = inner.next_article_id;
            inner.next_article_id += 1;
            inner.articles.push(CanonicalArticle {
                id,
                name: article.name.clone(),
                supplier_id: article.supplier_id,
                supplier_article_number: article.supplier_article_number.clone(),
                bundle_price: article.bundle_price,
                ocr_name_history: article.ocr_name_history.clone(),
                details: article.details.clone(),
                updated_at: Some(Utc::now()),
            });
            ids.push(id);
        }
        info!(count = ids.len(), "Saved articles");
        Ok(ids)
    }

    async fn append_ocr_name(&self, article_id: ArticleId, ocr_name: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(article) = inner.articles.iter_mut().find(|a| a.id == article_id) else {
            return Ok(false);
        };
        let added = article.ocr_name_history.insert(ocr_name.to_string());
        if added {
            article.updated_at = Some(Utc::now());
        }
        Ok(added)
    }
}
