//! # Category Index Module
//!
//! Categories in use, built from an article snapshot by the caller and
//! passed to whoever needs it. Nothing is cached globally: rebuild the index
//! when the article set changes.

use std::collections::HashMap;

use log::{debug, trace};

use crate::config::MatchingConfig;
use crate::model::CanonicalArticle;
use crate::normalizer::normalize;
use crate::similarity::similarity;

#[derive(Debug, Clone, PartialEq)]
struct CategoryEntry {
    /// Spelling of the first article seen with this category
    name: String,
    normalized: String,
    usage: usize,
}

/// Categories of an article set with usage counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryIndex {
    entries: Vec<CategoryEntry>,
    by_key: HashMap<String, usize>,
}

impl CategoryIndex {
    pub fn from_articles(articles: &[CanonicalArticle]) -> Self {
        let mut index = Self::default();
        for article in articles {
            if let Some(category) = article.details.category.as_deref() {
                index.add(category);
            }
        }
        debug!("Built category index with {} categories", index.len());
        index
    }

    /// Record one use of a category
    pub fn add(&mut self, category: &str) {
        let key = normalize(category);
        if key.is_empty() {
            return;
        }
        match self.by_key.get(&key) {
            Some(&position) => self.entries[position].usage += 1,
            None => {
                self.by_key.insert(key.clone(), self.entries.len());
                self.entries.push(CategoryEntry {
                    name: category.trim().to_string(),
                    normalized: key,
                    usage: 1,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Category names in first-seen order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn usage(&self, category: &str) -> usize {
        self.by_key
            .get(&normalize(category))
            .map(|&position| self.entries[position].usage)
            .unwrap_or(0)
    }

    /// Map a raw category onto the spelling already in use
    ///
    /// Exact normalized matches win; otherwise the most similar category above
    /// the similarity threshold (first seen wins ties). `None` means the raw
    /// value is a new category.
    pub fn canonicalize(&self, raw: &str, config: &MatchingConfig) -> Option<&str> {
        let key = normalize(raw);
        if key.is_empty() {
            return None;
        }
        if let Some(&position) = self.by_key.get(&key) {
            return Some(&self.entries[position].name);
        }

        let mut best: Option<(&CategoryEntry, f64)> = None;
        for entry in &self.entries {
            let ratio = similarity(&key, &entry.normalized);
            trace!("Category '{}' vs '{}': {:.2}", raw, entry.name, ratio);
            if ratio > config.similarity_threshold && best.map_or(true, |(_, b)| ratio > b) {
                best = Some((entry, ratio));
            }
        }
        best.map(|(entry, _)| entry.name.as_str())
    }

    /// Categories starting with `prefix`, most used first, then alphabetical
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<&str> {
        let key = normalize(prefix);
        let mut matches: Vec<&CategoryEntry> = self
            .entries
            .iter()
            .filter(|e| e.normalized.starts_with(&key))
            .collect();
        matches.sort_by(|a, b| b.usage.cmp(&a.usage).then_with(|| a.normalized.cmp(&b.normalized)));
        matches.into_iter().take(limit).map(|e| e.name.as_str()).collect()
    }
}
