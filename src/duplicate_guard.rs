//! # Duplicate Guard Module
//!
//! Checks an import row or a manually entered article against the records
//! already stored and the candidates already accepted in the current run.
//!
//! Two records collide when they belong to the same supplier and either
//! - their article numbers are equal ignoring case, or
//! - their names are equal ignoring case and surrounding whitespace.
//!
//! Article numbers are checked first and reported preferentially. Matching
//! is exact: a false positive here blocks a legitimate save.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::{non_empty, ArticleId, CanonicalArticle, CanonicalSupplier, SupplierId};
use crate::normalizer::fold_case;

/// Supplier of a candidate, by id or only by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierRef {
    Id(SupplierId),
    Name(String),
}

/// A record about to be accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCandidate {
    /// Id of the stored record being edited; never compared with itself
    pub id: Option<ArticleId>,
    pub name: String,
    pub supplier: SupplierRef,
    pub article_number: Option<String>,
}

impl DuplicateCandidate {
    pub fn new(name: &str, supplier: SupplierRef) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            supplier,
            article_number: None,
        }
    }

    pub fn with_article_number(mut self, number: &str) -> Self {
        self.article_number = Some(number.to_string());
        self
    }

    /// Mark the candidate as an edit of a stored record
    pub fn excluding(mut self, id: ArticleId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn from_article(article: &CanonicalArticle) -> Self {
        Self {
            id: Some(article.id),
            name: article.name.clone(),
            supplier: SupplierRef::Id(article.supplier_id),
            article_number: article.supplier_article_number.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchedOn {
    Name,
    ArticleNumber,
    None,
}

/// The record a candidate collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictingRecord {
    /// A stored article
    Stored(ArticleId),
    /// Index into the batch of accepted candidates
    Batch(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    pub matched_on: MatchedOn,
    pub conflicting_record: Option<ConflictingRecord>,
}

impl DuplicateVerdict {
    pub fn unique() -> Self {
        Self {
            is_duplicate: false,
            matched_on: MatchedOn::None,
            conflicting_record: None,
        }
    }

    fn duplicate(matched_on: MatchedOn, record: ConflictingRecord) -> Self {
        Self {
            is_duplicate: true,
            matched_on,
            conflicting_record: Some(record),
        }
    }
}

struct SupplierNames<'a>(HashMap<SupplierId, &'a str>);

impl<'a> SupplierNames<'a> {
    fn new(suppliers: &'a [CanonicalSupplier]) -> Self {
        Self(suppliers.iter().map(|s| (s.id, s.name.as_str())).collect())
    }

    fn name_of<'r>(&self, supplier: &'r SupplierRef) -> Option<&'r str>
    where
        'a: 'r,
    {
        match supplier {
            SupplierRef::Id(id) => self.0.get(id).copied(),
            SupplierRef::Name(name) => Some(name.as_str()),
        }
    }

    fn same(&self, a: &SupplierRef, b: &SupplierRef) -> bool {
        if let (SupplierRef::Id(x), SupplierRef::Id(y)) = (a, b) {
            return x == y;
        }
        match (self.name_of(a), self.name_of(b)) {
            (Some(x), Some(y)) => !x.trim().is_empty() && fold_case(x) == fold_case(y),
            _ => false,
        }
    }
}

/// Check `candidate` against stored articles and the current batch
///
/// Stored records are consulted before the batch for each rule.
pub fn check_duplicate(
    candidate: &DuplicateCandidate,
    batch: &[DuplicateCandidate],
    store: &[CanonicalArticle],
    suppliers: &[CanonicalSupplier],
) -> DuplicateVerdict {
    let names = SupplierNames::new(suppliers);
    let excluded = |id: Option<ArticleId>| candidate.id.is_some() && id == candidate.id;

    let stored: Vec<(ConflictingRecord, DuplicateCandidate)> = store
        .iter()
        .filter(|article| !excluded(Some(article.id)))
        .map(|article| (ConflictingRecord::Stored(article.id), DuplicateCandidate::from_article(article)))
        .collect();
    let others = stored.iter().map(|(record, c)| (*record, c)).chain(
        batch
            .iter()
            .enumerate()
            .filter(|(_, other)| !excluded(other.id))
            .map(|(index, other)| (ConflictingRecord::Batch(index), other)),
    );
    let others: Vec<(ConflictingRecord, &DuplicateCandidate)> = others.collect();

    if let Some(number) = non_empty(&candidate.article_number) {
        let number = fold_case(number);
        for (record, other) in &others {
            let same_number = non_empty(&other.article_number)
                .map(|n| fold_case(n) == number)
                .unwrap_or(false);
            if same_number && names.same(&candidate.supplier, &other.supplier) {
                debug!("'{}' duplicates {:?} by article number", candidate.name, record);
                return DuplicateVerdict::duplicate(MatchedOn::ArticleNumber, *record);
            }
        }
    }

    let name = fold_case(&candidate.name);
    if !name.is_empty() {
        for (record, other) in &others {
            if fold_case(&other.name) == name
                && names.same(&candidate.supplier, &other.supplier)
            {
                debug!("'{}' duplicates {:?} by name", candidate.name, record);
                return DuplicateVerdict::duplicate(MatchedOn::Name, *record);
            }
        }
    }

    DuplicateVerdict::unique()
}
