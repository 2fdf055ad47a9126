//! # Receipt Review Module
//!
//! Drives one scanned receipt from OCR output to reviewed line items.
//!
//! ```text
//! Idle --begin--> Initializing --resolve_and_link--> Linking --> Editing
//!                                                       ^          |
//!                                                       +--change_supplier
//! any state --reset/finish--> Idle
//! ```
//!
//! Linking happens only on the explicit `Linking` transitions. Edits made in
//! `Editing` never trigger a re-link, so user input cannot be overwritten by
//! a late automatic match.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::article_linker::{link_article, link_to, LinkDecision, MatchStrategy, UnlinkReason};
use crate::errors::EngineError;
use crate::model::{ArticleId, ScannedLineItem, ScannedReceipt, SupplierId};
use crate::store::{CatalogSnapshot, RecordStore};
use crate::supplier_resolver::{resolve_supplier, SupplierResolution};

/// Review lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    #[default]
    Idle,
    Initializing,
    Linking,
    Editing,
}

impl ReviewState {
    pub fn can_transition_to(self, next: ReviewState) -> bool {
        use ReviewState::*;
        matches!(
            (self, next),
            (Idle, Initializing)
                | (Initializing, Linking)
                | (Linking, Editing)
                | (Editing, Linking)
                | (_, Idle)
        )
    }
}

/// A line item with its current link decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewedLineItem {
    pub item: ScannedLineItem,
    pub decision: LinkDecision,
}

/// State of one receipt review
#[derive(Debug, Clone, Default)]
pub struct ReceiptReview {
    state: ReviewState,
    receipt: ScannedReceipt,
    supplier: Option<SupplierResolution>,
    lines: Vec<ReviewedLineItem>,
}

impl ReceiptReview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    /// Supplier decision for the receipt, once made
    pub fn supplier(&self) -> Option<SupplierResolution> {
        self.supplier
    }

    pub fn lines(&self) -> &[ReviewedLineItem] {
        &self.lines
    }

    fn transition(&mut self, next: ReviewState) -> Result<(), EngineError> {
        if !self.state.can_transition_to(next) {
            warn!(from = ?self.state, to = ?next, "Rejected review transition");
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = ?self.state, to = ?next, "Review transition");
        self.state = next;
        Ok(())
    }

    fn require(&self, expected: ReviewState, next: ReviewState) -> Result<(), EngineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                from: self.state,
                to: next,
            })
        }
    }

    /// Take a new receipt
    pub fn begin(&mut self, receipt: ScannedReceipt) -> Result<(), EngineError> {
        self.transition(ReviewState::Initializing)?;
        info!(items = receipt.items.len(), "Starting receipt review");
        self.receipt = receipt;
        self.supplier = None;
        self.lines.clear();
        Ok(())
    }

    /// Resolve the receipt's supplier once, then link every line item once
    pub fn resolve_and_link(
        &mut self,
        snapshot: &CatalogSnapshot,
    ) -> Result<&[ReviewedLineItem], EngineError> {
        self.require(ReviewState::Initializing, ReviewState::Linking)?;

        let resolution = match self.receipt.supplier_text.as_deref() {
            Some(text) => resolve_supplier(text, &snapshot.suppliers),
            None => SupplierResolution::Unresolved,
        };
        info!(?resolution, "Receipt supplier decided");
        self.supplier = Some(resolution);

        self.transition(ReviewState::Linking)?;
        self.link_all(snapshot);
        self.transition(ReviewState::Editing)?;
        Ok(&self.lines)
    }

    /// Replace the receipt supplier and link every line again
    pub fn change_supplier(
        &mut self,
        supplier_id: SupplierId,
        snapshot: &CatalogSnapshot,
    ) -> Result<&[ReviewedLineItem], EngineError> {
        self.require(ReviewState::Editing, ReviewState::Linking)?;
        self.transition(ReviewState::Linking)?;
        self.supplier = Some(SupplierResolution::Resolved(supplier_id));
        self.link_all(snapshot);
        self.transition(ReviewState::Editing)?;
        Ok(&self.lines)
    }

    fn link_all(&mut self, snapshot: &CatalogSnapshot) {
        let receipt_supplier = self.supplier.and_then(|s| s.supplier_id());
        let lines: Vec<ReviewedLineItem> = self
            .receipt
            .items
            .iter()
            .enumerate()
            .map(|(index, original)| {
                // keep user edits across a supplier change
                let item = self
                    .lines
                    .get(index)
                    .map(|line| line.item.clone())
                    .unwrap_or_else(|| original.clone());
                let decision = match item.supplier_id.or(receipt_supplier) {
                    Some(supplier_id) => link_article(&item, supplier_id, &snapshot.articles),
                    None => LinkDecision::Unlinked(UnlinkReason::NoMatch),
                };
                ReviewedLineItem { item, decision }
            })
            .collect();

        let linked = lines.iter().filter(|l| l.decision.is_linked()).count();
        info!(linked, total = lines.len(), "Linked receipt items");
        self.lines = lines;
    }

    /// Change a line item; the current link is kept and its merged values
    /// refreshed
    pub fn edit_item(
        &mut self,
        index: usize,
        snapshot: &CatalogSnapshot,
        edit: impl FnOnce(&mut ScannedLineItem),
    ) -> Result<(), EngineError> {
        self.require(ReviewState::Editing, ReviewState::Editing)?;
        let line = self
            .lines
            .get_mut(index)
            .ok_or(EngineError::UnknownLineItem(index))?;
        edit(&mut line.item);

        let current = match &line.decision {
            LinkDecision::Linked(linked) => Some((linked.article_id, linked.matched_by)),
            LinkDecision::Unlinked(_) => None,
        };
        if let Some((article_id, strategy)) = current {
            let article = snapshot
                .article(article_id)
                .ok_or(EngineError::UnknownArticle(article_id))?;
            line.decision = LinkDecision::Linked(link_to(&line.item, article, strategy));
        }
        Ok(())
    }

    /// Link a line item to an article chosen by the user
    pub fn link_manually(
        &mut self,
        index: usize,
        article_id: ArticleId,
        snapshot: &CatalogSnapshot,
    ) -> Result<(), EngineError> {
        self.require(ReviewState::Editing, ReviewState::Editing)?;
        let article = snapshot
            .article(article_id)
            .ok_or(EngineError::UnknownArticle(article_id))?;
        let line = self
            .lines
            .get_mut(index)
            .ok_or(EngineError::UnknownLineItem(index))?;
        line.decision = LinkDecision::Linked(link_to(&line.item, article, MatchStrategy::Manual));
        debug!(index, article_id, "Line item linked manually");
        Ok(())
    }

    /// Drop the link of a line item
    pub fn unlink(&mut self, index: usize) -> Result<(), EngineError> {
        self.require(ReviewState::Editing, ReviewState::Editing)?;
        let line = self
            .lines
            .get_mut(index)
            .ok_or(EngineError::UnknownLineItem(index))?;
        line.decision = LinkDecision::Unlinked(UnlinkReason::NoMatch);
        Ok(())
    }

    /// OCR spellings to append to the linked articles' histories
    pub fn history_updates(&self) -> Vec<(ArticleId, String)> {
        self.lines
            .iter()
            .filter_map(|line| match &line.decision {
                LinkDecision::Linked(linked) => linked
                    .history_entry
                    .as_ref()
                    .map(|name| (linked.article_id, name.clone())),
                LinkDecision::Unlinked(_) => None,
            })
            .collect()
    }

    /// Write the OCR history updates; returns how many were new
    pub async fn persist_history(&self, store: &dyn RecordStore) -> anyhow::Result<usize> {
        let mut appended = 0;
        for (article_id, name) in self.history_updates() {
            if store.append_ocr_name(article_id, &name).await? {
                appended += 1;
            }
        }
        info!(appended, "Persisted OCR name history");
        Ok(appended)
    }

    /// Hand out the reviewed lines and return to `Idle`
    pub fn finish(&mut self) -> Result<Vec<ReviewedLineItem>, EngineError> {
        self.require(ReviewState::Editing, ReviewState::Idle)?;
        self.transition(ReviewState::Idle)?;
        self.receipt = ScannedReceipt::default();
        self.supplier = None;
        Ok(std::mem::take(&mut self.lines))
    }

    /// Abandon the review from any state
    pub fn reset(&mut self) {
        self.state = ReviewState::Idle;
        self.receipt = ScannedReceipt::default();
        self.supplier = None;
        self.lines.clear();
    }
}
