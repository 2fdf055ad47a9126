//! # Article Linker Module
//!
//! Decides whether a scanned receipt line refers to a known article of the
//! receipt's supplier. Strategies are tried in order:
//!
//! 1. supplier article number, exact and case-sensitive
//! 2. raw OCR name against the spellings the article was linked from before
//!
//! The first strategy with exactly one candidate links. A strategy without
//! candidates falls through; a strategy with several candidates stops the
//! chain as ambiguous, an arbitrary pick is never made.
//!
//! On a link, master data comes from the stored article unless the receipt
//! prints its own value. Price and quantity always come from the receipt.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::model::{
    non_empty, ArticleDetails, ArticleId, CanonicalArticle, ScannedLineItem, SupplierId,
};
use crate::normalizer::normalize;

/// Why a line item was not linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnlinkReason {
    NoMatch,
    Ambiguous,
}

/// Which strategy produced a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    ArticleNumber,
    OcrNameHistory,
    /// Chosen by a user during receipt review
    Manual,
}

/// A line item combined with its linked article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedLineItem {
    pub linked_article_id: ArticleId,
    pub name: String,
    pub supplier_id: SupplierId,
    pub article_number: Option<String>,
    pub raw_ocr_name: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub details: ArticleDetails,
}

/// A successful link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedArticle {
    pub article_id: ArticleId,
    pub matched_by: MatchStrategy,
    pub merged: MergedLineItem,
    /// Raw OCR name to append to the article's history, when it is new
    pub history_entry: Option<String>,
}

/// All-or-nothing outcome for one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkDecision {
    Linked(LinkedArticle),
    Unlinked(UnlinkReason),
}

impl LinkDecision {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkDecision::Linked(_))
    }

    pub fn article_id(&self) -> Option<ArticleId> {
        match self {
            LinkDecision::Linked(linked) => Some(linked.article_id),
            LinkDecision::Unlinked(_) => None,
        }
    }
}

enum Candidates<'a> {
    None,
    One(&'a CanonicalArticle),
    Many(usize),
}

impl<'a> Candidates<'a> {
    fn collect_from(iter: impl Iterator<Item = &'a CanonicalArticle>) -> Self {
        let found: Vec<&CanonicalArticle> = iter.collect();
        match found.len() {
            0 => Candidates::None,
            1 => Candidates::One(found[0]),
            n => Candidates::Many(n),
        }
    }
}

/// Link a scanned line item to at most one article of `supplier_id`
pub fn link_article(
    item: &ScannedLineItem,
    supplier_id: SupplierId,
    catalog: &[CanonicalArticle],
) -> LinkDecision {
    let of_supplier = || catalog.iter().filter(move |a| a.supplier_id == supplier_id);

    if let Some(number) = item.article_number.as_deref().filter(|n| !n.trim().is_empty()) {
        let candidates = Candidates::collect_from(
            of_supplier().filter(|a| a.supplier_article_number.as_deref() == Some(number)),
        );
        match candidates {
            Candidates::One(article) => {
                return linked(item, article, MatchStrategy::ArticleNumber);
            }
            Candidates::Many(count) => {
                info!("Article number '{}' matches {} articles of supplier {}", number, count, supplier_id);
                return LinkDecision::Unlinked(UnlinkReason::Ambiguous);
            }
            Candidates::None => {
                debug!("No article with number '{}' for supplier {}", number, supplier_id);
            }
        }
    }

    if let Some(raw_name) = non_empty(&item.raw_ocr_name) {
        let key = normalize(raw_name);
        if !key.is_empty() {
            let candidates = Candidates::collect_from(of_supplier().filter(|a| {
                a.ocr_name_history.iter().any(|known| normalize(known) == key)
            }));
            match candidates {
                Candidates::One(article) => {
                    return linked(item, article, MatchStrategy::OcrNameHistory);
                }
                Candidates::Many(count) => {
                    info!("OCR name '{}' matches {} articles of supplier {}", raw_name, count, supplier_id);
                    return LinkDecision::Unlinked(UnlinkReason::Ambiguous);
                }
                Candidates::None => {
                    debug!("OCR name '{}' not known for supplier {}", raw_name, supplier_id);
                }
            }
        }
    }

    LinkDecision::Unlinked(UnlinkReason::NoMatch)
}

/// Build a link to a specific article, as for a manual choice
pub fn link_to(item: &ScannedLineItem, article: &CanonicalArticle, strategy: MatchStrategy) -> LinkedArticle {
    LinkedArticle {
        article_id: article.id,
        matched_by: strategy,
        merged: merge_line_item(item, article),
        history_entry: history_entry(item, article),
    }
}

fn linked(item: &ScannedLineItem, article: &CanonicalArticle, strategy: MatchStrategy) -> LinkDecision {
    debug!("Linked line item to article {} by {:?}", article.id, strategy);
    LinkDecision::Linked(link_to(item, article, strategy))
}

/// The raw OCR name if the article does not know it yet (compared normalized)
pub fn history_entry(item: &ScannedLineItem, article: &CanonicalArticle) -> Option<String> {
    let raw = non_empty(&item.raw_ocr_name)?;
    let key = normalize(raw);
    if key.is_empty() || article.ocr_name_history.iter().any(|known| normalize(known) == key) {
        return None;
    }
    Some(raw.to_string())
}

/// Merge master data of `article` with the values printed on the receipt
pub fn merge_line_item(item: &ScannedLineItem, article: &CanonicalArticle) -> MergedLineItem {
    let scan = &item.details;
    let master = &article.details;

    let details = ArticleDetails {
        category: prefer_text(&scan.category, &master.category),
        bundle_unit: prefer_text(&scan.bundle_unit, &master.bundle_unit),
        content_amount: scan.content_amount.or(master.content_amount),
        content_unit: prefer_text(&scan.content_unit, &master.content_unit),
        vat_rate: scan.vat_rate.or(master.vat_rate),
        allergens: prefer_list(&scan.allergens, &master.allergens),
        additives: prefer_list(&scan.additives, &master.additives),
        ingredients: prefer_text(&scan.ingredients, &master.ingredients),
        nutrition: match &scan.nutrition {
            Some(nutrition) if !nutrition.is_empty() => Some(nutrition.clone()),
            _ => master.nutrition.clone(),
        },
        ean_codes: prefer_list(&scan.ean_codes, &master.ean_codes),
        notes: prefer_text(&scan.notes, &master.notes),
    };

    MergedLineItem {
        linked_article_id: article.id,
        name: article.name.clone(),
        supplier_id: article.supplier_id,
        article_number: non_empty(&item.article_number)
            .map(str::to_string)
            .or_else(|| article.supplier_article_number.clone()),
        raw_ocr_name: item.raw_ocr_name.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price,
        details,
    }
}

fn prefer_text(scan: &Option<String>, master: &Option<String>) -> Option<String> {
    non_empty(scan).map(str::to_string).or_else(|| master.clone())
}

fn prefer_list(scan: &[String], master: &[String]) -> Vec<String> {
    if scan.iter().any(|v| !v.trim().is_empty()) {
        scan.to_vec()
    } else {
        master.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Nutrition;

    fn catalog() -> Vec<CanonicalArticle> {
        vec![
            CanonicalArticle::new(1, "Butter 250g", 10)
                .with_article_number("X1")
                .with_ocr_name("BUTTER 250G")
                .with_category("Molkerei"),
            CanonicalArticle::new(2, "Sahne", 10)
                .with_article_number("S2")
                .with_ocr_name("SAHNE 30% 1L"),
            CanonicalArticle::new(3, "Butter", 20).with_article_number("X1"),
        ]
    }

    #[test]
    fn test_article_number_is_case_sensitive() {
        let item = ScannedLineItem::new(1.0, 2.0).with_article_number("x1");
        assert_eq!(
            link_article(&item, 10, &catalog()),
            LinkDecision::Unlinked(UnlinkReason::NoMatch)
        );
    }

    #[test]
    fn test_number_miss_falls_through_to_history() {
        let item = ScannedLineItem::new(1.0, 2.0)
            .with_article_number("UNKNOWN")
            .with_ocr_name("sahne 30 % 1l");
        match link_article(&item, 10, &catalog()) {
            LinkDecision::Linked(linked) => {
                assert_eq!(linked.article_id, 2);
                assert_eq!(linked.matched_by, MatchStrategy::OcrNameHistory);
                assert_eq!(linked.history_entry, None);
            }
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn test_scoped_to_supplier() {
        let item = ScannedLineItem::new(1.0, 2.0).with_article_number("X1");
        assert_eq!(link_article(&item, 20, &catalog()).article_id(), Some(3));
        assert_eq!(
            link_article(&item, 99, &catalog()),
            LinkDecision::Unlinked(UnlinkReason::NoMatch)
        );
    }

    #[test]
    fn test_new_ocr_spelling_is_reported() {
        let item = ScannedLineItem::new(1.0, 2.0)
            .with_article_number("X1")
            .with_ocr_name("BUTTR 250G");
        match link_article(&item, 10, &catalog()) {
            LinkDecision::Linked(linked) => {
                assert_eq!(linked.history_entry.as_deref(), Some("BUTTR 250G"));
            }
            other => panic!("expected link, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_prefers_non_empty_scan_values() {
        let mut article = catalog().remove(0);
        article.details.allergens = vec!["Milch".to_string()];
        article.details.vat_rate = Some(7.0);
        article.details.nutrition = Some(Nutrition {
            fat: Some(82.0),
            ..Default::default()
        });

        let item = ScannedLineItem::new(3.0, 1.79).with_details(ArticleDetails {
            category: Some("  ".to_string()),
            notes: Some("Aktionsware".to_string()),
            allergens: vec![],
            nutrition: Some(Nutrition::default()),
            vat_rate: Some(19.0),
            ..Default::default()
        });

        let merged = merge_line_item(&item, &article);
        assert_eq!(merged.details.category.as_deref(), Some("Molkerei"));
        assert_eq!(merged.details.notes.as_deref(), Some("Aktionsware"));
        assert_eq!(merged.details.allergens, vec!["Milch".to_string()]);
        assert_eq!(merged.details.vat_rate, Some(19.0));
        assert_eq!(merged.details.nutrition.unwrap().fat, Some(82.0));
        assert_eq!(merged.quantity, 3.0);
        assert_eq!(merged.unit_price, 1.79);
        assert_eq!(merged.article_number.as_deref(), Some("X1"));
    }

    #[test]
    fn test_shared_article_number_is_ambiguous() {
        let mut catalog = catalog();
        catalog.push(CanonicalArticle::new(4, "Butter 500g", 10).with_article_number("X1"));

        // the OCR name alone would link article 1
        let item = ScannedLineItem::new(1.0, 2.0)
            .with_article_number("X1")
            .with_ocr_name("BUTTER 250G");
        assert_eq!(
            link_article(&item, 10, &catalog),
            LinkDecision::Unlinked(UnlinkReason::Ambiguous)
        );
    }
}
