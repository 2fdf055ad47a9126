//! # Article and Supplier Data Model
//!
//! Records the resolution engine reads and produces.
//!
//! ## Core Concepts
//!
//! - **CanonicalArticle / CanonicalSupplier**: authoritative records owned by
//!   the record store
//! - **ArticleDetails**: descriptive master data of an article (category,
//!   units, VAT, allergens, nutrition, ...)
//! - **ScannedLineItem**: one line of an OCR-scanned receipt
//! - **NewArticle**: an accepted import candidate ready to be saved
//!
//! ## Usage
//!
//! ```rust
//! use backoffice_resolver::model::{CanonicalArticle, ScannedLineItem};
//!
//! let article = CanonicalArticle::new(1, "Butter 250g", 7)
//!     .with_article_number("X1")
//!     .with_ocr_name("BUTTER 250G MARKE")
//!     .with_category("Molkerei");
//!
//! let item = ScannedLineItem::new(10.0, 1.89).with_article_number("X1");
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ArticleId = i64;
pub type SupplierId = i64;

/// A supplier as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSupplier {
    pub id: SupplierId,
    pub name: String,
}

impl CanonicalSupplier {
    pub fn new(id: SupplierId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// Nutrition facts per 100 g / 100 ml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    pub energy_kcal: Option<f64>,
    pub energy_kj: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub sugar: Option<f64>,
    pub fiber: Option<f64>,
    pub salt: Option<f64>,
}

impl Nutrition {
    /// True when no value is set
    pub fn is_empty(&self) -> bool {
        [
            self.energy_kcal,
            self.energy_kj,
            self.protein,
            self.fat,
            self.carbohydrates,
            self.sugar,
            self.fiber,
            self.salt,
        ]
        .iter()
        .all(Option::is_none)
    }
}

/// Descriptive master data shared by stored articles and scanned line items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetails {
    pub category: Option<String>,
    pub bundle_unit: Option<String>,
    pub content_amount: Option<f64>,
    pub content_unit: Option<String>,
    pub vat_rate: Option<f64>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub additives: Vec<String>,
    pub ingredients: Option<String>,
    pub nutrition: Option<Nutrition>,
    #[serde(default)]
    pub ean_codes: Vec<String>,
    pub notes: Option<String>,
}

/// An article as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalArticle {
    pub id: ArticleId,
    pub name: String,
    pub supplier_id: SupplierId,
    pub supplier_article_number: Option<String>,
    pub bundle_price: Option<f64>,
    /// Raw OCR spellings this article was linked from on earlier receipts
    #[serde(default)]
    pub ocr_name_history: BTreeSet<String>,
    #[serde(default)]
    pub details: ArticleDetails,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CanonicalArticle {
    pub fn new(id: ArticleId, name: &str, supplier_id: SupplierId) -> Self {
        Self {
            id,
            name: name.to_string(),
            supplier_id,
            supplier_article_number: None,
            bundle_price: None,
            ocr_name_history: BTreeSet::new(),
            details: ArticleDetails::default(),
            updated_at: None,
        }
    }

    pub fn with_article_number(mut self, number: &str) -> Self {
        self.supplier_article_number = Some(number.to_string());
        self
    }

    pub fn with_ocr_name(mut self, ocr_name: &str) -> Self {
        self.ocr_name_history.insert(ocr_name.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.details.category = Some(category.to_string());
        self
    }

    pub fn with_bundle_price(mut self, price: f64) -> Self {
        self.bundle_price = Some(price);
        self
    }

    pub fn with_details(mut self, details: ArticleDetails) -> Self {
        self.details = details;
        self
    }
}

/// One line of a scanned receipt
///
/// `details` holds values printed on the receipt itself; a non-empty value
/// there overrides the linked article's master data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedLineItem {
    pub raw_ocr_name: Option<String>,
    pub article_number: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub details: ArticleDetails,
}

impl ScannedLineItem {
    pub fn new(quantity: f64, unit_price: f64) -> Self {
        Self {
            quantity,
            unit_price,
            ..Default::default()
        }
    }

    pub fn with_ocr_name(mut self, ocr_name: &str) -> Self {
        self.raw_ocr_name = Some(ocr_name.to_string());
        self
    }

    pub fn with_article_number(mut self, number: &str) -> Self {
        self.article_number = Some(number.to_string());
        self
    }

    pub fn with_supplier(mut self, supplier_id: SupplierId) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }

    pub fn with_details(mut self, details: ArticleDetails) -> Self {
        self.details = details;
        self
    }
}

/// OCR output for a whole receipt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedReceipt {
    /// Supplier name as printed on the receipt, if the OCR found one
    pub supplier_text: Option<String>,
    pub items: Vec<ScannedLineItem>,
}

/// An article ready to be inserted into the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub name: String,
    pub supplier_id: SupplierId,
    pub supplier_article_number: Option<String>,
    pub bundle_price: Option<f64>,
    #[serde(default)]
    pub ocr_name_history: BTreeSet<String>,
    #[serde(default)]
    pub details: ArticleDetails,
}

/// Trimmed contents of an optional string, `None` when blank
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
