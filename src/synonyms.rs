//! # Synonym Dictionary Module
//!
//! Target fields of an article import and the header spellings that are
//! recognized for each of them. The built-in dictionary covers German and
//! English exports; a JSON document of the form
//! `{ "bundlePrice": ["Gebindepreis", "EK"], ... }` can replace it.
//!
//! The dictionary is immutable once built. Field processing order is not
//! part of the dictionary: it is passed separately as a [`FieldPriority`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use lazy_static::lazy_static;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::normalizer::normalize;

/// A canonical article attribute an import row can populate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetField {
    Name,
    Supplier,
    ArticleNumber,
    Category,
    BundlePrice,
    BundleUnit,
    ContentAmount,
    ContentUnit,
    VatRate,
    Ean,
    Allergens,
    Additives,
    Ingredients,
    Nutrition,
    Notes,
}

impl TargetField {
    pub const ALL: [TargetField; 15] = [
        TargetField::Name,
        TargetField::Supplier,
        TargetField::ArticleNumber,
        TargetField::Category,
        TargetField::BundlePrice,
        TargetField::BundleUnit,
        TargetField::ContentAmount,
        TargetField::ContentUnit,
        TargetField::VatRate,
        TargetField::Ean,
        TargetField::Allergens,
        TargetField::Additives,
        TargetField::Ingredients,
        TargetField::Nutrition,
        TargetField::Notes,
    ];

    /// Stable field id used in dictionary files and mappings
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Name => "name",
            TargetField::Supplier => "supplier",
            TargetField::ArticleNumber => "articleNumber",
            TargetField::Category => "category",
            TargetField::BundlePrice => "bundlePrice",
            TargetField::BundleUnit => "bundleUnit",
            TargetField::ContentAmount => "contentAmount",
            TargetField::ContentUnit => "contentUnit",
            TargetField::VatRate => "vatRate",
            TargetField::Ean => "ean",
            TargetField::Allergens => "allergens",
            TargetField::Additives => "additives",
            TargetField::Ingredients => "ingredients",
            TargetField::Nutrition => "nutrition",
            TargetField::Notes => "notes",
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetField {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| EngineError::Dictionary(format!("unknown target field '{s}'")))
    }
}

/// Ordered list of target fields, most important first
///
/// The field mapper assigns headers greedily in this order, so a field listed
/// earlier wins a header that two fields would both accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPriority(Vec<TargetField>);

impl FieldPriority {
    /// Build a priority list, dropping repeated fields (first occurrence wins)
    pub fn new(fields: impl IntoIterator<Item = TargetField>) -> Self {
        let mut seen = HashSet::new();
        Self(fields.into_iter().filter(|f| seen.insert(*f)).collect())
    }

    /// Default article import order
    pub fn standard() -> Self {
        Self::new([
            TargetField::Name,
            TargetField::Supplier,
            TargetField::ArticleNumber,
            TargetField::BundlePrice,
            TargetField::BundleUnit,
            TargetField::ContentAmount,
            TargetField::ContentUnit,
            TargetField::Category,
            TargetField::VatRate,
            TargetField::Ean,
            TargetField::Allergens,
            TargetField::Additives,
            TargetField::Ingredients,
            TargetField::Nutrition,
            TargetField::Notes,
        ])
    }

    pub fn fields(&self) -> &[TargetField] {
        &self.0
    }
}

/// Mapping from target field to its recognized header spellings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynonymDictionary {
    entries: BTreeMap<TargetField, Vec<String>>,
}

const STANDARD_TERMS: &[(TargetField, &[&str])] = &[
    (
        TargetField::Name,
        &[
            "Name", "Artikelname", "Artikelbezeichnung", "Bezeichnung", "Artikel",
            "Produktname", "Produkt", "Article name", "Article", "Product name",
            "Product", "Item name", "Item",
        ],
    ),
    (
        TargetField::Supplier,
        &[
            "Lieferant", "Lieferantenname", "Händler", "Bezugsquelle", "Supplier",
            "Supplier name", "Vendor", "Distributor",
        ],
    ),
    (
        TargetField::ArticleNumber,
        &[
            "Artikelnummer", "Artikel-Nr.", "Art.-Nr.", "Lieferantenartikelnummer",
            "Bestellnummer", "Article number", "Item number", "Supplier article number",
            "Product code", "SKU",
        ],
    ),
    (
        TargetField::Category,
        &["Kategorie", "Warengruppe", "Produktgruppe", "Category", "Product group"],
    ),
    (
        TargetField::BundlePrice,
        &[
            "Gebindepreis", "Preis", "Einkaufspreis", "EK-Preis", "Nettopreis",
            "Bundle price", "Price", "Purchase price", "Net price",
        ],
    ),
    (
        TargetField::BundleUnit,
        &[
            "Gebindeeinheit", "Gebinde", "Verpackungseinheit", "VE", "Bundle unit",
            "Pack unit", "Packaging unit",
        ],
    ),
    (
        TargetField::ContentAmount,
        &[
            "Inhalt", "Inhaltsmenge", "Füllmenge", "Menge", "Content", "Content amount",
            "Net content", "Amount",
        ],
    ),
    (
        TargetField::ContentUnit,
        &[
            "Inhaltseinheit", "Mengeneinheit", "Einheit", "Content unit", "Unit of measure",
            "UOM", "Unit",
        ],
    ),
    (
        TargetField::VatRate,
        &[
            "MwSt", "MwSt-Satz", "Mehrwertsteuer", "USt", "Steuersatz", "VAT", "VAT rate",
            "Tax rate",
        ],
    ),
    (
        TargetField::Ean,
        &["EAN", "EAN-Code", "GTIN", "Barcode", "Strichcode", "EAN codes"],
    ),
    (TargetField::Allergens, &["Allergene", "Allergenkennzeichnung", "Allergens"]),
    (TargetField::Additives, &["Zusatzstoffe", "Zusätze", "Additives"]),
    (TargetField::Ingredients, &["Zutaten", "Zutatenliste", "Ingredients"]),
    (
        TargetField::Nutrition,
        &[
            "Nährwerte", "Nährwertangaben", "Nährwerttabelle", "Nutrition",
            "Nutritional values", "Nutrition facts",
        ],
    ),
    (
        TargetField::Notes,
        &[
            "Notizen", "Bemerkungen", "Anmerkungen", "Kommentar", "Notes", "Comments",
            "Remarks",
        ],
    ),
];

lazy_static! {
    static ref STANDARD_DICTIONARY: SynonymDictionary = SynonymDictionary::from_terms(STANDARD_TERMS);
}

impl SynonymDictionary {
    /// The built-in German and English dictionary
    pub fn standard() -> Self {
        STANDARD_DICTIONARY.clone()
    }

    /// Build a dictionary from static term lists
    pub fn from_terms(terms: &[(TargetField, &[&str])]) -> Self {
        let mut dictionary = Self::default();
        for (field, synonyms) in terms {
            dictionary.insert(*field, synonyms.iter().map(|s| s.to_string()));
        }
        dictionary
    }

    /// Parse a `{ "<fieldId>": ["synonym", ...] }` JSON document
    ///
    /// Unknown field ids are rejected so typos in a dictionary file surface
    /// immediately instead of silently leaving a field without synonyms.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut dictionary = Self::default();
        for (key, synonyms) in raw {
            let field: TargetField = key.parse()?;
            dictionary.insert(field, synonyms);
        }
        info!(
            "Loaded synonym dictionary with {} fields and {} terms",
            dictionary.entries.len(),
            dictionary.term_count()
        );
        Ok(dictionary)
    }

    /// Load a dictionary file from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Dictionary(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&content)
    }

    /// Synonyms of a field in dictionary order (empty if the field is absent)
    pub fn synonyms(&self, field: TargetField) -> &[String] {
        self.entries.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fields that have at least one synonym
    pub fn fields(&self) -> impl Iterator<Item = TargetField> + '_ {
        self.entries.keys().copied()
    }

    pub fn term_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    // Keeps insertion order, drops blanks and terms that normalize identically
    fn insert(&mut self, field: TargetField, synonyms: impl IntoIterator<Item = String>) {
        let list = self.entries.entry(field).or_default();
        let mut seen: HashSet<String> = list.iter().map(|s| normalize(s)).collect();
        for synonym in synonyms {
            let key = normalize(&synonym);
            if key.is_empty() {
                debug!("Skipping synonym '{}' for {}: empty after normalization", synonym, field);
                continue;
            }
            if seen.insert(key) {
                list.push(synonym);
            }
        }
        if self.entries.get(&field).map_or(false, Vec::is_empty) {
            self.entries.remove(&field);
        }
    }
}
