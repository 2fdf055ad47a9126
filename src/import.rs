//! # Article Import Module
//!
//! Turns decoded spreadsheet/JSON rows into article candidates:
//!
//! 1. [`ImportSession::prepare`] maps the file's headers once.
//! 2. Every row is read through the mapping, cells are parsed (German and
//!    English number notation, lists, nutrition columns) and unmapped or
//!    empty fields fall back to [`ImportDefaults`].
//! 3. The supplier cell is resolved against the known suppliers.
//! 4. Each candidate passes the duplicate guard against the store snapshot
//!    and the rows accepted before it.
//!
//! A row without a name or supplier is rejected; a cell that cannot be parsed
//! only produces a warning and leaves the field empty.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::category_index::CategoryIndex;
use crate::config::MatchingConfig;
use crate::duplicate_guard::{check_duplicate, DuplicateCandidate, DuplicateVerdict, SupplierRef};
use crate::field_mapper::{map_fields, FieldMappingResult, MappedSource};
use crate::model::{ArticleDetails, CanonicalSupplier, NewArticle, Nutrition};
use crate::nutrition::Nutrient;
use crate::store::CatalogSnapshot;
use crate::supplier_resolver::{resolve_supplier, SupplierResolution};
use crate::synonyms::{FieldPriority, SynonymDictionary, TargetField};

/// One decoded row: header -> cell text
pub type ImportRow = BTreeMap<String, String>;

lazy_static! {
    static ref NUMBER_RE: Regex =
        Regex::new(r"-?\d[\d.,]*").expect("Number pattern should be valid");
    static ref LIST_SEPARATOR_RE: Regex =
        Regex::new(r"[,;|\n]+").expect("List separator pattern should be valid");
}

/// User-supplied values for fields the file does not provide
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDefaults {
    pub supplier: Option<SupplierRef>,
    pub category: Option<String>,
    pub bundle_unit: Option<String>,
    pub content_unit: Option<String>,
    pub vat_rate: Option<f64>,
}

/// An import row that passed transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedArticle {
    /// Index of the source row
    pub row: usize,
    pub name: String,
    pub supplier: SupplierRef,
    pub article_number: Option<String>,
    pub bundle_price: Option<f64>,
    pub details: ArticleDetails,
}

impl ImportedArticle {
    pub fn duplicate_candidate(&self) -> DuplicateCandidate {
        DuplicateCandidate {
            id: None,
            name: self.name.clone(),
            supplier: self.supplier.clone(),
            article_number: self.article_number.clone(),
        }
    }

    /// Convert into an insertable record; `None` while the supplier is only
    /// known by name
    pub fn into_new_article(self) -> Option<NewArticle> {
        let supplier_id = match self.supplier {
            SupplierRef::Id(id) => id,
            SupplierRef::Name(_) => return None,
        };
        Some(NewArticle {
            name: self.name,
            supplier_id,
            supplier_article_number: self.article_number,
            bundle_price: self.bundle_price,
            ocr_name_history: Default::default(),
            details: self.details,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    MissingName,
    MissingSupplier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowWarning {
    pub row: usize,
    pub field: TargetField,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowDuplicate {
    pub article: ImportedArticle,
    pub verdict: DuplicateVerdict,
}

/// Transformed row plus the problems found while reading it
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRow {
    pub article: ImportedArticle,
    pub warnings: Vec<RowWarning>,
}

/// Outcome of an import run
///
/// `ConflictingRecord::Batch(i)` in a duplicate verdict refers to
/// `accepted[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub accepted: Vec<ImportedArticle>,
    pub duplicates: Vec<RowDuplicate>,
    pub rejected: Vec<RowRejection>,
    pub warnings: Vec<RowWarning>,
}

/// Mapping and defaults for one imported file
#[derive(Debug, Clone)]
pub struct ImportSession {
    mapping: FieldMappingResult,
    defaults: ImportDefaults,
    config: MatchingConfig,
}

impl ImportSession {
    pub fn new(mapping: FieldMappingResult, defaults: ImportDefaults, config: MatchingConfig) -> Self {
        Self {
            mapping,
            defaults,
            config,
        }
    }

    /// Map `headers` and start a session with empty defaults
    pub fn prepare(
        headers: &[String],
        dictionary: &SynonymDictionary,
        priority: &FieldPriority,
        config: MatchingConfig,
    ) -> Self {
        let mapping = map_fields(priority, dictionary, headers, &config);
        Self::new(mapping, ImportDefaults::default(), config)
    }

    pub fn mapping(&self) -> &FieldMappingResult {
        &self.mapping
    }

    /// Mapping access for manual corrections before running
    pub fn mapping_mut(&mut self) -> &mut FieldMappingResult {
        &mut self.mapping
    }

    pub fn set_defaults(&mut self, defaults: ImportDefaults) {
        self.defaults = defaults;
    }

    /// Transform, deduplicate and classify every row
    pub fn run(&self, rows: &[ImportRow], snapshot: &CatalogSnapshot) -> ImportReport {
        info!("Importing {} rows", rows.len());
        let categories = CategoryIndex::from_articles(&snapshot.articles);
        let mut report = ImportReport::default();
        let mut batch: Vec<DuplicateCandidate> = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let transformed = match self.transform_row(index, row, &categories, &snapshot.suppliers) {
                Ok(transformed) => transformed,
                Err(rejection) => {
                    debug!("Row {} rejected: {:?}", index, rejection.reason);
                    report.rejected.push(rejection);
                    continue;
                }
            };
            report.warnings.extend(transformed.warnings);

            let candidate = transformed.article.duplicate_candidate();
            let verdict = check_duplicate(&candidate, &batch, &snapshot.articles, &snapshot.suppliers);
            if verdict.is_duplicate {
                report.duplicates.push(RowDuplicate {
                    article: transformed.article,
                    verdict,
                });
            } else {
                batch.push(candidate);
                report.accepted.push(transformed.article);
            }
        }

        info!(
            "Import finished: {} accepted, {} duplicates, {} rejected, {} warnings",
            report.accepted.len(),
            report.duplicates.len(),
            report.rejected.len(),
            report.warnings.len()
        );
        report
    }

    /// Read one row through the mapping
    pub fn transform_row(
        &self,
        index: usize,
        row: &ImportRow,
        categories: &CategoryIndex,
        suppliers: &[CanonicalSupplier],
    ) -> Result<TransformedRow, RowRejection> {
        let mut warnings = Vec::new();
        let text = |field: TargetField| self.cell(row, field);

        let name = text(TargetField::Name).ok_or(RowRejection {
            row: index,
            reason: RejectReason::MissingName,
        })?;

        let supplier = match text(TargetField::Supplier) {
            Some(raw) => match resolve_supplier(&raw, suppliers) {
                SupplierResolution::Resolved(id) => SupplierRef::Id(id),
                SupplierResolution::Unresolved => {
                    debug!("Row {}: supplier '{}' needs to be selected", index, raw);
                    warnings.push(RowWarning {
                        row: index,
                        field: TargetField::Supplier,
                        message: format!("unknown supplier: '{raw}'"),
                    });
                    SupplierRef::Name(raw)
                }
            },
            None => self.defaults.supplier.clone().ok_or(RowRejection {
                row: index,
                reason: RejectReason::MissingSupplier,
            })?,
        };

        let mut number = |field: TargetField| -> Option<f64> {
            let raw = self.cell(row, field)?;
            let parsed = parse_decimal(&raw);
            if parsed.is_none() {
                warn!("Row {}: cannot read {} from '{}'", index, field, raw);
                warnings.push(RowWarning {
                    row: index,
                    field,
                    message: format!("not a number: '{raw}'"),
                });
            }
            parsed
        };
        let bundle_price = number(TargetField::BundlePrice);
        let content_amount = number(TargetField::ContentAmount);
        let vat_rate = number(TargetField::VatRate).map(normalize_vat_rate);

        let category = text(TargetField::Category)
            .map(|raw| {
                categories
                    .canonicalize(&raw, &self.config)
                    .map(str::to_string)
                    .unwrap_or(raw)
            })
            .or_else(|| self.defaults.category.clone());

        let nutrition = self.read_nutrition(index, row, &mut warnings);

        let details = ArticleDetails {
            category,
            bundle_unit: text(TargetField::BundleUnit).or_else(|| self.defaults.bundle_unit.clone()),
            content_amount,
            content_unit: text(TargetField::ContentUnit)
                .or_else(|| self.defaults.content_unit.clone()),
            vat_rate: vat_rate.or(self.defaults.vat_rate),
            allergens: text(TargetField::Allergens).map(|v| split_list(&v)).unwrap_or_default(),
            additives: text(TargetField::Additives).map(|v| split_list(&v)).unwrap_or_default(),
            ingredients: text(TargetField::Ingredients),
            nutrition,
            ean_codes: text(TargetField::Ean)
                .map(|v| split_list(&v).into_iter().map(|c| c.replace(' ', "")).collect())
                .unwrap_or_default(),
            notes: text(TargetField::Notes),
        };

        Ok(TransformedRow {
            article: ImportedArticle {
                row: index,
                name,
                supplier,
                article_number: text(TargetField::ArticleNumber),
                bundle_price,
                details,
            },
            warnings,
        })
    }

    /// Trimmed cell of the column mapped to `field`, `None` if unmapped or blank
    fn cell(&self, row: &ImportRow, field: TargetField) -> Option<String> {
        let header = self.mapping.header_for(field)?;
        row.get(header)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn read_nutrition(
        &self,
        index: usize,
        row: &ImportRow,
        warnings: &mut Vec<RowWarning>,
    ) -> Option<Nutrition> {
        let mapping = self.mapping.mapping_for(TargetField::Nutrition)?;
        let nutrition = match mapping.source.as_ref()? {
            MappedSource::NutritionCluster => {
                let mut nutrition = Nutrition::default();
                for header in self.mapping.cluster_headers() {
                    let Some(nutrient) = Nutrient::classify(header) else {
                        continue;
                    };
                    if let Some(value) = row.get(header).and_then(|v| parse_decimal(v)) {
                        nutrient.apply(&mut nutrition, value);
                    }
                }
                nutrition
            }
            MappedSource::Header(header) => {
                let raw = row.get(header).map(|v| v.trim()).filter(|v| !v.is_empty())?;
                match serde_json::from_str::<Nutrition>(raw) {
                    Ok(nutrition) => nutrition,
                    Err(e) => {
                        warnings.push(RowWarning {
                            row: index,
                            field: TargetField::Nutrition,
                            message: format!("unreadable nutrition facts: {e}"),
                        });
                        return None;
                    }
                }
            }
        };
        (!nutrition.is_empty()).then_some(nutrition)
    }
}

/// Parse the first number in a cell, German or English notation
///
/// The last of `,` and `.` is the decimal separator when both occur; a lone
/// comma is decimal, several dots are thousands separators.
///
/// # Examples
///
/// ```rust
/// use backoffice_resolver::import::parse_decimal;
///
/// assert_eq!(parse_decimal("1.234,56 €"), Some(1234.56));
/// assert_eq!(parse_decimal("EUR 12.5"), Some(12.5));
/// assert_eq!(parse_decimal("2,49"), Some(2.49));
/// assert_eq!(parse_decimal("n/a"), None);
/// ```
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let token = NUMBER_RE.find(raw)?.as_str();
    let token = token.trim_end_matches(['.', ',']);
    let last_comma = token.rfind(',');
    let last_dot = token.rfind('.');

    let canonical = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (Some(_), None) if token.matches(',').count() == 1 => token.replace(',', "."),
        (Some(_), None) => token.replace(',', ""),
        (None, Some(_)) if token.matches('.').count() > 1 => token.replace('.', ""),
        _ => token.to_string(),
    };
    canonical.parse().ok()
}

/// Fractions such as 0.07 become percentages
fn normalize_vat_rate(rate: f64) -> f64 {
    if rate > 0.0 && rate < 1.0 {
        rate * 100.0
    } else {
        rate
    }
}

/// Split a list cell on `,` `;` `|` or line breaks
pub fn split_list(raw: &str) -> Vec<String> {
    LIST_SEPARATOR_RE
        .split(raw)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
