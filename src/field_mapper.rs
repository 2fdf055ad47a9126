//! # Field Mapper Module
//!
//! Guesses which column of an arbitrary export holds which article field.
//!
//! ## Algorithm
//!
//! 1. Headers mentioning nutrition terms are grouped into a
//!    [`NutritionClusterOption`]. They stay in the pool for other fields;
//!    one that a field takes for itself leaves the cluster afterwards.
//! 2. Target fields are visited in [`FieldPriority`] order. Every header not
//!    yet assigned is scored against each synonym of the field:
//!    - exact normalized equality: 100
//!    - one contains the other: `80 * min(len) / max(len)`
//!    - otherwise `60 * similarity` when similarity exceeds 0.7, else 0
//! 3. The best header is accepted when its score exceeds 30 and is then
//!    unavailable to later fields. Ties keep the header that comes first.
//!
//! Assignment is greedy: a field is never reconsidered, a header is never
//! reassigned. The constants come from [`MatchingConfig`].

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::config::MatchingConfig;
use crate::normalizer::normalize;
use crate::nutrition::NutritionClusterOption;
use crate::similarity::similarity;
use crate::synonyms::{FieldPriority, SynonymDictionary, TargetField};

/// Where a target field's value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MappedSource {
    /// A single source column
    Header(String),
    /// The columns of the run's nutrition cluster
    NutritionCluster,
}

/// The mapping decided for one target field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub target_field: TargetField,
    /// `None` when no header was good enough
    pub source: Option<MappedSource>,
    /// Score of the accepted header in `[0, 100]`, 0 when unmapped
    pub confidence: f64,
}

impl FieldMapping {
    fn unmapped(target_field: TargetField) -> Self {
        Self {
            target_field,
            source: None,
            confidence: 0.0,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.source.is_some()
    }

    /// Source header when mapped to a single column
    pub fn header(&self) -> Option<&str> {
        match &self.source {
            Some(MappedSource::Header(header)) => Some(header),
            _ => None,
        }
    }
}

/// Result of one mapping run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingResult {
    /// One entry per target field, in priority order
    pub mappings: Vec<FieldMapping>,
    pub nutrition_cluster: Option<NutritionClusterOption>,
}

impl FieldMappingResult {
    pub fn mapping_for(&self, field: TargetField) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.target_field == field)
    }

    pub fn header_for(&self, field: TargetField) -> Option<&str> {
        self.mapping_for(field).and_then(FieldMapping::header)
    }

    /// Fields that need a user-supplied default or are omitted
    pub fn unmapped_fields(&self) -> Vec<TargetField> {
        self.mappings
            .iter()
            .filter(|m| !m.is_mapped())
            .map(|m| m.target_field)
            .collect()
    }

    /// Headers of the nutrition cluster, empty when none was detected
    pub fn cluster_headers(&self) -> &[String] {
        self.nutrition_cluster
            .as_ref()
            .map(|c| c.headers.as_slice())
            .unwrap_or(&[])
    }

    /// Manually point a field at a header, keeping assignment exclusive
    ///
    /// Any other field currently mapped to `header` becomes unmapped. The
    /// manual choice carries full confidence.
    pub fn assign(&mut self, field: TargetField, header: &str) {
        for mapping in &mut self.mappings {
            if mapping.target_field != field && mapping.header() == Some(header) {
                debug!("Unmapping {} from '{}' for manual assignment", mapping.target_field, header);
                *mapping = FieldMapping::unmapped(mapping.target_field);
            }
        }
        let manual = FieldMapping {
            target_field: field,
            source: Some(MappedSource::Header(header.to_string())),
            confidence: 100.0,
        };
        match self.mappings.iter_mut().find(|m| m.target_field == field) {
            Some(mapping) => *mapping = manual,
            None => self.mappings.push(manual),
        }
        self.release_cluster_headers();
    }

    /// Clear the mapping of a field
    pub fn unassign(&mut self, field: TargetField) {
        if let Some(mapping) = self.mappings.iter_mut().find(|m| m.target_field == field) {
            *mapping = FieldMapping::unmapped(field);
        }
    }

    // A header read by its own field is no longer part of the nutrition
    // cluster. An emptied cluster is dropped and unmaps the nutrition field.
    fn release_cluster_headers(&mut self) {
        let Some(cluster) = self.nutrition_cluster.as_mut() else {
            return;
        };
        let assigned: Vec<String> = self
            .mappings
            .iter()
            .filter_map(|m| m.header().map(str::to_string))
            .collect();
        cluster.headers.retain(|header| {
            let keep = !assigned.contains(header);
            if !keep {
                debug!("Removing '{}' from the nutrition cluster", header);
            }
            keep
        });

        if cluster.headers.is_empty() {
            debug!("Nutrition cluster emptied, dropping it");
            self.nutrition_cluster = None;
            for mapping in &mut self.mappings {
                if mapping.source == Some(MappedSource::NutritionCluster) {
                    *mapping = FieldMapping::unmapped(mapping.target_field);
                }
            }
        }
    }
}

/// Score a normalized header against a normalized synonym
///
/// # Examples
///
/// ```rust
/// use backoffice_resolver::config::MatchingConfig;
/// use backoffice_resolver::field_mapper::score_header;
///
/// let config = MatchingConfig::default();
/// assert_eq!(score_header("lieferant", "lieferant", &config), 100.0);
/// assert_eq!(score_header("lieferantname", "lieferant", &config), 80.0 * 9.0 / 13.0);
/// assert_eq!(score_header("notizen", "lieferant", &config), 0.0);
/// ```
pub fn score_header(header: &str, synonym: &str, config: &MatchingConfig) -> f64 {
    if header.is_empty() || synonym.is_empty() {
        return 0.0;
    }
    if header == synonym {
        return config.exact_score;
    }
    if header.contains(synonym) || synonym.contains(header) {
        let header_len = header.chars().count();
        let synonym_len = synonym.chars().count();
        let (min, max) = (header_len.min(synonym_len), header_len.max(synonym_len));
        return config.containment_weight * min as f64 / max as f64;
    }
    let ratio = similarity(header, synonym);
    if ratio > config.similarity_threshold {
        config.fuzzy_weight * ratio
    } else {
        0.0
    }
}

/// Map target fields to source headers
///
/// Returns one [`FieldMapping`] per field of `priority`, in that order, plus
/// the nutrition cluster if any header qualified for it.
pub fn map_fields(
    priority: &FieldPriority,
    dictionary: &SynonymDictionary,
    headers: &[String],
    config: &MatchingConfig,
) -> FieldMappingResult {
    info!(
        "Mapping {} target fields against {} headers",
        priority.fields().len(),
        headers.len()
    );

    let nutrition_cluster = NutritionClusterOption::detect(headers);
    let normalized_headers: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
    let mut used = vec![false; headers.len()];
    let mut mappings = Vec::with_capacity(priority.fields().len());

    for &field in priority.fields() {
        if field == TargetField::Nutrition && nutrition_cluster.is_some() {
            debug!("Mapping {} to the nutrition cluster", field);
            mappings.push(FieldMapping {
                target_field: field,
                source: Some(MappedSource::NutritionCluster),
                confidence: config.exact_score,
            });
            continue;
        }

        let synonyms: Vec<String> = dictionary
            .synonyms(field)
            .iter()
            .map(|s| normalize(s))
            .filter(|s| !s.is_empty())
            .collect();

        let mut best: Option<(usize, f64)> = None;
        for (index, header) in normalized_headers.iter().enumerate() {
            if used[index] {
                continue;
            }
            let score = synonyms
                .iter()
                .map(|synonym| score_header(header, synonym, config))
                .fold(0.0, f64::max);
            trace!("{} <- '{}' scored {:.1}", field, headers[index], score);

            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) if score > config.acceptance_threshold => {
                used[index] = true;
                debug!("Mapped {} to '{}' ({:.1})", field, headers[index], score);
                mappings.push(FieldMapping {
                    target_field: field,
                    source: Some(MappedSource::Header(headers[index].clone())),
                    confidence: score,
                });
            }
            _ => {
                debug!("No header accepted for {}", field);
                mappings.push(FieldMapping::unmapped(field));
            }
        }
    }

    let mut result = FieldMappingResult {
        mappings,
        nutrition_cluster,
    };
    result.release_cluster_headers();

    let mapped = result.mappings.iter().filter(|m| m.is_mapped()).count();
    info!("Mapped {} of {} target fields", mapped, result.mappings.len());
    result
}
