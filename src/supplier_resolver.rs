//! # Progressive Supplier Resolver
//!
//! Receipts print supplier names with legal-form suffixes, branch names or
//! truncation ("Metro AG Frischedienst", "METRO"). The resolver narrows the
//! known suppliers word by word instead of relying on a fuzzy threshold:
//!
//! 1. An exact case-insensitive name match wins immediately.
//! 2. Otherwise the free text is split into words and the search term grows
//!    one word at a time. A single match resolves, an empty match set stops
//!    (a longer term cannot match more suppliers), and several matches after
//!    the last word are ambiguous.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::model::{CanonicalSupplier, SupplierId};
use crate::normalizer::{collapse_whitespace_lower, eq_ignore_case, tokenize};

/// Outcome of supplier resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplierResolution {
    Resolved(SupplierId),
    Unresolved,
}

impl SupplierResolution {
    pub fn supplier_id(&self) -> Option<SupplierId> {
        match self {
            SupplierResolution::Resolved(id) => Some(*id),
            SupplierResolution::Unresolved => None,
        }
    }
}

/// Resolve free text to at most one known supplier
///
/// # Examples
///
/// ```rust
/// use backoffice_resolver::model::CanonicalSupplier;
/// use backoffice_resolver::supplier_resolver::{resolve_supplier, SupplierResolution};
///
/// let suppliers = vec![
///     CanonicalSupplier::new(1, "Metro AG"),
///     CanonicalSupplier::new(2, "Metro AG Frischedienst Nord"),
/// ];
/// assert_eq!(
///     resolve_supplier("Metro AG Frischedienst", &suppliers),
///     SupplierResolution::Resolved(2)
/// );
/// assert_eq!(resolve_supplier("metro ag", &suppliers), SupplierResolution::Resolved(1));
/// ```
pub fn resolve_supplier(free_text: &str, suppliers: &[CanonicalSupplier]) -> SupplierResolution {
    if let Some(exact) = suppliers.iter().find(|s| eq_ignore_case(&s.name, free_text)) {
        debug!("Supplier '{}' resolved by exact name to {}", free_text, exact.id);
        return SupplierResolution::Resolved(exact.id);
    }

    let tokens = tokenize(free_text);
    if tokens.is_empty() {
        return SupplierResolution::Unresolved;
    }

    let names: Vec<String> = suppliers
        .iter()
        .map(|s| collapse_whitespace_lower(&s.name))
        .collect();

    for word_count in 1..=tokens.len() {
        let prefix = tokens[..word_count].join(" ");
        let matches: Vec<&CanonicalSupplier> = suppliers
            .iter()
            .zip(&names)
            .filter(|(_, name)| name.contains(&prefix))
            .map(|(supplier, _)| supplier)
            .collect();
        trace!("Prefix '{}' matches {} suppliers", prefix, matches.len());

        match matches.len() {
            1 => {
                debug!(
                    "Supplier '{}' resolved to {} after {} words",
                    free_text, matches[0].id, word_count
                );
                return SupplierResolution::Resolved(matches[0].id);
            }
            0 => {
                debug!("Supplier '{}' unresolved: no match for '{}'", free_text, prefix);
                return SupplierResolution::Unresolved;
            }
            _ if word_count == tokens.len() => {
                debug!(
                    "Supplier '{}' ambiguous: {} suppliers still match",
                    free_text,
                    matches.len()
                );
                return SupplierResolution::Unresolved;
            }
            _ => {}
        }
    }

    SupplierResolution::Unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppliers(names: &[&str]) -> Vec<CanonicalSupplier> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| CanonicalSupplier::new(i as i64 + 1, name))
            .collect()
    }

    #[test]
    fn test_exact_match_short_circuits() {
        let list = suppliers(&["Metro AG", "Metro AG Frischedienst Nord"]);
        assert_eq!(resolve_supplier("METRO AG", &list), SupplierResolution::Resolved(1));
        assert_eq!(resolve_supplier("  metro   ag ", &list), SupplierResolution::Resolved(1));
    }

    #[test]
    fn test_progressive_narrowing() {
        let list = suppliers(&["Metro AG", "Metro AG Frischedienst Nord"]);
        assert_eq!(
            resolve_supplier("Metro AG Frischedienst", &list),
            SupplierResolution::Resolved(2)
        );
    }

    #[test]
    fn test_single_word_unique_match() {
        let list = suppliers(&["Metro AG", "Transgourmet Deutschland"]);
        assert_eq!(resolve_supplier("Transgourmet", &list), SupplierResolution::Resolved(2));
        assert_eq!(
            resolve_supplier("transgourmet filiale 12", &list),
            SupplierResolution::Resolved(2)
        );
    }

    #[test]
    fn test_empty_match_set_is_final() {
        let list = suppliers(&["Metro AG", "Metro Cash"]);
        assert_eq!(resolve_supplier("Selgros Metro", &list), SupplierResolution::Unresolved);
        assert_eq!(
            resolve_supplier("Selgros Metro AG extra words", &list),
            SupplierResolution::Unresolved
        );
    }

    #[test]
    fn test_ambiguous_after_last_word() {
        let list = suppliers(&["Metro AG Nord", "Metro AG Süd"]);
        assert_eq!(resolve_supplier("Metro AG", &list), SupplierResolution::Unresolved);
    }

    #[test]
    fn test_blank_text_and_empty_list() {
        let list = suppliers(&["Metro AG"]);
        assert_eq!(resolve_supplier("   ", &list), SupplierResolution::Unresolved);
        assert_eq!(resolve_supplier("Metro", &[]), SupplierResolution::Unresolved);
    }

    #[test]
    fn test_supplier_id_accessor() {
        assert_eq!(SupplierResolution::Resolved(4).supplier_id(), Some(4));
        assert_eq!(SupplierResolution::Unresolved.supplier_id(), None);
    }
}
