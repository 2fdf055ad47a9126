//! # Nutrition Cluster Module
//!
//! Exports usually spread nutrition facts over several columns
//! ("Energie (kcal)", "Fett", "davon Zucker", ...). None of them matches the
//! `nutrition` target field on its own, so they are grouped into a single
//! synthetic option that the field mapper offers for that field.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::Nutrition;
use crate::normalizer::normalize;

/// Label shown for the synthetic nutrition option
pub const NUTRITION_CLUSTER_LABEL: &str = "Nährwerte (mehrere Spalten)";

/// Normalized terms that mark a header as a nutrition column, German and English
const NUTRITION_VOCABULARY: &[&str] = &[
    "calorie", "kalorie", "kcal", "kilojoule", "energy", "energie", "brennwert",
    "protein", "eiweiß", "eiweiss", "fat", "fett", "carbohydrate", "carbs",
    "kohlenhydrat", "fiber", "fibre", "ballaststoff", "sugar", "zucker", "salt", "salz",
];

/// Several real headers presented as one pseudo-header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionClusterOption {
    /// Constituent headers in source order
    pub headers: Vec<String>,
}

impl NutritionClusterOption {
    /// Collect every header that mentions a nutrition term
    ///
    /// Returns `None` when no header qualifies.
    pub fn detect(headers: &[String]) -> Option<Self> {
        let matched: Vec<String> = headers
            .iter()
            .filter(|header| is_nutrition_header(header))
            .cloned()
            .collect();

        if matched.is_empty() {
            return None;
        }
        debug!("Detected nutrition cluster with {} headers: {:?}", matched.len(), matched);
        Some(Self { headers: matched })
    }

    pub fn label(&self) -> &'static str {
        NUTRITION_CLUSTER_LABEL
    }

    pub fn contains(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }
}

/// Whether the normalized header contains a nutrition vocabulary term
pub fn is_nutrition_header(header: &str) -> bool {
    let normalized = normalize(header);
    !normalized.is_empty() && NUTRITION_VOCABULARY.iter().any(|term| normalized.contains(term))
}

/// A single nutrition value a column can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrient {
    EnergyKj,
    EnergyKcal,
    Protein,
    Fat,
    Carbohydrates,
    Sugar,
    Fiber,
    Salt,
}

impl Nutrient {
    /// Decide which value a cluster column holds
    ///
    /// Order matters: "Kohlenhydrate, davon Zucker" is sugar, "Energie (kJ)"
    /// is kilojoules. Saturated fat columns have no slot and yield `None`.
    pub fn classify(header: &str) -> Option<Self> {
        let h = normalize(header);
        let has = |terms: &[&str]| terms.iter().any(|t| h.contains(t));

        if has(&["gesättigt", "gesaettigt", "saturated"]) {
            None
        } else if has(&["kj", "kilojoule"]) {
            Some(Nutrient::EnergyKj)
        } else if has(&["kcal", "calorie", "kalorie", "energy", "energie", "brennwert"]) {
            Some(Nutrient::EnergyKcal)
        } else if has(&["sugar", "zucker"]) {
            Some(Nutrient::Sugar)
        } else if has(&["fiber", "fibre", "ballaststoff"]) {
            Some(Nutrient::Fiber)
        } else if has(&["salt", "salz"]) {
            Some(Nutrient::Salt)
        } else if has(&["protein", "eiweiß", "eiweiss"]) {
            Some(Nutrient::Protein)
        } else if has(&["carbohydrate", "carbs", "kohlenhydrat"]) {
            Some(Nutrient::Carbohydrates)
        } else if has(&["fat", "fett"]) {
            Some(Nutrient::Fat)
        } else {
            None
        }
    }

    /// Store a value in the matching slot (the first value per slot wins)
    pub fn apply(self, nutrition: &mut Nutrition, value: f64) {
        let slot = match self {
            Nutrient::EnergyKj => &mut nutrition.energy_kj,
            Nutrient::EnergyKcal => &mut nutrition.energy_kcal,
            Nutrient::Protein => &mut nutrition.protein,
            Nutrient::Fat => &mut nutrition.fat,
            Nutrient::Carbohydrates => &mut nutrition.carbohydrates,
            Nutrient::Sugar => &mut nutrition.sugar,
            Nutrient::Fiber => &mut nutrition.fiber,
            Nutrient::Salt => &mut nutrition.salt,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_collects_all_nutrition_headers() {
        let hs = headers(&["Artikelname", "Energie (kcal)", "Fett", "Preis", "davon Zucker", "Salz"]);
        let cluster = NutritionClusterOption::detect(&hs).unwrap();
        assert_eq!(cluster.headers, headers(&["Energie (kcal)", "Fett", "davon Zucker", "Salz"]));
        assert!(cluster.contains("Fett"));
        assert!(!cluster.contains("Preis"));
    }

    #[test]
    fn test_detect_none_without_matches() {
        assert!(NutritionClusterOption::detect(&headers(&["Artikelname", "Lieferant"])).is_none());
        assert!(NutritionClusterOption::detect(&[]).is_none());
    }

    #[test]
    fn test_english_headers() {
        assert!(is_nutrition_header("Protein (g)"));
        assert!(is_nutrition_header("Carbohydrates"));
        assert!(is_nutrition_header("Dietary Fiber"));
        assert!(!is_nutrition_header("Supplier"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(Nutrient::classify("Energie (kJ)"), Some(Nutrient::EnergyKj));
        assert_eq!(Nutrient::classify("Brennwert kcal"), Some(Nutrient::EnergyKcal));
        assert_eq!(Nutrient::classify("Kohlenhydrate, davon Zucker"), Some(Nutrient::Sugar));
        assert_eq!(Nutrient::classify("Kohlenhydrate"), Some(Nutrient::Carbohydrates));
        assert_eq!(Nutrient::classify("Eiweiß"), Some(Nutrient::Protein));
        assert_eq!(Nutrient::classify("Fett"), Some(Nutrient::Fat));
        assert_eq!(Nutrient::classify("davon gesättigte Fettsäuren"), None);
    }

    #[test]
    fn test_apply_keeps_first_value() {
        let mut nutrition = Nutrition::default();
        Nutrient::Fat.apply(&mut nutrition, 12.0);
        Nutrient::Fat.apply(&mut nutrition, 99.0);
        assert_eq!(nutrition.fat, Some(12.0));
    }
}
