//! # Resolver Configuration Module
//!
//! Scoring constants for header matching and fuzzy lookups, plus the
//! connection settings for the PostgreSQL record store. Values can be
//! overridden from the environment (a `.env` file is honoured).

use std::env;
use std::str::FromStr;

use anyhow::Context;

use crate::errors::EngineError;

// Constants for header scoring
pub const EXACT_MATCH_SCORE: f64 = 100.0;
pub const CONTAINMENT_WEIGHT: f64 = 80.0;
pub const FUZZY_WEIGHT: f64 = 60.0;
pub const SIMILARITY_THRESHOLD: f64 = 0.7;
pub const ACCEPTANCE_THRESHOLD: f64 = 30.0;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Tunable scoring configuration shared by the field mapper and the
/// category index
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Score for a header equal to a synonym after normalization
    pub exact_score: f64,
    /// Weight applied to the length ratio when one string contains the other
    pub containment_weight: f64,
    /// Weight applied to the similarity ratio for fuzzy matches
    pub fuzzy_weight: f64,
    /// Similarity must be strictly greater than this to score at all
    pub similarity_threshold: f64,
    /// Best header score must be strictly greater than this to be accepted
    pub acceptance_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            exact_score: EXACT_MATCH_SCORE,
            containment_weight: CONTAINMENT_WEIGHT,
            fuzzy_weight: FUZZY_WEIGHT,
            similarity_threshold: SIMILARITY_THRESHOLD,
            acceptance_threshold: ACCEPTANCE_THRESHOLD,
        }
    }
}

impl MatchingConfig {
    /// Build a configuration from defaults overridden by `RESOLVER_*`
    /// environment variables
    ///
    /// Recognized variables: `RESOLVER_CONTAINMENT_WEIGHT`,
    /// `RESOLVER_FUZZY_WEIGHT`, `RESOLVER_SIMILARITY_THRESHOLD`,
    /// `RESOLVER_ACCEPTANCE_THRESHOLD`.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            exact_score: defaults.exact_score,
            containment_weight: env_or("RESOLVER_CONTAINMENT_WEIGHT", defaults.containment_weight)?,
            fuzzy_weight: env_or("RESOLVER_FUZZY_WEIGHT", defaults.fuzzy_weight)?,
            similarity_threshold: env_or(
                "RESOLVER_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
            )?,
            acceptance_threshold: env_or(
                "RESOLVER_ACCEPTANCE_THRESHOLD",
                defaults.acceptance_threshold,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would push scores outside `[0, 100]`
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(EngineError::Config(format!(
                "similarity threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        for (label, weight) in [
            ("containment weight", self.containment_weight),
            ("fuzzy weight", self.fuzzy_weight),
            ("acceptance threshold", self.acceptance_threshold),
        ] {
            if !(0.0..=self.exact_score).contains(&weight) {
                return Err(EngineError::Config(format!(
                    "{label} must be within [0, {}], got {weight}",
                    self.exact_score
                )));
            }
        }
        Ok(())
    }
}

/// Connection settings for the PostgreSQL record store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl StoreConfig {
    /// Read `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS`
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("Invalid DATABASE_MAX_CONNECTIONS: {raw}"))?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, EngineError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| EngineError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = MatchingConfig::default();
        assert_eq!(config.exact_score, 100.0);
        assert_eq!(config.containment_weight, 80.0);
        assert_eq!(config.fuzzy_weight, 60.0);
        assert_eq!(config.similarity_threshold, 0.7);
        assert_eq!(config.acceptance_threshold, 30.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = MatchingConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MatchingConfig {
            fuzzy_weight: 120.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_parses_and_falls_back() {
        assert_eq!(env_or("RESOLVER_TEST_UNSET_VARIABLE", 0.5).unwrap(), 0.5);

        env::set_var("RESOLVER_TEST_BAD_VARIABLE", "not-a-number");
        assert!(env_or::<f64>("RESOLVER_TEST_BAD_VARIABLE", 0.5).is_err());

        env::set_var("RESOLVER_TEST_GOOD_VARIABLE", " 0.8 ");
        assert_eq!(env_or("RESOLVER_TEST_GOOD_VARIABLE", 0.5).unwrap(), 0.8);
    }

    #[test]
    fn test_matching_config_from_env() {
        env::set_var("RESOLVER_ACCEPTANCE_THRESHOLD", "45");
        let config = MatchingConfig::from_env().unwrap();
        assert_eq!(config.acceptance_threshold, 45.0);
        assert_eq!(config.containment_weight, CONTAINMENT_WEIGHT);

        env::set_var("RESOLVER_ACCEPTANCE_THRESHOLD", "250");
        assert!(matches!(MatchingConfig::from_env(), Err(EngineError::Config(_))));
        env::remove_var("RESOLVER_ACCEPTANCE_THRESHOLD");
    }

    #[test]
    fn test_store_config_from_env() {
        env::set_var("DATABASE_URL", "postgres://localhost/backoffice_test");
        env::set_var("DATABASE_MAX_CONNECTIONS", "12");
        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.database_url, "postgres://localhost/backoffice_test");
        assert_eq!(config.max_connections, 12);

        env::set_var("DATABASE_MAX_CONNECTIONS", "many");
        let err = StoreConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
        env::remove_var("DATABASE_MAX_CONNECTIONS");
    }
}
