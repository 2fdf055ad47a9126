//! # Back-Office Entity Resolution
//!
//! Matching core of a restaurant back-office: maps the columns of arbitrary
//! article exports onto article fields, resolves suppliers and articles from
//! scanned receipts, and guards against duplicate records.

pub mod article_linker;
pub mod category_index;
pub mod config;
pub mod duplicate_guard;
pub mod errors;
pub mod field_mapper;
pub mod import;
pub mod logging;
pub mod model;
pub mod normalizer;
pub mod nutrition;
pub mod receipt_review;
pub mod similarity;
pub mod store;
pub mod supplier_resolver;
pub mod synonyms;
