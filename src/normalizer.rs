//! # Normalizer Module
//!
//! Comparison forms for free text coming from spreadsheets and receipts.
//!
//! - [`normalize`] keeps only letters and digits, lowercased. Accented letters
//!   (`ä`, `ß`, `é`, ...) are letters and survive; punctuation and whitespace
//!   disappear without a placeholder, so `"Artikel-Nr."` becomes `"artikelnr"`.
//! - [`tokenize`] splits on whitespace for word-by-word narrowing.
//! - [`collapse_whitespace_lower`] is the case-insensitive form that keeps
//!   word boundaries, used to match supplier names on receipts.
//! - [`fold_case`] only trims and lowercases; record names and article
//!   numbers are compared in this form.

use unicode_normalization::UnicodeNormalization;

/// Normalize text for scoring
///
/// Applies NFKC composition first so decomposed umlauts (`a` + U+0308) and
/// precomposed ones compare equal.
///
/// # Examples
///
/// ```rust
/// use backoffice_resolver::normalizer::normalize;
///
/// assert_eq!(normalize("Artikel-Nr."), "artikelnr");
/// assert_eq!(normalize("  Gebinde Preis (€) "), "gebindepreis");
/// assert_eq!(normalize("Größe"), "größe");
/// ```
pub fn normalize(s: &str) -> String {
    s.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Split text into lowercase words, dropping empty tokens
///
/// # Examples
///
/// ```rust
/// use backoffice_resolver::normalizer::tokenize;
///
/// assert_eq!(tokenize("  Metro AG\tFrischedienst "), vec!["metro", "ag", "frischedienst"]);
/// assert!(tokenize("   ").is_empty());
/// ```
pub fn tokenize(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_lowercase).collect()
}

/// Lowercase, trim and collapse whitespace runs to a single space
pub fn collapse_whitespace_lower(s: &str) -> String {
    tokenize(s).join(" ")
}

/// Trim and lowercase, inner whitespace untouched
///
/// # Examples
///
/// ```rust
/// use backoffice_resolver::normalizer::fold_case;
///
/// assert_eq!(fold_case(" Butter 250G "), "butter 250g");
/// assert_ne!(fold_case("Butter  250g"), fold_case("Butter 250g"));
/// ```
pub fn fold_case(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Case-insensitive equality that ignores surrounding and repeated whitespace
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    collapse_whitespace_lower(a) == collapse_whitespace_lower(b)
}
