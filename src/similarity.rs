//! Edit-distance similarity between normalized strings.

use strsim::levenshtein;

/// Similarity ratio in `[0, 1]`: `(maxLen - editDistance) / maxLen`
///
/// Lengths are counted in characters, edits have unit cost. Two empty
/// strings are identical (1.0).
///
/// # Examples
///
/// ```rust
/// use backoffice_resolver::similarity::similarity;
///
/// assert_eq!(similarity("preis", "preis"), 1.0);
/// assert_eq!(similarity("preis", "kreis"), 0.8);
/// assert_eq!(similarity("", ""), 1.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    (max_len - distance) as f64 / max_len as f64
}
