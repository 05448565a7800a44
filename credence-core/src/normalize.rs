//! Standing normalization.
//!
//! Maps free-text standing descriptions from any source onto [`Standing`].

use crate::Standing;

/// Tokens that mark an inactive license. Checked before the active tokens
/// because "inativo" contains "ativo" and "inactive" contains "active".
const INACTIVE_TOKENS: &[&str] = &["inativo", "inativa", "inactive"];

/// Any text mentioning cancellation ("cancelado", "cancelled", ...).
const CANCELLED_TOKENS: &[&str] = &["cancel"];

/// Negations of an active token. "irregular" contains "regular" but says
/// nothing definite about the license, so it needs review.
const NEGATED_ACTIVE_TOKENS: &[&str] = &["irregular"];

const ACTIVE_TOKENS: &[&str] = &["ativo", "ativa", "active", "regular"];

/// Normalize a free-text standing description.
///
/// Matching is case-insensitive and substring based. Unknown or empty input
/// yields [`Standing::Pending`], which means "needs human review" rather than
/// a guess in either direction.
///
/// # Example
/// ```
/// use credence_core::{normalize, Standing};
///
/// assert_eq!(normalize("Situação: Regular"), Standing::Active);
/// assert_eq!(normalize("CANCELADO"), Standing::Cancelled);
/// assert_eq!(normalize(""), Standing::Pending);
/// ```
pub fn normalize(raw: &str) -> Standing {
    let text = raw.to_lowercase();
    let contains_any = |tokens: &[&str]| tokens.iter().any(|token| text.contains(token));

    if contains_any(INACTIVE_TOKENS) {
        Standing::Inactive
    } else if contains_any(CANCELLED_TOKENS) {
        Standing::Cancelled
    } else if contains_any(NEGATED_ACTIVE_TOKENS) {
        Standing::Pending
    } else if contains_any(ACTIVE_TOKENS) {
        Standing::Active
    } else {
        Standing::Pending
    }
}

/// Whether `text` contains an active token as a whole word.
///
/// Meant for scanning whole pages, where unrelated words ("Cancelar",
/// an "Ativo/Inativo" filter) would skew [`normalize`]. Word matching keeps
/// "inativo" and "irregular" from counting.
pub fn has_active_marker(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| ACTIVE_TOKENS.contains(&word))
}

/// Normalize an optional standing text; a missing value is `Pending`.
pub fn normalize_opt(raw: Option<&str>) -> Standing {
    raw.map(normalize).unwrap_or(Standing::Pending)
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// normalize is total: any input yields one of the four standings.
        #[test]
        fn prop_normalize_is_total(raw in ".*") {
            let standing = normalize(&raw);
            prop_assert!(Standing::ALL.contains(&standing));
        }

        /// Case does not change the outcome for ASCII input.
        #[test]
        fn prop_normalize_ignores_ascii_case(raw in "[a-zA-Z :]{0,40}") {
            prop_assert_eq!(
                normalize(&raw.to_ascii_uppercase()),
                normalize(&raw.to_ascii_lowercase())
            );
        }

        /// Any text carrying an inactive token is never reported as active.
        #[test]
        fn prop_inactive_token_never_active(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
            let raw = format!("{}inativo{}", prefix, suffix);
            prop_assert_eq!(normalize(&raw), Standing::Inactive);
        }
    }
}
