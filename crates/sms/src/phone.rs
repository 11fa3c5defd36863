//! Phone number normalization
//!
//! Numbers are keyed in E.164-ish form. Local numbers with a trunk prefix
//! (`0412 345 678`) and bare numbers get the configured country code.

use crate::models::PhoneNumber;

/// Country code applied when settings don't say otherwise
pub const DEFAULT_COUNTRY_CODE: &str = "+61";

/// Normalize a raw number, returning an empty string for empty input
pub fn normalize_phone_number(raw: &str, default_country_code: &str) -> String {
    let country_code = match default_country_code.trim() {
        "" => DEFAULT_COUNTRY_CODE,
        code => code,
    };

    let clean: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    if clean.is_empty() {
        return clean;
    }

    let clean = match clean.strip_prefix('0') {
        Some(rest) => format!("{country_code}{rest}"),
        None => clean,
    };

    if clean.starts_with('+') {
        clean
    } else {
        format!("{country_code}{clean}")
    }
}

/// Normalize into a [`PhoneNumber`], or `None` when nothing is left
pub fn normalize(raw: &str, default_country_code: &str) -> Option<PhoneNumber> {
    let normalized = normalize_phone_number(raw, default_country_code);
    (!normalized.is_empty()).then(|| PhoneNumber::new(normalized))
}
