use isolang::Language;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Language utilities for localization header columns
///
/// Localization files name their language columns with loose identifiers
/// ("german", "latam", "schinese", ...) rather than ISO codes. Providers,
/// on the other hand, sometimes answer with ISO 639 codes or plain English
/// names. This module canonicalizes response keys back to the header names
/// so translations land in the right column.
/// Alternative spellings providers have been observed to use, per header name
static LANGUAGE_ALTERNATIVES: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("german", vec!["de"]),
        ("latam", vec!["latin american spanish", "es-419"]),
        ("french", vec!["fr"]),
        ("italian", vec!["it"]),
        ("japanese", vec!["ja"]),
        ("koreana", vec!["korean", "ko"]),
        ("polish", vec!["pl"]),
        ("brazilian", vec!["portuguese", "pt-br"]),
        ("russian", vec!["ru"]),
        ("turkish", vec!["tr"]),
        ("schinese", vec!["simplified chinese", "zh-cn"]),
        ("tchinese", vec!["traditional chinese", "zh-tw"]),
        ("spanish", vec!["es"]),
    ])
});

/// English names that map onto a non-obvious header name
static ENGLISH_NAME_OVERRIDES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("korean", "koreana"),
        ("portuguese", "brazilian"),
        ("chinese", "schinese"),
    ])
});

/// Resolve a response key to the canonical header language name.
///
/// Tries, in order: the key itself, the known alternatives table, an ISO
/// 639-1/639-3 lookup whose English name matches a header language. Keys
/// that resolve to nothing are returned lowercased so callers can still
/// match them against unusual headers.
pub fn canonical_language(key: &str) -> String {
    let normalized = key.trim().to_lowercase();

    if LANGUAGE_ALTERNATIVES.contains_key(normalized.as_str()) {
        return normalized;
    }

    for (canonical, alternatives) in LANGUAGE_ALTERNATIVES.iter() {
        if alternatives.contains(&normalized.as_str()) {
            return (*canonical).to_string();
        }
    }

    // ISO code fallback: "deu" or "de" both resolve to "german"
    let from_iso = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    };
    if let Some(lang) = from_iso {
        let english = lang.to_name().to_lowercase();
        if let Some(header) = ENGLISH_NAME_OVERRIDES.get(english.as_str()) {
            return (*header).to_string();
        }
        if LANGUAGE_ALTERNATIVES.contains_key(english.as_str()) {
            return english;
        }
    }

    if let Some(header) = ENGLISH_NAME_OVERRIDES.get(normalized.as_str()) {
        return (*header).to_string();
    }

    normalized
}

/// Check whether two language identifiers refer to the same header column
pub fn language_keys_match(a: &str, b: &str) -> bool {
    canonical_language(a) == canonical_language(b)
}
