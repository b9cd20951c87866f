/*!
 * Parsing and repair of provider translation responses.
 *
 * Providers are asked for a JSON object mapping each requested language to
 * its translation. In practice replies arrive wrapped in markdown fences,
 * prefixed with prose, nested under a spurious outer key, or keyed by ISO
 * codes instead of header names. This module normalizes all of that, and
 * rejects replies where the model parroted the prompt instructions back
 * instead of translating.
 */

use std::collections::HashMap;

use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::language_utils::{canonical_language, language_keys_match};

static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*```(?:json)?\s*").expect("static regex"));
static FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").expect("static regex"));

/// Instruction fragments that show up verbatim when a model answers with a
/// translated copy of the prompt instead of a translation of the text
static ERROR_FRAGMENTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("spanish", "Responder solo con un objeto JSON"),
        ("latam", "Responder solo con un objeto JSON"),
        ("koreana", "JSON 객체로만 응답하고"),
        ("russian", "Ответьте только объектом JSON"),
        ("italian", "Rispondere solo con un oggetto JSON"),
        ("french", "Répondre uniquement avec un objet JSON"),
        ("brazilian", "Responder somente com um objeto JSON"),
        ("tchinese", "僅通過JSON對象響應"),
        ("japanese", "JSONオブジェクトでのみ応答してください"),
        ("schinese", "只能用JSON對象來回答"),
        ("polish", "Odpowiadaj tylko obiektem JSON"),
        ("german", "Antworte nur mit einem JSON-Objekt"),
        ("turkish", "Yalnızca JSON nesnesi ile yanıt verin"),
    ])
});

/// Parser for structured translation responses
pub struct ResponseParser;

impl ResponseParser {
    /// Parse a raw provider reply into `language -> translation`.
    ///
    /// Only languages present in `requested` are kept; a reply covering a
    /// subset of them is a valid partial result. An empty or unreadable
    /// reply is a `ParseError`.
    pub fn parse(
        raw: &str,
        requested: &[String],
    ) -> Result<HashMap<String, String>, ProviderError> {
        let cleaned = Self::clean_fences(raw);

        let value = match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => value,
            Err(first_error) => {
                // Repair attempt: strip any leading prose up to the first
                // structural open-marker and anything after the last close
                debug!("[PARSER] JSON parse failed ({}), attempting repair", first_error);
                let repaired = Self::extract_json_object(&cleaned);
                match repaired.and_then(|r| serde_json::from_str::<Value>(&r).ok()) {
                    Some(value) => value,
                    None => {
                        error!("[PARSER] Unparsable response");
                        debug!("[PARSER] Raw response: {}", raw);
                        return Err(ProviderError::ParseError(format!(
                            "response is not valid JSON: {}",
                            first_error
                        )));
                    }
                }
            }
        };

        let object = match Self::unwrap_object(value) {
            Some(object) => object,
            None => {
                debug!("[PARSER] Raw response: {}", raw);
                return Err(ProviderError::ParseError(
                    "response is not a JSON object of translations".to_string(),
                ));
            }
        };

        let mut translations = HashMap::new();
        for (key, value) in object {
            let Some(text) = value.as_str() else { continue };
            let canonical = canonical_language(&key);
            // Key the result by the requested spelling so callers can look
            // it up with the header name they asked for
            let Some(requested_name) = requested
                .iter()
                .find(|lang| language_keys_match(lang, &canonical))
            else {
                debug!("[PARSER] Ignoring unrequested language key '{}'", key);
                continue;
            };
            if *requested_name != key {
                debug!("[PARSER] Used alternative key '{}' for language '{}'", key, requested_name);
            }
            translations.insert(
                requested_name.clone(),
                text.trim_end_matches('\n').to_string(),
            );
        }

        if translations.is_empty() {
            debug!("[PARSER] Raw response: {}", raw);
            return Err(ProviderError::ParseError(
                "response contained none of the requested languages".to_string(),
            ));
        }

        if Self::contains_error_fragments(&translations) {
            return Err(ProviderError::ParseError(
                "response echoed prompt instructions instead of translating".to_string(),
            ));
        }

        Ok(translations)
    }

    /// Strip markdown code fences the models like to wrap JSON in
    fn clean_fences(raw: &str) -> String {
        let without_open = FENCE_OPEN.replace(raw, "");
        FENCE_CLOSE.replace(&without_open, "").trim().to_string()
    }

    /// Extract the JSON object embedded in a larger string, if any
    fn extract_json_object(text: &str) -> Option<String> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end < start {
            return None;
        }
        Some(text[start..=end].to_string())
    }

    /// Unwrap `{"12345": {"german": ...}}` style single-key nesting
    fn unwrap_object(value: Value) -> Option<serde_json::Map<String, Value>> {
        let object = match value {
            Value::Object(object) => object,
            _ => return None,
        };

        if object.len() == 1 {
            if let Some((_, inner)) = object.iter().next() {
                if let Value::Object(inner_object) = inner {
                    return Some(inner_object.clone());
                }
            }
        }

        Some(object)
    }

    /// Detect translated-prompt parrot responses
    fn contains_error_fragments(translations: &HashMap<String, String>) -> bool {
        for (language, translation) in translations {
            if let Some(fragment) = ERROR_FRAGMENTS.get(language.as_str()) {
                if translation.contains(fragment) {
                    error!("[PARSER] Detected error response in {} translation", language);
                    return true;
                }
            }
        }
        false
    }
}
