use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::ExtractedFields;

/// Template used when none is stored, and always used for the dedup key.
pub const DEFAULT_SPEECH_TEMPLATE: &str = "%(name) %(body)";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\(([A-Za-z0-9_]+)\)").expect("static placeholder regex"));

/// Substitutes every `%(field)` placeholder with the field's value.
/// Unknown fields resolve to the empty string.
pub fn format_text(template: &str, fields: &ExtractedFields) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            fields.get(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

/// Collapses whitespace runs to one space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable serialization of a message, independent of the user's template.
pub fn canonical_key(fields: &ExtractedFields) -> String {
    format_text(DEFAULT_SPEECH_TEMPLATE, fields)
}
