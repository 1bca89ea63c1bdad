use std::fmt;

use crate::{
    apply_text_filters, canonical_key, format_text, normalize_whitespace, ExtractedFields,
    FilterCollection, FilterContext, FilterOutcome, NotificationSink,
};

/// A message that survived both filter passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Values as extracted.
    pub fields: ExtractedFields,
    /// Values after field-level filters.
    pub filtered: ExtractedFields,
    /// Dedup key built from `filtered` with the default template.
    pub key: String,
    /// Normalized sentence to speak.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoContent,
    MutedField(String),
    MutedOutput,
    EmptyText,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoContent => write!(f, "no content"),
            Rejection::MutedField(name) => write!(f, "suppressed by filter on field {name}"),
            Rejection::MutedOutput => write!(f, "suppressed by output filter"),
            Rejection::EmptyText => write!(f, "empty text after filtering"),
        }
    }
}

/// Field filters, template, output filters, whitespace normalization.
pub fn compose_message(
    fields: ExtractedFields,
    filters: &FilterCollection,
    template: &str,
    notifier: Option<&dyn NotificationSink>,
) -> Result<ComposedMessage, Rejection> {
    if !fields.has_content() {
        return Err(Rejection::NoContent);
    }

    let mut filtered = fields.clone();
    for (name, value) in fields.iter() {
        let ctx = FilterContext {
            field_name: Some(name),
            fields: Some(&fields),
            notifier,
        };
        match apply_text_filters(value, &filters.field_filters(name), &ctx) {
            FilterOutcome::Text(text) => filtered.insert(name, text),
            FilterOutcome::Terminated => return Err(Rejection::MutedField(name.to_string())),
        }
    }

    let formatted = format_text(template, &filtered);
    let ctx = FilterContext {
        field_name: None,
        fields: Some(&fields),
        notifier,
    };
    let output = apply_text_filters(&formatted, &filters.output_filters(), &ctx)
        .into_text()
        .ok_or(Rejection::MutedOutput)?;

    let text = normalize_whitespace(&output);
    if text.is_empty() {
        return Err(Rejection::EmptyText);
    }

    Ok(ComposedMessage {
        key: canonical_key(&filtered),
        fields,
        filtered,
        text,
    })
}
