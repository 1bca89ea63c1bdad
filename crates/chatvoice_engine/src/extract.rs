use chatvoice_core::{normalize_whitespace, ExtractedFields, FieldExtractor, SiteConfig};
use scraper::{ElementRef, Selector};

use crate::dom::{parse_selector, SelectorError};

struct CompiledField {
    extractor: &'static FieldExtractor,
    selector: Option<Selector>,
}

/// Selectors of one site config, parsed once per attachment.
pub struct SiteSelectors {
    pub config: &'static SiteConfig,
    pub message: Selector,
    pub container: Option<Selector>,
    pub load_detection: Option<Selector>,
    fields: Vec<CompiledField>,
}

impl SiteSelectors {
    pub fn compile(config: &'static SiteConfig) -> Result<Self, SelectorError> {
        let fields = config
            .fields
            .iter()
            .map(|extractor| {
                let selector = match extractor.selector {
                    "" => None,
                    s => Some(parse_selector(s)?),
                };
                Ok(CompiledField {
                    extractor,
                    selector,
                })
            })
            .collect::<Result<Vec<_>, SelectorError>>()?;

        Ok(Self {
            config,
            message: parse_selector(config.message_selector)?,
            container: config.container_selector.map(parse_selector).transpose()?,
            load_detection: config.load_detection_selector.map(parse_selector).transpose()?,
            fields,
        })
    }

    /// Field values of one message element, in declaration order.
    pub fn extract_fields(&self, element: ElementRef<'_>) -> ExtractedFields {
        self.fields
            .iter()
            .map(|field| {
                let raw = field
                    .selector
                    .as_ref()
                    .and_then(|selector| find_self_or_descendant(element, selector))
                    .and_then(|target| read_value(target, field.extractor.attribute));
                let value = raw
                    .or_else(|| field.extractor.default_value.map(str::to_string))
                    .unwrap_or_default();
                (field.extractor.name, normalize_whitespace(&value))
            })
            .collect()
    }
}

/// `element` itself when it matches, otherwise its first matching descendant.
pub fn find_self_or_descendant<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    if selector.matches(&element) {
        return Some(element);
    }
    element.select(selector).next()
}

/// `element` when it matches, followed by every matching descendant in document order.
pub fn matching_inclusive<'a>(element: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    let mut found = Vec::new();
    if selector.matches(&element) {
        found.push(element);
    }
    found.extend(element.select(selector));
    found
}

fn read_value(target: ElementRef<'_>, attribute: Option<&str>) -> Option<String> {
    match attribute {
        Some(name) => target.value().attr(name).map(str::to_string),
        None => {
            let text: String = target.text().collect();
            (!text.is_empty()).then(|| text.trim().to_string())
        }
    }
}
