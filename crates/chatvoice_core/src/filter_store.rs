use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{FilterId, FilterRule, FilterTarget, TextFilter};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterStoreError {
    #[error("no filter with id {0}")]
    NotFound(FilterId),
    #[error("field-targeted filter requires a field name")]
    MissingFieldName,
    #[error("duplicate filter id {0}")]
    DuplicateId(FilterId),
    #[error("invalid filter json: {0}")]
    InvalidJson(String),
}

/// A filter before it has been assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFilter {
    pub enabled: bool,
    pub target: FilterTarget,
    pub field_name: Option<String>,
    pub description: Option<String>,
    pub rule: FilterRule,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterUpdate {
    pub enabled: Option<bool>,
    pub target: Option<FilterTarget>,
    pub field_name: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub rule: Option<FilterRule>,
}

/// Ordered filter list plus the id counter. Position is evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCollection {
    pub filters: Vec<TextFilter>,
    pub next_id: FilterId,
}

impl Default for FilterCollection {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            next_id: 1,
        }
    }
}

impl FilterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: FilterId) -> Option<&TextFilter> {
        self.filters.iter().find(|f| f.id == id)
    }

    /// Appends a filter under the next id and advances the counter. A stored
    /// counter that lags behind the existing ids is moved past them first.
    pub fn add(&mut self, draft: NewFilter) -> Result<TextFilter, FilterStoreError> {
        check_field_name(draft.target, draft.field_name.as_deref())?;
        let max_id = self.filters.iter().map(|f| f.id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        let filter = TextFilter {
            id: self.next_id,
            enabled: draft.enabled,
            target: draft.target,
            field_name: draft.field_name,
            description: draft.description,
            rule: draft.rule,
        };
        self.next_id += 1;
        self.filters.push(filter.clone());
        Ok(filter)
    }

    pub fn update(&mut self, id: FilterId, update: FilterUpdate) -> Result<(), FilterStoreError> {
        let filter = self
            .filters
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(FilterStoreError::NotFound(id))?;

        let target = update.target.unwrap_or(filter.target);
        let field_name = match &update.field_name {
            Some(name) => name.as_deref(),
            None => filter.field_name.as_deref(),
        };
        check_field_name(target, field_name)?;

        if let Some(enabled) = update.enabled {
            filter.enabled = enabled;
        }
        filter.target = target;
        if let Some(field_name) = update.field_name {
            filter.field_name = field_name;
        }
        if let Some(description) = update.description {
            filter.description = description;
        }
        if let Some(rule) = update.rule {
            filter.rule = rule;
        }
        Ok(())
    }

    /// Removes by id. Ids are never reused.
    pub fn remove(&mut self, id: FilterId) -> Result<TextFilter, FilterStoreError> {
        let index = self
            .filters
            .iter()
            .position(|f| f.id == id)
            .ok_or(FilterStoreError::NotFound(id))?;
        Ok(self.filters.remove(index))
    }

    /// Moves `source_id` to the position currently held by `target_id`.
    pub fn reorder(&mut self, source_id: FilterId, target_id: FilterId) -> Result<(), FilterStoreError> {
        let source = self
            .filters
            .iter()
            .position(|f| f.id == source_id)
            .ok_or(FilterStoreError::NotFound(source_id))?;
        let target = self
            .filters
            .iter()
            .position(|f| f.id == target_id)
            .ok_or(FilterStoreError::NotFound(target_id))?;
        let moved = self.filters.remove(source);
        self.filters.insert(target, moved);
        Ok(())
    }

    /// Enabled filters scoped to `field_name`.
    pub fn field_filters(&self, field_name: &str) -> Vec<TextFilter> {
        self.filters
            .iter()
            .filter(|f| {
                f.enabled
                    && f.target == FilterTarget::Field
                    && f.field_name.as_deref() == Some(field_name)
            })
            .cloned()
            .collect()
    }

    /// Enabled filters applied to the formatted sentence.
    pub fn output_filters(&self) -> Vec<TextFilter> {
        self.filters
            .iter()
            .filter(|f| f.enabled && f.target == FilterTarget::Output)
            .cloned()
            .collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.filters).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parses an exported filter array and rebuilds the collection,
    /// recomputing the id counter from the largest id.
    pub fn from_json(json: &str) -> Result<Self, FilterStoreError> {
        let filters: Vec<TextFilter> = serde_json::from_str(json)
            .map_err(|err| FilterStoreError::InvalidJson(err.to_string()))?;
        Self::from_filters(filters)
    }

    pub fn from_filters(filters: Vec<TextFilter>) -> Result<Self, FilterStoreError> {
        let mut seen = HashSet::new();
        for filter in &filters {
            if !seen.insert(filter.id) {
                return Err(FilterStoreError::DuplicateId(filter.id));
            }
            check_field_name(filter.target, filter.field_name.as_deref())?;
        }
        let next_id = filters.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        Ok(Self { filters, next_id })
    }
}

fn check_field_name(target: FilterTarget, field_name: Option<&str>) -> Result<(), FilterStoreError> {
    match (target, field_name) {
        (FilterTarget::Field, None) | (FilterTarget::Field, Some("")) => {
            Err(FilterStoreError::MissingFieldName)
        }
        _ => Ok(()),
    }
}
