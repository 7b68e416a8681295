//! Catalog search.
//!
//! Independent of the interaction graph: only the records are consulted.
//! Every criterion set on a `SearchFilter` must hold (AND); unset criteria
//! are ignored.

use super::catalog::CatalogIndex;
use super::trigger::{contains_phrase, normalize, phrase_key};
use crate::DrugRecord;
use serde::Serialize;

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Case-insensitive name, then id.
    #[default]
    Name,
    /// Catalog order.
    InsertionOrder,
    /// Drug class, then name.
    DrugClass,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Substring over name, uses, and mechanism.
    pub text: Option<String>,
    pub drug_class: Option<String>,
    pub category: Option<String>,
    pub is_dangerous: Option<bool>,
    /// Whole-word phrase within the administration route ("oral",
    /// "subcutaneous").
    pub route: Option<String>,
    /// Explicit ordering. Defaults to `Name`, or `InsertionOrder` when no
    /// criteria are set.
    pub sort: Option<SortKey>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn drug_class(mut self, class: impl Into<String>) -> Self {
        self.drug_class = Some(class.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn dangerous(mut self, is_dangerous: bool) -> Self {
        self.is_dangerous = Some(is_dangerous);
        self
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort = Some(key);
        self
    }

    /// No criteria set (sort key aside).
    pub fn has_no_criteria(&self) -> bool {
        self.text.is_none()
            && self.drug_class.is_none()
            && self.category.is_none()
            && self.is_dangerous.is_none()
            && self.route.is_none()
    }

    fn effective_sort(&self) -> SortKey {
        match self.sort {
            Some(key) => key,
            None if self.has_no_criteria() => SortKey::InsertionOrder,
            None => SortKey::Name,
        }
    }
}

/// Records matching every set criterion of `filter`.
pub fn search<'a>(catalog: &'a CatalogIndex, filter: &SearchFilter) -> Vec<&'a DrugRecord> {
    let text = filter.text.as_deref().map(phrase_key);
    let class = filter.drug_class.as_deref().map(normalize);
    let category = filter.category.as_deref().map(normalize);
    let route = filter.route.as_deref().map(phrase_key);

    let mut hits: Vec<&DrugRecord> = catalog
        .records()
        .iter()
        .filter(|r| text.as_deref().is_none_or(|t| matches_text(r, t)))
        .filter(|r| class.as_deref().is_none_or(|c| normalize(&r.drug_class) == c))
        .filter(|r| category.as_deref().is_none_or(|c| normalize(&r.category) == c))
        .filter(|r| filter.is_dangerous.is_none_or(|d| r.is_dangerous == d))
        .filter(|r| route.as_deref().is_none_or(|p| contains_phrase(&phrase_key(&r.administration.route), p)))
        .collect();

    match filter.effective_sort() {
        SortKey::InsertionOrder => {}
        SortKey::Name => hits.sort_by_cached_key(|r| (r.name.to_lowercase(), r.id.clone())),
        SortKey::DrugClass => {
            hits.sort_by_cached_key(|r| (normalize(&r.drug_class), r.name.to_lowercase(), r.id.clone()))
        }
    }
    hits
}

fn matches_text(record: &DrugRecord, needle: &str) -> bool {
    std::iter::once(&record.name)
        .chain(record.uses.iter())
        .chain(std::iter::once(&record.mechanism))
        .any(|field| phrase_key(field).contains(needle))
}
