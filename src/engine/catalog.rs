//! Catalog validation and indexing.
//!
//! This module holds the *static* side of the engine: the lookup structures
//! derived once from the full record list.
//!
//! Loading is split into two steps:
//!
//! 1. **Validate**: walk every record and collect every broken invariant
//!    (duplicate id, empty name, duplicate brand, unknown severity, partner
//!    text with nothing but punctuation). Nothing is indexed unless the whole
//!    catalog is clean.
//! 2. **Index**: build alias, class, and category lookups plus the mention
//!    table that later stages key their side tables by.
//!
//! ## Invariants
//!
//! - Positions stored in every lookup are indexes into `CatalogIndex::records`
//!   and are kept in insertion order.
//! - Alias, class, and category keys are built with `trigger::normalize`, the
//!   same function the resolver applies to partner text.
//! - `mentions` holds one entry per interaction mention, in record order, then
//!   mention order.

use super::trigger::{normalize, substance_slug};
use crate::error::{NotFound, RecordField, ValidationError, Violation, ViolationKind};
use crate::{DrugRecord, Severity};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Stable identifier of one interaction mention: the authoring drug plus the
/// mention's position in that drug's `interactions` list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MentionId {
    pub drug_id: String,
    pub ordinal: usize,
}

/// An interaction mention with its severity parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedMention {
    pub id: MentionId,
    pub partner_text: String,
    pub severity: Severity,
    pub effect: String,
}

/// Derived per-class view. Always recomputed from the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    /// Category of the first record carrying this class.
    pub category: String,
    pub count: usize,
}

/// Validated, immutable lookup structures over the catalog.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    records: Vec<DrugRecord>,
    by_id: HashMap<String, usize>,
    by_alias: HashMap<String, Vec<usize>>,
    by_class: HashMap<String, Vec<usize>>,
    by_category: HashMap<String, Vec<usize>>,
    mentions: Vec<IndexedMention>,
    /// Offset of each record's first mention in `mentions`.
    mention_start: Vec<usize>,
}

impl CatalogIndex {
    /// Validate `records` and build the index.
    ///
    /// Fails with every violation found, in record order.
    pub fn load(records: Vec<DrugRecord>) -> Result<Self, ValidationError> {
        let violations = validate(&records);
        if !violations.is_empty() {
            debug!(violations = violations.len(), "catalog failed validation");
            return Err(ValidationError { violations });
        }

        let mut by_id = HashMap::with_capacity(records.len());
        let mut by_alias: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_class: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_category: HashMap<String, Vec<usize>> = HashMap::new();
        let mut mentions = Vec::new();
        let mut mention_start = Vec::with_capacity(records.len());

        for (pos, record) in records.iter().enumerate() {
            by_id.insert(record.id.clone(), pos);
            mention_start.push(mentions.len());

            let aliases = std::iter::once(&record.name)
                .chain(std::iter::once(&record.generic_name))
                .chain(record.brand_names.iter());
            for alias in aliases {
                let slot = by_alias.entry(normalize(alias)).or_default();
                // name and generic name are often identical
                if slot.last() != Some(&pos) {
                    slot.push(pos);
                }
            }

            by_class.entry(normalize(&record.drug_class)).or_default().push(pos);
            by_category.entry(normalize(&record.category)).or_default().push(pos);

            for (ordinal, mention) in record.interactions.iter().enumerate() {
                // validated above
                let Ok(severity) = mention.severity.parse::<Severity>() else {
                    continue;
                };
                mentions.push(IndexedMention {
                    id: MentionId { drug_id: record.id.clone(), ordinal },
                    partner_text: mention.partner_text.clone(),
                    severity,
                    effect: mention.effect.trim().to_string(),
                });
            }
        }

        debug!(
            records = records.len(),
            aliases = by_alias.len(),
            classes = by_class.len(),
            mentions = mentions.len(),
            "catalog indexed"
        );

        Ok(CatalogIndex { records, by_id, by_alias, by_class, by_category, mentions, mention_start })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[DrugRecord] {
        &self.records
    }

    pub fn by_id(&self, id: &str) -> Result<&DrugRecord, NotFound> {
        self.position(id).map(|pos| &self.records[pos]).ok_or_else(|| NotFound { id: id.to_string() })
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn record_at(&self, pos: usize) -> &DrugRecord {
        &self.records[pos]
    }

    /// Records whose name, generic name, or any brand name matches `text`
    /// after normalization. Insertion order, no duplicates; empty when
    /// nothing matches.
    pub fn by_name_or_brand(&self, text: &str) -> Vec<&DrugRecord> {
        self.alias_positions(&normalize(text)).iter().map(|&pos| &self.records[pos]).collect()
    }

    /// Positions registered under an already-normalized alias key.
    pub(crate) fn alias_positions(&self, key: &str) -> &[usize] {
        self.by_alias.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_class(&self, class_name: &str) -> Vec<&DrugRecord> {
        self.class_positions(&normalize(class_name)).iter().map(|&pos| &self.records[pos]).collect()
    }

    /// Positions registered under an already-normalized class key.
    pub(crate) fn class_positions(&self, key: &str) -> &[usize] {
        self.by_class.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_category(&self, category: &str) -> Vec<&DrugRecord> {
        self.by_category
            .get(&normalize(category))
            .map(|positions| positions.iter().map(|&pos| &self.records[pos]).collect())
            .unwrap_or_default()
    }

    /// Class name → {category, count}, computed from the records on every
    /// call. The class is displayed with the spelling of its first record.
    pub fn class_summary(&self) -> BTreeMap<String, ClassSummary> {
        let mut summary = BTreeMap::new();
        for positions in self.by_class.values() {
            let Some(&first) = positions.first() else {
                continue;
            };
            let record = &self.records[first];
            summary.insert(
                record.drug_class.trim().to_string(),
                ClassSummary { category: record.category.trim().to_string(), count: positions.len() },
            );
        }
        summary
    }

    /// Every interaction mention, record order then mention order.
    pub fn mentions(&self) -> &[IndexedMention] {
        &self.mentions
    }

    pub fn mention(&self, id: &MentionId) -> Option<&IndexedMention> {
        let pos = self.position(&id.drug_id)?;
        self.mentions.get(self.mention_start[pos] + id.ordinal).filter(|m| m.id == *id)
    }
}

fn validate(records: &[DrugRecord]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (record_index, record) in records.iter().enumerate() {
        let mut push = |field: RecordField, kind: ViolationKind| {
            violations.push(Violation { record_index, id: record.id.clone(), field, kind });
        };

        if record.id.trim().is_empty() {
            push(RecordField::Id, ViolationKind::EmptyValue);
        } else if let Some(&first_index) = first_seen.get(record.id.as_str()) {
            push(RecordField::Id, ViolationKind::DuplicateId { first_index });
        } else {
            first_seen.insert(record.id.as_str(), record_index);
        }

        if record.name.trim().is_empty() {
            push(RecordField::Name, ViolationKind::EmptyValue);
        }
        if record.generic_name.trim().is_empty() {
            push(RecordField::GenericName, ViolationKind::EmptyValue);
        }

        let mut brands = HashSet::new();
        for brand in &record.brand_names {
            if !brands.insert(normalize(brand)) {
                push(RecordField::BrandNames, ViolationKind::DuplicateBrand { brand: brand.clone() });
            }
        }

        for (ordinal, mention) in record.interactions.iter().enumerate() {
            // no letter or digit left to look up or name a substance by
            if substance_slug(&normalize(&mention.partner_text)).is_empty() {
                push(RecordField::InteractionPartner { ordinal }, ViolationKind::EmptyValue);
            }
            if mention.severity.parse::<Severity>().is_err() {
                push(
                    RecordField::InteractionSeverity { ordinal },
                    ViolationKind::InvalidSeverity { value: mention.severity.clone() },
                );
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{mention, record, sample_records};

    #[test]
    fn loads_sample_catalog() {
        let catalog = CatalogIndex::load(sample_records()).unwrap();
        assert!(!catalog.is_empty());
        assert_eq!(catalog.by_id("warfarin").unwrap().name, "Warfarin");
        assert_eq!(catalog.by_id("nope"), Err(NotFound { id: "nope".to_string() }));
    }

    #[test]
    fn lists_every_violation() {
        let mut bad_severity = record("b", "Beta", "Demo");
        bad_severity.interactions.push(mention("Alcohol", "major", "x"));
        bad_severity.interactions.push(mention("  ", "mild", "x"));
        bad_severity.interactions.push(mention("()", "severe", "one"));
        bad_severity.interactions.push(mention("--", "mild", "two"));
        let mut empty_names = record("c", "", "Demo");
        empty_names.generic_name = " ".to_string();
        empty_names.brand_names = vec!["Cee".to_string(), "CEE ".to_string()];

        let records = vec![record("a", "Alpha", "Demo"), bad_severity, empty_names, record("a", "Alpha 2", "Demo")];
        let err = CatalogIndex::load(records).unwrap_err();

        let got: Vec<(usize, RecordField, ViolationKind)> =
            err.violations.iter().map(|v| (v.record_index, v.field, v.kind.clone())).collect();
        assert_eq!(
            got,
            vec![
                (
                    1,
                    RecordField::InteractionSeverity { ordinal: 0 },
                    ViolationKind::InvalidSeverity { value: "major".to_string() }
                ),
                (1, RecordField::InteractionPartner { ordinal: 1 }, ViolationKind::EmptyValue),
                (1, RecordField::InteractionPartner { ordinal: 2 }, ViolationKind::EmptyValue),
                (1, RecordField::InteractionPartner { ordinal: 3 }, ViolationKind::EmptyValue),
                (2, RecordField::Name, ViolationKind::EmptyValue),
                (2, RecordField::GenericName, ViolationKind::EmptyValue),
                (2, RecordField::BrandNames, ViolationKind::DuplicateBrand { brand: "CEE ".to_string() }),
                (3, RecordField::Id, ViolationKind::DuplicateId { first_index: 0 }),
            ]
        );
        assert_eq!(err.duplicate_ids(), vec!["a"]);
    }

    #[test]
    fn name_and_brand_lookup_is_normalized() {
        let catalog = CatalogIndex::load(sample_records()).unwrap();

        let ids = |text: &str| catalog.by_name_or_brand(text).iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids("warfarin"), vec!["warfarin"]);
        assert_eq!(ids("  COUMADIN "), vec!["warfarin"]);
        assert_eq!(ids("jantoven"), vec!["warfarin"]);
        assert_eq!(ids("Zoloft"), vec!["sertraline"]);
        assert!(ids("grapefruit juice").is_empty());
    }

    #[test]
    fn class_and_category_keep_insertion_order() {
        let catalog = CatalogIndex::load(sample_records()).unwrap();

        let statins: Vec<&str> = catalog.by_class("statin").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(statins, vec!["atorvastatin", "simvastatin"]);

        let positions: Vec<usize> =
            catalog.by_category("cardiovascular").iter().map(|r| catalog.position(&r.id).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(catalog.by_class("no such class").is_empty());
    }

    #[test]
    fn class_summary_counts_records() {
        let catalog = CatalogIndex::load(sample_records()).unwrap();
        let summary = catalog.class_summary();

        assert_eq!(summary["Statin"], ClassSummary { category: "Cardiovascular".to_string(), count: 2 });
        assert_eq!(summary["NSAID"].count, 2);
        assert_eq!(summary.values().map(|s| s.count).sum::<usize>(), catalog.len());
    }

    #[test]
    fn mention_table_is_addressable() {
        let catalog = CatalogIndex::load(sample_records()).unwrap();
        let warfarin_count = catalog.by_id("warfarin").unwrap().interactions.len();

        assert_eq!(catalog.mentions().iter().filter(|m| m.id.drug_id == "warfarin").count(), warfarin_count);
        for m in catalog.mentions() {
            assert_eq!(catalog.mention(&m.id), Some(m));
        }
        assert_eq!(catalog.mention(&MentionId { drug_id: "warfarin".to_string(), ordinal: 999 }), None);
    }
}
