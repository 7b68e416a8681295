//! Name resolution.
//!
//! Every interaction mention names its partner in free text. Resolution turns
//! that text into zero or more `ResolvedEntity` values: catalog drugs, or
//! opaque `SubstanceToken`s for everything the catalog does not hold
//! ("Alcohol", "Grapefruit juice", "CYP3A4 inhibitors").
//!
//! ## Strategy
//!
//! ```text
//! partner text
//!     │ normalize + MentionShape::scan          (trigger.rs)
//!     v
//! exact alias ──one──▶ Exact
//!     │        └many─▶ class name? ──yes──▶ Class
//!     │                            └─no───▶ Ambiguous (all candidates)
//!     │ none
//!     v
//! class name (or its singular) ──▶ Class (every member)
//!     │ none
//!     v
//! compound shape? ──▶ split on / , & "and" ──▶ resolve each part ──▶ Compound
//!     │ no
//!     v
//! SubstanceToken ──▶ Substance
//! ```
//!
//! Nothing is guessed: an ambiguous alias yields every candidate plus an
//! `AmbiguousResolution` record for the caller. An unmatched text is never an
//! error; it becomes a substance token.
//!
//! Resolution never touches the catalog. `NameResolver::resolve_all` produces
//! a side table keyed by `MentionId`, memoized per distinct partner text.

use super::catalog::{CatalogIndex, MentionId};
use super::trigger::{MentionShape, normalize, singular, split_compound, substance_slug};
use crate::api::Options;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// Normalized label for a partner that is not a catalog drug.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubstanceToken(String);

impl SubstanceToken {
    /// Build a token from raw text: "Grapefruit Juice" → `grapefruit-juice`.
    pub fn from_text(text: &str) -> Self {
        SubstanceToken(substance_slug(&normalize(text)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubstanceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A canonical interaction partner.
///
/// Ordering puts drugs before substances, then compares ids/tokens; graph
/// keys and neighbor lists rely on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResolvedEntity {
    /// A `DrugRecord::id`.
    Drug(String),
    Substance(SubstanceToken),
}

impl ResolvedEntity {
    pub fn drug(id: impl Into<String>) -> Self {
        ResolvedEntity::Drug(id.into())
    }

    pub fn substance(text: &str) -> Self {
        ResolvedEntity::Substance(SubstanceToken::from_text(text))
    }

    pub fn drug_id(&self) -> Option<&str> {
        match self {
            ResolvedEntity::Drug(id) => Some(id),
            ResolvedEntity::Substance(_) => None,
        }
    }

    pub fn as_substance(&self) -> Option<&SubstanceToken> {
        match self {
            ResolvedEntity::Drug(_) => None,
            ResolvedEntity::Substance(token) => Some(token),
        }
    }

    pub fn is_drug(&self) -> bool {
        matches!(self, ResolvedEntity::Drug(_))
    }

    /// Drug id or substance token.
    pub fn label(&self) -> &str {
        match self {
            ResolvedEntity::Drug(id) => id,
            ResolvedEntity::Substance(token) => token.as_str(),
        }
    }
}

impl fmt::Display for ResolvedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedEntity::Drug(id) => write!(f, "drug:{id}"),
            ResolvedEntity::Substance(token) => write!(f, "substance:{token}"),
        }
    }
}

/// How a resolution was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionKind {
    /// Exactly one catalog alias matched.
    Exact,
    /// Several catalog aliases matched; every candidate is returned.
    Ambiguous,
    /// The text names a drug class; every member is returned.
    Class,
    /// The text was split into parts resolved independently.
    Compound,
    /// No catalog match; kept as an opaque token.
    Substance,
}

/// Partner text that matched several catalog drugs.
///
/// Not fatal: the resolution still carries every candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("`{text}` matches {} catalog drugs: {}", candidates.len(), candidates.join(", "))]
pub struct AmbiguousResolution {
    /// Normalized text that was looked up.
    pub text: String,
    /// Candidate drug ids, catalog order.
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Normalized partner text.
    pub key: String,
    pub kind: ResolutionKind,
    pub entities: BTreeSet<ResolvedEntity>,
    /// One record per ambiguous lookup; compound texts may carry several.
    pub ambiguities: Vec<AmbiguousResolution>,
}

impl Resolution {
    fn substance(key: String) -> Self {
        let token = SubstanceToken(substance_slug(&key));
        Resolution {
            key,
            kind: ResolutionKind::Substance,
            entities: BTreeSet::from([ResolvedEntity::Substance(token)]),
            ambiguities: Vec::new(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguities.is_empty()
    }

    pub fn drug_ids(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().filter_map(ResolvedEntity::drug_id)
    }

    pub fn substances(&self) -> impl Iterator<Item = &SubstanceToken> {
        self.entities.iter().filter_map(ResolvedEntity::as_substance)
    }
}

/// Side table `MentionId → Resolution`, built once per catalog load.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTable {
    by_mention: BTreeMap<MentionId, Resolution>,
}

impl ResolutionTable {
    pub fn get(&self, id: &MentionId) -> Option<&Resolution> {
        self.by_mention.get(id)
    }

    /// Entries in `MentionId` order.
    pub fn iter(&self) -> impl Iterator<Item = (&MentionId, &Resolution)> {
        self.by_mention.iter()
    }

    pub fn len(&self) -> usize {
        self.by_mention.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mention.is_empty()
    }

    pub fn ambiguous(&self) -> impl Iterator<Item = (&MentionId, &Resolution)> {
        self.by_mention.iter().filter(|(_, r)| r.is_ambiguous())
    }

    /// Every distinct substance token referenced by any mention.
    pub fn substance_tokens(&self) -> BTreeSet<&SubstanceToken> {
        self.by_mention.values().flat_map(Resolution::substances).collect()
    }
}

/// Resolves partner text against one catalog.
#[derive(Debug, Clone, Copy)]
pub struct NameResolver<'a> {
    catalog: &'a CatalogIndex,
    options: &'a Options,
}

impl<'a> NameResolver<'a> {
    pub fn new(catalog: &'a CatalogIndex, options: &'a Options) -> Self {
        NameResolver { catalog, options }
    }

    /// Resolve one piece of partner text.
    pub fn resolve_text(&self, text: &str) -> Resolution {
        let shape = MentionShape::scan(text);
        let allow_split = self.options.split_compound_mentions && shape.is_compound();
        let resolution = self.resolve_key(normalize(text), allow_split);

        if resolution.is_ambiguous() {
            debug!(text, candidates = resolution.entities.len(), "ambiguous partner text");
        }
        resolution
    }

    /// Resolve every mention in the catalog.
    pub fn resolve_all(&self) -> ResolutionTable {
        let mut memo: HashMap<&str, Resolution> = HashMap::new();
        let mut by_mention = BTreeMap::new();

        for mention in self.catalog.mentions() {
            let resolution =
                memo.entry(mention.partner_text.as_str()).or_insert_with(|| self.resolve_text(&mention.partner_text));
            by_mention.insert(mention.id.clone(), resolution.clone());
        }

        debug!(mentions = by_mention.len(), distinct_texts = memo.len(), "mentions resolved");
        ResolutionTable { by_mention }
    }

    fn resolve_key(&self, key: String, allow_split: bool) -> Resolution {
        if let Some(resolution) = self.resolve_single(&key) {
            return resolution;
        }

        if allow_split {
            let parts = split_compound(&key);
            if parts.len() > 1 {
                let mut entities = BTreeSet::new();
                let mut ambiguities = Vec::new();
                for part in parts {
                    let resolved = self.resolve_key(part, false);
                    entities.extend(resolved.entities);
                    ambiguities.extend(resolved.ambiguities);
                }
                return Resolution { key, kind: ResolutionKind::Compound, entities, ambiguities };
            }
        }

        Resolution::substance(key)
    }

    /// Alias and class lookups for one key, without splitting.
    fn resolve_single(&self, key: &str) -> Option<Resolution> {
        let candidates = self.catalog.alias_positions(key);
        match candidates {
            [] => self.resolve_class(key),
            [pos] => Some(Resolution {
                key: key.to_string(),
                kind: ResolutionKind::Exact,
                entities: BTreeSet::from([self.drug_at(*pos)]),
                ambiguities: Vec::new(),
            }),
            many => self.resolve_class(key).or_else(|| {
                let ids: Vec<String> = many.iter().map(|&pos| self.catalog.record_at(pos).id.clone()).collect();
                Some(Resolution {
                    key: key.to_string(),
                    kind: ResolutionKind::Ambiguous,
                    entities: ids.iter().cloned().map(ResolvedEntity::Drug).collect(),
                    ambiguities: vec![AmbiguousResolution { text: key.to_string(), candidates: ids }],
                })
            }),
        }
    }

    fn resolve_class(&self, key: &str) -> Option<Resolution> {
        if !self.options.expand_drug_classes {
            return None;
        }

        let mut members = self.catalog.class_positions(key);
        if members.is_empty() {
            members = singular(key).map(|s| self.catalog.class_positions(s)).unwrap_or(&[]);
        }
        if members.is_empty() {
            return None;
        }

        Some(Resolution {
            key: key.to_string(),
            kind: ResolutionKind::Class,
            entities: members.iter().map(|&pos| self.drug_at(pos)).collect(),
            ambiguities: Vec::new(),
        })
    }

    fn drug_at(&self, pos: usize) -> ResolvedEntity {
        ResolvedEntity::Drug(self.catalog.record_at(pos).id.clone())
    }
}
