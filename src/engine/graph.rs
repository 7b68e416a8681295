//! Interaction graph reconciliation.
//!
//! The catalog records interactions per drug, so the same pair may be
//! described once, twice with different wording, or with conflicting
//! severities. This module folds every resolved mention into one undirected
//! edge per pair.
//!
//! ## Merge policy
//!
//! - `severity`: the maximum observed (`Severe > Moderate > Mild`).
//! - `effects`: the set of distinct, non-empty effect texts.
//! - `sources`: every contributing mention, sorted by `MentionId`.
//!
//! All three are order-independent, so the graph does not depend on the order
//! mentions are fed in. Missing reciprocity is kept visible through
//! `InteractionGraph::unreciprocated` and never filled in.
//!
//! A mention that resolves back to its own author (a statin mentioning
//! "Statins") produces no edge and is counted in `self_references`.

use super::catalog::{CatalogIndex, IndexedMention, MentionId};
use super::dedup::EdgeKey;
use super::resolve::{ResolutionTable, ResolvedEntity};
use crate::Severity;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One mention's contribution to an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMention {
    pub mention: MentionId,
    pub severity: Severity,
    pub effect: String,
}

impl SourceMention {
    /// Id of the drug whose record carries the mention.
    pub fn author(&self) -> &str {
        &self.mention.drug_id
    }
}

impl From<&IndexedMention> for SourceMention {
    fn from(mention: &IndexedMention) -> Self {
        SourceMention { mention: mention.id.clone(), severity: mention.severity, effect: mention.effect.clone() }
    }
}

/// Reconciled, undirected interaction between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEdge {
    pub key: EdgeKey,
    pub severity: Severity,
    pub effects: BTreeSet<String>,
    pub sources: Vec<SourceMention>,
}

impl InteractionEdge {
    fn new(key: EdgeKey, source: SourceMention) -> Self {
        let mut edge = InteractionEdge { key, severity: source.severity, effects: BTreeSet::new(), sources: Vec::new() };
        edge.absorb(source);
        edge
    }

    fn absorb(&mut self, source: SourceMention) {
        self.severity = self.severity.max(source.severity);
        if !source.effect.is_empty() {
            self.effects.insert(source.effect.clone());
        }
        self.sources.push(source);
    }

    /// Drug ids that authored at least one contributing mention.
    pub fn authors(&self) -> BTreeSet<&str> {
        self.sources.iter().map(SourceMention::author).collect()
    }

    /// Both endpoints are drugs and each authored a mention of the other.
    pub fn is_reciprocated(&self) -> bool {
        let (low, high) = self.key.endpoints();
        let (Some(a), Some(b)) = (low.drug_id(), high.drug_id()) else {
            return false;
        };
        let authors = self.authors();
        authors.contains(a) && authors.contains(b)
    }
}

/// A partner as seen from one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Neighbor<'a> {
    pub partner: &'a ResolvedEntity,
    pub severity: Severity,
    pub effects: &'a BTreeSet<String>,
}

/// Accumulates directed contributions into undirected edges.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    edges: BTreeMap<EdgeKey, InteractionEdge>,
    self_references: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the edge `source.author() -- partner`.
    ///
    /// Returns false when the partner is the author itself; nothing is added.
    pub fn add(&mut self, partner: ResolvedEntity, source: SourceMention) -> bool {
        let key = EdgeKey::new(ResolvedEntity::drug(source.author()), partner);
        if key.is_loop() {
            self.self_references += 1;
            return false;
        }

        match self.edges.entry(key) {
            Entry::Occupied(slot) => slot.into_mut().absorb(source),
            Entry::Vacant(slot) => {
                let key = slot.key().clone();
                slot.insert(InteractionEdge::new(key, source));
            }
        }
        true
    }

    pub fn finish(self) -> InteractionGraph {
        let mut edges = self.edges;
        let mut adjacency: BTreeMap<ResolvedEntity, Vec<EdgeKey>> = BTreeMap::new();

        for (key, edge) in edges.iter_mut() {
            edge.sources.sort_by(|a, b| a.mention.cmp(&b.mention));
            let (low, high) = key.endpoints();
            adjacency.entry(low.clone()).or_default().push(key.clone());
            adjacency.entry(high.clone()).or_default().push(key.clone());
        }

        InteractionGraph { edges, adjacency, self_references: self.self_references }
    }
}

/// Undirected, severity-labelled relation between resolved entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionGraph {
    edges: BTreeMap<EdgeKey, InteractionEdge>,
    adjacency: BTreeMap<ResolvedEntity, Vec<EdgeKey>>,
    self_references: usize,
}

impl InteractionGraph {
    /// Fold every resolved mention of `catalog` into a graph.
    pub fn build(catalog: &CatalogIndex, resolutions: &ResolutionTable) -> Self {
        let mut builder = GraphBuilder::new();
        for mention in catalog.mentions() {
            let Some(resolution) = resolutions.get(&mention.id) else {
                continue;
            };
            for partner in &resolution.entities {
                builder.add(partner.clone(), SourceMention::from(mention));
            }
        }

        let graph = builder.finish();
        debug!(edges = graph.len(), self_references = graph.self_references, "interaction graph built");
        graph
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Every edge in key order.
    pub fn edges(&self) -> impl Iterator<Item = &InteractionEdge> {
        self.edges.values()
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&InteractionEdge> {
        self.edges.get(key)
    }

    pub fn edge_between_drugs(&self, a: &str, b: &str) -> Option<&InteractionEdge> {
        self.edges.get(&EdgeKey::drugs(a, b))
    }

    /// Partners of `entity`, most severe first, then by partner.
    pub fn neighbors(&self, entity: &ResolvedEntity) -> Vec<Neighbor<'_>> {
        let Some(keys) = self.adjacency.get(entity) else {
            return Vec::new();
        };

        let mut out: Vec<Neighbor<'_>> = keys
            .iter()
            .filter_map(|key| {
                let edge = self.edges.get(key)?;
                let partner = key.other(entity)?;
                Some(Neighbor { partner, severity: edge.severity, effects: &edge.effects })
            })
            .collect();
        out.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.partner.cmp(b.partner)));
        out
    }

    /// Drug–drug edges only one side describes, in key order.
    pub fn unreciprocated(&self) -> impl Iterator<Item = &InteractionEdge> {
        self.edges.values().filter(|edge| edge.key.is_drug_pair() && !edge.is_reciprocated())
    }

    /// Mentions skipped because they resolved to their own author.
    pub fn self_references(&self) -> usize {
        self.self_references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Options;
    use crate::engine::resolve::NameResolver;
    use crate::fixtures::{mention, record_with, sample_records};
    use crate::DrugRecord;

    fn graph_of(records: Vec<DrugRecord>) -> InteractionGraph {
        let catalog = CatalogIndex::load(records).unwrap();
        let options = Options::default();
        let resolutions = NameResolver::new(&catalog, &options).resolve_all();
        InteractionGraph::build(&catalog, &resolutions)
    }

    #[test]
    fn warfarin_aspirin_edge_is_merged() {
        let graph = graph_of(sample_records());
        let edge = graph.edge_between_drugs("warfarin", "aspirin").unwrap();

        assert_eq!(edge.severity, Severity::Severe);
        assert_eq!(
            edge.effects.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Greatly increased bleeding risk", "Increased bleeding risk", "Increased risk of GI bleeding"]
        );
        assert_eq!(edge.sources.len(), 3);
        assert!(edge.is_reciprocated());
        assert_eq!(graph.edge_between_drugs("aspirin", "warfarin"), Some(edge));
    }

    #[test]
    fn max_severity_regardless_of_side() {
        let one_sided = graph_of(vec![
            record_with("a", "Alpha", "X", vec![mention("Beta", "severe", "bad")]),
            record_with("b", "Beta", "Y", vec![]),
        ]);
        let both_sides = graph_of(vec![
            record_with("a", "Alpha", "X", vec![mention("Beta", "severe", "bad")]),
            record_with("b", "Beta", "Y", vec![mention("Alpha", "moderate", "worse")]),
        ]);
        let reversed = graph_of(vec![
            record_with("b", "Beta", "Y", vec![mention("Alpha", "moderate", "worse")]),
            record_with("a", "Alpha", "X", vec![mention("Beta", "severe", "bad")]),
        ]);

        assert_eq!(one_sided.edge_between_drugs("a", "b").unwrap().severity, Severity::Severe);
        assert_eq!(both_sides.edge_between_drugs("a", "b").unwrap().severity, Severity::Severe);
        assert_eq!(both_sides.edge_between_drugs("a", "b"), reversed.edge_between_drugs("b", "a"));
        assert!(!one_sided.edge_between_drugs("a", "b").unwrap().is_reciprocated());
    }

    #[test]
    fn lists_unreciprocated_drug_pairs() {
        let graph = graph_of(sample_records());
        let pairs: Vec<(String, String)> = graph
            .unreciprocated()
            .map(|edge| {
                let (a, b) = edge.key.endpoints();
                (a.label().to_string(), b.label().to_string())
            })
            .collect();

        let expected = [
            ("aspirin", "clopidogrel"),
            ("aspirin", "lisinopril"),
            ("clarithromycin", "warfarin"),
            ("clopidogrel", "warfarin"),
            ("ibuprofen", "warfarin"),
            ("insulin-glargine", "metformin"),
            ("levothyroxine", "omeprazole"),
            ("sertraline", "warfarin"),
        ];
        let expected: Vec<(String, String)> = expected.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn neighbors_sorted_by_severity_then_partner() {
        let graph = graph_of(sample_records());
        let warfarin = ResolvedEntity::drug("warfarin");
        let labels: Vec<String> = graph.neighbors(&warfarin).iter().map(|n| n.partner.to_string()).collect();

        assert_eq!(
            labels,
            vec![
                "drug:aspirin",
                "drug:clopidogrel",
                "drug:ibuprofen",
                "substance:amiodarone",
                "drug:clarithromycin",
                "drug:sertraline",
                "substance:alcohol",
                "substance:vitamin-k-foods",
            ]
        );
        assert!(graph.neighbors(&ResolvedEntity::drug("nobody")).is_empty());
    }

    #[test]
    fn substances_keep_their_edges() {
        let graph = graph_of(sample_records());
        let alcohol = ResolvedEntity::substance("Alcohol");
        let partners: Vec<&str> = graph.neighbors(&alcohol).iter().map(|n| n.partner.label()).collect();

        assert_eq!(partners.first(), Some(&"tramadol"));
        assert!(partners.contains(&"warfarin"));
        assert!(partners.contains(&"sertraline"));
    }

    #[test]
    fn class_mention_skips_its_author() {
        let graph = graph_of(vec![
            record_with("s1", "Statone", "Statin", vec![mention("Statins", "moderate", "additive myopathy")]),
            record_with("s2", "Stattwo", "Statin", vec![]),
        ]);

        assert_eq!(graph.self_references(), 1);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.edge_between_drugs("s1", "s2").unwrap().severity, Severity::Moderate);
    }

    #[test]
    fn empty_effect_text_is_not_collected() {
        let graph = graph_of(vec![
            record_with("a", "Alpha", "X", vec![mention("Beta", "mild", "  ")]),
            record_with("b", "Beta", "Y", vec![]),
        ]);
        let edge = graph.edge_between_drugs("a", "b").unwrap();
        assert!(edge.effects.is_empty());
        assert_eq!(edge.sources.len(), 1);
    }
}
