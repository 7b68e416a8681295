//! Indexing, resolution, and interaction engine.
//!
//! This module is the facade over the pieces under `src/engine/`. Public paths
//! such as `crate::engine::CatalogIndex` stay stable while the implementation
//! is split into focused submodules.
//!
//! ## How the parts work together
//!
//! Building a snapshot is a pipeline; every stage reads the output of the
//! previous one and nothing is mutated after it is built:
//!
//! ```text
//! Vec<DrugRecord>
//!       │  CatalogIndex::load                 (catalog.rs)
//!       │    - validate every record, collect all violations
//!       │    - alias / class / category lookups
//!       │    - mention table with parsed severities
//!       v
//! CatalogIndex ──────────────────────────────┐
//!       │  NameResolver::resolve_all          │ (resolve.rs, trigger.rs)
//!       │    - normalize partner text         │
//!       │    - exact alias → class → split    │
//!       │      → substance token              │
//!       v                                     │
//! ResolutionTable                             │
//!       │  InteractionGraph::build            │ (graph.rs, dedup.rs)
//!       │    - undirected EdgeKey per pair    │
//!       │    - max severity, union effects    │
//!       v                                     v
//! InteractionGraph ──▶ RegimenChecker     query::search
//!                      (regimen.rs)       (query.rs)
//! ```
//!
//! `snapshot.rs` wraps the three built structures in an immutable `Snapshot`
//! and owns the publish/reload logic; `metrics.rs` records per-phase timings.
//!
//! ## Determinism
//!
//! Every ordered output (neighbors, findings, search results, class summaries)
//! is sorted on explicit keys. Hash maps are used only for lookups, never for
//! iteration order.

#[path = "engine/catalog.rs"]
mod catalog;
#[path = "engine/dedup.rs"]
mod dedup;
#[path = "engine/graph.rs"]
mod graph;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/query.rs"]
mod query;
#[path = "engine/regimen.rs"]
mod regimen;
#[path = "engine/resolve.rs"]
mod resolve;
#[path = "engine/snapshot.rs"]
mod snapshot;
#[path = "engine/trigger.rs"]
mod trigger;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use catalog::{CatalogIndex, ClassSummary, IndexedMention, MentionId};
pub use dedup::EdgeKey;
pub use graph::{GraphBuilder, InteractionEdge, InteractionGraph, Neighbor, SourceMention};
pub use metrics::BuildMetrics;
pub use query::{SearchFilter, SortKey, search as search_catalog};
pub use regimen::{
    ContraindicationFinding, DrugRef, InteractionFinding, PairWithoutRecord, RegimenChecker, RegimenReport,
    SubstanceAdvisory,
};
pub use resolve::{
    AmbiguousResolution, NameResolver, Resolution, ResolutionKind, ResolutionTable, ResolvedEntity, SubstanceToken,
};
pub use snapshot::{BuildPhase, CancellationToken, Cancellable, KnowledgeBase, RecordSource, Snapshot};
pub use trigger::{MentionShape, contains_phrase, normalize, phrase_key};
