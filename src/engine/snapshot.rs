//! Immutable snapshots and atomic publish.
//!
//! A `Snapshot` bundles everything built from one catalog: the index, the
//! resolution table and the interaction graph. It is never mutated after
//! construction and is shared as `Arc<Snapshot>`.
//!
//! `KnowledgeBase` holds the currently published snapshot. Reloads build a
//! complete new snapshot off to the side and swap the `Arc` in one short
//! write-lock section:
//!
//! ```text
//! reload ── lock writer ── fetch ── index ── resolve ── graph ── swap Arc
//!                            ^        ^         ^         ^
//!                            └────────┴─────────┴─────────┴── cancellation checks
//! readers ── current() ── clone Arc ── query freely ─────────────────────▶
//! ```
//!
//! Readers only hold the read lock long enough to clone the `Arc`, so queries
//! never wait on a build. A failed or cancelled reload leaves the previous
//! snapshot published.

use super::catalog::CatalogIndex;
use super::graph::InteractionGraph;
use super::metrics::BuildMetrics;
use super::query::{SearchFilter, search};
use super::regimen::{RegimenChecker, RegimenReport};
use super::resolve::{NameResolver, Resolution, ResolutionTable};
use crate::api::{Context, Options};
use crate::error::{RegimenError, ReloadError, SourceError, ValidationError};
use crate::DrugRecord;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

// --- Cancellation ------------------------------------------------------------

/// Cooperative cancellation.
pub trait Cancellable {
    fn is_cancelled(&self) -> bool;

    fn cancel(&self);
}

/// Shared flag checked between reload phases. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cancellable for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

// --- Build phases ------------------------------------------------------------

/// Stage of a snapshot build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    /// Reading records from a `RecordSource`.
    Fetch,
    Index,
    Resolve,
    Graph,
    Publish,
}

impl BuildPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildPhase::Fetch => "fetch",
            BuildPhase::Index => "index",
            BuildPhase::Resolve => "resolve",
            BuildPhase::Graph => "graph",
            BuildPhase::Publish => "publish",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Record sources ----------------------------------------------------------

/// External supplier of catalog records (file reader, database, ...).
///
/// Implementations that block should poll `token` and return early when it is
/// cancelled; whatever they return is discarded in that case.
pub trait RecordSource {
    fn fetch(&self, token: &CancellationToken) -> Result<Vec<DrugRecord>, SourceError>;
}

impl<F> RecordSource for F
where
    F: Fn(&CancellationToken) -> Result<Vec<DrugRecord>, SourceError>,
{
    fn fetch(&self, token: &CancellationToken) -> Result<Vec<DrugRecord>, SourceError> {
        self(token)
    }
}

// --- Snapshot ----------------------------------------------------------------

/// Everything built from one catalog. Immutable.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    built_at: NaiveDateTime,
    options: Options,
    catalog: CatalogIndex,
    resolutions: ResolutionTable,
    graph: InteractionGraph,
    metrics: BuildMetrics,
}

impl Snapshot {
    /// Build a snapshot, calling `checkpoint` before each phase.
    ///
    /// A checkpoint error aborts the build and is returned as is.
    pub(crate) fn build<E>(
        records: Vec<DrugRecord>,
        context: &Context,
        options: &Options,
        mut checkpoint: impl FnMut(BuildPhase) -> Result<(), E>,
    ) -> Result<Self, E>
    where
        E: From<ValidationError>,
    {
        let started = Instant::now();
        let mut metrics = BuildMetrics::default();

        checkpoint(BuildPhase::Index)?;
        let catalog = CatalogIndex::load(records)?;
        metrics.index = started.elapsed();

        checkpoint(BuildPhase::Resolve)?;
        let phase = Instant::now();
        let resolutions = NameResolver::new(&catalog, options).resolve_all();
        metrics.resolve = phase.elapsed();

        checkpoint(BuildPhase::Graph)?;
        let phase = Instant::now();
        let graph = InteractionGraph::build(&catalog, &resolutions);
        metrics.graph = phase.elapsed();

        metrics.records = catalog.len();
        metrics.mentions = catalog.mentions().len();
        metrics.distinct_partner_texts =
            catalog.mentions().iter().map(|m| m.partner_text.as_str()).collect::<HashSet<_>>().len();
        metrics.edges = graph.len();
        metrics.substance_tokens = resolutions.substance_tokens().len();
        metrics.ambiguous_resolutions = resolutions.ambiguous().count();
        metrics.unreciprocated_edges = graph.unreciprocated().count();
        metrics.self_references = graph.self_references();
        metrics.total = started.elapsed();

        debug!(summary = %metrics.summary(), "snapshot built");

        Ok(Snapshot {
            generation: 0,
            built_at: context.reference_time,
            options: options.clone(),
            catalog,
            resolutions,
            graph,
            metrics,
        })
    }

    /// Publish counter; 0 for snapshots built outside a `KnowledgeBase`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn built_at(&self) -> NaiveDateTime {
        self.built_at
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn resolutions(&self) -> &ResolutionTable {
        &self.resolutions
    }

    pub fn graph(&self) -> &InteractionGraph {
        &self.graph
    }

    pub fn metrics(&self) -> &BuildMetrics {
        &self.metrics
    }

    /// Resolve ad-hoc text with this snapshot's catalog and options.
    pub fn resolve_text(&self, text: &str) -> Resolution {
        NameResolver::new(&self.catalog, &self.options).resolve_text(text)
    }

    pub fn checker(&self) -> RegimenChecker<'_> {
        RegimenChecker::new(&self.catalog, &self.graph, &self.options)
    }

    pub fn search(&self, filter: &SearchFilter) -> Vec<&DrugRecord> {
        search(&self.catalog, filter)
    }

    pub fn check_regimen<S: AsRef<str>, C: AsRef<str>>(
        &self,
        drug_ids: &[S],
        conditions: &[C],
    ) -> Result<RegimenReport, RegimenError> {
        self.checker().full_report(drug_ids, conditions)
    }
}

// --- Knowledge base ----------------------------------------------------------

/// Holder of the published snapshot. Many readers, one writer at a time.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    current: RwLock<Option<Arc<Snapshot>>>,
    /// Serializes reloads; never taken by readers.
    writer: Mutex<()>,
    options: Options,
}

impl KnowledgeBase {
    /// An empty knowledge base; nothing is published until the first reload.
    pub fn new(options: Options) -> Self {
        KnowledgeBase { current: RwLock::new(None), writer: Mutex::new(()), options }
    }

    /// The published snapshot, if any.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Generation of the published snapshot, 0 when none.
    pub fn generation(&self) -> u64 {
        self.current().map(|s| s.generation).unwrap_or(0)
    }

    /// Build from `records` and publish. On failure the previous snapshot
    /// stays current.
    pub fn reload(&self, records: Vec<DrugRecord>) -> Result<Arc<Snapshot>, ValidationError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = Snapshot::build(records, &Context::default(), &self.options, |_| Ok::<(), ValidationError>(()))
            .inspect_err(|err| warn!(violations = err.violations.len(), "reload rejected"))?;
        Ok(self.publish(snapshot))
    }

    /// Fetch records from `source`, build, and publish, checking `token`
    /// before every phase.
    pub fn reload_from(
        &self,
        source: &dyn RecordSource,
        token: &CancellationToken,
    ) -> Result<Arc<Snapshot>, ReloadError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let check = |phase: BuildPhase| {
            if token.is_cancelled() {
                info!(%phase, "reload cancelled");
                Err(ReloadError::Cancelled { phase })
            } else {
                Ok(())
            }
        };

        let result = check(BuildPhase::Fetch)
            .and_then(|()| source.fetch(token).map_err(ReloadError::from))
            .and_then(|records| Snapshot::build(records, &Context::default(), &self.options, check))
            .and_then(|snapshot| check(BuildPhase::Publish).map(|()| snapshot));

        match result {
            Ok(snapshot) => Ok(self.publish(snapshot)),
            Err(err) => {
                if !matches!(err, ReloadError::Cancelled { .. }) {
                    warn!(error = %err, "reload failed");
                }
                Err(err)
            }
        }
    }

    /// Must be called with the writer lock held.
    fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.generation = slot.as_ref().map(|s| s.generation).unwrap_or(0) + 1;
        let snapshot = Arc::new(snapshot);
        *slot = Some(Arc::clone(&snapshot));
        drop(slot);

        info!(generation = snapshot.generation, summary = %snapshot.metrics.summary(), "snapshot published");
        snapshot
    }
}
