//! Snapshot build metrics.
//!
//! Every published snapshot carries one `BuildMetrics`. They are cheap to
//! collect (a handful of `Instant`s and counters) and are meant for logging
//! and for the CLI report footer, not for profiling individual records.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetrics {
    /// Wall time for the whole build, validation included.
    pub total: Duration,
    /// Validation and index construction.
    pub index: Duration,
    pub resolve: Duration,
    pub graph: Duration,

    pub records: usize,
    pub mentions: usize,
    /// Distinct partner texts seen across all mentions.
    pub distinct_partner_texts: usize,
    pub edges: usize,
    pub substance_tokens: usize,
    pub ambiguous_resolutions: usize,
    pub unreciprocated_edges: usize,
    /// Mentions that resolved back to their own author and were skipped.
    pub self_references: usize,
}

impl BuildMetrics {
    /// One-line summary for log output and the CLI footer.
    pub fn summary(&self) -> String {
        format!(
            "{} records, {} mentions, {} edges ({} unreciprocated), {} substances, {} ambiguous; built in {:?}",
            self.records,
            self.mentions,
            self.edges,
            self.unreciprocated_edges,
            self.substance_tokens,
            self.ambiguous_resolutions,
            self.total
        )
    }
}
