//! Drug knowledge base and interaction resolution engine.
//!
//! The crate takes an ordered catalog of [`DrugRecord`]s from an external
//! loader and builds an immutable [`Snapshot`]:
//!
//! ```text
//! records ──▶ CatalogIndex ──┬──▶ NameResolver ──▶ InteractionGraph ──▶ RegimenChecker
//!                            └──▶ query::search
//! ```
//!
//! Start from [`load_catalog`] for a one-off snapshot, or [`KnowledgeBase`]
//! when snapshots are reloaded while readers keep querying.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;

#[cfg(test)]
mod fixtures;

pub use api::{Context, Options, check_regimen, load_catalog, load_catalog_with, search};
pub use engine::{
    AmbiguousResolution, BuildMetrics, BuildPhase, CancellationToken, Cancellable, CatalogIndex, ClassSummary,
    ContraindicationFinding, DrugRef, EdgeKey, GraphBuilder, IndexedMention, InteractionEdge, InteractionFinding,
    InteractionGraph, KnowledgeBase, MentionId, MentionShape, NameResolver, Neighbor, PairWithoutRecord, RecordSource,
    RegimenChecker, RegimenReport, Resolution, ResolutionKind, ResolutionTable, ResolvedEntity, SearchFilter, Snapshot,
    SortKey, SourceMention, SubstanceAdvisory, SubstanceToken, contains_phrase, normalize, phrase_key,
};
pub use error::{
    NotFound, RecordField, RegimenError, ReloadError, SourceError, UnknownSeverity, ValidationError, Violation,
    ViolationKind,
};

// --- Catalog records --------------------------------------------------------

/// One catalog entry as supplied by the external loader.
///
/// Records are immutable once loaded. Wire names follow the dataset's
/// camelCase keys (`genericName`, `brandNames`, `isDangerous`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugRecord {
    pub id: String,
    pub name: String,
    pub generic_name: String,
    #[serde(default)]
    pub brand_names: Vec<String>,
    pub drug_class: String,
    pub category: String,
    #[serde(default)]
    pub uses: Vec<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub half_life: String,
    #[serde(default)]
    pub onset_of_action: String,
    #[serde(default)]
    pub administration: Administration,
    #[serde(default)]
    pub interactions: Vec<InteractionMention>,
    #[serde(default)]
    pub is_dangerous: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Administration {
    #[serde(default)]
    pub route: String,
    #[serde(default)]
    pub timing: String,
    #[serde(default)]
    pub with_food: bool,
    #[serde(default)]
    pub reason: String,
}

/// A single interaction entry recorded on one drug.
///
/// `partner_text` is free text (brand, generic, class, or a substance such as
/// "Grapefruit juice"). `severity` stays as supplied; the catalog index parses
/// and validates it at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMention {
    #[serde(alias = "drug")]
    pub partner_text: String,
    pub severity: String,
    #[serde(default)]
    pub effect: String,
}

// --- Severity ---------------------------------------------------------------

/// Interaction risk level, totally ordered `Mild < Moderate < Severe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Mild, Severity::Moderate, Severity::Severe];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    /// Accepts the three level names, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" => Ok(Severity::Severe),
            _ => Err(UnknownSeverity { value: s.to_string() }),
        }
    }
}
