//! Error types.
//!
//! Every error carries structured fields (offending id, field, reason) so that
//! callers can log or assert on them without parsing messages.

use crate::engine::BuildPhase;
use std::fmt;

/// A severity string that is not one of `mild`, `moderate`, `severe`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity `{value}`")]
pub struct UnknownSeverity {
    pub value: String,
}

/// The record field a [`Violation`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Id,
    Name,
    GenericName,
    BrandNames,
    /// Partner text of the interaction mention at `ordinal`.
    InteractionPartner { ordinal: usize },
    /// Severity of the interaction mention at `ordinal`.
    InteractionSeverity { ordinal: usize },
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordField::Id => f.write_str("id"),
            RecordField::Name => f.write_str("name"),
            RecordField::GenericName => f.write_str("genericName"),
            RecordField::BrandNames => f.write_str("brandNames"),
            RecordField::InteractionPartner { ordinal } => write!(f, "interactions[{ordinal}].drug"),
            RecordField::InteractionSeverity { ordinal } => write!(f, "interactions[{ordinal}].severity"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    EmptyValue,
    /// The id was already used by the record at `first_index`.
    DuplicateId { first_index: usize },
    DuplicateBrand { brand: String },
    InvalidSeverity { value: String },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::EmptyValue => f.write_str("value is empty"),
            ViolationKind::DuplicateId { first_index } => write!(f, "id already used by record #{first_index}"),
            ViolationKind::DuplicateBrand { brand } => write!(f, "brand `{brand}` listed more than once"),
            ViolationKind::InvalidSeverity { value } => write!(f, "severity `{value}` is not mild/moderate/severe"),
        }
    }
}

/// One broken catalog invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Position of the record in the supplied sequence.
    pub record_index: usize,
    pub id: String,
    pub field: RecordField,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record #{} (`{}`) {}: {}", self.record_index, self.id, self.field, self.kind)
    }
}

/// A catalog failed validation. Lists every violation found, in record order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("catalog rejected with {} violation(s); first: {}", violations.len(), first_violation(violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Ids that appear in a `DuplicateId` violation, deduplicated.
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .violations
            .iter()
            .filter(|v| matches!(v.kind, ViolationKind::DuplicateId { .. }))
            .map(|v| v.id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

fn first_violation(violations: &[Violation]) -> String {
    violations.first().map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no catalog record with id `{id}`")]
pub struct NotFound {
    pub id: String,
}

/// Rejected regimen input. Raised before any pair is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegimenError {
    #[error("regimen contains no drugs")]
    EmptyInput,

    #[error("unknown drug id(s): {}", ids.join(", "))]
    UnknownDrug { ids: Vec<String> },
}

/// Failure reported by an external [`crate::RecordSource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record source failed: {reason}")]
pub struct SourceError {
    pub reason: String,
}

/// A reload that did not publish. The previous snapshot stays current.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReloadError {
    #[error("reload cancelled before {phase}")]
    Cancelled { phase: BuildPhase },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
