use crate::engine::{self, RegimenReport, SearchFilter, Snapshot};
use crate::error::{RegimenError, ValidationError};
use crate::DrugRecord;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Build context.
///
/// Holds environment that is not part of the catalog itself.
#[derive(Debug, Clone)]
pub struct Context {
    /// Time stamped on snapshots built with this context.
    pub reference_time: NaiveDateTime,
}

impl Default for Context {
    fn default() -> Self {
        if cfg!(test) {
            let date = NaiveDate::from_ymd_opt(2013, 2, 12).unwrap_or_default();
            let time = NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default();
            Self { reference_time: NaiveDateTime::new(date, time) }
        } else {
            Self { reference_time: Local::now().naive_local() }
        }
    }
}

/// Options that affect resolution and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Split partner text such as "Antacids/Iron/Calcium" into parts that are
    /// resolved independently.
    pub split_compound_mentions: bool,
    /// Resolve class names ("NSAIDs", "Statins") to every catalog member of
    /// the class.
    pub expand_drug_classes: bool,
    /// List regimen pairs the catalog has no interaction data for.
    pub list_pairs_without_record: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { split_compound_mentions: true, expand_drug_classes: true, list_pairs_without_record: true }
    }
}

/// Validate `records` and build a snapshot with a default [`Context`] and
/// [`Options`].
///
/// # Example
/// ```
/// use drugkb::{Administration, DrugRecord, InteractionMention, load_catalog};
///
/// let record = |id: &str, name: &str, partner: &str| DrugRecord {
///     id: id.to_string(),
///     name: name.to_string(),
///     generic_name: name.to_lowercase(),
///     brand_names: Vec::new(),
///     drug_class: "Demo".to_string(),
///     category: "Demo".to_string(),
///     uses: Vec::new(),
///     side_effects: Vec::new(),
///     contraindications: Vec::new(),
///     warnings: Vec::new(),
///     mechanism: String::new(),
///     dosage: String::new(),
///     half_life: String::new(),
///     onset_of_action: String::new(),
///     administration: Administration::default(),
///     interactions: vec![InteractionMention {
///         partner_text: partner.to_string(),
///         severity: "severe".to_string(),
///         effect: "bleeding".to_string(),
///     }],
///     is_dangerous: false,
/// };
///
/// let snapshot = load_catalog(vec![record("a", "Alpha", "Beta"), record("b", "Beta", "Alcohol")]).unwrap();
/// assert_eq!(snapshot.graph().len(), 2);
/// ```
pub fn load_catalog(records: Vec<DrugRecord>) -> Result<Snapshot, ValidationError> {
    load_catalog_with(records, &Context::default(), &Options::default())
}

/// Validate `records` and build a snapshot with the given `context` and
/// `options`.
pub fn load_catalog_with(
    records: Vec<DrugRecord>,
    context: &Context,
    options: &Options,
) -> Result<Snapshot, ValidationError> {
    Snapshot::build(records, context, options, |_| Ok::<(), ValidationError>(()))
}

/// Records of `snapshot` matching `filter`.
pub fn search<'a>(snapshot: &'a Snapshot, filter: &SearchFilter) -> Vec<&'a DrugRecord> {
    engine::search_catalog(snapshot.catalog(), filter)
}

/// Interaction and contraindication report for a regimen.
///
/// Pairs absent from the report's `interactions` have no recorded data; they
/// are listed under `pairs_without_record`, not confirmed safe.
pub fn check_regimen<S: AsRef<str>, C: AsRef<str>>(
    snapshot: &Snapshot,
    drug_ids: &[S],
    conditions: &[C],
) -> Result<RegimenReport, RegimenError> {
    snapshot.check_regimen(drug_ids, conditions)
}
