//! Shared test data.

use crate::api::{Context, Options, load_catalog_with};
use crate::engine::Snapshot;
use crate::{Administration, DrugRecord, InteractionMention};

const SAMPLE_CATALOG: &str = include_str!("../demos/catalog.json");

/// The demo catalog shipped in `demos/catalog.json`.
pub(crate) fn sample_records() -> Vec<DrugRecord> {
    serde_json::from_str(SAMPLE_CATALOG).expect("demo catalog parses")
}

pub(crate) fn sample_snapshot() -> Snapshot {
    load_catalog_with(sample_records(), &Context::default(), &Options::default()).expect("demo catalog is valid")
}

/// Minimal record: generic name is the lowercased name, category "Testing",
/// oral route, no interactions.
pub(crate) fn record(id: &str, name: &str, class: &str) -> DrugRecord {
    DrugRecord {
        id: id.to_string(),
        name: name.to_string(),
        generic_name: name.to_lowercase(),
        brand_names: Vec::new(),
        drug_class: class.to_string(),
        category: "Testing".to_string(),
        uses: Vec::new(),
        side_effects: Vec::new(),
        contraindications: Vec::new(),
        warnings: Vec::new(),
        mechanism: String::new(),
        dosage: String::new(),
        half_life: String::new(),
        onset_of_action: String::new(),
        administration: Administration { route: "Oral".to_string(), ..Administration::default() },
        interactions: Vec::new(),
        is_dangerous: false,
    }
}

pub(crate) fn mention(partner: &str, severity: &str, effect: &str) -> InteractionMention {
    InteractionMention { partner_text: partner.to_string(), severity: severity.to_string(), effect: effect.to_string() }
}

/// `record` with the given interactions attached.
pub(crate) fn record_with(id: &str, name: &str, class: &str, interactions: Vec<InteractionMention>) -> DrugRecord {
    DrugRecord { interactions, ..record(id, name, class) }
}
