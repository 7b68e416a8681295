//! Regimen checks.
//!
//! A regimen is a set of catalog drug ids plus free-text conditions. The
//! checker evaluates every unordered drug pair against the interaction graph
//! and every (drug, condition) pair against the drug's contraindications.
//!
//! Input is validated first and all at once: an empty regimen or any unknown
//! id rejects the whole request before a single pair is looked up.
//!
//! A pair with no graph edge yields no `InteractionFinding`. That means the
//! catalog holds no interaction data for the pair. It does not mean the pair
//! was checked and found safe, which is why the report lists such pairs under
//! `pairs_without_record` rather than dropping them silently.
//!
//! Contraindication matching is whole-word phrase matching over normalized
//! text ("kidney disease" matches "Severe kidney disease (eGFR < 30)"). It is
//! not clinical inference; paraphrased conditions will be missed.

use super::catalog::CatalogIndex;
use super::graph::InteractionGraph;
use super::resolve::{ResolvedEntity, SubstanceToken};
use super::trigger::{contains_phrase, phrase_key};
use crate::api::Options;
use crate::error::RegimenError;
use crate::{DrugRecord, Severity};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Drug as it appears in findings. Orders by case-folded name, then exact
/// name, then id, matching the default search order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DrugRef {
    pub name: String,
    pub id: String,
}

impl DrugRef {
    fn of(record: &DrugRecord) -> Self {
        DrugRef { name: record.name.clone(), id: record.id.clone() }
    }

    fn sort_key(&self) -> (String, &str, &str) {
        (self.name.to_lowercase(), &self.name, &self.id)
    }
}

impl Ord for DrugRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for DrugRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A recorded interaction between two regimen drugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionFinding {
    /// The pair member whose name sorts first.
    pub drug_a: DrugRef,
    pub drug_b: DrugRef,
    pub severity: Severity,
    pub effects: Vec<String>,
    /// Both drugs describe the interaction in their own records.
    pub reciprocated: bool,
}

/// A condition that matched one of a drug's contraindications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContraindicationFinding {
    pub drug: DrugRef,
    /// Condition as supplied, trimmed.
    pub condition: String,
    /// The contraindication text that matched.
    pub matched_text: String,
}

/// A regimen drug's recorded interaction with a non-drug substance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstanceAdvisory {
    pub drug: DrugRef,
    pub substance: SubstanceToken,
    pub severity: Severity,
    pub effects: Vec<String>,
}

/// A regimen pair the catalog holds no interaction data for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairWithoutRecord {
    pub drug_a: DrugRef,
    pub drug_b: DrugRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimenReport {
    /// Distinct regimen drugs, name order.
    pub drugs: Vec<DrugRef>,
    pub interactions: Vec<InteractionFinding>,
    pub contraindications: Vec<ContraindicationFinding>,
    pub substance_advisories: Vec<SubstanceAdvisory>,
    pub pairs_without_record: Vec<PairWithoutRecord>,
    /// Highest severity across `interactions`; `None` when there are none.
    pub highest_severity: Option<Severity>,
}

impl RegimenReport {
    /// `highest_severity` as text, `"none"` when absent.
    pub fn highest_severity_label(&self) -> &'static str {
        self.highest_severity.map(Severity::as_str).unwrap_or("none")
    }

    pub fn has_findings(&self) -> bool {
        !self.interactions.is_empty() || !self.contraindications.is_empty()
    }
}

/// Evaluates regimens against one catalog and its graph.
#[derive(Debug, Clone, Copy)]
pub struct RegimenChecker<'a> {
    catalog: &'a CatalogIndex,
    graph: &'a InteractionGraph,
    options: &'a Options,
}

impl<'a> RegimenChecker<'a> {
    pub fn new(catalog: &'a CatalogIndex, graph: &'a InteractionGraph, options: &'a Options) -> Self {
        RegimenChecker { catalog, graph, options }
    }

    /// Recorded interactions among `drug_ids`, most severe first, then by
    /// drug-name pair.
    pub fn check_interactions<S: AsRef<str>>(&self, drug_ids: &[S]) -> Result<Vec<InteractionFinding>, RegimenError> {
        let drugs = self.regimen(drug_ids)?;
        Ok(self.interactions(&drugs).0)
    }

    pub fn check_contraindications<S: AsRef<str>, C: AsRef<str>>(
        &self,
        drug_ids: &[S],
        conditions: &[C],
    ) -> Result<Vec<ContraindicationFinding>, RegimenError> {
        let drugs = self.regimen(drug_ids)?;
        Ok(self.contraindications(&drugs, conditions))
    }

    pub fn full_report<S: AsRef<str>, C: AsRef<str>>(
        &self,
        drug_ids: &[S],
        conditions: &[C],
    ) -> Result<RegimenReport, RegimenError> {
        let drugs = self.regimen(drug_ids)?;
        let (interactions, mut pairs_without_record) = self.interactions(&drugs);
        if !self.options.list_pairs_without_record {
            pairs_without_record.clear();
        }
        let contraindications = self.contraindications(&drugs, conditions);
        let substance_advisories = self.substance_advisories(&drugs);
        let highest_severity = interactions.iter().map(|f| f.severity).max();

        debug!(
            drugs = drugs.len(),
            interactions = interactions.len(),
            contraindications = contraindications.len(),
            advisories = substance_advisories.len(),
            highest = highest_severity.map(Severity::as_str).unwrap_or("none"),
            "regimen checked"
        );

        Ok(RegimenReport {
            drugs,
            interactions,
            contraindications,
            substance_advisories,
            pairs_without_record,
            highest_severity,
        })
    }

    /// Validate and deduplicate the regimen. Name order.
    fn regimen<S: AsRef<str>>(&self, drug_ids: &[S]) -> Result<Vec<DrugRef>, RegimenError> {
        if drug_ids.is_empty() {
            return Err(RegimenError::EmptyInput);
        }

        let mut drugs = BTreeSet::new();
        let mut unknown = BTreeSet::new();
        for id in drug_ids {
            match self.catalog.by_id(id.as_ref()) {
                Ok(record) => {
                    drugs.insert(DrugRef::of(record));
                }
                Err(_) => {
                    unknown.insert(id.as_ref().to_string());
                }
            }
        }

        if !unknown.is_empty() {
            debug!(unknown = unknown.len(), "regimen rejected");
            return Err(RegimenError::UnknownDrug { ids: unknown.into_iter().collect() });
        }
        Ok(drugs.into_iter().collect())
    }

    fn interactions(&self, drugs: &[DrugRef]) -> (Vec<InteractionFinding>, Vec<PairWithoutRecord>) {
        let mut findings = Vec::new();
        let mut missing = Vec::new();

        for (i, a) in drugs.iter().enumerate() {
            for b in &drugs[i + 1..] {
                match self.graph.edge_between_drugs(&a.id, &b.id) {
                    Some(edge) => findings.push(InteractionFinding {
                        drug_a: a.clone(),
                        drug_b: b.clone(),
                        severity: edge.severity,
                        effects: edge.effects.iter().cloned().collect(),
                        reciprocated: edge.is_reciprocated(),
                    }),
                    None => missing.push(PairWithoutRecord { drug_a: a.clone(), drug_b: b.clone() }),
                }
            }
        }

        // pairs are generated in name order, so a stable sort keeps it as the tie-break
        findings.sort_by(|x, y| y.severity.cmp(&x.severity));
        (findings, missing)
    }

    /// Drug order, then condition order, then contraindication order.
    fn contraindications<C: AsRef<str>>(&self, drugs: &[DrugRef], conditions: &[C]) -> Vec<ContraindicationFinding> {
        let mut seen = BTreeSet::new();
        let conditions: Vec<(&str, String)> = conditions
            .iter()
            .map(|c| c.as_ref().trim())
            .filter_map(|c| {
                let key = phrase_key(c);
                (!key.is_empty() && seen.insert(key.clone())).then_some((c, key))
            })
            .collect();

        let mut findings = Vec::new();
        for drug in drugs {
            let Ok(record) = self.catalog.by_id(&drug.id) else {
                continue;
            };
            for (condition, condition_key) in &conditions {
                for text in &record.contraindications {
                    let text_key = phrase_key(text);
                    if contains_phrase(&text_key, condition_key) || contains_phrase(condition_key, &text_key) {
                        findings.push(ContraindicationFinding {
                            drug: drug.clone(),
                            condition: condition.to_string(),
                            matched_text: text.clone(),
                        });
                    }
                }
            }
        }
        findings
    }

    /// Substance edges of every regimen drug, most severe first.
    fn substance_advisories(&self, drugs: &[DrugRef]) -> Vec<SubstanceAdvisory> {
        let mut advisories: Vec<SubstanceAdvisory> = drugs
            .iter()
            .flat_map(|drug| {
                let entity = ResolvedEntity::drug(drug.id.as_str());
                self.graph
                    .neighbors(&entity)
                    .into_iter()
                    .filter_map(|n| {
                        Some(SubstanceAdvisory {
                            drug: drug.clone(),
                            substance: n.partner.as_substance()?.clone(),
                            severity: n.severity,
                            effects: n.effects.iter().cloned().collect(),
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        advisories.sort_by(|x, y| y.severity.cmp(&x.severity));
        advisories
    }
}
