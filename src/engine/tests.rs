//! Cross-module properties of the engine.

use super::catalog::CatalogIndex;
use super::query::{SearchFilter, SortKey, search};
use super::resolve::{NameResolver, ResolutionKind, ResolvedEntity};
use super::trigger::normalize;
use super::{EdgeKey, InteractionGraph};
use crate::api::Options;
use crate::fixtures::{mention, record, record_with, sample_records, sample_snapshot};
use crate::{DrugRecord, Severity};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

const CLASSES: &[&str] = &["Statin", "statin ", "NSAID", "SSRI", "Opioid Analgesic"];
const DRUGS: &[&str] = &["Alpha", "Bravo", "Charlie", "Delta", "Echo"];

fn graph_of(records: Vec<DrugRecord>) -> InteractionGraph {
    let catalog = CatalogIndex::load(records).unwrap();
    let options = Options::default();
    let resolutions = NameResolver::new(&catalog, &options).resolve_all();
    InteractionGraph::build(&catalog, &resolutions)
}

fn arb_catalog() -> impl Strategy<Value = Vec<DrugRecord>> {
    let row = (
        0..CLASSES.len(),
        "[a-z]{3,8}",
        prop::collection::vec("[A-Z][a-z]{2,6}", 0..3),
        any::<bool>(),
    );
    prop::collection::vec(row, 1..12).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (class, name, brands, dangerous))| {
                let mut r = record(&format!("d{i}"), &name, CLASSES[class]);
                let mut seen = HashSet::new();
                r.brand_names = brands.into_iter().filter(|b| seen.insert(b.to_lowercase())).collect();
                r.is_dangerous = dangerous;
                r
            })
            .collect()
    })
}

/// (author, partner, severity) triples over `DRUGS` plus one substance.
fn arb_mentions() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
    prop::collection::vec((0..DRUGS.len(), 0..DRUGS.len() + 1, 0..Severity::ALL.len()), 0..24)
}

fn records_from(mentions: &[(usize, usize, usize)]) -> Vec<DrugRecord> {
    DRUGS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let interactions = mentions
                .iter()
                .filter(|(author, _, _)| *author == i)
                .map(|&(_, partner, severity)| {
                    let partner = DRUGS.get(partner).copied().unwrap_or("Alcohol");
                    mention(partner, Severity::ALL[severity].as_str(), &format!("effect {severity}"))
                })
                .collect();
            record_with(&name.to_lowercase(), name, "Demo", interactions)
        })
        .collect()
}

proptest! {
    #[test]
    fn class_summary_counts_match_records(records in arb_catalog()) {
        let catalog = CatalogIndex::load(records).unwrap();
        let summary = catalog.class_summary();

        for (class, entry) in &summary {
            let expected = catalog.records().iter().filter(|r| normalize(&r.drug_class) == normalize(class)).count();
            prop_assert_eq!(entry.count, expected, "class {}", class);
        }
        prop_assert_eq!(summary.values().map(|s| s.count).sum::<usize>(), catalog.len());
    }

    #[test]
    fn every_name_and_brand_finds_its_record(records in arb_catalog()) {
        let catalog = CatalogIndex::load(records).unwrap();

        for record in catalog.records() {
            let aliases = std::iter::once(&record.name).chain(record.brand_names.iter());
            for alias in aliases {
                let hits = catalog.by_name_or_brand(&alias.to_uppercase());
                prop_assert!(hits.iter().any(|r| r.id == record.id), "{} not found via {}", record.id, alias);
            }
        }
    }

    #[test]
    fn graph_ignores_record_order(mentions in arb_mentions()) {
        let forward = records_from(&mentions);
        let mut backward = forward.clone();
        backward.reverse();

        let a: Vec<_> = graph_of(forward).edges().cloned().collect();
        let b: Vec<_> = graph_of(backward).edges().cloned().collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn edge_severity_is_the_maximum_mentioned(mentions in arb_mentions()) {
        let graph = graph_of(records_from(&mentions));

        let mut expected: BTreeMap<EdgeKey, Severity> = BTreeMap::new();
        for &(author, partner, severity) in &mentions {
            let author = ResolvedEntity::drug(DRUGS[author].to_lowercase());
            let partner = match DRUGS.get(partner) {
                Some(name) => ResolvedEntity::drug(name.to_lowercase()),
                None => ResolvedEntity::substance("Alcohol"),
            };
            let key = EdgeKey::new(author, partner);
            if key.is_loop() {
                continue;
            }
            let slot = expected.entry(key).or_insert(Severity::Mild);
            *slot = (*slot).max(Severity::ALL[severity]);
        }

        let got: BTreeMap<EdgeKey, Severity> = graph.edges().map(|e| (e.key.clone(), e.severity)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn search_is_idempotent(
        text in prop::option::of(prop::sample::select(vec!["pain", "cholesterol", "inhibits", "diabetes", "zzz"])),
        dangerous in prop::option::of(any::<bool>()),
        sort in prop::option::of(prop::sample::select(vec![SortKey::Name, SortKey::InsertionOrder, SortKey::DrugClass]))
    ) {
        let catalog = CatalogIndex::load(sample_records()).unwrap();
        let filter = SearchFilter { text: text.map(str::to_string), is_dangerous: dangerous, sort, ..SearchFilter::default() };

        let first: Vec<&str> = search(&catalog, &filter).iter().map(|r| r.id.as_str()).collect();
        let second: Vec<&str> = search(&catalog, &filter).iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(&first, &second);

        if let Some(flag) = dangerous {
            prop_assert!(first.iter().all(|id| catalog.by_id(id).unwrap().is_dangerous == flag));
        }
        if sort.is_none() && !filter.has_no_criteria() {
            let names: Vec<String> = first.iter().map(|id| catalog.by_id(id).unwrap().name.to_lowercase()).collect();
            prop_assert!(names.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}

#[test]
fn resolving_known_names_and_substances() {
    let snapshot = sample_snapshot();

    let warfarin = snapshot.resolve_text("Warfarin");
    assert_eq!(warfarin.kind, ResolutionKind::Exact);
    assert_eq!(warfarin.entities.iter().next(), Some(&ResolvedEntity::drug("warfarin")));
    assert_eq!(snapshot.catalog().by_id("warfarin").unwrap().name, "Warfarin");

    let alcohol = snapshot.resolve_text("Alcohol");
    assert_eq!(alcohol.kind, ResolutionKind::Substance);
    assert_eq!(alcohol.entities.iter().next(), Some(&ResolvedEntity::substance("alcohol")));
}

#[test]
fn one_sided_and_two_sided_mentions_agree_on_severity() {
    let one = graph_of(vec![
        record_with("a", "Alpha", "X", vec![mention("Bravo", "severe", "bad")]),
        record("b", "Bravo", "Y"),
    ]);
    let two = graph_of(vec![
        record_with("a", "Alpha", "X", vec![mention("Bravo", "severe", "bad")]),
        record_with("b", "Bravo", "Y", vec![mention("Alpha", "moderate", "bad")]),
    ]);

    assert_eq!(one.edge_between_drugs("a", "b").unwrap().severity, Severity::Severe);
    assert_eq!(two.edge_between_drugs("a", "b").unwrap().severity, Severity::Severe);
    // identical effect text is kept once
    assert_eq!(two.edge_between_drugs("a", "b").unwrap().effects.len(), 1);
}

#[test]
fn dangerous_search_is_name_ordered() {
    let snapshot = sample_snapshot();
    let filter = SearchFilter::new().dangerous(true);

    let names: Vec<&str> = snapshot.search(&filter).iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Insulin Glargine", "Tramadol", "Warfarin"]);
    assert_eq!(
        snapshot.search(&filter).iter().map(|r| &r.id).collect::<Vec<_>>(),
        snapshot.search(&filter).iter().map(|r| &r.id).collect::<Vec<_>>()
    );
}

#[test]
fn regimen_report_over_the_snapshot() {
    let snapshot = sample_snapshot();
    let report = snapshot.check_regimen(&["warfarin", "aspirin"], &["pregnancy"]).unwrap();

    assert_eq!(report.interactions.len(), 1);
    assert_eq!(report.highest_severity, Some(Severity::Severe));
    assert_eq!(report.contraindications.len(), 1);
    assert_eq!(report.contraindications[0].drug.id, "warfarin");
    assert!(report.substance_advisories.iter().any(|a| a.substance.as_str() == "alcohol"));
}
