use proptest::prelude::*;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use financial_risk_graph::{
    config::{EngineSettings, TransmissionSettings},
    database::{InMemoryStore, RiskStore},
    models::{CreateRisk, Entity, Event, Relationship, Risk, RiskCategory, RiskRelationship},
    risk::{entity_overlap, CompiledCatalog, RiskIdentificationEngine, RiskTransmissionModeler, ScoringRules},
};

/// Property-based tests for scoring bounds and transmission invariants

// Phrases that each hit at least one built-in pattern
fn risk_phrase() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("market crash"),
        Just("bond sell-off"),
        Just("credit rating downgrade"),
        Just("bankruptcy"),
        Just("liquidity crunch"),
        Just("bank run"),
        Just("cyber attack"),
        Just("lawsuit"),
        Just("strategy shift"),
        Just("scandal"),
        Just("regulatory crackdown"),
    ]
}

fn filler_word() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("the"), Just("quarterly"), Just("report"), Just("shows"), Just("after"), Just("markets")]
}

fn entity_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(0u8..12, 0..6).prop_map(|ids| ids.into_iter().map(|i| format!("E{:02}", i)).collect())
}

fn category() -> impl Strategy<Value = RiskCategory> {
    prop::sample::select(RiskCategory::ALL.to_vec())
}

fn risk(id: &str, category: RiskCategory, event_id: &str, entities: &[String]) -> Risk {
    let mut risk = Risk::new(CreateRisk {
        title: id.to_string(),
        description: String::new(),
        risk_type: category,
        severity: 3,
        likelihood: 0.5,
        impact_areas: Vec::new(),
    });
    risk.id = id.to_string();
    risk.add_event(event_id);
    for entity in entities {
        risk.add_entity(entity.clone(), 0.5);
    }
    risk
}

proptest! {
    /// Scores stay within their bounds for any match count
    #[test]
    fn test_scores_stay_in_bounds(match_count in 0usize..10_000) {
        let rules = ScoringRules::default();
        let severity = rules.severity(match_count);
        let likelihood = rules.likelihood(match_count);

        prop_assert!((1..=5).contains(&severity), "severity {} out of range", severity);
        prop_assert!((0.1..=0.9).contains(&likelihood), "likelihood {} out of range", likelihood);
    }

    /// More matches never lower severity or likelihood
    #[test]
    fn test_scores_are_monotonic(
        a in 0usize..500,
        b in 0usize..500,
        per_level in 1usize..6,
        per_match in 0.01f64..0.5,
    ) {
        let rules = ScoringRules::from(&EngineSettings {
            matches_per_severity_level: per_level,
            likelihood_per_match: per_match,
            ..EngineSettings::default()
        });
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        prop_assert!(rules.severity(low) <= rules.severity(high));
        prop_assert!(rules.likelihood(low) <= rules.likelihood(high));
    }

    /// Every identified risk is well-formed whatever the text
    #[test]
    fn test_identified_risks_are_well_formed(
        phrases in prop::collection::vec(risk_phrase(), 1..8),
        fillers in prop::collection::vec(filler_word(), 0..8),
        entity_type in prop_oneof![Just("Bank"), Just("Person"), Just("Bond"), Just("Unknown")],
    ) {
        let mut store = InMemoryStore::new();
        store.insert_entity(Entity::new("e1", "Subject", entity_type));
        let text = phrases.iter().chain(fillers.iter()).copied().collect::<Vec<&str>>().join(" ");
        let event = Event::new("ev1", "Generated", text, "generated", Utc::now()).with_entities(["e1"]);

        let engine = RiskIdentificationEngine::new(
            Arc::new(CompiledCatalog::builtin().unwrap()),
            ScoringRules::default(),
        );
        let ids = engine.identify_event(&mut store, &event).unwrap();
        prop_assert!(!ids.is_empty());

        for id in ids {
            let risk = store.get_risk(&id).unwrap().unwrap();
            prop_assert!((1..=5).contains(&risk.severity));
            prop_assert!(risk.likelihood >= 0.1 && risk.likelihood <= 0.9);
            prop_assert!(!risk.impact_areas.is_empty());
            prop_assert!(RiskCategory::ALL.contains(&risk.risk_type));
            let impact = risk.impact_on("e1").unwrap();
            prop_assert!((0.0..=1.0).contains(&impact));
        }
    }

    /// Overlap is symmetric and within (0, 1] whenever entities are shared
    #[test]
    fn test_overlap_is_symmetric(left in entity_ids(), right in entity_ids()) {
        let a = risk("a", RiskCategory::Market, "ev1", &left);
        let b = risk("b", RiskCategory::Credit, "ev2", &right);

        let forward = entity_overlap(&a, &b);
        prop_assert_eq!(forward, entity_overlap(&b, &a));
        prop_assert!((0.0..=1.0).contains(&forward));
        let shares_any = left.iter().any(|id| right.contains(id));
        prop_assert_eq!(shares_any, forward > 0.0);
    }

    /// Modeling writes matching annotations on both sides of every pair
    #[test]
    fn test_modeling_annotations_are_symmetric(
        specs in prop::collection::vec((category(), entity_ids()), 2..6),
        links in prop::collection::vec((0u8..12, 0u8..12), 0..15),
    ) {
        let mut store = InMemoryStore::new();
        for (source, target) in &links {
            store.insert_relationship(Relationship::new(
                format!("E{:02}", source),
                format!("E{:02}", target),
                "linked",
                1.0,
            ));
        }
        for (i, (category, entities)) in specs.iter().enumerate() {
            store.save_risk(risk(&format!("r{}", i), *category, &format!("ev{}", i), entities)).unwrap();
        }

        RiskTransmissionModeler::new(TransmissionSettings::default()).model(&mut store).unwrap();
        let risks = store.get_all_risks().unwrap();

        for source in &risks {
            for (target_id, forward) in &source.related_risks {
                let target = store.get_risk(target_id).unwrap().unwrap();
                let backward = &target.related_risks[&source.id];

                prop_assert_eq!(forward.correlation_strength, backward.correlation_strength);
                prop_assert_eq!(forward.transmission_strength, backward.transmission_strength);
                match forward.relationship {
                    RiskRelationship::CorrelatedWith => {
                        prop_assert_eq!(backward.relationship, RiskRelationship::CorrelatedWith)
                    }
                    RiskRelationship::MayCause => {
                        prop_assert_eq!(backward.relationship, RiskRelationship::MayBeCausedBy)
                    }
                    RiskRelationship::MayBeCausedBy => {
                        prop_assert_eq!(backward.relationship, RiskRelationship::MayCause)
                    }
                    other => prop_assert_eq!(backward.relationship, other),
                }
                if let (Some(path), Some(back)) = (&forward.transmission_path, &backward.transmission_path) {
                    let mut reversed = back.clone();
                    reversed.reverse();
                    prop_assert_eq!(path, &reversed);
                }
            }
        }
    }
}

#[test]
fn test_event_date_does_not_affect_scoring() {
    let engine = RiskIdentificationEngine::new(Arc::new(CompiledCatalog::builtin().unwrap()), ScoringRules::default());
    let mut store = InMemoryStore::new();
    let old = Event::new("old", "Bank run", "", "bank_run", Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
    let new = Event::new("new", "Bank run", "", "bank_run", Utc::now());

    let old_ids = engine.identify_event(&mut store, &old).unwrap();
    let new_ids = engine.identify_event(&mut store, &new).unwrap();

    let old_risk = store.get_risk(&old_ids[0]).unwrap().unwrap();
    let new_risk = store.get_risk(&new_ids[0]).unwrap().unwrap();
    assert_eq!(old_risk.severity, new_risk.severity);
    assert_eq!(old_risk.likelihood, new_risk.likelihood);
}
