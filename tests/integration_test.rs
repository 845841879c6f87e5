//! End-to-end tests for the risk analysis pipeline: identification, transmission
//! modeling and metrics over an in-memory store.

use chrono::{TimeZone, Utc};
use std::io::Write;

use financial_risk_graph::config::{Settings, TransmissionSettings};
use financial_risk_graph::database::{InMemoryStore, RiskStore, Snapshot};
use financial_risk_graph::error::{AppError, FailureScope};
use financial_risk_graph::models::*;
use financial_risk_graph::risk::{MetricsRecord, RiskAnalyzer, RiskTransmissionModeler};

fn event(id: &str, title: &str, description: &str, event_type: &str, day: u32) -> Event {
    Event::new(id, title, description, event_type, Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap())
}

fn analyzer(store: InMemoryStore) -> RiskAnalyzer<InMemoryStore> {
    RiskAnalyzer::new(store, &Settings::default()).unwrap()
}

fn only_risk_for(store: &InMemoryStore, event_id: &str) -> Risk {
    let mut risks: Vec<Risk> = store
        .get_all_risks()
        .unwrap()
        .into_iter()
        .filter(|risk| risk.triggering_event() == Some(event_id))
        .collect();
    assert_eq!(risks.len(), 1, "expected exactly one risk for {}", event_id);
    risks.remove(0)
}

/// Two events on disjoint entity sets linked by `links`.
fn two_event_store(first_entities: &[&str], second_entities: &[&str], links: &[(&str, &str)]) -> InMemoryStore {
    let mut store = InMemoryStore::new();
    for id in ["E1", "E2", "E3"] {
        store.insert_entity(Entity::new(id, format!("Firm {}", id), "Company"));
    }
    for (source, target) in links {
        store.insert_relationship(Relationship::new(*source, *target, "counterparty_of", 0.9));
    }
    store.insert_event(
        event("ev1", "Stock crash rattles investors", "Shares fell sharply", "market_crash", 1)
            .with_entities(first_entities.iter().copied()),
    );
    store.insert_event(
        event("ev2", "Lender files for bankruptcy", "Creditors wait for news", "credit_event", 2)
            .with_entities(second_entities.iter().copied()),
    );
    store
}

#[test]
fn test_market_crash_event_produces_market_risk() {
    let mut store = InMemoryStore::new();
    store.insert_entity(Entity::new("acme", "Acme Bank", "Bank"));
    store.insert_event(
        event(
            "ev1",
            "Turmoil",
            "market crash causes stock volatility and bond yield spike",
            "market_crash",
            3,
        )
        .with_entities(["acme"]),
    );

    let mut analyzer = analyzer(store);
    let ids = analyzer.identify_all_risks();
    assert_eq!(ids.len(), 1);

    let risk = analyzer.store().get_risk(&ids[0]).unwrap().unwrap();
    assert_eq!(risk.risk_type, RiskCategory::Market);
    assert_eq!(risk.entities.get("acme"), Some(&0.9));
    assert!((1..=5).contains(&risk.severity));
    assert!(risk.likelihood >= 0.1 && risk.likelihood <= 0.9);
    assert!(!risk.impact_areas.is_empty());
}

#[test]
fn test_shared_entity_yields_symmetric_correlation() {
    let mut analyzer = analyzer(two_event_store(&["E1", "E2"], &["E2", "E3"], &[]));
    let report = analyzer.run_analysis();
    assert!(report.is_clean());
    assert_eq!(report.transmission.as_ref().map(|t| t.correlations), Some(1));

    let r1 = only_risk_for(analyzer.store(), "ev1");
    let r2 = only_risk_for(analyzer.store(), "ev2");
    assert_eq!(r1.risk_type, RiskCategory::Market);
    assert_eq!(r2.risk_type, RiskCategory::Credit);

    let forward = &r1.related_risks[&r2.id];
    let backward = &r2.related_risks[&r1.id];
    assert_eq!(forward.relationship, RiskRelationship::CorrelatedWith);
    assert_eq!(backward.relationship, RiskRelationship::CorrelatedWith);
    assert_eq!(forward.correlation_strength, Some(0.5));
    assert_eq!(backward.correlation_strength, Some(0.5));
}

#[test]
fn test_one_intermediate_entity_yields_transmission() {
    let mut analyzer = analyzer(two_event_store(&["E1"], &["E3"], &[("E1", "E2"), ("E2", "E3")]));
    analyzer.run_analysis();

    let market = only_risk_for(analyzer.store(), "ev1");
    let credit = only_risk_for(analyzer.store(), "ev2");

    let forward = &market.related_risks[&credit.id];
    assert_eq!(forward.relationship, RiskRelationship::MayCause);
    assert_eq!(forward.transmission_strength, Some(0.5));
    assert_eq!(
        forward.transmission_path,
        Some(vec!["E1".to_string(), "E2".to_string(), "E3".to_string()])
    );
    assert_eq!(credit.related_risks[&market.id].relationship, RiskRelationship::MayBeCausedBy);

    let path = analyzer.find_risk_path(&market.id, &credit.id);
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].path, vec!["Firm E1", "Firm E2", "Firm E3"]);
    assert_eq!(path[0].relationship, "may_cause");

    let all_paths = analyzer.find_risk_transmission_paths();
    assert_eq!(all_paths.len(), 2);
}

#[test]
fn test_transmission_rerun_is_deterministic() {
    let mut analyzer = analyzer(two_event_store(&["E1", "E2"], &["E3"], &[("E2", "E3"), ("E1", "E3")]));
    analyzer.run_analysis();
    let mut store = analyzer.into_store();
    let before = store.get_all_risks().unwrap();

    let modeler = RiskTransmissionModeler::new(TransmissionSettings::default());
    for _ in 0..3 {
        modeler.model(&mut store).unwrap();
        assert_eq!(store.get_all_risks().unwrap(), before);
    }
}

#[test]
fn test_empty_store_metrics_are_zeroed() {
    let mut analyzer = analyzer(InMemoryStore::new());
    assert!(analyzer.identify_all_risks().is_empty());

    let metrics = analyzer.calculate_risk_metrics();
    assert_eq!(metrics, MetricsRecord::default());
    assert!(analyzer.find_risk_transmission_paths().is_empty());
    assert!(analyzer.get_top_risks(5).is_empty());
}

#[test]
fn test_metrics_after_analysis() {
    let mut analyzer = analyzer(two_event_store(&["E1", "E2"], &["E2", "E3"], &[]));
    analyzer.run_analysis();

    let metrics = analyzer.calculate_risk_metrics();
    assert_eq!(metrics.total_risks, 2);
    assert_eq!(metrics.risk_type_distribution[&RiskCategory::Market], 1);
    assert_eq!(metrics.risk_type_distribution[&RiskCategory::Credit], 1);
    assert_eq!(metrics.most_affected_entities[0].id, "E2");
    assert_eq!(metrics.most_affected_entities[0].risk_count, 2);
    assert_eq!(metrics.risk_event_correlation[&RiskCategory::Credit]["credit_event"], 1);
    assert_eq!(metrics.risk_over_time["2024-05-01"].total, 1);
    assert_eq!(metrics.risk_categories.iter().map(|c| c.percentage).sum::<f64>(), 100.0);
}

/// Store that fails on chosen operations, for exercising batch-boundary handling.
#[derive(Default)]
struct FaultyStore {
    inner: InMemoryStore,
    broken_news: Option<String>,
    fail_relationships: bool,
    fail_risk_listing: bool,
    /// 1-based index of the `save_risk` call to reject.
    fail_save_on: Option<usize>,
    saves: usize,
}

impl RiskStore for FaultyStore {
    fn get_all_events(&self) -> Result<Vec<Event>, AppError> {
        self.inner.get_all_events()
    }

    fn get_event(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        self.inner.get_event(event_id)
    }

    fn get_news(&self, news_id: &str) -> Result<Option<NewsItem>, AppError> {
        if self.broken_news.as_deref() == Some(news_id) {
            return Err(AppError::StoreError(format!("news {} unreadable", news_id)));
        }
        self.inner.get_news(news_id)
    }

    fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>, AppError> {
        self.inner.get_entity(entity_id)
    }

    fn get_all_relationships(&self) -> Result<Vec<Relationship>, AppError> {
        if self.fail_relationships {
            return Err(AppError::StoreError("relationship index offline".to_string()));
        }
        self.inner.get_all_relationships()
    }

    fn get_all_risks(&self) -> Result<Vec<Risk>, AppError> {
        if self.fail_risk_listing {
            return Err(AppError::StoreError("risk table locked".to_string()));
        }
        self.inner.get_all_risks()
    }

    fn get_risk(&self, risk_id: &str) -> Result<Option<Risk>, AppError> {
        self.inner.get_risk(risk_id)
    }

    fn save_risk(&mut self, risk: Risk) -> Result<(), AppError> {
        self.saves += 1;
        if self.fail_save_on == Some(self.saves) {
            return Err(AppError::StoreError(format!("write {} rejected", self.saves)));
        }
        self.inner.save_risk(risk)
    }
}

#[test]
fn test_failing_event_does_not_abort_batch() {
    let mut inner = two_event_store(&["E1"], &["E2"], &[]);
    let broken = event("ev0", "Quiet day", "Nothing happened", "other", 1).with_news(["n-bad"]);
    inner.insert_event(broken);

    let store = FaultyStore {
        inner,
        broken_news: Some("n-bad".to_string()),
        ..FaultyStore::default()
    };
    let mut analyzer = RiskAnalyzer::new(store, &Settings::default()).unwrap();
    let report = analyzer.run_analysis();

    assert_eq!(report.events_processed, 3);
    assert_eq!(report.risk_ids.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, FailureScope::Event { event_id: "ev0".to_string() });
    assert_eq!(report.failures[0].error.kind(), "store");
}

#[test]
fn test_partial_event_save_reports_stored_risks() {
    let mut inner = InMemoryStore::new();
    inner.insert_entity(Entity::new("acme", "Acme Bank", "Bank"));
    inner.insert_event(
        event("ev1", "Lender collapses", "bankruptcy filing follows a bank run", "credit_event", 4)
            .with_entities(["acme"]),
    );
    let store = FaultyStore {
        inner,
        fail_save_on: Some(2),
        ..FaultyStore::default()
    };

    let mut analyzer = RiskAnalyzer::new(store, &Settings::default()).unwrap();
    let report = analyzer.run_analysis();

    assert_eq!(report.events_processed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].scope, FailureScope::Event { event_id: "ev1".to_string() });

    let stored = analyzer.store().get_all_risks().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(report.risk_ids, vec![stored[0].id.clone()]);
    assert_eq!(stored[0].risk_type, RiskCategory::Credit);
}

#[test]
fn test_transmission_failure_leaves_risks_intact() {
    let store = FaultyStore {
        inner: two_event_store(&["E1"], &["E3"], &[("E1", "E2"), ("E2", "E3")]),
        fail_relationships: true,
        ..FaultyStore::default()
    };
    let mut analyzer = RiskAnalyzer::new(store, &Settings::default()).unwrap();
    let report = analyzer.run_analysis();

    assert_eq!(report.risk_ids.len(), 2);
    assert!(report.transmission.is_none());
    assert_eq!(report.failures[0].scope, FailureScope::Transmission);

    let risks = analyzer.store().get_all_risks().unwrap();
    assert_eq!(risks.len(), 2);
    assert!(risks.iter().all(|risk| risk.related_risks.is_empty()));
}

#[test]
fn test_metrics_failure_returns_default_record() {
    let store = FaultyStore {
        inner: two_event_store(&["E1"], &["E2"], &[]),
        fail_risk_listing: true,
        ..FaultyStore::default()
    };
    let analyzer = RiskAnalyzer::new(store, &Settings::default()).unwrap();

    assert_eq!(analyzer.calculate_risk_metrics(), MetricsRecord::default());
    assert!(analyzer.find_risk_transmission_paths().is_empty());
}

#[test]
fn test_snapshot_file_round_trip_through_analysis() {
    let source = two_event_store(&["E1", "E2"], &["E2"], &[]);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&source.to_snapshot()).unwrap().as_bytes())
        .unwrap();

    let store = InMemoryStore::load_snapshot(file.path()).unwrap();
    let mut analyzer = analyzer(store);
    let ids = analyzer.identify_all_risks();
    assert_eq!(ids.len(), 2);

    let snapshot: Snapshot = analyzer.into_store().to_snapshot();
    assert_eq!(snapshot.risks.len(), 2);
    assert_eq!(snapshot.events.len(), 2);
}

#[test]
fn test_custom_catalog_file_is_used() {
    let mut catalog = financial_risk_graph::risk::PatternCatalog::default();
    catalog
        .patterns
        .insert(RiskCategory::Reputation, vec!["shareholder revolt".to_string()]);

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(serde_json::to_string(&catalog).unwrap().as_bytes()).unwrap();

    let mut settings = Settings::default();
    settings.catalog.path = Some(file.path().to_string_lossy().to_string());

    let mut store = InMemoryStore::new();
    store.insert_event(event("ev1", "Shareholder revolt at AGM", "", "governance", 4));
    let mut analyzer = RiskAnalyzer::new(store, &settings).unwrap();
    let ids = analyzer.identify_all_risks();

    assert_eq!(ids.len(), 1);
    let risk = analyzer.store().get_risk(&ids[0]).unwrap().unwrap();
    assert_eq!(risk.risk_type, RiskCategory::Reputation);
    assert_eq!(risk.title, "Reputation Risk for Financial system from Governance Event");
}
