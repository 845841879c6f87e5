// Risk Metrics Aggregator - read-only statistics and path reporting over the risk set
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, warn};

use crate::config::EngineSettings;
use crate::database::RiskStore;
use crate::error::AppError;
use crate::models::{Event, RelatedRisk, Risk, RiskCategory, MAX_SEVERITY, MIN_SEVERITY};
use crate::risk::graph::RiskGraph;
use crate::risk::transmission::shared_entities;
use crate::utils::math::percentage;
use crate::utils::time::{day_bucket, format_day};

/// Strength reported for a related risk that carries no numeric annotation.
pub const DEFAULT_PATH_STRENGTH: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub name: RiskCategory,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityShare {
    pub level: u8,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityExposure {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub risk_count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub id: String,
    pub title: String,
    pub risk_type: RiskCategory,
    pub severity: u8,
    pub likelihood: f64,
}

impl From<&Risk> for RiskSummary {
    fn from(risk: &Risk) -> Self {
        Self {
            id: risk.id.clone(),
            title: risk.title.clone(),
            risk_type: risk.risk_type,
            severity: risk.severity,
            likelihood: risk.likelihood,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeBucket {
    pub total: usize,
    pub by_type: BTreeMap<RiskCategory, usize>,
}

/// Aggregate view of the risk set. `Default` is the all-zero record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRecord {
    pub total_risks: usize,
    pub risk_type_distribution: BTreeMap<RiskCategory, usize>,
    pub risk_severity_distribution: BTreeMap<u8, usize>,
    pub risk_categories: Vec<CategoryShare>,
    pub severity_distribution: Vec<SeverityShare>,
    pub most_affected_entities: Vec<EntityExposure>,
    pub highest_severity_risks: Vec<RiskSummary>,
    /// category -> event type -> risks triggered by that type of event
    pub risk_event_correlation: BTreeMap<RiskCategory, BTreeMap<String, usize>>,
    /// "YYYY-MM-DD" -> counts
    pub risk_over_time: BTreeMap<String, TimeBucket>,
}

impl Default for MetricsRecord {
    fn default() -> Self {
        Self {
            total_risks: 0,
            risk_type_distribution: RiskCategory::ALL.iter().map(|category| (*category, 0)).collect(),
            risk_severity_distribution: (MIN_SEVERITY..=MAX_SEVERITY).map(|level| (level, 0)).collect(),
            risk_categories: Vec::new(),
            severity_distribution: Vec::new(),
            most_affected_entities: Vec::new(),
            highest_severity_risks: Vec::new(),
            risk_event_correlation: BTreeMap::new(),
            risk_over_time: BTreeMap::new(),
        }
    }
}

/// One hop of exposure between two risks, ready for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathRecord {
    pub source_id: String,
    pub source_title: String,
    pub source_type: RiskCategory,
    pub target_id: String,
    pub target_title: String,
    pub target_type: RiskCategory,
    /// Entity names along the transmission path, or the shared entities of a correlation.
    pub path: Vec<String>,
    pub strength: f64,
    pub relationship: String,
}

/// Memoizes entity-name and event lookups for one aggregation call.
struct LookupCache<'s, S: RiskStore> {
    store: &'s S,
    names: RefCell<HashMap<String, String>>,
    events: RefCell<HashMap<String, Option<Event>>>,
}

impl<'s, S: RiskStore> LookupCache<'s, S> {
    fn new(store: &'s S) -> Self {
        Self {
            store,
            names: RefCell::new(HashMap::new()),
            events: RefCell::new(HashMap::new()),
        }
    }

    /// Entity name, or the id itself when the entity cannot be resolved.
    fn entity_name(&self, entity_id: &str) -> String {
        if let Some(name) = self.names.borrow().get(entity_id) {
            return name.clone();
        }
        let name = match self.store.get_entity(entity_id) {
            Ok(Some(entity)) => entity.name,
            Ok(None) => entity_id.to_string(),
            Err(e) => {
                debug!(entity_id = %entity_id, error = %e, "Entity lookup failed, using id");
                entity_id.to_string()
            }
        };
        self.names.borrow_mut().insert(entity_id.to_string(), name.clone());
        name
    }

    fn event(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        if let Some(cached) = self.events.borrow().get(event_id) {
            return Ok(cached.clone());
        }
        let event = self.store.get_event(event_id)?;
        self.events.borrow_mut().insert(event_id.to_string(), event.clone());
        Ok(event)
    }
}

pub struct RiskMetricsAggregator {
    top_risks_limit: usize,
    top_entities_limit: usize,
}

fn by_severity(a: &Risk, b: &Risk) -> std::cmp::Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.likelihood.total_cmp(&a.likelihood))
        .then_with(|| a.id.cmp(&b.id))
}

impl RiskMetricsAggregator {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            top_risks_limit: settings.top_risks_limit,
            top_entities_limit: settings.top_entities_limit,
        }
    }

    /// Metrics over the current snapshot; logs and returns the zeroed record on failure.
    pub fn calculate_risk_metrics<S: RiskStore>(&self, store: &S) -> MetricsRecord {
        match self.try_calculate(store) {
            Ok(metrics) => metrics,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Failed to calculate risk metrics");
                MetricsRecord::default()
            }
        }
    }

    pub fn try_calculate<S: RiskStore>(&self, store: &S) -> Result<MetricsRecord, AppError> {
        let mut risks = store.get_all_risks()?;
        risks.sort_by(|a, b| a.id.cmp(&b.id));

        let mut metrics = MetricsRecord {
            total_risks: risks.len(),
            ..MetricsRecord::default()
        };
        if risks.is_empty() {
            return Ok(metrics);
        }

        let lookups = LookupCache::new(store);
        let total = risks.len();

        for risk in &risks {
            *metrics.risk_type_distribution.entry(risk.risk_type).or_insert(0) += 1;
            *metrics.risk_severity_distribution.entry(risk.severity).or_insert(0) += 1;
        }

        metrics.risk_categories = metrics
            .risk_type_distribution
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(category, count)| CategoryShare {
                name: *category,
                count: *count,
                percentage: percentage(*count, total),
            })
            .collect();
        // Stable sort keeps rank order among equal counts.
        metrics.risk_categories.sort_by(|a, b| b.count.cmp(&a.count));

        metrics.severity_distribution = metrics
            .risk_severity_distribution
            .iter()
            .map(|(level, count)| SeverityShare {
                level: *level,
                count: *count,
                percentage: percentage(*count, total),
            })
            .collect();

        metrics.most_affected_entities = self.most_affected_entities(store, &risks)?;

        let mut ranked: Vec<&Risk> = risks.iter().collect();
        ranked.sort_by(|a, b| by_severity(a, b));
        metrics.highest_severity_risks = ranked
            .into_iter()
            .take(self.top_risks_limit)
            .map(RiskSummary::from)
            .collect();

        for event in store.get_all_events()? {
            for category in metrics.risk_categories.iter().map(|share| share.name) {
                metrics
                    .risk_event_correlation
                    .entry(category)
                    .or_default()
                    .entry(event.event_type.clone())
                    .or_insert(0);
            }
        }

        for risk in &risks {
            let event = match risk.triggering_event() {
                Some(event_id) => lookups.event(event_id)?,
                None => None,
            };

            if let Some(event) = &event {
                *metrics
                    .risk_event_correlation
                    .entry(risk.risk_type)
                    .or_default()
                    .entry(event.event_type.clone())
                    .or_insert(0) += 1;
            }

            let timestamp = event.as_ref().map_or(risk.created_at, |event| event.event_date);
            let bucket = metrics
                .risk_over_time
                .entry(format_day(day_bucket(timestamp)))
                .or_default();
            bucket.total += 1;
            *bucket.by_type.entry(risk.risk_type).or_insert(0) += 1;
        }

        debug!(
            total_risks = metrics.total_risks,
            entities = metrics.most_affected_entities.len(),
            days = metrics.risk_over_time.len(),
            "Calculated risk metrics"
        );
        Ok(metrics)
    }

    fn most_affected_entities<S: RiskStore>(&self, store: &S, risks: &[Risk]) -> Result<Vec<EntityExposure>, AppError> {
        let mut touches: BTreeMap<&str, usize> = BTreeMap::new();
        for risk in risks {
            for entity_id in risk.entities.keys() {
                *touches.entry(entity_id.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = touches.into_iter().collect();
        // BTreeMap order already sorts ids ascending; stable sort keeps it for ties.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let mut exposures = Vec::new();
        for (entity_id, risk_count) in ranked {
            if exposures.len() >= self.top_entities_limit {
                break;
            }
            match store.get_entity(entity_id)? {
                Some(entity) => exposures.push(EntityExposure {
                    id: entity.id,
                    name: entity.name,
                    entity_type: entity.entity_type,
                    risk_count,
                    percentage: percentage(risk_count, risks.len()),
                }),
                None => debug!(entity_id = %entity_id, "Skipping unresolved entity in exposure ranking"),
            }
        }
        Ok(exposures)
    }

    /// The `limit` most severe risks, ordered by severity, then likelihood, then id.
    pub fn get_top_risks<S: RiskStore>(&self, store: &S, limit: usize) -> Vec<RiskSummary> {
        match store.get_all_risks() {
            Ok(mut risks) => {
                risks.sort_by(by_severity);
                risks.iter().take(limit).map(RiskSummary::from).collect()
            }
            Err(e) => {
                error!(error = %e, "Failed to load risks for ranking");
                Vec::new()
            }
        }
    }

    /// Every related-risk annotation flattened into path records.
    pub fn find_risk_transmission_paths<S: RiskStore>(&self, store: &S) -> Vec<PathRecord> {
        match self.try_transmission_paths(store) {
            Ok(paths) => paths,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Failed to collect transmission paths");
                Vec::new()
            }
        }
    }

    fn try_transmission_paths<S: RiskStore>(&self, store: &S) -> Result<Vec<PathRecord>, AppError> {
        let mut risks = store.get_all_risks()?;
        risks.sort_by(|a, b| a.id.cmp(&b.id));
        let by_id: BTreeMap<&str, &Risk> = risks.iter().map(|risk| (risk.id.as_str(), risk)).collect();
        let lookups = LookupCache::new(store);

        let mut paths = Vec::new();
        for risk in &risks {
            for (target_id, related) in &risk.related_risks {
                match by_id.get(target_id.as_str()) {
                    Some(target) => paths.push(path_record(&lookups, risk, target, related)),
                    None => warn!(source_id = %risk.id, target_id = %target_id, "Related risk not found, skipping"),
                }
            }
        }
        Ok(paths)
    }

    /// Path records leading from `source_id` to `target_id`: the direct annotation
    /// if there is one, otherwise the shortest chain over related-risk links.
    pub fn find_risk_path<S: RiskStore>(&self, store: &S, source_id: &str, target_id: &str) -> Vec<PathRecord> {
        match self.try_risk_path(store, source_id, target_id) {
            Ok(path) => path,
            Err(e) => {
                error!(source_id = %source_id, target_id = %target_id, error = %e, "Failed to find risk path");
                Vec::new()
            }
        }
    }

    fn try_risk_path<S: RiskStore>(&self, store: &S, source_id: &str, target_id: &str) -> Result<Vec<PathRecord>, AppError> {
        let lookups = LookupCache::new(store);

        let (Some(source), Some(target)) = (store.get_risk(source_id)?, store.get_risk(target_id)?) else {
            warn!(source_id = %source_id, target_id = %target_id, "Risk not found for path search");
            return Ok(Vec::new());
        };

        if let Some(related) = source.related_risks.get(target_id) {
            return Ok(vec![path_record(&lookups, &source, &target, related)]);
        }

        let risks = store.get_all_risks()?;
        let mut graph = RiskGraph::new();
        for risk in &risks {
            graph.add_node(&risk.id);
            for (related_id, related) in &risk.related_risks {
                graph.add_edge(&risk.id, related_id, related.strength().unwrap_or(DEFAULT_PATH_STRENGTH));
            }
        }

        let Some(hops) = graph.shortest_path(source_id, target_id, None) else {
            debug!(source_id = %source_id, target_id = %target_id, "No path between risks");
            return Ok(Vec::new());
        };

        let by_id: BTreeMap<&str, &Risk> = risks.iter().map(|risk| (risk.id.as_str(), risk)).collect();
        let records = hops
            .windows(2)
            .filter_map(|pair| {
                let from = by_id.get(pair[0].as_str())?;
                let to = by_id.get(pair[1].as_str())?;
                let related = from.related_risks.get(&pair[1])?;
                Some(path_record(&lookups, from, to, related))
            })
            .collect();
        Ok(records)
    }
}

fn path_record<S: RiskStore>(lookups: &LookupCache<'_, S>, source: &Risk, target: &Risk, related: &RelatedRisk) -> PathRecord {
    let path = match &related.transmission_path {
        Some(entity_ids) => entity_ids.iter().map(|id| lookups.entity_name(id)).collect(),
        None => shared_entities(source, target)
            .into_iter()
            .map(|id| lookups.entity_name(id))
            .collect(),
    };

    PathRecord {
        source_id: source.id.clone(),
        source_title: source.title.clone(),
        source_type: source.risk_type,
        target_id: target.id.clone(),
        target_title: target.title.clone(),
        target_type: target.risk_type,
        path,
        strength: related.strength().unwrap_or(DEFAULT_PATH_STRENGTH),
        relationship: related.relationship.as_str().to_string(),
    }
}
