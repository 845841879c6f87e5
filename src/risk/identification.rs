// Risk Identification Engine - scores events against the pattern catalog and creates risks
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineSettings;
use crate::database::RiskStore;
use crate::error::{AppError, BatchFailure, FailureScope};
use crate::models::{CreateRisk, Entity, Event, Risk, RiskCategory, MAX_SEVERITY, MIN_SEVERITY};
use crate::risk::catalog::{CategoryScan, CompiledCatalog};
use crate::utils::math::{clamp_unit, round_to};

pub const MIN_LIKELIHOOD: f64 = 0.1;
pub const MAX_LIKELIHOOD: f64 = 0.9;

/// Maps a category's match count to severity and likelihood.
///
/// severity   = clamp(matches / matches_per_severity_level, 1, 5)
/// likelihood = clamp(matches * likelihood_per_match, 0.1, 0.9)
///
/// Both are non-decreasing in the match count.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRules {
    pub min_match_count: usize,
    pub matches_per_severity_level: usize,
    pub likelihood_per_match: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for ScoringRules {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            min_match_count: settings.min_match_count.max(1),
            matches_per_severity_level: settings.matches_per_severity_level.max(1),
            likelihood_per_match: settings.likelihood_per_match,
        }
    }
}

impl ScoringRules {
    pub fn is_triggered(&self, match_count: usize) -> bool {
        match_count > 0 && match_count >= self.min_match_count
    }

    pub fn severity(&self, match_count: usize) -> u8 {
        let level = match_count / self.matches_per_severity_level;
        level.clamp(MIN_SEVERITY as usize, MAX_SEVERITY as usize) as u8
    }

    pub fn likelihood(&self, match_count: usize) -> f64 {
        let raw = clamp_unit(match_count as f64 * self.likelihood_per_match, MIN_LIKELIHOOD, MAX_LIKELIHOOD);
        round_to(raw, 2)
    }
}

/// Result of running identification over every event in the store.
#[derive(Debug, Clone, Default)]
pub struct IdentificationOutcome {
    pub risk_ids: Vec<String>,
    pub events_processed: usize,
    pub failures: Vec<BatchFailure>,
}

/// An event that stopped part-way. Risks listed in `saved_risk_ids` were already
/// written to the store before `error` occurred.
#[derive(Debug, Clone)]
pub struct EventFailure {
    pub saved_risk_ids: Vec<String>,
    pub error: AppError,
}

impl From<AppError> for EventFailure {
    fn from(error: AppError) -> Self {
        Self {
            saved_risk_ids: Vec::new(),
            error,
        }
    }
}

pub struct RiskIdentificationEngine {
    catalog: Arc<CompiledCatalog>,
    rules: ScoringRules,
}

impl RiskIdentificationEngine {
    pub fn new(catalog: Arc<CompiledCatalog>, rules: ScoringRules) -> Self {
        Self { catalog, rules }
    }

    /// Score every event. A failing event is recorded and contributes only the
    /// risks it saved before failing; only a failure to list events aborts the pass.
    pub fn identify_all<S: RiskStore>(&self, store: &mut S) -> Result<IdentificationOutcome, AppError> {
        let events = store.get_all_events()?;
        let mut outcome = IdentificationOutcome::default();

        for event in &events {
            outcome.events_processed += 1;
            match self.identify_event(store, event) {
                Ok(risk_ids) => {
                    info!(event_id = %event.id, risks = risk_ids.len(), "Identified risks from event");
                    outcome.risk_ids.extend(risk_ids);
                }
                Err(failure) => {
                    warn!(
                        event_id = %event.id,
                        error = %failure.error,
                        kind = failure.error.kind(),
                        saved = failure.saved_risk_ids.len(),
                        "Risk identification failed for event"
                    );
                    outcome.risk_ids.extend(failure.saved_risk_ids);
                    outcome
                        .failures
                        .push(BatchFailure::new(FailureScope::Event { event_id: event.id.clone() }, failure.error));
                }
            }
        }

        Ok(outcome)
    }

    /// Create and persist one risk per triggered category for `event`.
    ///
    /// Every risk is built before the first write. If a write fails, the ids
    /// already saved travel with the error.
    pub fn identify_event<S: RiskStore>(&self, store: &mut S, event: &Event) -> Result<Vec<String>, EventFailure> {
        let corpus = self.build_corpus(store, event)?;
        let triggered: Vec<CategoryScan> = self
            .catalog
            .scan(&corpus)
            .into_iter()
            .filter(|scan| self.rules.is_triggered(scan.match_count))
            .collect();

        if triggered.is_empty() {
            debug!(event_id = %event.id, "No risk patterns matched");
            return Ok(Vec::new());
        }

        let entities = self.resolve_entities(store, event)?;
        let risks: Vec<Risk> = triggered
            .iter()
            .map(|scan| {
                let risk = self.build_risk(event, &entities, scan);
                debug!(
                    risk_id = %risk.id,
                    category = %scan.category,
                    matches = scan.match_count,
                    severity = risk.severity,
                    likelihood = risk.likelihood,
                    "Created risk"
                );
                risk
            })
            .collect();

        let mut saved_risk_ids = Vec::with_capacity(risks.len());
        for risk in risks {
            let risk_id = risk.id.clone();
            if let Err(error) = store.save_risk(risk) {
                return Err(EventFailure { saved_risk_ids, error });
            }
            saved_risk_ids.push(risk_id);
        }

        Ok(saved_risk_ids)
    }

    /// Lower-cased event title, description and linked news text.
    fn build_corpus<S: RiskStore>(&self, store: &S, event: &Event) -> Result<String, AppError> {
        let mut corpus = format!("{} {} ", event.title, event.description);

        for news_id in &event.news_sources {
            match store.get_news(news_id)? {
                Some(news) => {
                    corpus.push_str(&news.title);
                    corpus.push(' ');
                    corpus.push_str(&news.content);
                    corpus.push(' ');
                }
                None => warn!(event_id = %event.id, news_id = %news_id, "Linked news item not found, skipping"),
            }
        }

        Ok(corpus.to_lowercase())
    }

    fn resolve_entities<S: RiskStore>(&self, store: &S, event: &Event) -> Result<Vec<Entity>, AppError> {
        let mut entities = Vec::with_capacity(event.entities.len());
        for entity_id in &event.entities {
            match store.get_entity(entity_id)? {
                Some(entity) => entities.push(entity),
                None => warn!(event_id = %event.id, entity_id = %entity_id, "Event entity not found, skipping"),
            }
        }
        Ok(entities)
    }

    fn build_risk(&self, event: &Event, entities: &[Entity], scan: &CategoryScan) -> Risk {
        let category = scan.category;
        let mut risk = Risk::new(CreateRisk {
            title: self.risk_title(event, entities, category),
            description: self.risk_description(event, scan),
            risk_type: category,
            severity: self.rules.severity(scan.match_count),
            likelihood: self.rules.likelihood(scan.match_count),
            impact_areas: self.catalog.impact_areas(category),
        });

        risk.add_event(event.id.clone());
        for entity in entities {
            risk.add_entity(entity.id.clone(), self.catalog.impact_level(entity, category));
        }
        risk
    }

    fn risk_title(&self, event: &Event, entities: &[Entity], category: RiskCategory) -> String {
        let names: Vec<&str> = entities.iter().take(2).map(|entity| entity.name.as_str()).collect();
        let subject = if names.is_empty() {
            "Financial system".to_string()
        } else {
            names.join(" and ")
        };

        let event_type = event.display_type();
        let event_type = if event_type.is_empty() { "Unclassified".to_string() } else { event_type };

        format!("{} for {} from {} Event", category, subject, event_type)
    }

    fn risk_description(&self, event: &Event, scan: &CategoryScan) -> String {
        let mut description = format!(
            "Risk identified from event: {}. Event details: {}. ",
            event.title.trim_end_matches('.'),
            event.description.trim_end_matches('.'),
        );

        if !scan.indicators.is_empty() {
            let indicators: Vec<&str> = scan.indicators.iter().map(String::as_str).collect();
            description.push_str(&format!("Risk indicators found: {}. ", indicators.join(", ")));
        }

        description.push_str(self.catalog.explanation(scan.category));
        description.trim_end().to_string()
    }
}
