use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::database::RiskStore;
use crate::error::{AppError, BatchFailure, FailureScope};
use crate::risk::catalog::{CompiledCatalog, PatternCatalog};
use crate::risk::identification::{RiskIdentificationEngine, ScoringRules};
use crate::risk::metrics::{MetricsRecord, PathRecord, RiskMetricsAggregator, RiskSummary};
use crate::risk::transmission::{RiskTransmissionModeler, TransmissionSummary};

/// Outcome of a full identification + transmission pass.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub risk_ids: Vec<String>,
    pub events_processed: usize,
    pub failures: Vec<BatchFailure>,
    /// `None` when the transmission phase could not run.
    pub transmission: Option<TransmissionSummary>,
}

impl AnalysisReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Entry point tying the store to the three analysis components.
pub struct RiskAnalyzer<S: RiskStore> {
    store: S,
    engine: RiskIdentificationEngine,
    modeler: RiskTransmissionModeler,
    aggregator: RiskMetricsAggregator,
}

impl<S: RiskStore> RiskAnalyzer<S> {
    /// Build an analyzer, loading the catalog named in settings or the built-in one.
    pub fn new(store: S, settings: &Settings) -> Result<Self, AppError> {
        let catalog = match &settings.catalog.path {
            Some(path) => PatternCatalog::from_json_file(path)?.compile()?,
            None => CompiledCatalog::builtin()?,
        };
        Ok(Self::with_catalog(store, settings, Arc::new(catalog)))
    }

    pub fn with_catalog(store: S, settings: &Settings, catalog: Arc<CompiledCatalog>) -> Self {
        Self {
            store,
            engine: RiskIdentificationEngine::new(catalog, ScoringRules::from(&settings.engine)),
            modeler: RiskTransmissionModeler::new(settings.transmission.clone()),
            aggregator: RiskMetricsAggregator::new(&settings.engine),
        }
    }

    /// Identify risks for every event, then model transmission across all risks.
    pub fn run_analysis(&mut self) -> AnalysisReport {
        let mut report = AnalysisReport::default();

        match self.engine.identify_all(&mut self.store) {
            Ok(outcome) => {
                report.risk_ids = outcome.risk_ids;
                report.events_processed = outcome.events_processed;
                report.failures = outcome.failures;
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Failed to load events for risk identification");
                report.failures.push(BatchFailure::new(FailureScope::Identification, e));
                return report;
            }
        }

        match self.modeler.model(&mut self.store) {
            Ok(mut summary) => {
                report.failures.append(&mut summary.failures);
                report.transmission = Some(summary);
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Transmission modeling failed, risks left unannotated");
                report.failures.push(BatchFailure::new(FailureScope::Transmission, e));
            }
        }

        info!(
            events = report.events_processed,
            risks = report.risk_ids.len(),
            failures = report.failures.len(),
            "Risk analysis complete"
        );
        report
    }

    /// Ids of the risks created by a full analysis pass.
    pub fn identify_all_risks(&mut self) -> Vec<String> {
        self.run_analysis().risk_ids
    }

    pub fn find_risk_transmission_paths(&self) -> Vec<PathRecord> {
        self.aggregator.find_risk_transmission_paths(&self.store)
    }

    pub fn find_risk_path(&self, source_id: &str, target_id: &str) -> Vec<PathRecord> {
        self.aggregator.find_risk_path(&self.store, source_id, target_id)
    }

    pub fn calculate_risk_metrics(&self) -> MetricsRecord {
        self.aggregator.calculate_risk_metrics(&self.store)
    }

    pub fn get_top_risks(&self, limit: usize) -> Vec<RiskSummary> {
        self.aggregator.get_top_risks(&self.store, limit)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
