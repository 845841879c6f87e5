// Risk Transmission Modeler - correlation and indirect transmission between identified risks
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::config::TransmissionSettings;
use crate::database::RiskStore;
use crate::error::{AppError, BatchFailure, FailureScope};
use crate::models::{Risk, RiskRelationship};
use crate::risk::graph::EntityGraph;

/// Counters for one modeling pass.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TransmissionSummary {
    pub risks: usize,
    pub pairs_evaluated: usize,
    pub pairs_same_event: usize,
    pub correlations: usize,
    pub transmissions: usize,
    #[serde(skip)]
    pub failures: Vec<BatchFailure>,
}

/// What a single pair evaluation concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum PairLink {
    Correlated { strength: f64 },
    Transmission { strength: f64, path: Vec<String> },
    Unrelated,
}

pub struct RiskTransmissionModeler {
    settings: TransmissionSettings,
}

/// Shared entities over the smaller entity set; 0 when either side has none.
pub fn entity_overlap(a: &Risk, b: &Risk) -> f64 {
    let smaller = a.entities.len().min(b.entities.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.entities.keys().filter(|id| b.entities.contains_key(*id)).count();
    shared as f64 / smaller as f64
}

fn same_triggering_event(a: &Risk, b: &Risk) -> bool {
    match (a.triggering_event(), b.triggering_event()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

impl RiskTransmissionModeler {
    pub fn new(settings: TransmissionSettings) -> Self {
        Self { settings }
    }

    /// Annotate every eligible pair of stored risks.
    ///
    /// Loading risks or relationships is all-or-nothing; after that, a pair whose
    /// annotations cannot be saved on both sides is rolled back, recorded in the
    /// summary and skipped.
    pub fn model<S: RiskStore>(&self, store: &mut S) -> Result<TransmissionSummary, AppError> {
        let mut risks = store.get_all_risks()?;
        risks.sort_by(|a, b| a.id.cmp(&b.id));

        let mut summary = TransmissionSummary {
            risks: risks.len(),
            ..TransmissionSummary::default()
        };
        if risks.len() < 2 {
            debug!(risks = risks.len(), "Fewer than two risks, nothing to model");
            return Ok(summary);
        }

        let relationships = store.get_all_relationships()?;
        let graph = EntityGraph::from_relationships(&relationships, self.settings.min_edge_confidence);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built entity graph for transmission modeling"
        );

        for j in 1..risks.len() {
            let (head, tail) = risks.split_at_mut(j);
            let b = &mut tail[0];

            for a in head.iter_mut() {
                if same_triggering_event(a, b) {
                    summary.pairs_same_event += 1;
                    continue;
                }
                summary.pairs_evaluated += 1;

                let link = self.evaluate_pair(&graph, a, b);
                if link == PairLink::Unrelated {
                    continue;
                }

                let (a_before, b_before) = (a.clone(), b.clone());
                self.apply_link(a, b, &link);

                if let Err(e) = persist_pair(store, a, b, &a_before) {
                    warn!(source_id = %a.id, target_id = %b.id, error = %e, "Failed to persist pair annotations");
                    *a = a_before;
                    *b = b_before;
                    summary.failures.push(BatchFailure::new(
                        FailureScope::RiskPair {
                            source_id: a.id.clone(),
                            target_id: b.id.clone(),
                        },
                        e,
                    ));
                    continue;
                }

                match &link {
                    PairLink::Correlated { .. } => summary.correlations += 1,
                    PairLink::Transmission { .. } => summary.transmissions += 1,
                    PairLink::Unrelated => {}
                }
            }
        }

        info!(
            risks = summary.risks,
            pairs = summary.pairs_evaluated,
            correlations = summary.correlations,
            transmissions = summary.transmissions,
            failures = summary.failures.len(),
            "Transmission modeling complete"
        );
        Ok(summary)
    }

    /// Classify one pair. `a` is the side the returned path starts from.
    pub fn evaluate_pair(&self, graph: &EntityGraph, a: &Risk, b: &Risk) -> PairLink {
        let overlap = entity_overlap(a, b);
        if overlap > 0.0 {
            return PairLink::Correlated { strength: overlap };
        }

        let sources: Vec<&str> = a.entities.keys().map(String::as_str).collect();
        let targets: Vec<&str> = b.entities.keys().map(String::as_str).collect();

        match graph.shortest_path_between(&sources, &targets, self.settings.max_path_length) {
            Some(path) if path.len() >= 2 => {
                let path_length = path.len() - 1;
                PairLink::Transmission {
                    strength: 1.0 / path_length as f64,
                    path,
                }
            }
            _ => PairLink::Unrelated,
        }
    }

    /// Write the link onto both risks.
    fn apply_link(&self, a: &mut Risk, b: &mut Risk, link: &PairLink) {
        match link {
            PairLink::Correlated { strength } => {
                a.annotate_correlation(b.id.clone(), *strength);
                b.annotate_correlation(a.id.clone(), *strength);
            }
            PairLink::Transmission { strength, path } => {
                let (label_a, label_b) = RiskRelationship::for_transmission(a.risk_type, b.risk_type);
                let mut reversed = path.clone();
                reversed.reverse();

                a.annotate_transmission(b.id.clone(), label_a, *strength, path.clone());
                b.annotate_transmission(a.id.clone(), label_b, *strength, reversed);
            }
            PairLink::Unrelated => {}
        }
    }
}

/// Save both sides of an annotated pair. If the second save fails the first side
/// is restored to `a_before`, so the store never holds a one-sided link.
fn persist_pair<S: RiskStore>(store: &mut S, a: &Risk, b: &Risk, a_before: &Risk) -> Result<(), AppError> {
    store.save_risk(a.clone())?;
    if let Err(e) = store.save_risk(b.clone()) {
        if let Err(rollback) = store.save_risk(a_before.clone()) {
            error!(risk_id = %a.id, error = %rollback, "Failed to roll back one-sided annotation");
        }
        return Err(e);
    }
    Ok(())
}

/// Entity ids shared by two risks, ascending.
pub fn shared_entities<'a>(a: &'a Risk, b: &'a Risk) -> BTreeSet<&'a str> {
    a.entities
        .keys()
        .filter(|id| b.entities.contains_key(*id))
        .map(String::as_str)
        .collect()
}
