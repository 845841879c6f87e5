use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// The eight fixed risk categories.
///
/// Declaration order is the transmission rank: a lower-ranked category is
/// considered a potential cause of a higher-ranked one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "Market Risk")]
    Market,
    #[serde(rename = "Credit Risk")]
    Credit,
    #[serde(rename = "Liquidity Risk")]
    Liquidity,
    #[serde(rename = "Operational Risk")]
    Operational,
    #[serde(rename = "Legal Risk")]
    Legal,
    #[serde(rename = "Strategic Risk")]
    Strategic,
    #[serde(rename = "Reputation Risk")]
    Reputation,
    #[serde(rename = "Regulatory Risk")]
    Regulatory,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 8] = [
        RiskCategory::Market,
        RiskCategory::Credit,
        RiskCategory::Liquidity,
        RiskCategory::Operational,
        RiskCategory::Legal,
        RiskCategory::Strategic,
        RiskCategory::Reputation,
        RiskCategory::Regulatory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Market => "Market Risk",
            RiskCategory::Credit => "Credit Risk",
            RiskCategory::Liquidity => "Liquidity Risk",
            RiskCategory::Operational => "Operational Risk",
            RiskCategory::Legal => "Legal Risk",
            RiskCategory::Strategic => "Strategic Risk",
            RiskCategory::Reputation => "Reputation Risk",
            RiskCategory::Regulatory => "Regulatory Risk",
        }
    }

    /// Transmission rank, 1 (Market) through 8 (Regulatory).
    pub fn rank(&self) -> u8 {
        *self as u8 + 1
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label one risk carries for another in `related_risks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRelationship {
    CorrelatedWith,
    MayCause,
    MayBeCausedBy,
    MayInfluence,
}

impl RiskRelationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskRelationship::CorrelatedWith => "correlated_with",
            RiskRelationship::MayCause => "may_cause",
            RiskRelationship::MayBeCausedBy => "may_be_caused_by",
            RiskRelationship::MayInfluence => "may_influence",
        }
    }

    /// Labels for (lower side, higher side) of a transmission between two categories.
    pub fn for_transmission(from: RiskCategory, to: RiskCategory) -> (Self, Self) {
        match from.rank().cmp(&to.rank()) {
            std::cmp::Ordering::Less => (RiskRelationship::MayCause, RiskRelationship::MayBeCausedBy),
            std::cmp::Ordering::Greater => (RiskRelationship::MayBeCausedBy, RiskRelationship::MayCause),
            std::cmp::Ordering::Equal => (RiskRelationship::MayInfluence, RiskRelationship::MayInfluence),
        }
    }
}

impl fmt::Display for RiskRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annotations one risk holds about a related risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedRisk {
    pub relationship: RiskRelationship,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission_strength: Option<f64>,
    /// Entity ids from this risk's side to the related risk's side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission_path: Option<Vec<String>>,
}

impl RelatedRisk {
    pub fn new(relationship: RiskRelationship) -> Self {
        Self {
            relationship,
            correlation_strength: None,
            transmission_strength: None,
            transmission_path: None,
        }
    }

    /// Correlation strength if present, otherwise transmission strength.
    pub fn strength(&self) -> Option<f64> {
        self.correlation_strength.or(self.transmission_strength)
    }
}

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 5;
pub const FALLBACK_IMPACT_AREAS: [&str; 2] = ["Financial", "Operational"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub title: String,
    pub description: String,
    pub risk_type: RiskCategory,
    pub severity: u8,
    pub likelihood: f64,
    pub impact_areas: Vec<String>,
    /// entity id -> impact level in [0, 1]
    #[serde(default)]
    pub entities: BTreeMap<String, f64>,
    /// Triggering event first.
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub related_risks: BTreeMap<String, RelatedRisk>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRisk {
    pub title: String,
    pub description: String,
    pub risk_type: RiskCategory,
    pub severity: u8,
    pub likelihood: f64,
    pub impact_areas: Vec<String>,
}

impl Risk {
    pub fn new(create_risk: CreateRisk) -> Self {
        let impact_areas = if create_risk.impact_areas.is_empty() {
            FALLBACK_IMPACT_AREAS.iter().map(|area| area.to_string()).collect()
        } else {
            create_risk.impact_areas
        };

        Self {
            id: Uuid::new_v4().to_string(),
            title: create_risk.title,
            description: create_risk.description,
            risk_type: create_risk.risk_type,
            severity: create_risk.severity.clamp(MIN_SEVERITY, MAX_SEVERITY),
            likelihood: if create_risk.likelihood.is_finite() {
                create_risk.likelihood.clamp(0.0, 1.0)
            } else {
                0.0
            },
            impact_areas,
            entities: BTreeMap::new(),
            events: Vec::new(),
            related_risks: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach an impacted entity; a repeated id overwrites its impact level.
    pub fn add_entity(&mut self, entity_id: impl Into<String>, impact_level: f64) {
        let impact_level = if impact_level.is_finite() { impact_level.clamp(0.0, 1.0) } else { 0.0 };
        self.entities.insert(entity_id.into(), impact_level);
    }

    pub fn add_event(&mut self, event_id: impl Into<String>) {
        let event_id = event_id.into();
        if !self.events.contains(&event_id) {
            self.events.push(event_id);
        }
    }

    pub fn triggering_event(&self) -> Option<&str> {
        self.events.first().map(String::as_str)
    }

    /// Record (or relabel) a related risk and return its annotation slot.
    pub fn add_related_risk(&mut self, risk_id: impl Into<String>, relationship: RiskRelationship) -> &mut RelatedRisk {
        let related = self
            .related_risks
            .entry(risk_id.into())
            .or_insert_with(|| RelatedRisk::new(relationship));
        related.relationship = relationship;
        related
    }

    pub fn annotate_correlation(&mut self, risk_id: impl Into<String>, strength: f64) {
        let related = self.add_related_risk(risk_id, RiskRelationship::CorrelatedWith);
        related.correlation_strength = Some(strength);
        related.transmission_strength = None;
        related.transmission_path = None;
    }

    pub fn annotate_transmission(
        &mut self,
        risk_id: impl Into<String>,
        relationship: RiskRelationship,
        strength: f64,
        path: Vec<String>,
    ) {
        let related = self.add_related_risk(risk_id, relationship);
        related.correlation_strength = None;
        related.transmission_strength = Some(strength);
        related.transmission_path = Some(path);
    }

    pub fn impact_on(&self, entity_id: &str) -> Option<f64> {
        self.entities.get(entity_id).copied()
    }
}
