use serde::{Deserialize, Serialize};

fn default_confidence() -> f64 {
    1.0
}

/// Extracted link between two entities, weighted by extraction confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type", default)]
    pub relationship_type: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type: relationship_type.into(),
            confidence,
        }
    }
}
