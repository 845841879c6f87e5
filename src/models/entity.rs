use serde::{Deserialize, Serialize};

/// A financial entity extracted upstream. Read-only inside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub mention_count: u32,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type: entity_type.into(),
            subtype: None,
            mention_count: 0,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Broad class used for the `DEFAULT_<CLASS>` impact rows.
    pub fn entity_class(&self) -> Option<EntityClass> {
        EntityClass::from_type(&self.entity_type)
            .or_else(|| self.subtype.as_deref().and_then(EntityClass::from_type))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityClass {
    Organization,
    Person,
    Instrument,
}

impl EntityClass {
    pub fn from_type(entity_type: &str) -> Option<Self> {
        match entity_type.trim().to_lowercase().as_str() {
            "organization" | "org" | "company" | "bank" | "insurance" | "asset manager"
            | "regulator" | "central bank" | "government" | "exchange" => Some(EntityClass::Organization),
            "person" | "per" => Some(EntityClass::Person),
            "instrument" | "product" | "stock" | "bond" | "currency" | "commodity" | "index" => {
                Some(EntityClass::Instrument)
            }
            _ => None,
        }
    }

    /// Key of the fallback row in the impact matrix.
    pub fn default_row_key(&self) -> &'static str {
        match self {
            EntityClass::Organization => "DEFAULT_ORGANIZATION",
            EntityClass::Person => "DEFAULT_PERSON",
            EntityClass::Instrument => "DEFAULT_INSTRUMENT",
        }
    }
}
