use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::database::store::RiskStore;
use crate::error::AppError;
use crate::models::{Entity, Event, NewsItem, Relationship, Risk};

/// Serialized form of a store, as exchanged with the extraction pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub risks: Vec<Risk>,
}

/// Process-local store backed by ordered maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entities: BTreeMap<String, Entity>,
    events: BTreeMap<String, Event>,
    news: BTreeMap<String, NewsItem>,
    relationships: Vec<Relationship>,
    risks: BTreeMap<String, Risk>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        for entity in snapshot.entities {
            store.insert_entity(entity);
        }
        for event in snapshot.events {
            store.insert_event(event);
        }
        for news in snapshot.news {
            store.insert_news(news);
        }
        for relationship in snapshot.relationships {
            store.insert_relationship(relationship);
        }
        for risk in snapshot.risks {
            store.risks.insert(risk.id.clone(), risk);
        }
        store
    }

    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;

        info!(
            path = %path.display(),
            entities = snapshot.entities.len(),
            events = snapshot.events.len(),
            news = snapshot.news.len(),
            relationships = snapshot.relationships.len(),
            risks = snapshot.risks.len(),
            "Loaded store snapshot"
        );

        Ok(Self::from_snapshot(snapshot))
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            entities: self.entities.values().cloned().collect(),
            events: self.events.values().cloned().collect(),
            news: self.news.values().cloned().collect(),
            relationships: self.relationships.clone(),
            risks: self.risks.values().cloned().collect(),
        }
    }

    pub fn insert_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn insert_event(&mut self, event: Event) {
        self.events.insert(event.id.clone(), event);
    }

    pub fn insert_news(&mut self, news: NewsItem) {
        self.news.insert(news.id.clone(), news);
    }

    pub fn insert_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn risk_count(&self) -> usize {
        self.risks.len()
    }
}

impl RiskStore for InMemoryStore {
    fn get_all_events(&self) -> Result<Vec<Event>, AppError> {
        Ok(self.events.values().cloned().collect())
    }

    fn get_event(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        Ok(self.events.get(event_id).cloned())
    }

    fn get_news(&self, news_id: &str) -> Result<Option<NewsItem>, AppError> {
        Ok(self.news.get(news_id).cloned())
    }

    fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>, AppError> {
        Ok(self.entities.get(entity_id).cloned())
    }

    fn get_all_relationships(&self) -> Result<Vec<Relationship>, AppError> {
        Ok(self.relationships.clone())
    }

    fn get_all_risks(&self) -> Result<Vec<Risk>, AppError> {
        Ok(self.risks.values().cloned().collect())
    }

    fn get_risk(&self, risk_id: &str) -> Result<Option<Risk>, AppError> {
        Ok(self.risks.get(risk_id).cloned())
    }

    fn save_risk(&mut self, risk: Risk) -> Result<(), AppError> {
        self.risks.insert(risk.id.clone(), risk);
        Ok(())
    }
}
