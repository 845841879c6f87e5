use crate::error::AppError;
use crate::models::{Entity, Event, NewsItem, Relationship, Risk};

/// Read/write access to the records the engine works on.
///
/// Lookups by id return `Ok(None)` on a miss; `Err` is reserved for failures of
/// the store itself. Writes must be visible to subsequent reads in the same run.
pub trait RiskStore {
    fn get_all_events(&self) -> Result<Vec<Event>, AppError>;
    fn get_event(&self, event_id: &str) -> Result<Option<Event>, AppError>;
    fn get_news(&self, news_id: &str) -> Result<Option<NewsItem>, AppError>;
    fn get_entity(&self, entity_id: &str) -> Result<Option<Entity>, AppError>;
    fn get_all_relationships(&self) -> Result<Vec<Relationship>, AppError>;
    fn get_all_risks(&self) -> Result<Vec<Risk>, AppError>;
    fn get_risk(&self, risk_id: &str) -> Result<Option<Risk>, AppError>;
    fn save_risk(&mut self, risk: Risk) -> Result<(), AppError>;
}
