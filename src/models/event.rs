use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A financial event produced by the upstream extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub event_date: DateTime<Utc>,
    /// Involved entity ids, most prominent first.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Linked news item ids.
    #[serde(default)]
    pub news_sources: Vec<String>,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        event_type: impl Into<String>,
        event_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            event_type: event_type.into(),
            event_date,
            entities: Vec::new(),
            news_sources: Vec::new(),
        }
    }

    pub fn with_entities<I, S>(mut self, entity_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entity_id in entity_ids {
            let entity_id = entity_id.into();
            if !self.entities.contains(&entity_id) {
                self.entities.push(entity_id);
            }
        }
        self
    }

    pub fn with_news<I, S>(mut self, news_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.news_sources.extend(news_ids.into_iter().map(Into::into));
        self
    }

    /// "market_crash" -> "Market Crash"
    pub fn display_type(&self) -> String {
        self.event_type
            .split(|c: char| c == '_' || c.is_whitespace())
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

/// A news article linked to one or more events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl NewsItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            source: String::new(),
            url: String::new(),
            published_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_type_title_cases_snake_case() {
        let event = Event::new("e", "t", "d", "market_crash", Utc::now());
        assert_eq!(event.display_type(), "Market Crash");

        let event = Event::new("e", "t", "d", "RATE HIKE", Utc::now());
        assert_eq!(event.display_type(), "Rate Hike");
    }

    #[test]
    fn test_with_entities_keeps_order_and_dedupes() {
        let event = Event::new("e", "t", "d", "x", Utc::now()).with_entities(["b", "a", "b"]);
        assert_eq!(event.entities, vec!["b".to_string(), "a".to_string()]);
    }
}
