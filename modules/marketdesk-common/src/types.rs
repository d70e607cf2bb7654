use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// --- Enums ---

/// Where a market event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    #[serde(rename = "Alpha Vantage")]
    AlphaVantage,
    #[serde(rename = "Event Registry")]
    EventRegistry,
    #[serde(rename = "Custom Event")]
    Custom,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::AlphaVantage => "Alpha Vantage",
            EventSource::EventRegistry => "Event Registry",
            EventSource::Custom => "Custom Event",
        }
    }
}

impl FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Alpha Vantage" => Ok(EventSource::AlphaVantage),
            "Event Registry" => Ok(EventSource::EventRegistry),
            "Custom Event" => Ok(EventSource::Custom),
            other => Err(format!("unknown event source: {other}")),
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an event sits in the enrichment pipeline.
///
/// Researching -> Writing -> FetchingAnalytics -> Drafted; any stage may
/// divert to Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
    Researching,
    Writing,
    #[serde(rename = "Fetching Analytics")]
    FetchingAnalytics,
    Drafted,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Researching => "Researching",
            ProcessingStatus::Writing => "Writing",
            ProcessingStatus::FetchingAnalytics => "Fetching Analytics",
            ProcessingStatus::Drafted => "Drafted",
            ProcessingStatus::Failed => "Failed",
        }
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Researching" => Ok(ProcessingStatus::Researching),
            "Writing" => Ok(ProcessingStatus::Writing),
            "Fetching Analytics" => Ok(ProcessingStatus::FetchingAnalytics),
            "Drafted" => Ok(ProcessingStatus::Drafted),
            "Failed" => Ok(ProcessingStatus::Failed),
            other => Err(format!("unknown processing status: {other}")),
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Neutral => "NEUTRAL",
        }
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POSITIVE" => Ok(Sentiment::Positive),
            "NEGATIVE" => Ok(Sentiment::Negative),
            "NEUTRAL" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            "LOW" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Editorial lifecycle of a post: Draft -> Approved -> Published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStatus {
    Draft,
    Approved,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "Draft",
            PostStatus::Approved => "Approved",
            PostStatus::Published => "Published",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(PostStatus::Draft),
            "Approved" => Ok(PostStatus::Approved),
            "Published" => Ok(PostStatus::Published),
            other => Err(format!("unknown post status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentTone {
    Formal,
    Neutral,
    Informal,
}

impl ContentTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTone::Formal => "Formal",
            ContentTone::Neutral => "Neutral",
            ContentTone::Informal => "Informal",
        }
    }
}

// --- Articles ---

/// A provider-shape-independent article as fetched from a news API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub time_published: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub overall_sentiment_score: Option<f64>,
    #[serde(default)]
    pub overall_sentiment_label: Option<String>,
}

// --- Live enrichment snapshot ---

/// The live state of one market event as the pipeline advances it.
/// Broadcast after every stage and persisted alongside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub id: Uuid,
    pub title: String,
    pub banner: Option<String>,
    pub description: String,
    pub sentiment: Option<Sentiment>,
    pub priority_flag: Option<Priority>,
    pub compliance_check: Option<String>,
    pub deep_research: Option<String>,
    pub summary: Option<String>,
    pub processing_status: ProcessingStatus,
    pub source: EventSource,
    pub editable: bool,
    pub updated_at: DateTime<Utc>,
}

impl EventSnapshot {
    /// Fresh snapshot for a just-created event, before any enrichment ran.
    pub fn new(id: Uuid, title: String, description: String, source: EventSource) -> Self {
        Self {
            id,
            title,
            banner: None,
            description,
            sentiment: None,
            priority_flag: None,
            compliance_check: None,
            deep_research: None,
            summary: None,
            processing_status: ProcessingStatus::Researching,
            source,
            editable: false,
            updated_at: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_wire_strings_roundtrip() {
        for source in [
            EventSource::AlphaVantage,
            EventSource::EventRegistry,
            EventSource::Custom,
        ] {
            assert_eq!(source.as_str().parse::<EventSource>().unwrap(), source);
        }
        for status in [
            ProcessingStatus::Researching,
            ProcessingStatus::Writing,
            ProcessingStatus::FetchingAnalytics,
            ProcessingStatus::Drafted,
            ProcessingStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ProcessingStatus>().unwrap(), status);
        }
    }

    #[test]
    fn serde_uses_wire_strings() {
        let json = serde_json::to_string(&ProcessingStatus::FetchingAnalytics).unwrap();
        assert_eq!(json, "\"Fetching Analytics\"");

        let sentiment: Sentiment = serde_json::from_str("\"POSITIVE\"").unwrap();
        assert_eq!(sentiment, Sentiment::Positive);
    }

    #[test]
    fn unknown_wire_string_is_rejected() {
        assert!("Bullish".parse::<Sentiment>().is_err());
        assert!("Queued".parse::<ProcessingStatus>().is_err());
    }

    #[test]
    fn fresh_snapshot_starts_researching() {
        let snapshot = EventSnapshot::new(
            Uuid::new_v4(),
            "Fed holds rates".into(),
            "FOMC statement".into(),
            EventSource::AlphaVantage,
        );
        assert_eq!(snapshot.processing_status, ProcessingStatus::Researching);
        assert!(!snapshot.editable);
        assert!(snapshot.sentiment.is_none());
    }
}
