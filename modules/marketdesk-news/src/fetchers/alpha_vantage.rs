// Alpha Vantage NEWS_SENTIMENT feed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use marketdesk_common::{EventSource, MarketDeskError, RawArticle};

use super::NewsFetcher;

const FEED_LIMIT: u32 = 1000;
const LOOKBACK_HOURS: i64 = 24;

pub struct AlphaVantageFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feed: Vec<RawArticle>,
}

impl AlphaVantageFetcher {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build Alpha Vantage HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl NewsFetcher for AlphaVantageFetcher {
    async fn fetch(&self, _keyword: Option<&str>) -> Result<Vec<RawArticle>, MarketDeskError> {
        // Alpha Vantage expects YYYYMMDDTHHMM
        let time_from = (Utc::now() - chrono::Duration::hours(LOOKBACK_HOURS))
            .format("%Y%m%dT%H%M")
            .to_string();
        let limit = FEED_LIMIT.to_string();

        let response = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("function", "NEWS_SENTIMENT"),
                ("apikey", self.api_key.as_str()),
                ("time_from", time_from.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| MarketDeskError::Provider(format!("Alpha Vantage request: {e}")))?;

        if !response.status().is_success() {
            return Err(MarketDeskError::Provider(format!(
                "Alpha Vantage returned {}",
                response.status()
            )));
        }

        let body: FeedResponse = response
            .json()
            .await
            .map_err(|e| MarketDeskError::Provider(format!("Alpha Vantage body: {e}")))?;

        info!(articles = body.feed.len(), "alpha vantage: feed fetched");
        Ok(body.feed)
    }

    fn source(&self) -> EventSource {
        EventSource::AlphaVantage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_items_map_straight_onto_raw_articles() {
        let raw = r#"{
            "items": "2",
            "feed": [
                {
                    "title": "Chipmaker beats estimates",
                    "url": "https://news.example/chip",
                    "time_published": "20260805T103000",
                    "authors": ["Jane Doe"],
                    "summary": "Q2 revenue above guidance.",
                    "banner_image": "https://news.example/chip.png",
                    "source": "Example Wire",
                    "overall_sentiment_score": 0.31,
                    "overall_sentiment_label": "Somewhat-Bullish"
                },
                {
                    "title": "Minimal item",
                    "summary": "no extras"
                }
            ]
        }"#;

        let parsed: FeedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.feed.len(), 2);
        assert_eq!(parsed.feed[0].authors, vec!["Jane Doe"]);
        assert_eq!(parsed.feed[0].overall_sentiment_score, Some(0.31));
        assert!(parsed.feed[1].url.is_empty());
    }

    #[test]
    fn missing_feed_key_is_an_empty_batch() {
        let parsed: FeedResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.feed.is_empty());
    }
}
