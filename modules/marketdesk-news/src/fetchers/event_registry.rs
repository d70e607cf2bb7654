// Event Registry article search. Paginates through every result page.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use marketdesk_common::{EventSource, MarketDeskError, RawArticle};

use super::NewsFetcher;

pub struct EventRegistryFetcher {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: ArticlePage,
}

#[derive(Deserialize)]
struct ArticlePage {
    #[serde(default)]
    results: Vec<ErArticle>,
    #[serde(default = "one")]
    pages: u32,
}

impl Default for ArticlePage {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            pages: one(),
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Deserialize)]
struct ErArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, rename = "dateTimePub")]
    date_time_pub: Option<String>,
    #[serde(default)]
    source: Option<ErSource>,
    #[serde(default)]
    authors: Vec<ErAuthor>,
}

#[derive(Deserialize)]
struct ErSource {
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
struct ErAuthor {
    #[serde(default)]
    name: String,
}

impl From<ErArticle> for RawArticle {
    fn from(a: ErArticle) -> Self {
        RawArticle {
            title: a.title,
            summary: a.body,
            url: a.url,
            banner_image: a.image,
            source: a.source.map(|s| s.title),
            time_published: a.date_time_pub,
            authors: a.authors.into_iter().map(|a| a.name).collect(),
            overall_sentiment_score: None,
            overall_sentiment_label: None,
        }
    }
}

impl EventRegistryFetcher {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build Event Registry HTTP client");
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn fetch_page(
        &self,
        keyword: Option<&str>,
        page: u32,
    ) -> Result<ArticlePage, MarketDeskError> {
        let mut payload = json!({
            "apiKey": self.api_key,
            "dateStart": Utc::now().format("%Y-%m-%d").to_string(),
            "articlesPage": page,
        });
        if let Some(keyword) = keyword {
            payload["keyword"] = json!([keyword]);
        }

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MarketDeskError::Provider(format!("Event Registry request: {e}")))?;

        if !response.status().is_success() {
            return Err(MarketDeskError::Provider(format!(
                "Event Registry returned {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| MarketDeskError::Provider(format!("Event Registry body: {e}")))?;

        Ok(body.articles)
    }
}

#[async_trait]
impl NewsFetcher for EventRegistryFetcher {
    async fn fetch(&self, keyword: Option<&str>) -> Result<Vec<RawArticle>, MarketDeskError> {
        let mut all = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.fetch_page(keyword, page).await?;
            let pages = batch.pages.max(1);
            all.extend(batch.results.into_iter().map(RawArticle::from));

            if page >= pages {
                break;
            }
            page += 1;
        }

        info!(articles = all.len(), keyword, "event registry: search fetched");
        Ok(all)
    }

    fn source(&self) -> EventSource {
        EventSource::EventRegistry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_shape_maps_to_raw_article() {
        let raw = r#"{
            "articles": {
                "results": [{
                    "title": "Bond yields jump",
                    "body": "Ten-year yields rose sharply.",
                    "url": "https://news.example/yields",
                    "image": "https://news.example/yields.jpg",
                    "dateTimePub": "2026-08-05T09:00:00Z",
                    "source": {"title": "Example Daily"},
                    "authors": [{"name": "A. Writer"}]
                }],
                "pages": 3
            }
        }"#;

        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.articles.pages, 3);

        let article = RawArticle::from(parsed.articles.results.into_iter().next().unwrap());
        assert_eq!(article.summary, "Ten-year yields rose sharply.");
        assert_eq!(article.source.as_deref(), Some("Example Daily"));
        assert_eq!(article.authors, vec!["A. Writer"]);
    }

    #[test]
    fn empty_response_defaults_to_single_page() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.articles.pages, 1);
        assert!(parsed.articles.results.is_empty());
    }
}
