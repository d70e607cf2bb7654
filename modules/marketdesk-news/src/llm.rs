//! OpenAI-backed implementation of the enrichment calls.
//!
//! One prompt per pipeline stage. Structured stages (classification,
//! sentiment, priority) go through typed extraction; prose stages are plain
//! completions.

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::warn;

use ai_client::{strip_code_blocks, util::truncate_to_char_boundary, OpenAi};
use marketdesk_common::{Priority, RawArticle, Sentiment};

use crate::traits::{Classification, Enricher};

/// Cap on article JSON handed to a prompt.
const MAX_PROMPT_BYTES: usize = 12_000;

const CLASSIFY_PROMPT: &str = "You are a financial news desk editor. Decide whether the \
article is financial or market-moving news: companies, earnings, markets, commodities, \
rates, currencies, crypto, economic policy or regulation with market impact. General \
politics, sports, lifestyle and technology stories without market relevance are not \
financial.";

const TITLE_PROMPT: &str = "You are a financial news desk editor. Write one short, \
punchy headline for this article, prefixed with 'AI processing:'. Return only the \
headline text.";

const DEEP_RESEARCH_PROMPT: &str = "You are a financial research analyst. Produce a \
thorough research note on the article: what happened, the companies and instruments \
involved, market context, likely first- and second-order effects, and what to watch \
next. Write in clear prose with short paragraphs.";

const SYNTHESIZE_PROMPT: &str = "You are a financial research analyst. You are given \
several related articles as JSON. Synthesize them into a single thorough research \
note: the common story, points of agreement and disagreement between sources, market \
context and likely effects. Write in clear prose with short paragraphs.";

const SUMMARIZE_PROMPT: &str = "You are a financial editor. Condense the research note \
into a tight summary a busy trader can read in under a minute. Keep concrete numbers. \
Return only the summary.";

const SENTIMENT_PROMPT: &str = "You are a market sentiment analyst. Judge the overall \
market sentiment this article implies for the assets it concerns.";

const PRIORITY_PROMPT: &str = "You are a news desk triage editor. Rate how urgently a \
financial audience needs this article: HIGH for market-moving or time-critical news, \
MEDIUM for notable but not urgent, LOW for background interest.";

const COMPLIANCE_PROMPT: &str = "You are a financial compliance reviewer. Check the \
article summary for claims that would be problematic to republish: investment advice, \
unverifiable allegations, market manipulation concerns. Respond with 'Compliant' or a \
one-sentence description of the concern.";

const KEYWORDS_PROMPT: &str = "You are a financial news search expert. Generate search \
keywords and phrases for the given event title: important terms and variations, \
implied financial and market terms, company names and tickers, ordered most specific \
first. Return ONLY a JSON array of strings.";

const TONE_REWRITE_PROMPT: &str = "You are a financial content editor. Rewrite the \
given content following the custom instructions, in the requested tone. Preserve the \
facts and figures. Return only the rewritten content.";

#[derive(Debug, Deserialize, JsonSchema)]
struct ClassificationCall {
    is_financial: bool,
    reason: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SentimentCall {
    sentiment: Sentiment,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PriorityCall {
    priority: Priority,
}

#[derive(Clone)]
pub struct EventLlm {
    agent: OpenAi,
}

impl EventLlm {
    pub fn new(agent: OpenAi) -> Self {
        Self { agent }
    }

    fn article_json(article: &RawArticle) -> String {
        let json = serde_json::to_string(article).unwrap_or_default();
        truncate_to_char_boundary(&json, MAX_PROMPT_BYTES).to_string()
    }

    /// Rewrite post content with user instructions and a tone. Used by the
    /// editorial customize flow, not by the pipeline.
    pub async fn rewrite_with_tone(
        &self,
        content: &str,
        instructions: &str,
        tone: &str,
    ) -> Result<String> {
        let user = format!(
            "Content:\n{content}\n\nCustom instructions: {instructions}\nTone: {tone}"
        );
        self.agent.chat_completion(TONE_REWRITE_PROMPT, user).await
    }
}

#[async_trait]
impl Enricher for EventLlm {
    async fn classify(&self, article: &RawArticle) -> Result<Classification> {
        let call: ClassificationCall = self
            .agent
            .extract(CLASSIFY_PROMPT, Self::article_json(article))
            .await?;
        Ok(Classification {
            is_financial: call.is_financial,
            reason: call.reason,
        })
    }

    async fn banner_title(&self, article: &RawArticle) -> Result<String> {
        self.agent
            .chat_completion(TITLE_PROMPT, Self::article_json(article))
            .await
    }

    async fn deep_research(&self, article: &RawArticle, corpus: &[RawArticle]) -> Result<String> {
        if corpus.is_empty() {
            self.agent
                .chat_completion(DEEP_RESEARCH_PROMPT, Self::article_json(article))
                .await
        } else {
            let json = serde_json::to_string(corpus).unwrap_or_default();
            self.agent
                .chat_completion(
                    SYNTHESIZE_PROMPT,
                    truncate_to_char_boundary(&json, MAX_PROMPT_BYTES * 4),
                )
                .await
        }
    }

    async fn summarize(&self, deep_research: &str) -> Result<String> {
        self.agent
            .chat_completion(SUMMARIZE_PROMPT, deep_research)
            .await
    }

    async fn sentiment(&self, article: &RawArticle) -> Result<Sentiment> {
        let call: SentimentCall = self
            .agent
            .extract(SENTIMENT_PROMPT, Self::article_json(article))
            .await?;
        Ok(call.sentiment)
    }

    async fn priority(&self, article: &RawArticle) -> Result<Priority> {
        let call: PriorityCall = self
            .agent
            .extract(PRIORITY_PROMPT, Self::article_json(article))
            .await?;
        Ok(call.priority)
    }

    async fn compliance(&self, article: &RawArticle) -> Result<String> {
        self.agent
            .chat_completion(COMPLIANCE_PROMPT, Self::article_json(article))
            .await
    }

    async fn keyword_combinations(&self, title: &str) -> Result<Vec<String>> {
        let response = match self
            .agent
            .chat_completion(KEYWORDS_PROMPT, format!("Event title: {title}"))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // Fall back to the raw title rather than failing the research
                warn!(error = %e, "keyword generation failed, using title as-is");
                return Ok(vec![title.to_string()]);
            }
        };

        let cleaned = strip_code_blocks(&response);
        if let Ok(keywords) = serde_json::from_str::<Vec<String>>(cleaned) {
            return Ok(keywords);
        }

        // Not valid JSON: salvage by splitting
        let salvaged: Vec<String> = cleaned
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|k| k.trim().trim_matches('"').to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if salvaged.is_empty() {
            Ok(vec![title.to_string()])
        } else {
            Ok(salvaged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_json_is_capped() {
        let article = RawArticle {
            title: "t".repeat(40_000),
            ..Default::default()
        };
        assert!(EventLlm::article_json(&article).len() <= MAX_PROMPT_BYTES);
    }

    #[test]
    fn structured_call_types_deserialize() {
        let call: SentimentCall = serde_json::from_str(r#"{"sentiment":"NEGATIVE"}"#).unwrap();
        assert_eq!(call.sentiment, Sentiment::Negative);

        let call: PriorityCall = serde_json::from_str(r#"{"priority":"HIGH"}"#).unwrap();
        assert_eq!(call.priority, Priority::High);

        let call: ClassificationCall =
            serde_json::from_str(r#"{"is_financial":true,"reason":"earnings"}"#).unwrap();
        assert!(call.is_financial);
        assert_eq!(call.reason, "earnings");
    }
}
