use crate::app::ports::SummarizerPort;
use crate::common::error::{Result, SearchError};
use crate::common::types::EventRecord;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// Summarizer backed by the OpenAI Responses API.
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn prompt(event: &EventRecord) -> String {
        let mut prompt = format!(
            "Write one upbeat sentence (under 200 characters) describing this event for a listings page. Event: {}",
            event.title
        );
        if let Some(venue) = &event.venue {
            prompt.push_str(&format!(". Venue: {venue}"));
        }
        if let Some(start) = &event.start_time {
            prompt.push_str(&format!(". Starts: {start}"));
        }
        if event.showings > 1 {
            prompt.push_str(&format!(". Showings: {}", event.showings));
        }
        prompt.push('.');
        prompt
    }

    /// Concatenates every `output_text` content item of a Responses API reply.
    pub fn extract_text(body: &Value) -> Option<String> {
        if let Some(text) = body.get("output_text").and_then(Value::as_str) {
            return Some(text.to_string());
        }
        let text = body
            .get("output")?
            .as_array()?
            .iter()
            .filter_map(|item| item.get("content").and_then(Value::as_array))
            .flatten()
            .filter(|content| content.get("type").and_then(Value::as_str) == Some("output_text"))
            .filter_map(|content| content.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("");
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl SummarizerPort for OpenAiSummarizer {
    #[instrument(skip(self, event), fields(title = %event.title))]
    async fn summarize(&self, event: &EventRecord) -> Result<String> {
        let body = json!({
            "model": self.model,
            "input": Self::prompt(event),
            "max_output_tokens": 80,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SearchError::Summarizer {
                message: format!("status {}: {}", status.as_u16(), text),
            });
        }

        let value: Value = resp.json().await?;
        let text = Self::extract_text(&value).ok_or_else(|| SearchError::Summarizer {
            message: "response contained no output text".to_string(),
        })?;
        debug!("Summarized '{}'", event.title);
        Ok(text)
    }
}
