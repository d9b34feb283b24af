//! The advisory LLM call (spec §4.3, §9).
//!
//! Treated as a normal, possibly-garbage data source: a task with a hard
//! deadline. On deadline elapsed, non-JSON response, schema mismatch, or
//! low confidence, the caller falls back to the heuristic table. No
//! mutable state is shared between this call and the main request task.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::domain::{Classification, ClassifierSource, Complexity, PreAnalysis, TaskType};

#[derive(Debug, Deserialize)]
struct AdvisoryResponse {
    task_type: TaskType,
    complexity: Complexity,
    #[serde(default)]
    required_capabilities: BTreeSet<String>,
    confidence: f32,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    rationale: String,
}

const SYSTEM_PROMPT_VERSION: &str = "v1";

fn system_prompt() -> String {
    format!(
        "You are a routing classifier (prompt version {SYSTEM_PROMPT_VERSION}). \
         Given a user request, respond with ONLY a JSON object matching: \
         {{\"task_type\": string, \"complexity\": \"simple\"|\"medium\"|\"complex\", \
         \"required_capabilities\": [string], \"confidence\": number 0..1, \
         \"department\": string|null, \"rationale\": string}}."
    )
}

#[derive(Debug, Clone)]
pub struct AdvisoryClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for AdvisoryClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8081/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "rb://fast_cheap_general".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

pub struct AdvisoryClient {
    http: reqwest::Client,
    config: AdvisoryClientConfig,
}

impl AdvisoryClient {
    pub fn new(config: AdvisoryClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Issue a single outbound call, enforcing the hard timeout. Returns
    /// `None` on any failure mode (timeout, transport error, non-JSON,
    /// schema mismatch, low confidence) — the caller is expected to take
    /// the heuristic fallback in that case, never to propagate an error.
    pub async fn classify(&self, excerpt: &str, pre: &PreAnalysis) -> Option<Classification> {
        let fut = self.call_once(excerpt, pre);
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(Ok(resp)) if resp.confidence >= Classification::MIN_CONFIDENCE => {
                Some(Classification {
                    task_type: resp.task_type,
                    complexity: resp.complexity,
                    required_capabilities: resp.required_capabilities,
                    confidence: resp.confidence,
                    classifier_source: ClassifierSource::AdvisoryLlm,
                    department: resp.department,
                    rationale: resp.rationale,
                })
            }
            Ok(Ok(_)) => {
                tracing::info!(event = "low_confidence", "advisory classifier below confidence threshold");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(event = "schema_error", error = %err, "advisory classifier call failed");
                None
            }
            Err(_) => {
                tracing::warn!(event = "timeout", "advisory classifier call timed out");
                None
            }
        }
    }

    async fn call_once(
        &self,
        excerpt: &str,
        pre: &PreAnalysis,
    ) -> Result<AdvisoryResponse, anyhow::Error> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt()},
                {"role": "user", "content": format!(
                    "tokens≈{} turns={} keywords={:?}\n---\n{}",
                    pre.estimated_input_tokens, pre.conversation_turns, pre.matched_keywords, excerpt
                )},
            ],
            "temperature": 0.0,
            "response_format": {"type": "json_object"},
        });

        let resp = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: serde_json::Value = resp.json().await?;
        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing message content"))?;

        let parsed: AdvisoryResponse = serde_json::from_str(content)?;
        if !(0.0..=1.0).contains(&parsed.confidence) {
            anyhow::bail!("confidence out of range");
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_its_version() {
        assert!(system_prompt().contains(SYSTEM_PROMPT_VERSION));
    }
}
