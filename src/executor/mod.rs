//! C6: Executor — orchestrates the provider call with a fallback chain
//! and records the outcome of every attempt (spec §4.6).
//!
//! Ordering guarantee: the caller commits to a model+provider for the
//! *first* attempt before any bytes are emitted; once a streaming
//! response has produced its first event, no further fallback is
//! attempted — that's enforced by the API layer, which stops calling
//! `Executor::execute` after the first successful stream handoff.

pub mod backoff;

use std::time::Instant;

use crate::domain::{AttemptOutcome, ChatCompletionRequest, Result, RouterError};
use crate::providers::{CallOutcome, ProviderRegistry, StreamEvent};

const RETRYABLE_STATUS: &[u16] = &[408, 425, 429, 500, 502, 503, 504];

pub struct ExecutionOutcome {
    pub model_used: String,
    pub provider: String,
    pub attempts: Vec<AttemptOutcome>,
    pub fallback_used: bool,
    pub body: ExecutorBody,
}

pub enum ExecutorBody {
    Buffered(serde_json::Value),
    Stream(futures::stream::BoxStream<'static, StreamEvent>),
}

/// Carries the full attempt history alongside the terminal error so callers
/// that only receive `Err` (no `ExecutionOutcome`) can still audit every
/// attempt that was made (spec §4.7).
pub struct ExecutionFailure {
    pub error: RouterError,
    pub attempts: Vec<AttemptOutcome>,
}

pub struct Executor {
    registry: ProviderRegistry,
}

impl Executor {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn is_retryable(err: &RouterError) -> bool {
        match err {
            RouterError::ProviderStatus { status, .. } => RETRYABLE_STATUS.contains(status),
            RouterError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// At most `1 + len(fallback_chain)` attempts. Stops immediately on a
    /// non-retryable failure (spec §4.6 step 4) or on success.
    pub async fn execute(
        &self,
        primary_model: &str,
        fallback_chain: &[String],
        request: &ChatCompletionRequest,
    ) -> std::result::Result<ExecutionOutcome, ExecutionFailure> {
        let mut chain = Vec::with_capacity(1 + fallback_chain.len());
        chain.push(primary_model.to_string());
        chain.extend_from_slice(fallback_chain);

        let mut attempts = Vec::new();
        let mut last_err = None;

        for (idx, model_id) in chain.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(backoff::delay_for_attempt(idx as u32)).await;
            }

            let provider = self
                .registry
                .model(model_id)
                .map(|m| m.provider_tag_key())
                .unwrap_or_else(|| "unknown".to_string());

            let started = Instant::now();
            match self.registry.call(model_id, request).await {
                Ok(outcome) => {
                    attempts.push(AttemptOutcome {
                        model_id: model_id.clone(),
                        provider_tag: provider.clone(),
                        succeeded: true,
                        status_code: Some(200),
                        error: None,
                        latency_ms: started.elapsed().as_millis() as u64,
                    });
                    let body = match outcome {
                        CallOutcome::Buffered(v) => ExecutorBody::Buffered(v),
                        CallOutcome::Stream(s) => ExecutorBody::Stream(s),
                    };
                    return Ok(ExecutionOutcome {
                        model_used: model_id.clone(),
                        provider,
                        attempts,
                        fallback_used: idx > 0,
                        body,
                    });
                }
                Err(err) => {
                    let status = match &err {
                        RouterError::ProviderStatus { status, .. } => Some(*status),
                        _ => None,
                    };
                    attempts.push(AttemptOutcome {
                        model_id: model_id.clone(),
                        provider_tag: provider,
                        succeeded: false,
                        status_code: status,
                        error: Some(err.to_string()),
                        latency_ms: started.elapsed().as_millis() as u64,
                    });

                    if !Self::is_retryable(&err) {
                        return Err(ExecutionFailure { error: err, attempts });
                    }
                    last_err = Some(err);
                }
            }
        }

        let _ = last_err;
        Err(ExecutionFailure {
            error: RouterError::AllProvidersFailed {
                attempts: attempts.len(),
            },
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RouterError;

    #[test]
    fn retryable_status_codes_match_spec_table() {
        for code in [408, 425, 429, 500, 502, 503, 504] {
            assert!(Executor::is_retryable(&RouterError::ProviderStatus {
                status: code,
                retryable: true,
                body: String::new(),
            }));
        }
        assert!(!Executor::is_retryable(&RouterError::ProviderStatus {
            status: 400,
            retryable: false,
            body: String::new(),
        }));
    }
}
