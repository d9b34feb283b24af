//! Per-provider HTTP binding: translates the internal normalized chat
//! request into the vendor wire format and back (spec §4.5).

use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;

use crate::domain::{ChatCompletionRequest, ProviderTag, Result, RouterError};

use super::streaming::{parse_openai_compatible_chunk, StreamEvent};

#[derive(Debug, Clone)]
pub struct ProviderBinding {
    pub provider_tag: ProviderTag,
    pub endpoint: String,
    pub api_key: String,
    pub max_concurrent_calls: u32,
    pub timeout: Duration,
    pub retryable_status_codes: Vec<u16>,
}

impl ProviderBinding {
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }
}

#[derive(Debug)]
pub enum CallOutcome {
    Buffered(serde_json::Value),
    Stream(BoxStream<'static, StreamEvent>),
}

#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
}

impl Default for ProviderClient {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl ProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Performs the outbound call. All vendor bindings speak an
    /// OpenAI-compatible wire format in this deployment (self-hosted
    /// inference servers and compliant-cloud gateways both normalize to
    /// it upstream of this proxy), so a single adapter covers every tag.
    pub async fn call(
        &self,
        binding: &ProviderBinding,
        model_id: &str,
        request: &ChatCompletionRequest,
    ) -> Result<CallOutcome> {
        let mut body = serde_json::to_value(request)?;
        body["model"] = serde_json::Value::String(model_id.to_string());

        let resp = self
            .http
            .post(&binding.endpoint)
            .bearer_auth(&binding.api_key)
            .timeout(binding.timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let status_u16 = status.as_u16();
            let text = resp.text().await.unwrap_or_default();
            if binding.is_retryable_status(status_u16) {
                return Err(RouterError::ProviderStatus {
                    status: status_u16,
                    retryable: true,
                    body: text,
                });
            }
            return Err(RouterError::UpstreamRefusal {
                message: format!("provider returned {status_u16}"),
                raw: serde_json::json!({"error": {"message": text, "code": status_u16}}),
            });
        }

        if request.stream {
            let byte_stream = resp.bytes_stream();
            // Chunk errors (dropped connection, read timeout mid-stream) are no
            // longer swallowed: the first one is turned into a terminal
            // `StreamEvent::error` and nothing after it is yielded (spec §4.6).
            let event_stream = byte_stream
                .map(|chunk| match chunk {
                    Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).to_string()),
                    Err(e) => Err(e.to_string()),
                })
                .flat_map(|chunk_result| {
                    futures::stream::iter(match chunk_result {
                        Ok(text) => text
                            .lines()
                            .filter_map(|line| line.strip_prefix("data: ").map(str::to_string))
                            .map(Ok)
                            .collect::<Vec<_>>(),
                        Err(e) => vec![Err(e)],
                    })
                })
                .scan(false, |errored, line_result| {
                    let next = if *errored {
                        None
                    } else {
                        match line_result {
                            Ok(data) => Some(parse_openai_compatible_chunk(&data)),
                            Err(e) => {
                                *errored = true;
                                Some(Some(StreamEvent::error(e)))
                            }
                        }
                    };
                    futures::future::ready(next)
                })
                .filter_map(|event| async move { event })
                .boxed();
            Ok(CallOutcome::Stream(event_stream))
        } else {
            let json: serde_json::Value = resp.json().await?;
            Ok(CallOutcome::Buffered(json))
        }
    }
}
