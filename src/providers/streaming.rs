//! Uniform streaming event contract (spec §4.5). All upstream vendor
//! wire formats are normalized into this single enumeration so the
//! Executor and the SSE serializer are provider-agnostic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_delta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_delta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_delta: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<crate::domain::TokenUsage>,
    /// Set only for the synthetic terminal event the provider client emits
    /// when the upstream connection dies mid-stream (spec §4.6). Never set
    /// alongside the other fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Extracts the OpenAI-compatible `usage` object, present on the buffered
/// response body and on the final chunk of a streamed one.
pub fn usage_from_value(value: &serde_json::Value) -> Option<crate::domain::TokenUsage> {
    let usage = value.get("usage")?;
    Some(crate::domain::TokenUsage {
        input_tokens: usage.get("prompt_tokens")?.as_u64()? as u32,
        output_tokens: usage.get("completion_tokens")?.as_u64()? as u32,
    })
}

/// Parses one vendor's SSE data line into a uniform event. Each vendor
/// wire shape gets its own small adapter function; this one follows the
/// OpenAI-compatible `choices[0].delta` shape, which the two other
/// dialects in `ProviderKind` are normalized onto before reaching here.
pub fn parse_openai_compatible_chunk(data: &str) -> Option<StreamEvent> {
    if data == "[DONE]" {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    let choice = value.get("choices")?.get(0)?;
    let delta = choice.get("delta").cloned().unwrap_or_default();

    Some(StreamEvent {
        role_delta: delta.get("role").and_then(|v| v.as_str()).map(String::from),
        text_delta: delta.get("content").and_then(|v| v.as_str()).map(String::from),
        tool_call_delta: delta.get("tool_calls").cloned(),
        finish_reason: choice.get("finish_reason").and_then(|v| v.as_str()).map(String::from),
        usage: usage_from_value(&value),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_done_sentinel_as_stream_end() {
        assert!(parse_openai_compatible_chunk("[DONE]").is_none());
    }

    #[test]
    fn parses_text_delta() {
        let chunk = r#"{"choices":[{"delta":{"content":"hi"},"finish_reason":null}]}"#;
        let event = parse_openai_compatible_chunk(chunk).unwrap();
        assert_eq!(event.text_delta.as_deref(), Some("hi"));
    }
}
