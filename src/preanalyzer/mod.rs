//! C1: PreAnalyzer — cheap deterministic feature extraction (spec §4.1).
//!
//! Pure function; never fails. Malformed input produces degraded features
//! plus a `parse_warnings` entry rather than an error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{ChatCompletionRequest, CodeBlock, PreAnalysis};

/// Closed, case-insensitive keyword vocabulary (spec §4.1).
const KEYWORDS: &[&str] = &[
    "debug", "review", "architecture", "test", "design", "tradeoff", "error",
    "refactor", "optimi", "security", "performance", "math", "algorithm",
];

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```([A-Za-z0-9_+-]*)\n([\s\S]*?)```").expect("static regex"));

/// BPE-compatible approximation: ~4 chars/token for English prose, tuned
/// down slightly for code-heavy content where tokens run shorter. Accuracy
/// within ±10% is the spec's explicit tolerance, not exactness.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    if chars == 0 {
        return 0;
    }
    ((chars as f64) / 3.7).ceil() as u32
}

pub fn analyze(request: &ChatCompletionRequest) -> PreAnalysis {
    let mut warnings = Vec::new();
    let all_content = request.all_content();

    if request.messages.is_empty() {
        warnings.push("request has no messages".to_string());
    }

    let estimated_input_tokens = estimate_tokens(&all_content);

    let code_blocks = FENCE_RE
        .captures_iter(&all_content)
        .map(|cap| {
            let lang = cap.get(1).map(|m| m.as_str().to_string());
            let body = cap.get(2).map(|m| m.as_str()).unwrap_or_default();
            CodeBlock {
                language: lang.filter(|l| !l.is_empty()),
                line_count: body.lines().count(),
            }
        })
        .collect::<Vec<_>>();

    let lower = all_content.to_lowercase();
    let matched_keywords = KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();

    let conversation_turns = request
        .messages
        .iter()
        .filter(|m| !matches!(m.role, crate::domain::Role::System))
        .count() as u32;

    PreAnalysis {
        estimated_input_tokens,
        code_blocks,
        matched_keywords,
        conversation_turns,
        department_hint: None,
        parse_warnings: warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;

    #[test]
    fn detects_fenced_code_and_keywords() {
        let req = ChatCompletionRequest {
            messages: vec![Message::user(
                "please debug this:\n```python\nprint(1)\n```",
            )],
            model: "auto".to_string(),
            stream: false,
            tools: None,
            temperature: None,
            max_tokens: None,
            conversation_id: None,
        };
        let analysis = analyze(&req);
        assert_eq!(analysis.code_blocks.len(), 1);
        assert_eq!(analysis.code_blocks[0].language.as_deref(), Some("python"));
        assert!(analysis.has_keyword("debug"));
    }

    #[test]
    fn empty_request_never_fails() {
        let req = ChatCompletionRequest {
            messages: vec![],
            model: "auto".to_string(),
            stream: false,
            tools: None,
            temperature: None,
            max_tokens: None,
            conversation_id: None,
        };
        let analysis = analyze(&req);
        assert_eq!(analysis.estimated_input_tokens, 0);
        assert!(!analysis.parse_warnings.is_empty());
    }

    #[test]
    fn token_estimate_within_tolerance() {
        let text = "a".repeat(370);
        let estimate = estimate_tokens(&text);
        assert!((90..=110).contains(&estimate));
    }
}
