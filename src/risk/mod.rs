//! C2: RiskAnalyzer — deterministic, pattern-based risk gate (spec §4.2).
//!
//! Runs before the Classifier. Its level is authoritative and is never
//! softened by any later stage (invariant §3.2).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{ChatCompletionRequest, PreAnalysis, RiskAssessment, RiskLevel, SignalFamily, TriggeredSignal};

struct SignalTable {
    family: SignalFamily,
    level: RiskLevel,
    patterns: Vec<Regex>,
}

static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("static regex"));

static TABLES: Lazy<Vec<SignalTable>> = Lazy::new(|| {
    let compile = |words: &[&str]| -> Vec<Regex> {
        words
            .iter()
            .map(|w| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(w))).expect("static regex"))
            .collect()
    };

    vec![
        SignalTable {
            family: SignalFamily::PiiPhiFinancialRegulated,
            level: RiskLevel::Regulated,
            patterns: compile(&[
                "HIPAA", "PHI", "PII", "GDPR", "SOX", "PCI-DSS", "medical record", "diagnosis",
            ]),
        },
        SignalTable {
            family: SignalFamily::LegalContractExec,
            level: RiskLevel::High,
            patterns: compile(&[
                "NDA",
                "indemnif",
                "board of directors",
                "acquisition valuation",
                "M&A",
                "term sheet",
                "credentials",
            ]),
        },
        SignalTable {
            family: SignalFamily::BusinessSensitive,
            level: RiskLevel::Medium,
            patterns: compile(&["customer-identifying", "forecast", "internal pricing"]),
        },
    ]
});

const EXCERPT_MAX: usize = 80;

fn truncate(s: &str) -> String {
    if s.chars().count() <= EXCERPT_MAX {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(EXCERPT_MAX).collect();
        t.push('…');
        t
    }
}

/// Evaluate signal families in order; any match elevates the level, never
/// lowers it. Only one excerpt (the first match found) is kept for the
/// rationale, per spec §4.2.
pub fn assess(request: &ChatCompletionRequest, _pre: &PreAnalysis) -> RiskAssessment {
    let content = request.all_content();
    let mut level = RiskLevel::Low;
    let mut signals = Vec::new();
    let mut rationale_excerpt: Option<String> = None;

    if let Some(m) = SSN_RE.find(&content) {
        level = level.max(RiskLevel::Regulated);
        signals.push(TriggeredSignal {
            family: SignalFamily::PiiPhiFinancialRegulated,
            excerpt: truncate(m.as_str()),
        });
        rationale_excerpt.get_or_insert(truncate(m.as_str()));
    }

    for table in TABLES.iter() {
        for pattern in &table.patterns {
            if let Some(m) = pattern.find(&content) {
                level = level.max(table.level);
                signals.push(TriggeredSignal {
                    family: table.family,
                    excerpt: truncate(m.as_str()),
                });
                rationale_excerpt.get_or_insert(truncate(m.as_str()));
            }
        }
    }

    let audit_required = level == RiskLevel::Regulated;
    let direct_commercial_forbidden = level >= RiskLevel::High;

    let rationale = match rationale_excerpt {
        Some(excerpt) => format!("matched signal: \"{excerpt}\""),
        None => "no elevated signals detected".to_string(),
    };

    RiskAssessment {
        level,
        rationale,
        triggered_signals: signals,
        audit_required,
        direct_commercial_forbidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;

    fn req(content: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            messages: vec![Message::user(content)],
            model: "auto".to_string(),
            stream: false,
            tools: None,
            temperature: None,
            max_tokens: None,
            conversation_id: None,
        }
    }

    #[test]
    fn regulated_content_forbids_direct_commercial() {
        let assessment = assess(&req("patient diagnosis under HIPAA"), &PreAnalysis::default());
        assert_eq!(assessment.level, RiskLevel::Regulated);
        assert!(assessment.audit_required);
        assert!(assessment.direct_commercial_forbidden);
    }

    #[test]
    fn legal_content_is_high_not_regulated() {
        let assessment = assess(&req("please review this NDA and indemnification clause"), &PreAnalysis::default());
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(!assessment.audit_required);
        assert!(assessment.direct_commercial_forbidden);
    }

    #[test]
    fn plain_code_request_is_low() {
        let assessment = assess(&req("write a python hello world script"), &PreAnalysis::default());
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(!assessment.direct_commercial_forbidden);
    }
}
