//! Heuristic fallback mapping table (spec §4.3), used whenever the
//! advisory LLM call times out, returns non-JSON, fails schema
//! validation, or reports confidence below `Classification::MIN_CONFIDENCE`.

use std::collections::BTreeSet;

use crate::domain::{Classification, ClassifierSource, Complexity, PreAnalysis, TaskType};

pub fn classify(pre: &PreAnalysis, department: Option<String>) -> Classification {
    let long = pre.estimated_input_tokens > 2_000 || pre.code_line_total() > 80;

    let (task_type, complexity) = if pre.has_keyword("debug") || pre.has_keyword("error") {
        (TaskType::Debugging, Complexity::Medium)
    } else if pre.has_keyword("math") || pre.has_keyword("algorithm") {
        (TaskType::MathReasoning, Complexity::Complex)
    } else if pre.has_keyword("review") && pre.has_code() {
        (TaskType::CodeReview, Complexity::Medium)
    } else if pre.has_keyword("architecture") || pre.has_keyword("design") || pre.has_keyword("tradeoff") {
        (TaskType::ArchitectureDesign, Complexity::Complex)
    } else if pre.has_keyword("test") {
        (TaskType::TestGeneration, Complexity::Simple)
    } else if pre.has_code() && long {
        (TaskType::CodeGeneration, Complexity::Complex)
    } else if pre.has_code() {
        (TaskType::CodeGeneration, Complexity::Simple)
    } else {
        (TaskType::General, Complexity::Medium)
    };

    let mut capabilities = BTreeSet::new();
    if complexity == Complexity::Complex {
        capabilities.insert("deep_reasoning".to_string());
    }

    Classification {
        task_type,
        complexity,
        required_capabilities: capabilities,
        confidence: Classification::HEURISTIC_CONFIDENCE,
        classifier_source: ClassifierSource::HeuristicFallback,
        department,
        rationale: "heuristic fallback from keyword/token signals".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre_with(keywords: &[&str], tokens: u32) -> PreAnalysis {
        PreAnalysis {
            estimated_input_tokens: tokens,
            code_blocks: vec![],
            matched_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            conversation_turns: 1,
            department_hint: None,
            parse_warnings: vec![],
        }
    }

    #[test]
    fn debug_keyword_maps_to_debugging() {
        let c = classify(&pre_with(&["debug"], 50), None);
        assert_eq!(c.task_type, TaskType::Debugging);
        assert_eq!(c.classifier_source, ClassifierSource::HeuristicFallback);
        assert_eq!(c.confidence, Classification::HEURISTIC_CONFIDENCE);
    }

    #[test]
    fn math_keyword_maps_to_math_reasoning() {
        let c = classify(&pre_with(&["algorithm"], 50), None);
        assert_eq!(c.task_type, TaskType::MathReasoning);
        assert_eq!(c.complexity, Complexity::Complex);
    }

    #[test]
    fn no_signals_is_general() {
        let c = classify(&pre_with(&[], 10), None);
        assert_eq!(c.task_type, TaskType::General);
    }
}
