//! Classification (spec §3, §4.3).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    CodeGeneration,
    CodeReview,
    Debugging,
    ArchitectureDesign,
    QuestionAnswer,
    MathReasoning,
    TestGeneration,
    Summarization,
    Translation,
    CreativeWriting,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierSource {
    AdvisoryLlm,
    HeuristicFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub task_type: TaskType,
    pub complexity: Complexity,
    /// Open-vocabulary tagged strings such as `deep_reasoning`, `long_context`.
    pub required_capabilities: BTreeSet<String>,
    pub confidence: f32,
    pub classifier_source: ClassifierSource,
    pub department: Option<String>,
    pub rationale: String,
}

impl Classification {
    /// Minimum confidence to accept the advisory classifier's output
    /// without falling back to the heuristic table (spec §4.3).
    pub const MIN_CONFIDENCE: f32 = 0.6;
    pub const HEURISTIC_CONFIDENCE: f32 = 0.5;

    pub fn is_advisory(&self) -> bool {
        matches!(self.classifier_source, ClassifierSource::AdvisoryLlm)
    }
}
