//! C3: Classifier — advisory task-type/complexity/confidence call with a
//! heuristic fallback (spec §4.3).
//!
//! Classifier failures are not errors to the caller: they are normal
//! inputs to the PolicyEngine.

pub mod advisory;
pub mod heuristic;

use crate::domain::{ChatCompletionRequest, Classification, PreAnalysis};

pub use advisory::{AdvisoryClient, AdvisoryClientConfig};

pub struct Classifier {
    advisory: Option<AdvisoryClient>,
}

impl Classifier {
    pub fn new(advisory: Option<AdvisoryClient>) -> Self {
        Self { advisory }
    }

    pub fn disabled() -> Self {
        Self { advisory: None }
    }

    /// Runs the advisory call (if configured) and falls back to the
    /// heuristic table on any failure mode. Emits one observability event
    /// per call via the advisory client itself.
    pub async fn classify(
        &self,
        request: &ChatCompletionRequest,
        pre: &PreAnalysis,
    ) -> Classification {
        let department = pre.department_hint.clone();

        if let Some(client) = &self.advisory {
            let excerpt: String = request.user_content().chars().take(4_000).collect();
            if let Some(classification) = client.classify(&excerpt, pre).await {
                tracing::debug!(event = "success", task_type = ?classification.task_type, "advisory classification accepted");
                return classification;
            }
        }

        heuristic::classify(pre, department)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassifierSource, Message};

    #[tokio::test]
    async fn disabled_classifier_always_uses_heuristic() {
        let classifier = Classifier::disabled();
        let req = ChatCompletionRequest {
            messages: vec![Message::user("debug this please")],
            model: "auto".to_string(),
            stream: false,
            tools: None,
            temperature: None,
            max_tokens: None,
            conversation_id: None,
        };
        let pre = crate::preanalyzer::analyze(&req);
        let classification = classifier.classify(&req, &pre).await;
        assert_eq!(classification.classifier_source, ClassifierSource::HeuristicFallback);
    }
}
