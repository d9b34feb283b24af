//! Core value types for the routing pipeline (spec.md §3).
//!
//! These types carry no behavior beyond simple helpers; the stages that
//! produce and consume them live in their own top-level modules
//! (`preanalyzer`, `risk`, `classifier`, `policy_engine`, `providers`,
//! `executor`, `recorder`).

pub mod classification;
pub mod decision;
pub mod error;
pub mod identity;
pub mod message;
pub mod model;
pub mod policy;
pub mod pre_analysis;
pub mod request;
pub mod risk;

pub use classification::{Classification, ClassifierSource, Complexity, TaskType};
pub use decision::{
    AttemptOutcome, LatencyBreakdownMs, PolicyTraceEntry, RoutingDecision, TokenUsage,
    TraceResult,
};
pub use error::{Result, RouterError};
pub use identity::Identity;
pub use message::{Message, Role};
pub use model::{
    is_virtual_model, ConcreteModel, HealthState, ProviderTag, Tier, VirtualModel,
    VIRTUAL_MODEL_PREFIX,
};
pub use policy::{Action, BudgetThresholds, DepartmentPolicy, MatchClause, PolicyRule};
pub use pre_analysis::{CodeBlock, PreAnalysis};
pub use request::{ChatCompletionRequest, IncomingRequest, AUTO_MODEL};
pub use risk::{RiskAssessment, RiskLevel, SignalFamily, TriggeredSignal};
