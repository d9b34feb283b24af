//! Streaming response assembly for `POST /v1/chat/completions` (spec §6).
//!
//! The wire contract: an initial `event: routing_decision` frame carrying
//! the full `RoutingDecision` as JSON, then one `data:` chunk per
//! `StreamEvent` in OpenAI-compatible shape, terminated either by
//! `data: [DONE]` or, if the upstream connection dies mid-stream, by an
//! `event: error` frame (spec §4.6). Mirrors the uniform `StreamEvent`
//! contract from `providers::streaming` so every vendor's wire format looks
//! identical to the caller.
//!
//! The `RoutingDecision` handed in here was built before the body was
//! consumed, so it can't yet know the final token usage or whether the
//! stream will die partway through. `streamed_response` finalizes and
//! records it once the stream actually ends, which keeps invariant §3.1
//! ("exactly one audit record per request") true for streaming responses
//! too — `RoutingPipeline::route` deliberately skips recording when the
//! body is a stream.

use std::sync::{Arc, Mutex};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, BoxStream, StreamExt};
use rust_decimal::Decimal;
use std::convert::Infallible;

use crate::budget::BudgetStore;
use crate::domain::{Identity, RoutingDecision, TokenUsage};
use crate::providers::StreamEvent;
use crate::recorder::DecisionRecorder;

/// Collaborators `streamed_response` needs to finalize the audit record
/// once the stream ends, since `RoutingPipeline::route` hands back the body
/// before any of this is known.
pub struct StreamAudit {
    pub recorder: Arc<DecisionRecorder>,
    pub budget_store: Arc<dyn BudgetStore>,
    pub identity: Identity,
    /// `(input_price_per_mtok, output_price_per_mtok)` for the selected
    /// model, when it's still present in the catalog.
    pub pricing: Option<(Decimal, Decimal)>,
}

#[derive(Default)]
struct StreamState {
    usage: Option<TokenUsage>,
    error: Option<String>,
}

pub fn streamed_response(
    decision: RoutingDecision,
    audit: StreamAudit,
    events: BoxStream<'static, StreamEvent>,
) -> Sse<BoxStream<'static, Result<Event, Infallible>>> {
    let decision_payload = serde_json::to_string(&decision).unwrap_or_else(|_| "{}".to_string());
    let decision_event = stream::once(async move {
        Ok(Event::default().event("routing_decision").data(decision_payload))
    });

    let state = Arc::new(Mutex::new(StreamState::default()));

    let state_for_body = state.clone();
    let body_events = events.map(move |event| {
        if let Some(reason) = &event.error {
            state_for_body.lock().unwrap().error = Some(reason.clone());
            let payload = serde_json::json!({ "error": { "message": reason } }).to_string();
            return Ok(Event::default().event("error").data(payload));
        }
        if event.usage.is_some() {
            state_for_body.lock().unwrap().usage = event.usage.clone();
        }
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(payload))
    });

    let state_for_tail = state.clone();
    let tail = stream::once(async move {
        let (usage, error) = {
            let s = state_for_tail.lock().unwrap();
            (s.usage.clone(), s.error.clone())
        };

        let mut finalized = decision;
        if let Some(usage) = usage {
            if let Some((input_price, output_price)) = audit.pricing {
                finalized.estimated_cost_usd = usage.estimate_cost_usd(input_price, output_price);
            }
            finalized.token_usage = usage;
        }
        if error.is_some() {
            finalized.terminal_error = Some("terminated_mid_stream".to_string());
        }

        audit.recorder.record(&finalized).await;
        if finalized.estimated_cost_usd > Decimal::from(0) {
            audit
                .budget_store
                .record_spend(&audit.identity, finalized.estimated_cost_usd)
                .await;
        }

        if error.is_some() {
            None
        } else {
            Some(Ok(Event::default().data("[DONE]")))
        }
    })
    .filter_map(|event| async move { event });

    let combined: BoxStream<'static, Result<Event, Infallible>> =
        decision_event.chain(body_events).chain(tail).boxed();

    Sse::new(combined).keep_alive(KeepAlive::default())
}
