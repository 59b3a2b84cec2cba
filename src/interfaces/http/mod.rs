/// HTTP Interface - Booking ingestion
///
/// `POST /emit` with `{"event": "new-booking", "data": <booking>}` dispatches
/// the booking and answers with the number of drivers matched on this
/// instance. Any other event name is accepted and ignored. The observability
/// routes are served from the same listener.

use crate::application::ports::{BookingRelay, EventEmitter};
use crate::application::use_cases::DispatchBookingUseCase;
use crate::domain::entities::Booking;
use crate::infrastructure::observability::{observability_router, ObservabilityState};
use crate::shared::protocol::EVENT_NEW_BOOKING;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub const EMIT_ACK: &str = "Event emitted";

#[derive(Debug, Clone, Deserialize)]
pub struct EmitRequest {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitResponse {
    pub message: String,
    pub matched: usize,
}

async fn emit_handler<E, R>(
    State(use_case): State<Arc<DispatchBookingUseCase<E, R>>>,
    Json(request): Json<EmitRequest>,
) -> Json<EmitResponse>
where
    E: EventEmitter + 'static,
    R: BookingRelay + 'static,
{
    let matched = if request.event == EVENT_NEW_BOOKING {
        use_case.execute(&Booking::new(request.data)).matched
    } else {
        debug!(event = %request.event, "ignoring non-booking event");
        0
    };

    Json(EmitResponse {
        message: EMIT_ACK.to_string(),
        matched,
    })
}

/// `/emit` only
pub fn ingestion_router<E, R>(use_case: Arc<DispatchBookingUseCase<E, R>>) -> Router
where
    E: EventEmitter + 'static,
    R: BookingRelay + 'static,
{
    Router::new()
        .route("/emit", post(emit_handler::<E, R>))
        .with_state(use_case)
}

/// `/emit` plus health and metrics
pub fn router<E, R>(
    use_case: Arc<DispatchBookingUseCase<E, R>>,
    observability: ObservabilityState,
) -> Router
where
    E: EventEmitter + 'static,
    R: BookingRelay + 'static,
{
    ingestion_router(use_case).merge(observability_router(observability))
}
