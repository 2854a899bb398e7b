//! Request instrumentation.
//!
//! # Responsibilities
//! - Assign a request ID (UUID v4) and echo it on the response
//! - Account every request as in flight until its response is produced
//! - Record request metrics
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The in-flight guard lives inside the handler future, so an aborted
//!   connection still releases its slot

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::net::InFlightTracker;
use crate::observability::metrics;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Wrap `router` with request ID, tracing and in-flight accounting.
pub fn instrument(router: Router, tracker: InFlightTracker) -> Router {
    router
        .layer(middleware::from_fn_with_state(tracker, track_in_flight))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
}

/// Middleware counting the request as in flight until it completes.
pub async fn track_in_flight(
    State(tracker): State<InFlightTracker>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let guard = tracker.track();
    metrics::set_in_flight(tracker.in_flight());

    tracing::debug!(
        request = %guard.seq(),
        method = %method,
        path = %request.uri().path(),
        "Request started"
    );

    let response = next.run(request).await;

    drop(guard);
    metrics::set_in_flight(tracker.in_flight());
    metrics::record_request(method.as_str(), response.status().as_u16(), start);

    response
}
