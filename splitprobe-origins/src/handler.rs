use axum::extract::{OriginalUri, State};
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use splitprobe_core::{render_origin_body, OriginIdentity, RequestLedger};
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct OriginState {
    pub identity: Arc<OriginIdentity>,
    pub ledger: RequestLedger,
}

/// Catch-all handler: count the request, then identify ourselves
pub(crate) async fn serve_origin(
    State(state): State<OriginState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> impl IntoResponse {
    let count = state.ledger.record(state.identity.name());
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    tracing::trace!(
        origin = state.identity.name(),
        %method,
        path,
        count,
        "origin hit"
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_origin_body(&state.identity, path),
    )
}
