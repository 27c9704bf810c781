//! API server assembly and shared handler state.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::registry::AlarmRegistry;
use crate::tracing::prelude::*;

/// State shared by every handler: the registry context object.
#[derive(Clone)]
pub struct SharedState {
    pub registry: Arc<AlarmRegistry>,
}

/// Build the full router: the v0 API plus interactive docs at `/docs`.
pub fn router(state: SharedState) -> axum::Router {
    let (router, api) = OpenApiRouter::new()
        .merge(super::v0::routes())
        .split_for_parts();
    router
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until the token is cancelled.
pub async fn serve(listen: SocketAddr, state: SharedState, running: CancellationToken) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { running.cancelled().await })
        .await?;
    Ok(())
}
