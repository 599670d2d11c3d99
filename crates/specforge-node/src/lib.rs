//! # SpecForge Node
//!
//! HTTP service exposing the generation pipeline.

use axum::{
    routing::{get, post},
    Router,
};
use specforge_pipeline::CancellationToken;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod api;
pub mod config;
pub mod registry;
pub mod state;

pub use config::{ModelProvider, NodeConfig};
pub use registry::{RunRecord, RunRegistry};
pub use state::AppState;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed (tests).
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Run the node until `shutdown` is cancelled or Ctrl-C is received.
pub async fn run_server(config: NodeConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    info!("🚀 SpecForge node starting...");

    let state = AppState::from_config(&config, shutdown.clone())?;
    info!(
        model = state.orchestrator.model().model_name(),
        output_dir = %config.output_dir.display(),
        "pipeline ready"
    );

    let app = create_router(state);

    let listener = TcpListener::bind(config.bind).await?;
    info!("🌐 Listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("👋 SpecForge node stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                return shutdown.cancelled().await;
            }
            info!("shutdown requested, cancelling in-flight runs");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/ping", get(api::health::ping))
        .route("/health", get(api::health::health_check))

        // Invocation entrypoint
        .route("/invocations", post(api::invoke::invoke))

        // Run registry
        .route("/api/v1/runs", get(api::runs::list_runs))
        .route("/api/v1/runs/:id", get(api::runs::get_run))

        // WebSocket endpoints
        .route("/ws/events", get(api::ws::event_stream))

        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use specforge_model::EchoInvoker;
    use specforge_pipeline::PipelineConfig;
    use specforge_prompt::TemplatePromptBuilder;
    use specforge_store::InMemoryArtifactWriter;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_ping_route() {
        let state = AppState::new(
            PipelineConfig::default(),
            Arc::new(TemplatePromptBuilder::new()),
            Arc::new(EchoInvoker::new()),
            Arc::new(InMemoryArtifactWriter::new()),
            CancellationToken::new(),
        );

        let response = create_router(state)
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
