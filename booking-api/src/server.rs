//! HTTP routing and server with graceful shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    booking,
    config::Config,
    envelope::{Outcome, METHOD_NOT_ALLOWED},
    error::Result,
    executor::Executor,
    health::health,
    middleware::{request_id_layer, request_id_propagation_layer, sensitive_headers_layer},
    product,
    state::AppState,
};

async fn method_not_allowed() -> Outcome {
    Outcome::client_error(METHOD_NOT_ALLOWED, StatusCode::METHOD_NOT_ALLOWED)
}

/// Build the application router
///
/// All routes live under `/api`. Any method other than GET on a known path
/// answers 405 with the standard envelope.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/v1/booking",
            get(booking::http::list_bookings).fallback(method_not_allowed),
        )
        .route(
            "/v1/booking/{id}",
            get(booking::http::get_booking).fallback(method_not_allowed),
        )
        .route(
            "/v1/products",
            get(product::http::list_products).fallback(method_not_allowed),
        )
        .route(
            "/v1/products/{id}",
            get(product::http::get_product).fallback(method_not_allowed),
        )
        .route("/health", get(health).fallback(method_not_allowed));

    Router::new().nest("/api", api).with_state(state)
}

/// Server instance
pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Serve `app` until SIGINT or SIGTERM
    ///
    /// After the signal the listener stops accepting, and requests still in
    /// flight after `shutdown_grace_secs` are cancelled through `executor`,
    /// which resolves them as timeouts.
    pub async fn serve(self, app: Router, executor: Executor) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.port));

        tracing::info!("Starting {} on {}", self.config.service.name, addr);
        self.log_middleware_config();

        // Layers wrap outward: the last one added sees the request first.
        let body_limit = self.config.middleware.body_limit_mb * 1024 * 1024;
        let app = app
            .layer(self.build_cors_layer())
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(sensitive_headers_layer())
            .layer(request_id_propagation_layer())
            .layer(request_id_layer())
            .layer(CatchPanicLayer::new());

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Server listening on {}", addr);

        let grace = Duration::from_secs(self.config.service.shutdown_grace_secs);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    tracing::warn!("Grace period elapsed, cancelling in-flight requests");
                    executor.shutdown();
                });
            })
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn log_middleware_config(&self) {
        tracing::info!("Middleware configuration:");
        tracing::info!("  - Body limit: {} MB", self.config.middleware.body_limit_mb);
        tracing::info!("  - CORS mode: {}", self.config.middleware.cors_mode);
        tracing::info!(
            "  - Deadlines: read={}ms list={}ms write={}ms",
            self.config.deadlines.read_ms,
            self.config.deadlines.list_ms,
            self.config.deadlines.write_ms
        );
    }

    fn build_cors_layer(&self) -> CorsLayer {
        match self.config.middleware.cors_mode.as_str() {
            "permissive" => CorsLayer::permissive(),
            "restrictive" | "disabled" => CorsLayer::new(),
            other => {
                tracing::warn!("Unknown CORS mode: {}, defaulting to permissive", other);
                CorsLayer::permissive()
            }
        }
    }
}

/// Wait for SIGTERM or SIGINT
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
