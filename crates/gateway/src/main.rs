//! Trades CMS content gateway
//!
//! The public REST API consumed by the marketing front end.
//! Handles:
//! - Read endpoints for services, projects, testimonials and areas
//! - Quality-gated local coverage pages
//! - Rate-limited lead capture
//! - Observability (logging, metrics, request IDs)

mod handlers;
mod middleware;

use axum::{
    extract::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router, ServiceExt,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::{limit::ConcurrencyLimitLayer, Layer};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use trades_common::{
    config::AppConfig,
    db::DbPool,
    media::MediaResolver,
    metrics::{self, LATENCY_BUCKETS},
    quality::QualityPolicy,
    telemetry,
};

use middleware::rate_limit::{create_lead_limiter, KeyedRateLimiter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub policy: QualityPolicy,
    pub media: Arc<MediaResolver>,
    pub lead_limiter: Option<Arc<KeyedRateLimiter>>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DbPool) -> trades_common::Result<Self> {
        Ok(Self {
            policy: QualityPolicy::from(&config.quality),
            media: Arc::new(MediaResolver::new(&config.media)?),
            lead_limiter: create_lead_limiter(&config.rate_limit),
            config,
            db,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    telemetry::init_tracing(&config.observability);
    info!("Starting Trades CMS gateway v{}", trades_common::VERSION);

    // Initialize metrics
    install_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    // Create app state
    let state = AppState::new(config.clone(), db)?;

    // Trailing slashes are trimmed before routing
    let app = NormalizePathLayer::trim_trailing_slash().layer(create_router(state));

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Serve Prometheus metrics on a separate port; 0 disables the exporter
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets(LATENCY_BUCKETS)?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Content endpoints
        .route("/services", get(handlers::services::list_services))
        .route("/services/{id}", get(handlers::services::get_service))
        .route("/projects", get(handlers::projects::list_projects))
        .route("/projects/{slug}", get(handlers::projects::get_project))
        .route("/testimonials", get(handlers::testimonials::list_testimonials))
        .route("/testimonials/{id}", get(handlers::testimonials::get_testimonial))
        .route("/areas", get(handlers::areas::list_areas))
        .route("/areas/{slug}", get(handlers::areas::get_area))

        // Local SEO endpoints
        .route("/geoareas", get(handlers::geoareas::list_geoareas))
        .route("/geoareas/{slug}", get(handlers::geoareas::get_geoarea))
        .route("/coverage", get(handlers::coverage::list_coverage))
        .route("/coverage/{id}", get(handlers::coverage::get_coverage))
        .route("/coverage/{service}/{city}", get(handlers::coverage::get_coverage_for))

        // Lead capture (per-client rate limit)
        .route(
            "/leads",
            post(handlers::leads::create_lead).route_layer(from_fn_with_state(
                state.clone(),
                middleware::rate_limit::lead_rate_limit,
            )),
        )

        // Site configuration
        .route("/config", get(handlers::site::get_config))
        .route("/themes", get(handlers::site::list_themes))
        .route_layer(from_fn(middleware::metrics::track_metrics));

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(state.config.server.max_concurrent_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
