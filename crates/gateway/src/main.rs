//! Folio API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Authentication (bearer tokens) and actor resolution
//! - Rate limiting
//! - Request routing onto the catalog and review services
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    routing::{get, patch, post},
    Router,
};
use folio_common::{
    auth::JwtManager,
    clock::SystemClock,
    config::{AppConfig, ObservabilityConfig},
    db::{schema, DbPool, Repository},
    mail::create_mailer,
    metrics::{self, LATENCY_BUCKETS},
    services::{AccountService, AccountSettings, CatalogService, ReviewService, Services},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub reviews: ReviewService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, repo: Repository, services: Services) -> Self {
        Self {
            config,
            repo,
            accounts: services.accounts,
            catalog: services.catalog,
            reviews: services.reviews,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::load()?);
    init_tracing(&config.observability);
    config.validate()?;

    info!(
        service = %config.observability.service_name,
        "Starting Folio API Gateway v{}",
        folio_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    // Initialize database connection
    let pool = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        schema::create_schema(pool.conn()).await?;
        info!("Database schema ensured");
    }
    let repo = Repository::new(pool);

    // Collaborators
    let jwt = Arc::new(JwtManager::new(
        config.jwt_secret()?,
        config.auth.jwt_expiration_secs,
    ));
    let mailer = create_mailer(&config.mail)?;
    let settings = AccountSettings {
        code_bytes: config.auth.confirmation_code_bytes,
        confirmation_subject: config.mail.confirmation_subject.clone(),
        mail_deadline: config.mail.delivery_budget(),
    };
    let services = Services::new(repo.clone(), jwt, mailer, Arc::new(SystemClock), settings);

    if let (Some(username), Some(email)) = (
        config.bootstrap.admin_username.as_deref(),
        config.bootstrap.admin_email.as_deref(),
    ) {
        services.accounts.ensure_superuser(username, email).await?;
    }

    // Build the router
    let state = AppState::new(config.clone(), repo, services);
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Open connections get `shutdown_timeout` to drain once the signal arrives
    let shutdown_timeout = config.shutdown_timeout();
    let drain_deadline = async move {
        let _ = shutdown_rx.wait_for(|stopping| *stopping).await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server.into_future() => result?,
        _ = drain_deadline => warn!("Shutdown timeout elapsed, closing remaining connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured level when set
fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

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
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Signup and token exchange
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/token", post(handlers::auth::token))
        // Users
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/me",
            get(handlers::users::get_me).patch(handlers::users::patch_me),
        )
        .route(
            "/users/{username}",
            get(handlers::users::get_user)
                .patch(handlers::users::patch_user)
                .delete(handlers::users::delete_user),
        )
        // Categories and genres
        .route(
            "/categories",
            get(handlers::taxonomies::list_categories).post(handlers::taxonomies::create_category),
        )
        .route(
            "/categories/{slug}",
            patch(handlers::taxonomies::update_category)
                .delete(handlers::taxonomies::delete_category),
        )
        .route(
            "/genres",
            get(handlers::taxonomies::list_genres).post(handlers::taxonomies::create_genre),
        )
        .route(
            "/genres/{slug}",
            patch(handlers::taxonomies::update_genre).delete(handlers::taxonomies::delete_genre),
        )
        // Titles
        .route(
            "/titles",
            get(handlers::titles::list_titles).post(handlers::titles::create_title),
        )
        .route(
            "/titles/{title_id}",
            get(handlers::titles::get_title)
                .patch(handlers::titles::update_title)
                .delete(handlers::titles::delete_title),
        )
        // Reviews
        .route(
            "/titles/{title_id}/reviews",
            get(handlers::reviews::list_reviews).post(handlers::reviews::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(handlers::reviews::get_review)
                .patch(handlers::reviews::update_review)
                .delete(handlers::reviews::delete_review),
        )
        // Comments
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(handlers::comments::list_comments).post(handlers::comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(handlers::comments::get_comment)
                .patch(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        );

    let mut app = Router::new().nest("/api/v1", api_routes);

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        app = app.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    app.layer(axum::middleware::from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
