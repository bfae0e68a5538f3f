//! DevCamper Backend
//!
//! A REST backend for a bootcamp directory: bootcamps, courses and user accounts
//! with role-based access, persisted in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod geocoder;
mod mailer;
mod models;
mod query;
mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::TokenKeys;
use config::Config;
use db::Repository;
use geocoder::{Geocoder, MapQuestGeocoder};
use mailer::{LogMailer, Mailer, SmtpMailer};

/// Multipart framing allowance on top of the configured photo size.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenKeys>,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DevCamper Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Public directory: {:?}", config.public_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    let tokens = match &config.jwt_secret {
        Some(secret) => TokenKeys::new(secret.as_bytes(), config.jwt_expire_days),
        None => {
            tracing::warn!(
                "No JWT secret configured (DEVCAMPER_JWT_SECRET). Sessions will not survive a restart!"
            );
            TokenKeys::random(config.jwt_expire_days)
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            tracing::info!("Sending mail through {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpMailer::new(smtp, &config.mail_from)?)
        }
        None => {
            tracing::warn!("No SMTP host configured (DEVCAMPER_SMTP_HOST). Mail will only be logged.");
            Arc::new(LogMailer)
        }
    };

    if config.geocoder.api_key.is_none() {
        tracing::warn!("No geocoder API key configured (DEVCAMPER_GEOCODER_API_KEY)");
    }
    let geocoder: Arc<dyn Geocoder> = Arc::new(MapQuestGeocoder::new(&config.geocoder)?);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    tokio::fs::create_dir_all(config.image_dir()).await?;

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
        tokens: Arc::new(tokens),
        geocoder,
        mailer,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let photo_limit = DefaultBodyLimit::max(state.config.max_upload_bytes + UPLOAD_OVERHEAD_BYTES);

    // API routes
    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/auth/me", get(api::me))
        .route("/auth/forgotpassword", post(api::forgot_password))
        .route(
            "/auth/resetpassword/{token}",
            get(api::check_reset_token).post(api::reset_password),
        )
        // Bootcamps
        .route("/bootcamps", get(api::list_bootcamps).post(api::create_bootcamp))
        .route(
            "/bootcamps/radius/{zipcode}/{distance}",
            get(api::bootcamps_in_radius),
        )
        .route(
            "/bootcamps/{id}",
            get(api::get_bootcamp)
                .put(api::update_bootcamp)
                .delete(api::delete_bootcamp),
        )
        .route(
            "/bootcamps/{id}/photo",
            put(api::upload_bootcamp_photo).layer(photo_limit),
        )
        .route("/bootcamps/{id}/courses", post(api::create_bootcamp_course))
        // Courses
        .route("/courses", get(api::list_courses).post(api::create_course))
        .route(
            "/courses/{id}",
            get(api::get_course)
                .put(api::update_course)
                .delete(api::delete_course),
        )
        .route("/courses/{id}/courses", get(api::list_bootcamp_courses));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    let public_dir = ServeDir::new(&state.config.public_dir);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes)
        .fallback_service(public_dir)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
