use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use auth::rate_limit::RateLimitState;
use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readtrack_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    let db = db::create_pool(&config.database_url, config.db_max_connections).await;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let state = AppState {
        db,
        config: config.clone(),
        rate_limiter: RateLimitState::new(),
    };

    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Books
        .route("/api/books", get(handlers::books::list_books))
        .route("/api/books", post(handlers::books::create_book))
        .route("/api/books/:id", get(handlers::books::get_book))
        .route("/api/books/:id", put(handlers::books::update_book))
        .route("/api/books/:id", delete(handlers::books::delete_book))
        // Notes & quotes
        .route("/api/books/:id/notes", get(handlers::notes::list_notes))
        .route("/api/books/:id/notes", post(handlers::notes::create_note))
        .route("/api/notes/:id", put(handlers::notes::update_note))
        .route("/api/notes/:id", delete(handlers::notes::delete_note))
        .route("/api/books/:id/quotes", get(handlers::quotes::list_quotes))
        .route("/api/books/:id/quotes", post(handlers::quotes::create_quote))
        .route("/api/quotes/:id", delete(handlers::quotes::delete_quote))
        // Reading logs
        .route("/api/logs", post(handlers::reading_logs::record_session))
        .route("/api/logs", get(handlers::reading_logs::list_logs))
        .route("/api/logs/:date", put(handlers::reading_logs::correct_log))
        // Goals
        .route("/api/goals", get(handlers::goals::get_goal))
        .route("/api/goals", put(handlers::goals::upsert_goal))
        // Streak & freezes
        .route("/api/streak", get(handlers::streaks::get_streak))
        .route("/api/streak/calendar", get(handlers::streaks::get_calendar))
        .route("/api/streak/freeze", post(handlers::streaks::use_freeze))
        // Dashboard
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    handlers::streaks::spawn_freeze_grant_worker(state.db.clone(), config.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    // ConnectInfo provides the client IP for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}
