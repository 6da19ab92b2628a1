//! Secret Santa organizer — entry point.
//!
//! Serves a small Axum REST API over SQLite: managers create groups,
//! participants join with an invite code and keep a wish list, and a manager
//! triggers the draw, which emails every giver the wish list of the person
//! they drew.

mod api;
mod auth;
mod config;
mod coordinator;
mod db;
mod draw;
mod errors;
mod models;
mod notify;
mod store;
mod validation;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use coordinator::Coordinator;
use notify::{EmailDispatcher, Mailer};
use store::SqliteParticipantStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!("Draw mode: {:?}", config.draw_mode);

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // A run still in flight here was cut off by a previous shutdown.
    let released = db::fail_interrupted_runs(&pool).await?;
    if released > 0 {
        warn!("Marked {released} interrupted run(s) as failed");
    }

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(config.email_timeout_secs))
        .build()?;
    let mailer = Mailer::new(client, &config);

    let coordinator = Arc::new(Coordinator::new(
        pool.clone(),
        SqliteParticipantStore::new(pool.clone()),
        EmailDispatcher::new(mailer.clone()),
        config.draw_mode,
    ));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState {
        pool,
        coordinator,
        mailer,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/managers", post(api::create_manager))
        .route("/managers/verify", post(api::verify_manager))
        .route("/groups", get(api::list_groups).post(api::create_group))
        .route(
            "/groups/:id",
            get(api::get_group)
                .put(api::rename_group)
                .delete(api::delete_group),
        )
        .route("/groups/:id/participants", post(api::add_participant))
        .route(
            "/groups/:id/participants/:participant_id",
            axum::routing::delete(api::remove_participant),
        )
        .route("/groups/:id/organize", post(api::organize))
        .route("/groups/:id/runs", get(api::list_runs))
        .route("/runs/:id", get(api::get_run))
        .route("/runs/:id/resend", post(api::resend_run))
        .route("/invites/validate", post(api::validate_invite))
        .route("/invites/join", post(api::join_group))
        .route(
            "/participants/:id/gifts",
            get(api::list_gifts).post(api::create_gift),
        )
        .route(
            "/gifts/:id",
            axum::routing::patch(api::update_gift).delete(api::delete_gift),
        )
        .route("/gifts/:id/buy", post(api::buy_gift))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
