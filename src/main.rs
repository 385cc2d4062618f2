mod actors;
mod auth;
mod config;
mod db;
mod dedup;
mod entities;
mod error;
mod import;
mod models;
mod movies;
mod query;
mod routes;
mod text;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::TokenKeys, config::Config, movies::MovieStore, query::MovieQuery};

const MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub store: MovieStore,
    pub query: MovieQuery,
    pub auth: TokenKeys,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,kinoteka=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url).await?;

    let collator =
        text::title_collator().map_err(|err| anyhow::anyhow!("building collator: {err}"))?;

    let state = Arc::new(AppState {
        db: db.clone(),
        store: MovieStore::new(db.clone()),
        query: MovieQuery::new(db, Arc::new(collator)),
        auth: TokenKeys::new(&config.jwt_secret, config.token_ttl_hours),
    });

    let app = Router::new()
        .route("/api/v1/users", post(routes::register))
        .route("/api/v1/sessions", post(routes::create_session))
        .route("/api/v1/movies", post(routes::create_movie).get(routes::list_movies))
        .route(
            "/api/v1/movies/{id}",
            get(routes::get_movie).patch(routes::update_movie).delete(routes::delete_movie),
        )
        .route(
            "/api/v1/movies/import",
            post(routes::import_movies).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
