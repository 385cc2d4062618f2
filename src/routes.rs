use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::debug;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    import,
    models::{
        AuthResponse, CreateMovieRequest, ImportMeta, ImportResponse, ListMeta, ListResponse,
        MovieResponse, RegisterRequest, SessionRequest, UpdateMovieRequest, UserResponse,
    },
    query::ListQuery,
    users,
};

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = users::register(&state.db, &req.email, &req.name, &req.password).await?;
    debug!(user_id = user.id, "registered user");

    let token = state.auth.issue(user.id)?;
    let response = AuthResponse {
        token,
        user: UserResponse { id: user.id, email: user.email, name: user.name },
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = users::authenticate(&state.db, &req.email, &req.password).await?;

    let token = state.auth.issue(user.id)?;
    let response = AuthResponse {
        token,
        user: UserResponse { id: user.id, email: user.email, name: user.name },
    };
    Ok(Json(response))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateMovieRequest>,
) -> AppResult<(StatusCode, Json<MovieResponse>)> {
    let input = req.validate()?;
    debug!(user_id = auth.user_id, title = %input.title, year = input.year, "creating movie");

    let created = state.store.create(input).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MovieResponse>> {
    let movie = state.store.get(id).await?.ok_or(AppError::NotFound("movie"))?;
    Ok(Json(movie.into()))
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateMovieRequest>,
) -> AppResult<Json<MovieResponse>> {
    let changes = req.validate()?;
    let updated =
        state.store.update(id, changes).await?.ok_or(AppError::NotFound("movie"))?;
    Ok(Json(updated.into()))
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    if !state.store.delete(id).await? {
        return Err(AppError::NotFound("movie"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let (filters, sort, page) = query.validate()?;
    let (items, total) = state.query.list(&filters, sort, page).await?;

    Ok(Json(ListResponse {
        data: items.into_iter().map(MovieResponse::from).collect(),
        meta: ListMeta { total },
    }))
}

pub async fn import_movies(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Bytes,
) -> AppResult<Json<ImportResponse>> {
    let text = std::str::from_utf8(&body)
        .map_err(|_| AppError::InvalidFileContent("file is not valid UTF-8".to_string()))?;

    let records = import::parse(text)?;
    debug!(user_id = auth.user_id, records = records.len(), "parsed import file");

    let outcome = state.store.create_many(records).await?;
    debug!(
        imported = outcome.created.len(),
        duplicates = outcome.skipped,
        "completed import"
    );

    Ok(Json(ImportResponse {
        meta: ImportMeta {
            imported: outcome.created.len(),
            duplicates: outcome.skipped,
            total: outcome.total_after,
        },
        data: outcome.created.into_iter().map(MovieResponse::from).collect(),
    }))
}
