use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use super::dto::{
    CreateUserRequest, ListQuery, LoginRequest, LoginResponse, MessageResponse,
    PaginatedResponse, UpdateUserRequest, UserResponse,
};
use crate::{auth::JwtKeys, error::ApiError, extractors::JsonBody, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Path ids are plain decimal digits that fit in `i64`; anything else
/// (signs, whitespace, fractions) is rejected before the service is called.
fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    Some(raw)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            warn!(id = raw, "invalid user id");
            ApiError::invalid_user_id()
        })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate().map_err(|e| {
        warn!(error = %e, "invalid registration");
        ApiError::invalid_request(e)
    })?;

    let user = state
        .users
        .register(payload)
        .await
        .map_err(|e| ApiError::from_user_error(e, "Failed to create user"))?;

    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(mut payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.validate().map_err(|e| {
        warn!(error = %e, "invalid login request");
        ApiError::invalid_request(e)
    })?;

    let user = state
        .users
        .login(payload)
        .await
        .map_err(|e| ApiError::from_user_error(e, "Login failed"))?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Login failed")
    })?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let (page, limit) = query.resolve();

    let (users, total) = state
        .users
        .get_all(page, limit)
        .await
        .map_err(|e| ApiError::from_user_error(e, "Failed to fetch users"))?;

    Ok(Json(PaginatedResponse::new(users, total, page, limit)))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_user_id(&id)?;
    let user = state
        .users
        .get_by_id(id)
        .await
        .map_err(|e| ApiError::from_user_error(e, "Failed to fetch user"))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(mut payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_user_id(&id)?;
    payload.validate().map_err(|e| {
        warn!(error = %e, user_id = id, "invalid update");
        ApiError::invalid_request(e)
    })?;

    let user = state
        .users
        .update(id, payload)
        .await
        .map_err(|e| ApiError::from_user_error(e, "Failed to update user"))?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_user_id(&id)?;
    state
        .users
        .delete(id)
        .await
        .map_err(|e| ApiError::from_user_error(e, "Failed to delete user"))?;
    Ok(Json(MessageResponse {
        message: "User deleted successfully".into(),
    }))
}
