use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, MeResponse, PublicUser, RefreshRequest, RegisterRequest, TokenRequest,
            UpdateMeRequest,
        },
        jwt::{AuthUser, JwtKeys, TokenKind},
        repo_types::User,
        services,
    },
    error::AppError,
    payload::JsonBody,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/token", post(token))
        .route("/user/token/refresh", post(refresh))
        .route("/user/me", get(get_me).patch(update_me))
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::register_user(state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn token(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TokenRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = services::authenticate(state.store.as_ref(), &payload.email, &payload.password).await?;
    info!(user_id = %user.id, email = %user.email, "token issued");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            AppError::Unauthorized("Invalid or expired refresh token".into())
        })?;

    let user = services::load_user(state.store.as_ref(), claims.sub).await?;
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = services::load_user(state.store.as_ref(), user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<UpdateMeRequest>,
) -> Result<Json<MeResponse>, AppError> {
    let user = services::update_profile(state.store.as_ref(), user_id, payload).await?;
    Ok(Json(user.into()))
}
