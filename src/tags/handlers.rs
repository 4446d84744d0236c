use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    payload::{JsonBody, PathParam, UpdateMode},
    state::AppState,
    tags::{
        dto::{TagResponse, UpdateTagRequest},
        services,
    },
};

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/tags", get(list_tags))
        .route(
            "/recipe/tags/:id",
            patch(patch_tag).put(put_tag).delete(delete_tag),
        )
}

#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let tags = services::list_tags(state.store.as_ref(), user_id).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn patch_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateTagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    update(state, user_id, id, payload, UpdateMode::Partial).await
}

#[instrument(skip(state, payload))]
pub async fn put_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateTagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    update(state, user_id, id, payload, UpdateMode::Full).await
}

async fn update(
    state: AppState,
    user_id: Uuid,
    id: Uuid,
    mut payload: UpdateTagRequest,
    mode: UpdateMode,
) -> Result<Json<TagResponse>, AppError> {
    payload.validate(mode)?;
    let tag = services::update_tag(state.store.as_ref(), user_id, id, payload.name).await?;
    Ok(Json(tag.into()))
}

#[instrument(skip(state))]
pub async fn delete_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_tag(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
