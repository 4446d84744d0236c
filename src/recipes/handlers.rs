use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    payload::{JsonBody, PathParam, UpdateMode},
    recipes::{
        dto::{CreateRecipeRequest, RecipeDetail, RecipeSummary, UpdateRecipeRequest},
        services,
    },
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipe/recipes/:id",
            get(get_recipe)
                .put(put_recipe)
                .patch(patch_recipe)
                .delete(delete_recipe),
        )
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<RecipeSummary>>, AppError> {
    let recipes = services::list_recipes(state.store.as_ref(), user_id).await?;
    Ok(Json(recipes.into_iter().map(RecipeSummary::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<RecipeDetail>, AppError> {
    let recipe = services::get_recipe(state.store.as_ref(), user_id, id).await?;
    Ok(Json(recipe.into()))
}

/// POST /recipe/recipes; the owner is always the caller.
#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = services::create_recipe(state.store.as_ref(), user_id, payload).await?;
    let location = format!("/api/recipe/recipes/{}", recipe.recipe.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(RecipeDetail::from(recipe)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn put_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>, AppError> {
    update(state, user_id, id, payload, UpdateMode::Full).await
}

#[instrument(skip(state, payload))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>, AppError> {
    update(state, user_id, id, payload, UpdateMode::Partial).await
}

async fn update(
    state: AppState,
    user_id: Uuid,
    id: Uuid,
    payload: UpdateRecipeRequest,
    mode: UpdateMode,
) -> Result<Json<RecipeDetail>, AppError> {
    let changes = payload.validate(mode)?;
    let recipe = services::update_recipe(state.store.as_ref(), user_id, id, changes).await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_recipe(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
