use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::recipes::{
    dto::{CreateRecipeRequest, UpdateRecipeRequest},
    repo_types::RecipeWithTags,
};
use crate::store::{Store, StoreError, StoreTx};
use crate::tags::repo_types::{Tag, TagDescriptor};

fn not_found() -> AppError {
    AppError::NotFound("Recipe not found".into())
}

/// Resolves a descriptor to the owner's tag, creating it when absent. A lost
/// insert race is recovered by looking the tag up once more.
async fn resolve_tag(
    tx: &mut dyn StoreTx,
    owner: Uuid,
    descriptor: &TagDescriptor,
) -> Result<Tag, AppError> {
    match tx.find_or_create_tag(owner, descriptor).await {
        Ok((tag, created)) => {
            if created {
                debug!(tag_id = %tag.id, user_id = %owner, name = %tag.name, "tag created");
            }
            Ok(tag)
        }
        Err(StoreError::Conflict(reason)) => {
            warn!(user_id = %owner, name = %descriptor.name, %reason, "retrying tag lookup");
            tx.find_tag_by_name(owner, &descriptor.name)
                .await?
                .ok_or(AppError::Conflict(reason))
        }
        Err(e) => Err(e.into()),
    }
}

/// Attaches the descriptors in order; repeats resolve to the same tag and
/// are attached once.
async fn attach_tags(
    tx: &mut dyn StoreTx,
    owner: Uuid,
    recipe_id: Uuid,
    descriptors: &[TagDescriptor],
) -> Result<(), AppError> {
    for descriptor in descriptors {
        let tag = resolve_tag(tx, owner, descriptor).await?;
        tx.attach_tag(recipe_id, tag.id).await?;
    }
    Ok(())
}

/// Creates a recipe owned by `owner` and attaches its tags, in one transaction.
pub async fn create_recipe(
    store: &dyn Store,
    owner: Uuid,
    payload: CreateRecipeRequest,
) -> Result<RecipeWithTags, AppError> {
    let (fields, descriptors) = payload.into_parts()?;

    let mut tx = store.begin().await?;
    let recipe = tx.create_recipe(owner, &fields).await?;
    attach_tags(tx.as_mut(), owner, recipe.id, &descriptors).await?;
    let tags = tx.recipe_tags(recipe.id).await?;
    tx.commit().await?;

    info!(recipe_id = %recipe.id, user_id = %owner, tags = tags.len(), "recipe created");
    Ok(RecipeWithTags { recipe, tags })
}

/// Applies a validated update to a recipe owned by `owner`.
///
/// Absent `tags` leaves the associations alone; a present list replaces them
/// (an empty list detaches everything). Tag rows are never deleted here. A
/// recipe owned by someone else is reported as not found.
pub async fn update_recipe(
    store: &dyn Store,
    owner: Uuid,
    id: Uuid,
    changes: UpdateRecipeRequest,
) -> Result<RecipeWithTags, AppError> {
    let mut tx = store.begin().await?;
    let mut recipe = tx.find_recipe(owner, id).await?.ok_or_else(not_found)?;

    let descriptors = changes.apply(&mut recipe);
    let recipe = tx.update_recipe(&recipe).await?;

    if let Some(descriptors) = descriptors {
        tx.clear_recipe_tags(recipe.id).await?;
        attach_tags(tx.as_mut(), owner, recipe.id, &descriptors).await?;
    }
    let tags = tx.recipe_tags(recipe.id).await?;
    tx.commit().await?;

    info!(recipe_id = %recipe.id, user_id = %owner, "recipe updated");
    Ok(RecipeWithTags { recipe, tags })
}

pub async fn list_recipes(store: &dyn Store, owner: Uuid) -> Result<Vec<RecipeWithTags>, AppError> {
    let mut tx = store.begin().await?;
    let recipes = tx.list_recipes(owner).await?;
    let mut out = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        let tags = tx.recipe_tags(recipe.id).await?;
        out.push(RecipeWithTags { recipe, tags });
    }
    tx.commit().await?;
    Ok(out)
}

pub async fn get_recipe(store: &dyn Store, owner: Uuid, id: Uuid) -> Result<RecipeWithTags, AppError> {
    let mut tx = store.begin().await?;
    let recipe = tx.find_recipe(owner, id).await?.ok_or_else(not_found)?;
    let tags = tx.recipe_tags(recipe.id).await?;
    tx.commit().await?;
    Ok(RecipeWithTags { recipe, tags })
}

/// Deletes the recipe and its tag associations; the tags themselves stay.
pub async fn delete_recipe(store: &dyn Store, owner: Uuid, id: Uuid) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    if !tx.delete_recipe(owner, id).await? {
        return Err(not_found());
    }
    tx.commit().await?;
    info!(recipe_id = %id, user_id = %owner, "recipe deleted");
    Ok(())
}
