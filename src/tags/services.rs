use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::Store;
use crate::tags::repo_types::Tag;

fn not_found() -> AppError {
    AppError::NotFound("Tag not found".into())
}

pub async fn list_tags(store: &dyn Store, owner: Uuid) -> Result<Vec<Tag>, AppError> {
    let mut tx = store.begin().await?;
    let tags = tx.list_tags(owner).await?;
    tx.commit().await?;
    Ok(tags)
}

/// Renames a tag owned by `owner`; `None` leaves it unchanged.
pub async fn update_tag(
    store: &dyn Store,
    owner: Uuid,
    id: Uuid,
    name: Option<String>,
) -> Result<Tag, AppError> {
    let mut tx = store.begin().await?;
    let mut tag = tx.find_tag(owner, id).await?.ok_or_else(not_found)?;
    if let Some(name) = name {
        tag.name = name;
    }
    let tag = tx.update_tag(&tag).await?;
    tx.commit().await?;
    info!(tag_id = %tag.id, user_id = %owner, "tag updated");
    Ok(tag)
}

/// Deletes the tag row and detaches it from every recipe.
pub async fn delete_tag(store: &dyn Store, owner: Uuid, id: Uuid) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    if !tx.delete_tag(owner, id).await? {
        return Err(not_found());
    }
    tx.commit().await?;
    info!(tag_id = %id, user_id = %owner, "tag deleted");
    Ok(())
}
