use sqlx::PgConnection;
use uuid::Uuid;

use crate::store::{StoreError, StoreResult};
use crate::tags::repo_types::Tag;

pub async fn find_by_name(
    conn: &mut PgConnection,
    owner: Uuid,
    name: &str,
) -> StoreResult<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, user_id, name
          FROM tags
         WHERE user_id = $1 AND name = $2
        "#,
    )
    .bind(owner)
    .bind(name)
    .fetch_optional(conn)
    .await?;
    Ok(tag)
}

/// Insert unless `(owner, name)` already exists. `None` means another
/// transaction holds the key.
pub async fn insert_if_absent(
    conn: &mut PgConnection,
    owner: Uuid,
    name: &str,
) -> StoreResult<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (id, user_id, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, name) DO NOTHING
        RETURNING id, user_id, name
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(name)
    .fetch_optional(conn)
    .await?;
    Ok(tag)
}

pub async fn find(conn: &mut PgConnection, owner: Uuid, id: Uuid) -> StoreResult<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"SELECT id, user_id, name FROM tags WHERE id = $1 AND user_id = $2"#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(conn)
    .await?;
    Ok(tag)
}

pub async fn list_by_user(conn: &mut PgConnection, owner: Uuid) -> StoreResult<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, user_id, name
          FROM tags
         WHERE user_id = $1
         ORDER BY name DESC
        "#,
    )
    .bind(owner)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Rename a tag; colliding with another tag of the same owner is a conflict.
pub async fn update(conn: &mut PgConnection, tag: &Tag) -> StoreResult<Tag> {
    sqlx::query_as::<_, Tag>(
        r#"
        UPDATE tags SET name = $3
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, name
        "#,
    )
    .bind(tag.id)
    .bind(tag.user_id)
    .bind(&tag.name)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("tag '{}' already exists", tag.name))
        }
        other => other.into(),
    })
}

/// Associations go with the row (`ON DELETE CASCADE`).
pub async fn delete(conn: &mut PgConnection, owner: Uuid, id: Uuid) -> StoreResult<bool> {
    let res = sqlx::query(r#"DELETE FROM tags WHERE id = $1 AND user_id = $2"#)
        .bind(id)
        .bind(owner)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() > 0)
}
