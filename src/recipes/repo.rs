use sqlx::PgConnection;
use uuid::Uuid;

use crate::recipes::repo_types::{Recipe, RecipeFields};
use crate::store::StoreResult;
use crate::tags::repo_types::Tag;

pub async fn insert(
    conn: &mut PgConnection,
    owner: Uuid,
    fields: &RecipeFields,
) -> StoreResult<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (id, user_id, title, description, time_minutes, price, link)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, user_id, title, description, time_minutes, price, link, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.time_minutes)
    .bind(fields.price)
    .bind(&fields.link)
    .fetch_one(conn)
    .await?;
    Ok(recipe)
}

/// `user_id` is only used to scope the row, never written.
pub async fn update(conn: &mut PgConnection, recipe: &Recipe) -> StoreResult<Recipe> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
           SET title = $3, description = $4, time_minutes = $5, price = $6, link = $7
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, description, time_minutes, price, link, created_at
        "#,
    )
    .bind(recipe.id)
    .bind(recipe.user_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.link)
    .fetch_one(conn)
    .await?;
    Ok(recipe)
}

pub async fn delete(conn: &mut PgConnection, owner: Uuid, id: Uuid) -> StoreResult<bool> {
    let res = sqlx::query(r#"DELETE FROM recipes WHERE id = $1 AND user_id = $2"#)
        .bind(id)
        .bind(owner)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn list_by_user(conn: &mut PgConnection, owner: Uuid) -> StoreResult<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, description, time_minutes, price, link, created_at
          FROM recipes
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(owner)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn find(conn: &mut PgConnection, owner: Uuid, id: Uuid) -> StoreResult<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, description, time_minutes, price, link, created_at
          FROM recipes
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(conn)
    .await?;
    Ok(recipe)
}

pub async fn list_tags(conn: &mut PgConnection, recipe_id: Uuid) -> StoreResult<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.user_id, t.name
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = $1
         ORDER BY rt.position ASC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn clear_tags(conn: &mut PgConnection, recipe_id: Uuid) -> StoreResult<()> {
    sqlx::query(r#"DELETE FROM recipe_tags WHERE recipe_id = $1"#)
        .bind(recipe_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn attach_tag(conn: &mut PgConnection, recipe_id: Uuid, tag_id: Uuid) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        VALUES ($1, $2)
        ON CONFLICT (recipe_id, tag_id) DO NOTHING
        "#,
    )
    .bind(recipe_id)
    .bind(tag_id)
    .execute(conn)
    .await?;
    Ok(())
}
