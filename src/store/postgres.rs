use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{RecipeStore, Store, StoreError, StoreResult, StoreTx, TagStore, UserStore};
use crate::auth::{self, repo_types::{NewUser, User}};
use crate::recipes::{self, repo_types::{Recipe, RecipeFields}};
use crate::tags::{self, repo_types::{Tag, TagDescriptor}};

/// PostgreSQL-backed store; each transaction holds one pooled connection.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// Rolled back by sqlx when dropped without commit.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for PgTx {
    async fn create_recipe(&mut self, owner: Uuid, fields: &RecipeFields) -> StoreResult<Recipe> {
        recipes::repo::insert(&mut self.tx, owner, fields).await
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> StoreResult<Recipe> {
        recipes::repo::update(&mut self.tx, recipe).await
    }

    async fn delete_recipe(&mut self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        recipes::repo::delete(&mut self.tx, owner, id).await
    }

    async fn list_recipes(&mut self, owner: Uuid) -> StoreResult<Vec<Recipe>> {
        recipes::repo::list_by_user(&mut self.tx, owner).await
    }

    async fn find_recipe(&mut self, owner: Uuid, id: Uuid) -> StoreResult<Option<Recipe>> {
        recipes::repo::find(&mut self.tx, owner, id).await
    }

    async fn recipe_tags(&mut self, recipe_id: Uuid) -> StoreResult<Vec<Tag>> {
        recipes::repo::list_tags(&mut self.tx, recipe_id).await
    }

    async fn clear_recipe_tags(&mut self, recipe_id: Uuid) -> StoreResult<()> {
        recipes::repo::clear_tags(&mut self.tx, recipe_id).await
    }

    async fn attach_tag(&mut self, recipe_id: Uuid, tag_id: Uuid) -> StoreResult<()> {
        recipes::repo::attach_tag(&mut self.tx, recipe_id, tag_id).await
    }
}

#[async_trait]
impl TagStore for PgTx {
    async fn find_or_create_tag(
        &mut self,
        owner: Uuid,
        descriptor: &TagDescriptor,
    ) -> StoreResult<(Tag, bool)> {
        if let Some(tag) = tags::repo::find_by_name(&mut self.tx, owner, &descriptor.name).await? {
            return Ok((tag, false));
        }
        match tags::repo::insert_if_absent(&mut self.tx, owner, &descriptor.name).await? {
            Some(tag) => Ok((tag, true)),
            None => {
                debug!(%owner, name = %descriptor.name, "tag insert lost a race");
                Err(StoreError::Conflict(format!(
                    "tag '{}' was created concurrently",
                    descriptor.name
                )))
            }
        }
    }

    async fn find_tag_by_name(&mut self, owner: Uuid, name: &str) -> StoreResult<Option<Tag>> {
        tags::repo::find_by_name(&mut self.tx, owner, name).await
    }

    async fn find_tag(&mut self, owner: Uuid, id: Uuid) -> StoreResult<Option<Tag>> {
        tags::repo::find(&mut self.tx, owner, id).await
    }

    async fn list_tags(&mut self, owner: Uuid) -> StoreResult<Vec<Tag>> {
        tags::repo::list_by_user(&mut self.tx, owner).await
    }

    async fn update_tag(&mut self, tag: &Tag) -> StoreResult<Tag> {
        tags::repo::update(&mut self.tx, tag).await
    }

    async fn delete_tag(&mut self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        tags::repo::delete(&mut self.tx, owner, id).await
    }
}

#[async_trait]
impl UserStore for PgTx {
    async fn create_user(&mut self, user: &NewUser) -> StoreResult<User> {
        auth::repo::insert(&mut self.tx, user).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        auth::repo::find_by_email(&mut self.tx, email).await
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        auth::repo::find_by_id(&mut self.tx, id).await
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<User> {
        auth::repo::update(&mut self.tx, user).await
    }
}
