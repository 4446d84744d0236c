//! Persistence seams. Every read and write goes through a [`StoreTx`] obtained
//! from [`Store::begin`]; nothing is visible to other transactions until
//! [`StoreTx::commit`], and dropping the handle rolls back.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::recipes::repo_types::{Recipe, RecipeFields};
use crate::tags::repo_types::{Tag, TagDescriptor};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key was taken, possibly by a concurrent transaction.
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: RecipeStore + TagStore + UserStore {
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
pub trait RecipeStore: Send {
    async fn create_recipe(&mut self, owner: Uuid, fields: &RecipeFields) -> StoreResult<Recipe>;
    /// Writes the scalar fields of `recipe`; the owner column is never updated.
    async fn update_recipe(&mut self, recipe: &Recipe) -> StoreResult<Recipe>;
    async fn delete_recipe(&mut self, owner: Uuid, id: Uuid) -> StoreResult<bool>;
    /// Newest first.
    async fn list_recipes(&mut self, owner: Uuid) -> StoreResult<Vec<Recipe>>;
    async fn find_recipe(&mut self, owner: Uuid, id: Uuid) -> StoreResult<Option<Recipe>>;
    /// Attached tags in attachment order.
    async fn recipe_tags(&mut self, recipe_id: Uuid) -> StoreResult<Vec<Tag>>;
    async fn clear_recipe_tags(&mut self, recipe_id: Uuid) -> StoreResult<()>;
    /// Idempotent.
    async fn attach_tag(&mut self, recipe_id: Uuid, tag_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait TagStore: Send {
    /// Returns the tag and whether it was inserted. A lost insert race is
    /// reported as [`StoreError::Conflict`].
    async fn find_or_create_tag(
        &mut self,
        owner: Uuid,
        descriptor: &TagDescriptor,
    ) -> StoreResult<(Tag, bool)>;
    async fn find_tag_by_name(&mut self, owner: Uuid, name: &str) -> StoreResult<Option<Tag>>;
    async fn find_tag(&mut self, owner: Uuid, id: Uuid) -> StoreResult<Option<Tag>>;
    /// Ordered by name, descending.
    async fn list_tags(&mut self, owner: Uuid) -> StoreResult<Vec<Tag>>;
    async fn update_tag(&mut self, tag: &Tag) -> StoreResult<Tag>;
    /// Also detaches the tag from every recipe.
    async fn delete_tag(&mut self, owner: Uuid, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send {
    async fn create_user(&mut self, user: &NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>>;
    async fn update_user(&mut self, user: &User) -> StoreResult<User>;
}
