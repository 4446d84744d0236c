//! In-process store used by tests. Transactions are serialized behind an
//! async mutex and work on a private copy that replaces the shared state on
//! commit.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{RecipeStore, Store, StoreError, StoreResult, StoreTx, TagStore, UserStore};
use crate::auth::repo_types::{NewUser, User};
use crate::recipes::repo_types::{Recipe, RecipeFields};
use crate::tags::repo_types::{Tag, TagDescriptor};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: Vec<User>,
    pub recipes: Vec<Recipe>, // insertion order
    pub tags: Vec<Tag>,
    pub recipe_tags: Vec<(Uuid, Uuid)>, // (recipe_id, tag_id), attachment order
}

/// How the next tag insert misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagInsertFault {
    /// A concurrent transaction committed the same name first.
    Race,
    /// The insert conflicts but the winning row is not visible afterwards.
    Lost,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    tag_insert_fault: Arc<std::sync::Mutex<Option<TagInsertFault>>>,
}

impl MemoryStore {
    /// Committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Makes the next tag insert behave as if a concurrent transaction
    /// committed the same `(owner, name)` first.
    pub fn race_next_tag_insert(&self) {
        self.set_tag_insert_fault(TagInsertFault::Race);
    }

    /// Makes the next tag insert report a conflict while leaving no tag
    /// behind for the follow-up lookup to find.
    pub fn fail_next_tag_insert(&self) {
        self.set_tag_insert_fault(TagInsertFault::Lost);
    }

    fn set_tag_insert_fault(&self, fault: TagInsertFault) {
        if let Ok(mut slot) = self.tag_insert_fault.lock() {
            *slot = Some(fault);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            tag_insert_fault: self.tag_insert_fault.clone(),
        }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    tag_insert_fault: Arc<std::sync::Mutex<Option<TagInsertFault>>>,
}

impl MemoryTx {
    fn take_tag_insert_fault(&self) -> Option<TagInsertFault> {
        self.tag_insert_fault.lock().ok().and_then(|mut slot| slot.take())
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for MemoryTx {
    async fn create_recipe(&mut self, owner: Uuid, fields: &RecipeFields) -> StoreResult<Recipe> {
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: owner,
            title: fields.title.clone(),
            description: fields.description.clone(),
            time_minutes: fields.time_minutes,
            price: fields.price,
            link: fields.link.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.staged.recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> StoreResult<Recipe> {
        let stored = self
            .staged
            .recipes
            .iter_mut()
            .find(|r| r.id == recipe.id && r.user_id == recipe.user_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        stored.title = recipe.title.clone();
        stored.description = recipe.description.clone();
        stored.time_minutes = recipe.time_minutes;
        stored.price = recipe.price;
        stored.link = recipe.link.clone();
        Ok(stored.clone())
    }

    async fn delete_recipe(&mut self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let before = self.staged.recipes.len();
        self.staged
            .recipes
            .retain(|r| !(r.id == id && r.user_id == owner));
        let deleted = self.staged.recipes.len() < before;
        if deleted {
            self.staged.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
        }
        Ok(deleted)
    }

    async fn list_recipes(&mut self, owner: Uuid) -> StoreResult<Vec<Recipe>> {
        Ok(self
            .staged
            .recipes
            .iter()
            .rev()
            .filter(|r| r.user_id == owner)
            .cloned()
            .collect())
    }

    async fn find_recipe(&mut self, owner: Uuid, id: Uuid) -> StoreResult<Option<Recipe>> {
        Ok(self
            .staged
            .recipes
            .iter()
            .find(|r| r.id == id && r.user_id == owner)
            .cloned())
    }

    async fn recipe_tags(&mut self, recipe_id: Uuid) -> StoreResult<Vec<Tag>> {
        let tags = &self.staged.tags;
        Ok(self
            .staged
            .recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, t)| tags.iter().find(|tag| tag.id == *t).cloned())
            .collect())
    }

    async fn clear_recipe_tags(&mut self, recipe_id: Uuid) -> StoreResult<()> {
        self.staged.recipe_tags.retain(|(r, _)| *r != recipe_id);
        Ok(())
    }

    async fn attach_tag(&mut self, recipe_id: Uuid, tag_id: Uuid) -> StoreResult<()> {
        if !self.staged.recipe_tags.contains(&(recipe_id, tag_id)) {
            self.staged.recipe_tags.push((recipe_id, tag_id));
        }
        Ok(())
    }
}

#[async_trait]
impl TagStore for MemoryTx {
    async fn find_or_create_tag(
        &mut self,
        owner: Uuid,
        descriptor: &TagDescriptor,
    ) -> StoreResult<(Tag, bool)> {
        if let Some(tag) = self.find_tag_by_name(owner, &descriptor.name).await? {
            return Ok((tag, false));
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            user_id: owner,
            name: descriptor.name.clone(),
        };
        let fault = self.take_tag_insert_fault();
        if fault != Some(TagInsertFault::Lost) {
            self.staged.tags.push(tag.clone());
        }
        if fault.is_some() {
            return Err(StoreError::Conflict(format!(
                "tag '{}' was created concurrently",
                descriptor.name
            )));
        }
        Ok((tag, true))
    }

    async fn find_tag_by_name(&mut self, owner: Uuid, name: &str) -> StoreResult<Option<Tag>> {
        Ok(self
            .staged
            .tags
            .iter()
            .find(|t| t.user_id == owner && t.name == name)
            .cloned())
    }

    async fn find_tag(&mut self, owner: Uuid, id: Uuid) -> StoreResult<Option<Tag>> {
        Ok(self
            .staged
            .tags
            .iter()
            .find(|t| t.id == id && t.user_id == owner)
            .cloned())
    }

    async fn list_tags(&mut self, owner: Uuid) -> StoreResult<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .staged
            .tags
            .iter()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect();
        tags.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(tags)
    }

    async fn update_tag(&mut self, tag: &Tag) -> StoreResult<Tag> {
        let taken = self
            .staged
            .tags
            .iter()
            .any(|t| t.user_id == tag.user_id && t.name == tag.name && t.id != tag.id);
        if taken {
            return Err(StoreError::Conflict(format!("tag '{}' already exists", tag.name)));
        }
        let stored = self
            .staged
            .tags
            .iter_mut()
            .find(|t| t.id == tag.id && t.user_id == tag.user_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        stored.name = tag.name.clone();
        Ok(stored.clone())
    }

    async fn delete_tag(&mut self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let before = self.staged.tags.len();
        self.staged.tags.retain(|t| !(t.id == id && t.user_id == owner));
        let deleted = self.staged.tags.len() < before;
        if deleted {
            self.staged.recipe_tags.retain(|(_, tag_id)| *tag_id != id);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl UserStore for MemoryTx {
    async fn create_user(&mut self, user: &NewUser) -> StoreResult<User> {
        if self.staged.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(
                "user with this email already exists".into(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: OffsetDateTime::now_utc(),
        };
        self.staged.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.staged.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.staged.users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<User> {
        let stored = self
            .staged
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        stored.name = user.name.clone();
        stored.password_hash = user.password_hash.clone();
        stored.is_active = user.is_active;
        stored.is_staff = user.is_staff;
        stored.is_superuser = user.is_superuser;
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str) -> RecipeFields {
        RecipeFields {
            title: title.into(),
            description: String::new(),
            time_minutes: 10,
            price: None,
            link: String::new(),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_is_rolled_back() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.create_recipe(owner, &fields("Draft")).await.unwrap();
        drop(tx);

        assert!(store.snapshot().await.recipes.is_empty());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.create_recipe(owner, &fields("Soup")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let recipes = tx.list_recipes(owner).await.unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].title, "Soup");
    }

    #[tokio::test]
    async fn attach_tag_is_idempotent() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let recipe = tx.create_recipe(owner, &fields("Salad")).await.unwrap();
        let (tag, created) = tx
            .find_or_create_tag(owner, &TagDescriptor::new("green"))
            .await
            .unwrap();
        assert!(created);
        tx.attach_tag(recipe.id, tag.id).await.unwrap();
        tx.attach_tag(recipe.id, tag.id).await.unwrap();

        assert_eq!(tx.recipe_tags(recipe.id).await.unwrap(), vec![tag]);
    }

    #[tokio::test]
    async fn renaming_onto_existing_name_conflicts() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        tx.find_or_create_tag(owner, &TagDescriptor::new("vegan"))
            .await
            .unwrap();
        let (mut dessert, _) = tx
            .find_or_create_tag(owner, &TagDescriptor::new("dessert"))
            .await
            .unwrap();
        dessert.name = "vegan".into();

        let err = tx.update_tag(&dessert).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
