use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Tag record; `(user_id, name)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

/// Tag reference carried in a recipe payload, resolved by owner + name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagDescriptor {
    pub name: String,
}

impl TagDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
