use rust_decimal::Decimal;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tags::repo_types::Tag;

/// Recipe record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid, // owner, never changed after insert
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Option<Decimal>, // NUMERIC(5, 2)
    pub link: String,
    pub created_at: OffsetDateTime,
}

/// Scalar recipe fields written on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Option<Decimal>,
    pub link: String,
}

/// A recipe together with its attached tags, in attachment order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeWithTags {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
}
