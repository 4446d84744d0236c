use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, FieldErrors};
use crate::payload::{present, UpdateMode};
use crate::recipes::repo_types::{Recipe, RecipeFields, RecipeWithTags};
use crate::tags::dto::{clean_tag_name, TagResponse};
use crate::tags::repo_types::TagDescriptor;

const MAX_TITLE_LEN: usize = 255;
const MAX_LINK_LEN: usize = 255;
const PRICE_DECIMAL_PLACES: u32 = 2;
// NUMERIC(5, 2) leaves three integer digits.
const PRICE_LIMIT: i64 = 1000;

/// List projection.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Option<Decimal>,
    pub link: String,
    pub tags: Vec<TagResponse>,
}

/// Detail projection: the summary plus `description`.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
}

impl From<RecipeWithTags> for RecipeSummary {
    fn from(value: RecipeWithTags) -> Self {
        RecipeDetail::from(value).summary
    }
}

impl From<RecipeWithTags> for RecipeDetail {
    fn from(value: RecipeWithTags) -> Self {
        let RecipeWithTags { recipe, tags } = value;
        Self {
            summary: RecipeSummary {
                id: recipe.id,
                title: recipe.title,
                time_minutes: recipe.time_minutes,
                price: recipe.price,
                link: recipe.link,
                tags: tags.into_iter().map(TagResponse::from).collect(),
            },
            description: recipe.description,
        }
    }
}

/// Body of `POST /recipe/recipes`. Any owner key in the body is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_minutes: i32,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub tags: Vec<TagDescriptor>,
}

impl CreateRecipeRequest {
    /// Validates and normalizes the payload, splitting off the tag list.
    pub fn into_parts(self) -> Result<(RecipeFields, Vec<TagDescriptor>), AppError> {
        let mut errors = FieldErrors::default();
        let title = check_title(&self.title, &mut errors);
        let link = check_link(&self.link, &mut errors);
        let price = self.price.map(|p| check_price(p, &mut errors));
        let tags = clean_descriptors(self.tags, &mut errors);
        errors.into_result()?;

        Ok((
            RecipeFields {
                title,
                description: self.description.trim().to_string(),
                time_minutes: self.time_minutes,
                price,
                link,
            },
            tags,
        ))
    }
}

/// Body of `PUT`/`PATCH /recipe/recipes/:id`. Absent keys leave the stored
/// value alone; `tags: []` clears the associations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Option<Decimal>>,
    pub link: Option<String>,
    pub tags: Option<Vec<TagDescriptor>>,
}

impl UpdateRecipeRequest {
    pub fn validate(mut self, mode: UpdateMode) -> Result<Self, AppError> {
        let mut errors = FieldErrors::default();
        if mode == UpdateMode::Full {
            if self.title.is_none() {
                errors.add("title", "This field is required.");
            }
            if self.time_minutes.is_none() {
                errors.add("time_minutes", "This field is required.");
            }
        }
        if let Some(title) = self.title.take() {
            self.title = Some(check_title(&title, &mut errors));
        }
        if let Some(description) = self.description.take() {
            self.description = Some(description.trim().to_string());
        }
        if let Some(link) = self.link.take() {
            self.link = Some(check_link(&link, &mut errors));
        }
        if let Some(Some(price)) = self.price {
            self.price = Some(Some(check_price(price, &mut errors)));
        }
        if let Some(tags) = self.tags.take() {
            self.tags = Some(clean_descriptors(tags, &mut errors));
        }
        errors.into_result()?;
        Ok(self)
    }

    /// Merges the present scalar fields into `recipe` and hands back the tag
    /// list, if one was sent. The owner is not part of the merge.
    pub fn apply(self, recipe: &mut Recipe) -> Option<Vec<TagDescriptor>> {
        if let Some(title) = self.title {
            recipe.title = title;
        }
        if let Some(description) = self.description {
            recipe.description = description;
        }
        if let Some(time_minutes) = self.time_minutes {
            recipe.time_minutes = time_minutes;
        }
        if let Some(price) = self.price {
            recipe.price = price;
        }
        if let Some(link) = self.link {
            recipe.link = link;
        }
        self.tags
    }
}

fn check_title(raw: &str, errors: &mut FieldErrors) -> String {
    let title = raw.trim();
    if title.is_empty() {
        errors.add("title", "This field may not be blank.");
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.add("title", "Ensure this field has no more than 255 characters.");
    }
    title.to_string()
}

fn check_link(raw: &str, errors: &mut FieldErrors) -> String {
    let link = raw.trim();
    if link.chars().count() > MAX_LINK_LEN {
        errors.add("link", "Ensure this field has no more than 255 characters.");
    }
    link.to_string()
}

/// Returns the price rescaled to two decimal places.
fn check_price(price: Decimal, errors: &mut FieldErrors) -> Decimal {
    if price.normalize().scale() > PRICE_DECIMAL_PLACES {
        errors.add("price", "Ensure that there are no more than 2 decimal places.");
    }
    if price.abs() >= Decimal::from(PRICE_LIMIT) {
        errors.add("price", "Ensure that there are no more than 5 digits in total.");
    }
    let mut price = price;
    price.rescale(PRICE_DECIMAL_PLACES);
    price
}

fn clean_descriptors(tags: Vec<TagDescriptor>, errors: &mut FieldErrors) -> Vec<TagDescriptor> {
    tags.into_iter()
        .filter_map(|descriptor| match clean_tag_name(&descriptor.name) {
            Ok(name) => Some(TagDescriptor { name }),
            Err(msg) => {
                errors.add("tags", msg);
                None
            }
        })
        .collect()
}
