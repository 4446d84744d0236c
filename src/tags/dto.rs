use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, FieldErrors};
use crate::payload::UpdateMode;
use crate::tags::repo_types::Tag;

pub const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
}

impl UpdateTagRequest {
    /// Trims `name` in place.
    pub fn validate(&mut self, mode: UpdateMode) -> Result<(), AppError> {
        let mut errors = FieldErrors::default();
        match self.name.as_deref().map(clean_tag_name) {
            Some(Ok(name)) => self.name = Some(name),
            Some(Err(msg)) => errors.add("name", msg),
            None if mode == UpdateMode::Full => errors.add("name", "This field is required."),
            None => {}
        }
        errors.into_result()
    }
}

/// Trimmed tag name, or the reason it is unusable.
pub fn clean_tag_name(raw: &str) -> Result<String, &'static str> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("This field may not be blank.");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("Ensure this field has no more than 255 characters.");
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_tag_name_trims_and_rejects_blank() {
        assert_eq!(clean_tag_name("  vegan ").unwrap(), "vegan");
        assert!(clean_tag_name("   ").is_err());
        assert!(clean_tag_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn full_update_requires_name() {
        let mut req = UpdateTagRequest::default();
        assert!(req.validate(UpdateMode::Partial).is_ok());

        let err = req.validate(UpdateMode::Full).unwrap_err();
        match err {
            AppError::Validation(fields) => assert!(fields.get("name").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
