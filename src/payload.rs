use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use tracing::warn;

use crate::error::AppError;

/// JSON request body whose decoding failures surface as `AppError::BadRequest`.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let reason = rejection.body_text();
                warn!(%reason, "malformed request body");
                Err(AppError::BadRequest(reason))
            }
        }
    }
}

/// Path parameters whose parse failures surface as `AppError::BadRequest`.
pub struct PathParam<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                let reason = rejection.body_text();
                warn!(%reason, "malformed path parameter");
                Err(AppError::BadRequest(reason))
            }
        }
    }
}

/// PUT replaces the resource and needs every required field, PATCH does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Partial,
    Full,
}

/// Wraps a present value in `Some`, so `Option<Option<T>>` tells an absent key
/// (outer `None`, via `#[serde(default)]`) from an explicit `null`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Nullable {
        #[serde(default, deserialize_with = "present")]
        value: Option<Option<i32>>,
    }

    #[test]
    fn present_distinguishes_absent_null_and_value() {
        let absent: Nullable = serde_json::from_str("{}").unwrap();
        let null: Nullable = serde_json::from_str(r#"{"value": null}"#).unwrap();
        let value: Nullable = serde_json::from_str(r#"{"value": 3}"#).unwrap();

        assert_eq!(absent.value, None);
        assert_eq!(null.value, Some(None));
        assert_eq!(value.value, Some(Some(3)));
    }
}
