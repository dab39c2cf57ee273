//! API handlers module

pub mod auth;
pub mod comments;
pub mod extract;
pub mod health;
pub mod reviews;
pub mod taxonomies;
pub mod titles;
pub mod users;

use folio_common::errors::{AppError, Result};
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// `?search=` on list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Run the request body's `validator` rules before any core rule
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| {
        let field = e.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: e.to_string(),
            field,
        }
    })
}

/// Keeps an explicit `null` apart from an absent field: absent stays `None`
/// (via `#[serde(default)]`), `null` becomes `Some(None)`
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
