//! Access to the managed relational backend.
//!
//! The backend owns all persistent project data and enforces row-level
//! security. mecal talks to it through the [`Backend`] trait; the production
//! implementation is [`RestBackend`].

mod client;
#[cfg(test)]
pub mod fake;
mod query;
mod types;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::MecalError;

pub use client::RestBackend;
pub use query::{Filter, Order, Query};
pub use types::*;

/// Table-level operations against the backend.
pub trait Backend {
    /// Fetch rows matching `query`.
    fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, MecalError>;

    /// Insert one row and return it as stored.
    fn insert(&self, table: &str, row: &Value) -> Result<Value, MecalError>;

    /// Patch rows matching `query` and return them as stored.
    fn update(&self, table: &str, query: &Query, patch: &Value) -> Result<Vec<Value>, MecalError>;

    /// Delete rows matching `query` and return what was removed.
    fn delete(&self, table: &str, query: &Query) -> Result<Vec<Value>, MecalError>;

    /// Resolve an access token to a user id. Invalid tokens yield `None`.
    fn user_for_token(&self, token: &str) -> Result<Option<String>, MecalError>;
}

/// Deserialize backend rows into typed records.
///
/// # Errors
///
/// Returns `MecalError::Parse` if a row does not match `T`.
pub fn rows_as<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, MecalError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(MecalError::from))
        .collect()
}

/// Render a scalar JSON value as an id string.
#[must_use]
pub fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
