//! Resource trait and related types
//!
//! Resources exchange state with the plugin host as JSON objects keyed by
//! attribute name; each implementation converts to and from its API model.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::ApiError;
use crate::attachment::AttachmentError;
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
}

/// Diagnostic represents an error reported back to the user
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("invalid value for {attribute}: {message}")]
    InvalidConfig { attribute: String, message: String },

    #[error("failed to convert state: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0} cannot be updated in place; it must be replaced")]
    RequiresReplace(String),

    #[error("{0} does not support import")]
    ImportNotSupported(String),
}

impl ResourceError {
    pub fn invalid(attribute: &str, message: impl Into<String>) -> Self {
        ResourceError::InvalidConfig {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    pub fn to_diagnostic(&self, summary: &str) -> Diagnostic {
        let diag = Diagnostic::error(summary, self.to_string());
        match self {
            ResourceError::InvalidConfig { attribute, .. } => diag.with_attribute(attribute.as_str()),
            _ => diag,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResourceError>;

/// Base trait for resources - implement CRUD operations
#[async_trait]
pub trait Resource: Send + Sync {
    /// Must match the name the provider registers the resource under
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Create the resource and return the full new state, computed values included
    async fn create(&self, planned: Value) -> Result<Value>;

    /// Refresh state; `None` means the resource no longer exists
    async fn read(&self, current: Value) -> Result<Option<Value>>;

    async fn update(&self, prior: Value, planned: Value) -> Result<Value>;

    async fn delete(&self, current: Value) -> Result<()>;

    /// Build a state from an imported ID; the host follows up with `read`
    async fn import_state(&self, _id: &str) -> Result<Value> {
        Err(ResourceError::ImportNotSupported(self.type_name().to_string()))
    }
}

pub(crate) fn as_object<'a>(state: &'a Value, attribute: &str) -> Result<&'a Map<String, Value>> {
    state
        .as_object()
        .ok_or_else(|| ResourceError::invalid(attribute, "state must be an object"))
}

/// Required non-empty string attribute
pub(crate) fn required_str<'a>(state: &'a Value, attribute: &str) -> Result<&'a str> {
    match as_object(state, attribute)?.get(attribute) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(ResourceError::invalid(attribute, "must not be empty")),
        Some(Value::Null) | None => Err(ResourceError::invalid(attribute, "is required")),
        Some(other) => Err(ResourceError::invalid(
            attribute,
            format!("expected a string, got {}", other),
        )),
    }
}

pub(crate) fn optional_str<'a>(state: &'a Value, attribute: &str) -> Result<Option<&'a str>> {
    match as_object(state, attribute)?.get(attribute) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(ResourceError::invalid(
            attribute,
            format!("expected a string, got {}", other),
        )),
    }
}

pub(crate) fn optional_bool(state: &Value, attribute: &str) -> Result<Option<bool>> {
    match as_object(state, attribute)?.get(attribute) {
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(ResourceError::invalid(
            attribute,
            format!("expected a bool, got {}", other),
        )),
    }
}

pub(crate) fn optional_i64(state: &Value, attribute: &str) -> Result<Option<i64>> {
    match as_object(state, attribute)?.get(attribute) {
        Some(Value::Null) | None => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| ResourceError::invalid(attribute, format!("expected an integer, got {}", v))),
    }
}

/// List of strings; absent and null both read as empty
pub(crate) fn string_list(state: &Value, attribute: &str) -> Result<Vec<String>> {
    match as_object(state, attribute)?.get(attribute) {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ResourceError::invalid(attribute, format!("expected strings, got {}", item))
                })
            })
            .collect(),
        Some(other) => Err(ResourceError::invalid(
            attribute,
            format!("expected a list, got {}", other),
        )),
    }
}
