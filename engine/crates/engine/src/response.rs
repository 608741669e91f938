use grove_value::ConstValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ServerError;

/// Result of an operation, shaped like a GraphQL-over-HTTP response body.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Absent when the request failed before execution, null when an error bubbled up to the
    /// root.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<ConstValue>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<ServerError>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub extensions: IndexMap<String, ConstValue>,
}

impl Response {
    pub fn new(data: impl Into<ConstValue>) -> Self {
        Self {
            data: Some(data.into()),
            ..Default::default()
        }
    }

    /// A request error: no execution happened.
    pub fn from_errors(errors: Vec<ServerError>) -> Self {
        Self {
            data: None,
            errors,
            extensions: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn extension(mut self, name: impl Into<String>, value: ConstValue) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// The data if no error happened at all.
    pub fn into_result(self) -> Result<Response, Vec<ServerError>> {
        if self.is_err() {
            Err(self.errors)
        } else {
            Ok(self)
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
