use std::{
    any::Any,
    fmt::{self, Debug, Formatter},
    time::Duration,
};

use grove_value::Variables;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use web_time::Instant;

use crate::{context::Data, FieldValue};

/// An operation to run against a [`Schema`](crate::Schema).
///
/// Deserializes from the GraphQL-over-HTTP body: `query`, `operationName` and `variables`.
/// Everything else only exists on the Rust side and is set with the builder methods.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Variables,
    /// Parent value handed to the root fields.
    #[serde(skip)]
    pub root_value: FieldValue,
    /// Only visible to this request, looked up before the schema data.
    #[serde(skip)]
    pub data: Data,
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
    /// Fields which haven't started before this instant fail with `OPERATION_TIMEOUT`.
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Request {
            query: query.into(),
            operation_name: None,
            variables: Variables::default(),
            root_value: FieldValue::NULL,
            data: Data::default(),
            cancellation: None,
            deadline: None,
        }
    }

    /// Selects the operation to run when the document holds several.
    #[must_use]
    pub fn with_operation_name<T: Into<String>>(mut self, name: T) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn root_value(mut self, root_value: impl Into<FieldValue>) -> Self {
        self.root_value = root_value.into();
        self
    }

    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Cancelling the token stops the operation, subscriptions included.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Shorthand for a deadline relative to now.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }
}

impl<T: Into<String>> From<T> for Request {
    fn from(query: T) -> Self {
        Request::new(query)
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("operation_name", &self.operation_name)
            .field("variables", &self.variables)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
