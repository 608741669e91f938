use std::{
    any::Any,
    collections::BTreeMap,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use async_graphql_parser::Pos;
use grove_value::ConstValue;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{query_path::PathSegment, QueryPath};

/// Machine readable error codes, exposed as `extensions.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    OperationParsingError,
    OperationValidationError,
    BadUserInput,
    InternalServerError,
    Unauthorized,
    OperationTimeout,
    SubscriptionError,
}

/// Extensions to the error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ErrorExtensionValues(BTreeMap<String, ConstValue>);

impl ErrorExtensionValues {
    /// Set an extension value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<ConstValue>) {
        self.0.insert(name.as_ref().to_string(), value.into());
    }

    pub fn unset(&mut self, name: impl AsRef<str>) {
        self.0.remove(name.as_ref());
    }

    pub fn get(&self, name: impl AsRef<str>) -> Option<&ConstValue> {
        self.0.get(name.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: ErrorExtensionValues) {
        self.0.extend(other.0);
    }
}

/// An error in a GraphQL server, as it appears in a response.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// An explanatory message of the error.
    pub message: String,
    /// Where the error occurred.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locations: Vec<Pos>,
    /// If the error occurred in a resolver, the path to the error.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<PathSegment>,
    /// Extensions to the error.
    #[serde(skip_serializing_if = "error_extensions_is_empty", default)]
    pub extensions: Option<ErrorExtensionValues>,
    #[serde(skip)]
    pub source: Option<Arc<dyn Any + Send + Sync>>,
}

fn error_extensions_is_empty(values: &Option<ErrorExtensionValues>) -> bool {
    values.as_ref().map_or(true, ErrorExtensionValues::is_empty)
}

impl Debug for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerError")
            .field("message", &self.message)
            .field("locations", &self.locations)
            .field("path", &self.path)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl PartialEq for ServerError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.locations == other.locations
            && self.path == other.path
            && self.extensions == other.extensions
    }
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl ServerError {
    /// Create a new server error with the message.
    pub fn new(message: impl Into<String>, pos: Option<Pos>) -> Self {
        Self {
            message: message.into(),
            locations: pos.map(|pos| vec![pos]).unwrap_or_default(),
            path: Vec::new(),
            extensions: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: &QueryPath) -> Self {
        self.path = path.to_vec();
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.extensions
            .get_or_insert_with(Default::default)
            .set("code", code.as_ref());
        self
    }

    /// The `extensions.code` of this error, if it is a known one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self.extensions.as_ref()?.get("code")? {
            ConstValue::String(code) => code.parse().ok(),
            _ => None,
        }
    }

    /// Downcast the error source.
    pub fn source<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.source.as_ref().and_then(|source| source.downcast_ref())
    }
}

impl From<async_graphql_parser::Error> for ServerError {
    fn from(err: async_graphql_parser::Error) -> Self {
        Self {
            message: err.to_string(),
            locations: err.positions().collect(),
            path: Vec::new(),
            extensions: None,
            source: None,
        }
        .with_code(ErrorCode::OperationParsingError)
    }
}

/// Alias for `Result<T, ServerError>`.
pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// An error raised by a resolver or a permission.
///
/// Anything implementing [`Display`] converts into it, so resolvers can use `?` on their own
/// error types. The error is attached to the field's location and path by the executor.
#[derive(Clone, Default)]
pub struct Error {
    pub message: String,
    pub source: Option<Arc<dyn Any + Send + Sync>>,
    pub extensions: Option<ErrorExtensionValues>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.extensions == other.extensions
    }
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
            extensions: None,
        }
    }

    /// Create an error keeping the original error around, available with [`ServerError::source`].
    pub fn new_with_source(source: impl Display + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Arc::new(source)),
            extensions: None,
        }
    }

    #[must_use]
    pub fn extension(mut self, name: impl AsRef<str>, value: impl Into<ConstValue>) -> Self {
        self.extensions.get_or_insert_with(Default::default).set(name, value);
        self
    }

    #[must_use]
    pub fn with_code(self, code: ErrorCode) -> Self {
        self.extension("code", code.as_ref())
    }

    pub fn into_server_error(self, pos: Pos) -> ServerError {
        ServerError {
            message: self.message,
            locations: vec![pos],
            path: Vec::new(),
            extensions: self.extensions,
            source: self.source,
        }
    }
}

impl<T: Display + Send + Sync + 'static> From<T> for Error {
    fn from(e: T) -> Self {
        Self::new_with_source(e)
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Build time failures, every violation found while building the graph is reported.
#[derive(Debug, thiserror::Error)]
#[error("Invalid schema: {}", .violations.iter().join("; "))]
pub struct SchemaError {
    pub violations: Vec<SchemaViolation>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("Type \"{name}\" is declared more than once")]
    DuplicateType { name: String },
    #[error("Type \"{name}\" is referenced but never declared")]
    UnknownType { name: String },
    #[error("Root type \"{name}\" must be an object type")]
    RootNotAnObject { name: String },
    #[error("{kind} \"{name}\" must define at least one field")]
    NoFields { kind: &'static str, name: String },
    #[error("Field \"{type_name}.{field}\" is declared more than once")]
    DuplicateField { type_name: String, field: String },
    #[error("Argument \"{argument}\" of \"{type_name}.{field}\" is declared more than once")]
    DuplicateArgument {
        type_name: String,
        field: String,
        argument: String,
    },
    #[error("Enum \"{name}\" must define at least one value")]
    EmptyEnum { name: String },
    #[error("Union \"{name}\" must have at least one member")]
    EmptyUnion { name: String },
    #[error("Union \"{name}\" can only include object types, \"{member}\" is not one")]
    NonObjectUnionMember { name: String, member: String },
    #[error("\"{object}\" cannot implement \"{interface}\" which is not an interface")]
    NotAnInterface { object: String, interface: String },
    #[error("Interface field \"{interface}.{field}\" expects type \"{expected}\" but \"{object}.{field}\" is type \"{actual}\"")]
    IncompatibleInterfaceField {
        object: String,
        interface: String,
        field: String,
        expected: String,
        actual: String,
    },
    #[error("Interface field argument \"{interface}.{field}({argument}:)\" expected but \"{object}.{field}\" does not provide it")]
    MissingInterfaceArgument {
        object: String,
        interface: String,
        field: String,
        argument: String,
    },
    #[error("Interface field argument \"{interface}.{field}({argument}:)\" expects type \"{expected}\" but \"{object}.{field}({argument}:)\" is type \"{actual}\"")]
    IncompatibleInterfaceArgument {
        object: String,
        interface: String,
        field: String,
        argument: String,
        expected: String,
        actual: String,
    },
    #[error("The type of \"{type_name}.{field}\" must be an output type but got \"{ty}\"")]
    InputTypeInOutput {
        type_name: String,
        field: String,
        ty: String,
    },
    #[error("The type of \"{location}\" must be an input type but got \"{ty}\"")]
    OutputTypeInInput { location: String, ty: String },
    #[error("Field \"{type_name}.{field}\" is fail_silently but its type \"{ty}\" is neither nullable nor a list")]
    FailSilentlyOnNonNull {
        type_name: String,
        field: String,
        ty: String,
    },
    #[error("Invalid default value for \"{location}\": {message}")]
    InvalidDefaultValue { location: String, message: String },
    #[error("Type \"{ty}\" nests more than 15 lists")]
    TooManyNestedLists { ty: String },
    #[error("Object field \"{object}.{field}\" adds the required argument \"{argument}\" missing from the interface field \"{interface}.{field}\"")]
    RequiredArgumentNotInInterface {
        object: String,
        interface: String,
        field: String,
        argument: String,
    },
}
