//! A GraphQL execution engine for schemas declared at runtime.
//!
//! Types are declared with the builders of the [`registry`] module, then turned into an
//! immutable [`SchemaGraph`] by [`Schema::build`]. Requests go through parsing, validation,
//! the coercion of their variables and arguments, and finally the execution of the selected
//! operation.
//!
//! ```rust
//! use grove_engine::{Field, FieldFuture, FieldValue, InputValue, Object, Request, Schema, TypeRef};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let query = Object::new("Query").field(
//!     Field::new("add", TypeRef::named_nn(TypeRef::INT))
//!         .argument(InputValue::new("a", TypeRef::named_nn(TypeRef::INT)))
//!         .argument(InputValue::new("b", TypeRef::named_nn(TypeRef::INT)))
//!         .resolver(|ctx| {
//!             FieldFuture::new(async move {
//!                 let a = ctx.args.deserialize::<i32>("a")?.unwrap_or_default();
//!                 let b = ctx.args.deserialize::<i32>("b")?.unwrap_or_default();
//!                 Ok(Some(FieldValue::value(a + b)))
//!             })
//!         }),
//! );
//!
//! let schema = Schema::build(query).finish().unwrap();
//! let response = schema.execute(Request::new("{ add(a: 10, b: 20) }")).await;
//! assert_eq!(response.to_json(), serde_json::json!({"data": {"add": 30}}));
//! # });
//! ```

mod coercion;
mod config;
mod context;
mod error;
pub mod extensions;
mod graph;
mod query_path;
pub mod registry;
mod request;
mod resolver_utils;
mod response;
mod schema;
mod subscription;
mod validation;

pub use config::{to_camel_case, SchemaConfig};
pub use context::{ContextExt, ContextField, ContextSelectionSet, Data, QueryEnv, ResolveInfo};
pub use error::{
    Error, ErrorCode, ErrorExtensionValues, Result, SchemaError, SchemaViolation, ServerError, ServerResult,
};
pub use graph::{
    BuiltinScalar, Definition, EnumDefinition, EnumId, EnumValueDefinition, EnumValueId, FieldDefinition, FieldId,
    InputObjectDefinition, InputObjectId, InputValueDefinition, InputValueId, InterfaceDefinition, InterfaceId,
    ObjectDefinition, ObjectId, RootOperationTypes, ScalarDefinition, ScalarId, SchemaGraph, Type, UnionDefinition,
    UnionId,
};
pub use grove_value::{ConstValue, Name, Number, Value, Variables};
pub use query_path::{PathSegment, QueryPath, QueryPathSegment};
pub use registry::{
    ArgumentValues, Deprecation, Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    LazyType, MaybeAbsent, Object, Permission, ResolverContext, Scalar, TypeDescriptor, TypeKind, TypeRef, Union,
};
pub use request::Request;
pub use response::Response;
#[doc(hidden)]
pub use schema::SchemaEnv;
pub use schema::{Schema, SchemaBuilder};
pub use validation::ValidationResult;
