//! Per request state and the contexts handed over to resolvers.

mod field;
mod selection_set;

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    ops::Deref,
    sync::{Arc, Mutex, PoisonError},
};

use async_graphql_parser::{
    types::{FragmentDefinition, OperationDefinition},
    Positioned,
};
use fnv::FnvHashMap;
use grove_value::{Name, Variables};
use tokio_util::sync::CancellationToken;
use web_time::Instant;

pub use field::{ContextField, ResolveInfo};
pub use selection_set::ContextSelectionSet;

use crate::{
    coercion::CoercedArguments, extensions::Extensions, schema::SchemaEnv, Error, FieldValue, QueryPath, Result,
    ServerError,
};

/// Type map used for the schema data and the request data.
#[derive(Default)]
pub struct Data(FnvHashMap<TypeId, Box<dyn Any + Sync + Send>>);

impl Data {
    /// Insert data, replacing any previous value of the same type.
    pub fn insert<D: Any + Send + Sync>(&mut self, data: D) {
        self.0.insert(TypeId::of::<D>(), Box::new(data));
    }

    pub fn get<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.0.get(&TypeId::of::<D>()).and_then(|data| data.downcast_ref())
    }

    pub(crate) fn merge(&mut self, other: Data) {
        self.0.extend(other.0);
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Data").field(&self.0.len()).finish()
    }
}

#[doc(hidden)]
pub struct QueryEnvInner {
    pub extensions: Extensions,
    pub variables: Variables,
    pub operation_name: Option<String>,
    pub operation: Positioned<OperationDefinition>,
    pub fragments: HashMap<Name, Positioned<FragmentDefinition>>,
    pub(crate) arguments: CoercedArguments,
    pub root_value: FieldValue,
    pub ctx_data: Arc<Data>,
    pub errors: Mutex<Vec<ServerError>>,
    pub cancellation: CancellationToken,
    pub deadline: Option<Instant>,
}

impl QueryEnvInner {
    pub fn add_error(&self, error: ServerError) {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).push(error);
    }

    pub(crate) fn take_errors(&self) -> Vec<ServerError> {
        std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether the request was cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct QueryEnv(Arc<QueryEnvInner>);

impl QueryEnv {
    pub(crate) fn new(inner: QueryEnvInner) -> Self {
        QueryEnv(Arc::new(inner))
    }
}

impl Deref for QueryEnv {
    type Target = QueryEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Accessors shared by every context.
pub trait ContextExt {
    fn path(&self) -> &QueryPath;

    fn query_env(&self) -> &QueryEnv;

    fn schema_env(&self) -> &SchemaEnv;

    /// Gets data of type `D`, looking first at the request data then at the schema data.
    ///
    /// # Errors
    ///
    /// Returns an error if no data of this type exists.
    fn data<D: Any + Send + Sync>(&self) -> Result<&D> {
        self.data_opt::<D>()
            .ok_or_else(|| Error::new(format!("Data `{}` does not exist.", std::any::type_name::<D>())))
    }

    fn data_opt<D: Any + Send + Sync>(&self) -> Option<&D> {
        self.query_env()
            .ctx_data
            .get::<D>()
            .or_else(|| self.schema_env().data.get::<D>())
    }

    /// Reports an error without failing the current field.
    fn add_error(&self, error: ServerError) {
        self.query_env().add_error(error);
    }

    fn is_cancelled(&self) -> bool {
        self.query_env().is_cancelled()
    }
}
