use std::fmt::{self, Formatter};

use async_graphql_parser::{
    types::{Field, SelectionSet},
    Positioned,
};

use super::{ContextExt, ContextSelectionSet};
use crate::{
    coercion::field_key,
    graph::{FieldDefinition, FieldId, ObjectId, SchemaGraph},
    query_path::QueryPath,
    registry::ArgumentValues,
    schema::SchemaEnv,
    Error, QueryEnv, ServerError,
};

/// Context of the field being resolved.
#[derive(Clone)]
pub struct ContextField<'a> {
    /// The current path being resolved.
    pub path: QueryPath,
    /// Object type the field is resolved on.
    pub parent_type: ObjectId,
    pub field_id: FieldId,
    /// First occurrence of the field in the operation, its position and arguments are the ones
    /// used.
    pub item: &'a Positioned<Field>,
    pub(crate) fields: Vec<&'a Positioned<Field>>,
    /// Context scoped to the current schema
    pub schema_env: &'a SchemaEnv,
    /// Context scoped to the current query
    pub query_env: &'a QueryEnv,
}

/// Metadata about the field being resolved.
#[derive(Debug, Clone, Copy)]
pub struct ResolveInfo<'a> {
    pub path: &'a QueryPath,
    pub parent_type: &'a str,
    /// Name of the field in the schema.
    pub name: &'a str,
    pub alias: Option<&'a str>,
    /// Type of the field as it is printed in SDL, e.g. `[User!]!`.
    pub return_type: &'a str,
}

impl<'a> ContextField<'a> {
    pub fn graph(&self) -> &'a SchemaGraph {
        &self.schema_env.graph
    }

    pub fn field(&self) -> &'a FieldDefinition {
        &self.graph()[self.field_id]
    }

    pub fn info(&self) -> ResolveInfo<'_> {
        let field = self.field();
        ResolveInfo {
            path: &self.path,
            parent_type: &self.graph()[self.parent_type].name,
            name: &field.name,
            alias: self.item.node.alias.as_ref().map(|alias| alias.node.as_str()),
            return_type: &field.ty_display,
        }
    }

    pub fn arguments(&self) -> ArgumentValues<'a> {
        ArgumentValues(self.query_env.arguments.get(&field_key(self.item.pos)))
    }

    /// Selection sets of every occurrence of the field.
    pub(crate) fn selection_sets(&self) -> Vec<&'a Positioned<SelectionSet>> {
        self.fields.iter().map(|field| &field.node.selection_set).collect()
    }

    pub(crate) fn with_selection_set(&self, path: QueryPath, ty: ObjectId) -> ContextSelectionSet<'a> {
        ContextSelectionSet {
            path,
            ty,
            items: self.selection_sets(),
            schema_env: self.schema_env,
            query_env: self.query_env,
        }
    }

    /// Attaches the field location and path to a resolver error.
    pub fn set_error_path(&self, error: Error) -> ServerError {
        self.set_error_path_at(error, &self.path)
    }

    pub(crate) fn set_error_path_at(&self, error: Error, path: &QueryPath) -> ServerError {
        error.into_server_error(self.item.pos).with_path(path)
    }
}

impl ContextExt for ContextField<'_> {
    fn path(&self) -> &QueryPath {
        &self.path
    }

    fn query_env(&self) -> &QueryEnv {
        self.query_env
    }

    fn schema_env(&self) -> &SchemaEnv {
        self.schema_env
    }
}

impl std::fmt::Debug for ContextField<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextField")
            .field("path", &self.path)
            .field("field", &self.field().name)
            .finish()
    }
}
