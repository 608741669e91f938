use std::fmt::{self, Formatter};

use async_graphql_parser::{
    types::{Field, SelectionSet},
    Positioned,
};

use super::ContextExt;
use crate::{
    graph::{FieldId, ObjectId, SchemaGraph},
    query_path::QueryPath,
    schema::SchemaEnv,
    ContextField, QueryEnv,
};

#[derive(Clone)]
pub struct ContextSelectionSet<'a> {
    /// The current path being resolved.
    pub path: QueryPath,
    /// Concrete object type the selection sets apply to.
    pub ty: ObjectId,
    /// Selection sets of every field merged under the same response key.
    pub items: Vec<&'a Positioned<SelectionSet>>,
    /// Context scoped to the current schema
    pub schema_env: &'a SchemaEnv,
    /// Context scoped to the current query
    pub query_env: &'a QueryEnv,
}

impl<'a> ContextSelectionSet<'a> {
    pub fn graph(&self) -> &'a SchemaGraph {
        &self.schema_env.graph
    }

    /// Context of a field of this selection set, `fields` being every occurrence of it under the
    /// same response key.
    pub fn with_field(&self, field_id: FieldId, fields: Vec<&'a Positioned<Field>>) -> Option<ContextField<'a>> {
        let item = *fields.first()?;
        Some(ContextField {
            path: self.path.child(item.node.response_key().node.clone()),
            parent_type: self.ty,
            field_id,
            item,
            fields,
            schema_env: self.schema_env,
            query_env: self.query_env,
        })
    }
}

impl ContextExt for ContextSelectionSet<'_> {
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

impl std::fmt::Debug for ContextSelectionSet<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextSelectionSet")
            .field("path", &self.path)
            .field("ty", &self.ty)
            .finish()
    }
}
