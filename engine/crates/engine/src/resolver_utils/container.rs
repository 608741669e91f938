use std::collections::HashSet;

use async_graphql_parser::{
    types::{Field, Selection, SelectionSet},
    Positioned,
};
use futures_util::{future::BoxFuture, FutureExt};
use grove_value::{ConstValue, Name};
use indexmap::IndexMap;

use super::field::resolve_field;
use crate::{graph::Definition, ContextSelectionSet, ErrorCode, FieldValue, ServerError, ServerResult};

/// Resolve a container by executing each of the fields concurrently.
pub(crate) async fn resolve_root_container(ctx: &ContextSelectionSet<'_>, root: &FieldValue) -> ServerResult<ConstValue> {
    resolve_container_inner(ctx, root, true).await
}

/// Resolve a container by executing each of the fields serially, a field starting once the
/// previous one is completed.
pub(crate) async fn resolve_root_container_serial(
    ctx: &ContextSelectionSet<'_>,
    root: &FieldValue,
) -> ServerResult<ConstValue> {
    resolve_container_inner(ctx, root, false).await
}

pub(super) async fn resolve_container(ctx: &ContextSelectionSet<'_>, parent: &FieldValue) -> ServerResult<ConstValue> {
    resolve_container_inner(ctx, parent, true).await
}

type FieldResultFuture<'a> = BoxFuture<'a, ServerResult<(Name, ConstValue)>>;

async fn resolve_container_inner(
    ctx: &ContextSelectionSet<'_>,
    parent: &FieldValue,
    parallel: bool,
) -> ServerResult<ConstValue> {
    let graph = ctx.graph();
    let object = &graph[ctx.ty];
    ::tracing::trace!("Where: {}", object.name);

    if ctx.query_env.is_cancelled() {
        return cancelled_selection_set(ctx);
    }

    let mut futures: Vec<FieldResultFuture<'_>> = Vec::new();
    for (response_key, fields) in collect_fields(ctx) {
        let Some(&first) = fields.first() else {
            continue;
        };
        let name = first.node.name.node.as_str();
        let response_key = Name::new(response_key);

        if name == "__typename" {
            let typename = ConstValue::String(object.name.clone());
            futures.push(async move { Ok((response_key, typename)) }.boxed());
            continue;
        }

        let Some(field_id) = graph.field_by_name(Definition::Object(ctx.ty), name) else {
            return Err(ServerError::new(
                format!(r#"Cannot query field "{name}" on type "{}"."#, object.name),
                Some(first.pos),
            ));
        };
        let Some(ctx_field) = ctx.with_field(field_id, fields) else {
            continue;
        };
        futures.push(
            async move {
                let value = resolve_field(&ctx_field, parent).await?;
                Ok((response_key, value))
            }
            .boxed(),
        );
    }

    let results = if parallel {
        futures_util::future::join_all(futures).await
    } else {
        let mut results = Vec::with_capacity(futures.len());
        for future in futures {
            let result = future.await;
            let failed = result.is_err();
            results.push(result);
            if failed {
                break;
            }
        }
        results
    };

    let mut container = IndexMap::with_capacity(results.len());
    let mut failure = None;
    for result in results {
        match result {
            Ok((response_key, value)) => {
                container.insert(response_key, value);
            }
            // The first error replaces this object by null in its parent, the others would be
            // lost with it.
            Err(error) if failure.is_some() => ctx.query_env.add_error(error),
            Err(error) => failure = Some(error),
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(ConstValue::Object(container)),
    }
}

/// None of the fields start once the operation is cancelled. A single error is reported, at the
/// first field, and it propagates if any of the fields is non-null.
fn cancelled_selection_set(ctx: &ContextSelectionSet<'_>) -> ServerResult<ConstValue> {
    let graph = ctx.graph();
    let fields = collect_fields(ctx);
    let Some((first_key, first)) = fields
        .iter()
        .find_map(|(response_key, fields)| Some((*response_key, *fields.first()?)))
    else {
        return Ok(ConstValue::Object(IndexMap::new()));
    };

    ::tracing::debug!(path = %ctx.path, "operation cancelled, selection set not resolved");
    let error = ServerError::new("Operation timed out", Some(first.pos))
        .with_path(&ctx.path.child(first_key))
        .with_code(ErrorCode::OperationTimeout);

    let mut container = IndexMap::with_capacity(fields.len());
    for (response_key, fields) in &fields {
        let Some(field) = fields.first() else {
            continue;
        };
        let name = field.node.name.node.as_str();
        let value = if name == "__typename" {
            ConstValue::String(graph[ctx.ty].name.clone())
        } else {
            let is_required = graph
                .field_by_name(Definition::Object(ctx.ty), name)
                .is_some_and(|field_id| graph[field_id].ty.wrapping.is_required());
            if is_required {
                return Err(error);
            }
            ConstValue::Null
        };
        container.insert(Name::new(response_key), value);
    }

    ctx.query_env.add_error(error);
    Ok(ConstValue::Object(container))
}

/// Fields of the selection sets applying to the object type of the context, grouped by response
/// key in the order of their first occurrence.
pub(crate) fn collect_fields<'a>(ctx: &ContextSelectionSet<'a>) -> IndexMap<&'a str, Vec<&'a Positioned<Field>>> {
    let mut fields = IndexMap::new();
    let mut visited_fragments = HashSet::new();
    for selection_set in ctx.items.iter().copied() {
        collect_selection_set_fields(ctx, &selection_set.node, &mut visited_fragments, &mut fields);
    }
    fields
}

fn collect_selection_set_fields<'a>(
    ctx: &ContextSelectionSet<'a>,
    selection_set: &'a SelectionSet,
    visited_fragments: &mut HashSet<&'a str>,
    fields: &mut IndexMap<&'a str, Vec<&'a Positioned<Field>>>,
) {
    let query_env = ctx.query_env;
    for selection in &selection_set.items {
        match &selection.node {
            Selection::Field(field) => {
                fields
                    .entry(field.node.response_key().node.as_str())
                    .or_default()
                    .push(field);
            }
            Selection::InlineFragment(fragment) => {
                let type_condition = fragment.node.type_condition.as_ref().map(|condition| &condition.node.on.node);
                if type_condition.map_or(true, |name| type_condition_applies(ctx, name)) {
                    collect_selection_set_fields(ctx, &fragment.node.selection_set.node, visited_fragments, fields);
                }
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                if !visited_fragments.insert(name) {
                    continue;
                }
                let Some(fragment) = query_env.fragments.get(name) else {
                    continue;
                };
                if type_condition_applies(ctx, &fragment.node.type_condition.node.on.node) {
                    collect_selection_set_fields(ctx, &fragment.node.selection_set.node, visited_fragments, fields);
                }
            }
        }
    }
}

fn type_condition_applies(ctx: &ContextSelectionSet<'_>, type_condition: &str) -> bool {
    let graph = ctx.graph();
    graph
        .definition_by_name(type_condition)
        .is_some_and(|definition| graph.is_possible_type(definition, ctx.ty))
}
