use grove_value::ConstValue;

use crate::{
    graph::{Definition, ObjectId, SchemaGraph},
    ContextField, Error, FieldValue,
};

/// Finds the object type of a value returned for an interface or a union. In order:
/// - the type given with [`FieldValue::with_type`],
/// - the `resolve_type` hook of the abstract type,
/// - the `is_type_of` predicates of the possible types, exactly one must match,
/// - a `__typename` member of an object value,
/// - the possible type whose fields are the only ones to cover every member of an object value.
pub(super) fn resolve_abstract_type(
    ctx: &ContextField<'_>,
    abstract_type: Definition,
    value: &FieldValue,
) -> Result<ObjectId, Error> {
    let graph = ctx.graph();
    let abstract_name = graph.definition_name(abstract_type);

    let resolve_type = match abstract_type {
        Definition::Interface(id) => graph[id].resolve_type.as_ref(),
        Definition::Union(id) => graph[id].resolve_type.as_ref(),
        _ => None,
    };

    let type_name = value
        .type_tag()
        .map(str::to_string)
        .or_else(|| resolve_type.and_then(|resolve_type| resolve_type(value)));

    let object_id = match type_name {
        Some(type_name) => match graph.object_by_name(&type_name) {
            Some(id) if graph.is_possible_type(abstract_type, id) => id,
            _ => {
                return Err(Error::new(format!(
                    r#"Runtime Object type "{type_name}" is not a possible type for "{abstract_name}"."#
                )));
            }
        },
        None => infer_object_type(graph, abstract_type, value).ok_or_else(|| {
            let info = ctx.info();
            Error::new(format!(
                r#"Abstract type "{abstract_name}" must resolve to an Object type at runtime for field "{}.{}". Either the value must be tagged with its type, the "{abstract_name}" type should provide a "resolve_type" function or each possible type should provide an "is_type_of" function."#,
                info.parent_type, info.name
            ))
        })?,
    };

    ::tracing::trace!("resolved {abstract_name} to {}", graph[object_id].name);
    Ok(object_id)
}

fn infer_object_type(graph: &SchemaGraph, abstract_type: Definition, value: &FieldValue) -> Option<ObjectId> {
    let possible_types = graph.possible_types(abstract_type);

    let with_predicate = possible_types
        .iter()
        .filter(|id| graph[**id].is_type_of.is_some())
        .count();
    if with_predicate > 0 {
        let mut matching = possible_types.iter().copied().filter(|id| {
            graph[*id]
                .is_type_of
                .as_ref()
                .is_some_and(|is_type_of| is_type_of(value))
        });
        if let (Some(id), None) = (matching.next(), matching.next()) {
            return Some(id);
        }
    }

    let Some(ConstValue::Object(object)) = value.as_value() else {
        return None;
    };

    if let Some(ConstValue::String(type_name)) = object.get("__typename") {
        return graph
            .object_by_name(type_name)
            .filter(|id| graph.is_possible_type(abstract_type, *id));
    }

    let mut matching = possible_types.iter().copied().filter(|id| {
        object.keys().all(|key| {
            graph[*id]
                .fields
                .iter()
                .any(|field_id| graph[field_id].name == key.as_str() || graph[field_id].declared_name == key.as_str())
        })
    });
    match (matching.next(), matching.next()) {
        (Some(id), None) => Some(id),
        _ => None,
    }
}
