use grove_value::ConstValue;

use super::field::complete_value;
use crate::{
    graph::Type, registry::FieldValueParts, ContextField, Error, FieldValue, QueryPath, ServerResult,
};

/// Completes the items of a list concurrently, `item_ty` being the type of the items.
///
/// An item failing is `null` if its type is nullable, otherwise the whole list fails.
pub(super) async fn complete_list(
    ctx: &ContextField<'_>,
    path: QueryPath,
    item_ty: Type,
    value: FieldValue,
) -> ServerResult<ConstValue> {
    let items = match value.into_parts() {
        FieldValueParts::List(items) => items,
        FieldValueParts::Value(ConstValue::List(items)) => items.into_iter().map(FieldValue::from).collect(),
        FieldValueParts::Value(value) => {
            return Err(ctx.set_error_path_at(
                Error::new(format!("Expected a list for \"{}\" but got {value}", ctx.field().ty_display)),
                &path,
            ));
        }
        FieldValueParts::Opaque(_) => {
            return Err(ctx.set_error_path_at(
                Error::new(format!(
                    "Expected a list for \"{}\" but got an opaque value",
                    ctx.field().ty_display
                )),
                &path,
            ));
        }
    };

    let futures = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| complete_value(ctx, path.child(index), item_ty, item));
    let results = futures_util::future::join_all(futures).await;

    let mut values = Vec::with_capacity(results.len());
    let mut failure = None;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(error) if item_ty.wrapping.is_nullable() => {
                ctx.query_env.add_error(error);
                values.push(ConstValue::Null);
            }
            Err(error) if failure.is_some() => ctx.query_env.add_error(error),
            Err(error) => failure = Some(error),
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(ConstValue::List(values)),
    }
}
