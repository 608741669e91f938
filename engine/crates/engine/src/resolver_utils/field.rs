use std::panic::AssertUnwindSafe;

use futures_util::{future::BoxFuture, FutureExt};
use grove_value::{ConstValue, Name};

use super::{abstract_type::resolve_abstract_type, container::resolve_container, list::complete_list};
use crate::{
    graph::{BuiltinScalar, Definition, EnumId, ScalarId, Type},
    registry::{FieldValueParts, ResolverFn},
    ContextField, Error, ErrorCode, FieldFuture, FieldValue, QueryPath, ResolverContext, ServerError, ServerResult,
};

/// Resolves a field and completes its value. Errors of a nullable field are added to the request
/// errors, the field being `null`.
pub(super) async fn resolve_field(ctx: &ContextField<'_>, parent: &FieldValue) -> ServerResult<ConstValue> {
    let field = ctx.field();

    let result = if ctx.query_env.is_cancelled() {
        ::tracing::debug!(path = %ctx.path, "operation cancelled, field not resolved");
        Err(ServerError::new("Operation timed out", Some(ctx.item.pos))
            .with_path(&ctx.path)
            .with_code(ErrorCode::OperationTimeout))
    } else if ctx.query_env.extensions.is_empty() {
        resolve_field_value(ctx, parent).await
    } else {
        let resolve_fut = resolve_field_value(ctx, parent);
        futures_util::pin_mut!(resolve_fut);
        ctx.query_env.extensions.resolve(ctx.info(), &mut resolve_fut).await
    };

    // Extensions may have replaced the value.
    let result = match result {
        Ok(ConstValue::Null) if field.ty.wrapping.is_required() => Err(non_null_error(ctx, &ctx.path)),
        result => result,
    };

    match result {
        Err(error) if field.ty.wrapping.is_nullable() => {
            ctx.query_env.add_error(error);
            Ok(ConstValue::Null)
        }
        result => result,
    }
}

async fn resolve_field_value(ctx: &ContextField<'_>, parent: &FieldValue) -> ServerResult<ConstValue> {
    let field = ctx.field();
    ::tracing::trace!(path = %ctx.path, "resolving {}", field.name);

    let resolver_ctx = ResolverContext {
        ctx,
        args: ctx.arguments(),
        parent_value: parent,
    };

    if let PermissionOutcome::Denied(value) = check_permissions(&resolver_ctx).await? {
        return Ok(value);
    }

    let resolver = field.resolver.as_ref().or(ctx.schema_env.default_resolver.as_ref());
    let value = match resolver {
        Some(resolver) => call_resolver(ctx, resolver, resolver_ctx).await?,
        None => read_from_parent(ctx, parent)?,
    };

    complete_value(ctx, ctx.path.clone(), field.ty, value.unwrap_or_default()).await
}

pub(crate) enum PermissionOutcome {
    Granted,
    /// Denied on a field failing silently, resolved to this value.
    Denied(ConstValue),
}

/// Runs the permissions of the field in order, stopping at the first denial.
pub(crate) async fn check_permissions(ctx: &ResolverContext<'_>) -> ServerResult<PermissionOutcome> {
    let field = ctx.field();
    for permission in &field.permissions {
        if permission.has_permission(ctx).await {
            continue;
        }

        ::tracing::debug!(path = %ctx.path, "permission denied on {}", field.name);
        if field.fail_silently {
            let value = if field.ty.wrapping.is_list() {
                ConstValue::List(Vec::new())
            } else {
                ConstValue::Null
            };
            return Ok(PermissionOutcome::Denied(value));
        }

        let mut error = Error::new(permission.message()).with_code(ErrorCode::Unauthorized);
        if let Some(extensions) = permission.error_extensions() {
            error.extensions.get_or_insert_with(Default::default).merge(extensions);
        }
        return Err(ctx.set_error_path(error));
    }
    Ok(PermissionOutcome::Granted)
}

async fn call_resolver(
    ctx: &ContextField<'_>,
    resolver: &ResolverFn,
    resolver_ctx: ResolverContext<'_>,
) -> ServerResult<Option<FieldValue>> {
    let result = match std::panic::catch_unwind(AssertUnwindSafe(|| resolver(resolver_ctx))) {
        Ok(FieldFuture::Immediate(result)) => Ok(result),
        Ok(FieldFuture::Deferred(future)) => AssertUnwindSafe(future).catch_unwind().await,
        Ok(FieldFuture::Stream(_)) => Ok(Err(Error::new(format!(
            "Field \"{}.{}\" returned a stream, only subscription root fields can",
            ctx.info().parent_type,
            ctx.field().name
        )))),
        Err(panic) => Err(panic),
    };

    match result {
        Ok(result) => result.map_err(|error| ctx.set_error_path(error)),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("unknown panic payload");
            ::tracing::warn!(path = %ctx.path, "resolver panicked: {message}");
            Err(ServerError::new("Internal server error", Some(ctx.item.pos))
                .with_path(&ctx.path)
                .with_code(ErrorCode::InternalServerError))
        }
    }
}

/// Reads the field from its parent object, by its declared name then by its exposed one.
fn read_from_parent(ctx: &ContextField<'_>, parent: &FieldValue) -> ServerResult<Option<FieldValue>> {
    let field = ctx.field();
    match parent.as_value() {
        Some(ConstValue::Object(object)) => Ok(object
            .get(field.declared_name.as_str())
            .or_else(|| object.get(field.name.as_str()))
            .cloned()
            .map(FieldValue::from)),
        _ => Err(ctx.set_error_path(Error::new(format!(
            "Field \"{}.{}\" has no resolver and its parent is not an object",
            ctx.info().parent_type,
            field.name
        )))),
    }
}

pub(super) fn non_null_error(ctx: &ContextField<'_>, path: &QueryPath) -> ServerError {
    ServerError::new(
        format!(
            "Cannot return null for non-nullable field {}.{}",
            ctx.info().parent_type,
            ctx.field().name
        ),
        Some(ctx.item.pos),
    )
    .with_path(path)
}

/// Completes a resolved value according to its type, `path` being its position in the response.
pub(crate) fn complete_value<'a>(
    ctx: &'a ContextField<'a>,
    path: QueryPath,
    ty: Type,
    value: FieldValue,
) -> BoxFuture<'a, ServerResult<ConstValue>> {
    async move {
        if value.is_null() {
            return if ty.wrapping.is_required() {
                Err(non_null_error(ctx, &path))
            } else {
                Ok(ConstValue::Null)
            };
        }

        let mut item_ty = ty;
        if item_ty.wrapping.pop_list_wrapping().is_some() {
            return complete_list(ctx, path, item_ty, value).await;
        }

        match ty.definition {
            Definition::Scalar(id) => complete_scalar(ctx, id, value).map_err(|error| ctx.set_error_path_at(error, &path)),
            Definition::Enum(id) => complete_enum(ctx, id, value).map_err(|error| ctx.set_error_path_at(error, &path)),
            Definition::Object(id) => {
                let selection_ctx = ctx.with_selection_set(path, id);
                resolve_container(&selection_ctx, &value).await
            }
            Definition::Interface(_) | Definition::Union(_) => {
                let id = resolve_abstract_type(ctx, ty.definition, &value)
                    .map_err(|error| ctx.set_error_path_at(error, &path))?;
                let selection_ctx = ctx.with_selection_set(path, id);
                resolve_container(&selection_ctx, &value).await
            }
            Definition::InputObject(_) => Err(ctx.set_error_path_at(
                Error::new(format!("internal: \"{}\" is not an output type", ctx.field().ty_display)),
                &path,
            )),
        }
    }
    .boxed()
}

fn complete_scalar(ctx: &ContextField<'_>, id: ScalarId, value: FieldValue) -> Result<ConstValue, Error> {
    let scalar = &ctx.graph()[id];
    let value = match value.into_parts() {
        FieldValueParts::Value(value) => value,
        FieldValueParts::List(_) | FieldValueParts::Opaque(_) => {
            return Err(Error::new(format!("{} cannot represent a non GraphQL value", scalar.name)));
        }
    };

    let Some(builtin) = scalar.builtin else {
        return match &scalar.serialize {
            Some(serialize) => serialize(value),
            None => Ok(value),
        };
    };

    let valid = match (builtin, &value) {
        (BuiltinScalar::Int, ConstValue::Number(number)) => number
            .as_i64()
            .is_some_and(|number| i32::try_from(number).is_ok()),
        (BuiltinScalar::Float, ConstValue::Number(_))
        | (BuiltinScalar::String | BuiltinScalar::ID, ConstValue::String(_))
        | (BuiltinScalar::Boolean, ConstValue::Boolean(_)) => true,
        (BuiltinScalar::ID, ConstValue::Number(number)) => {
            return match number.as_i64() {
                Some(number) => Ok(ConstValue::String(number.to_string())),
                None => Err(Error::new(format!("ID cannot represent value: {value}"))),
            };
        }
        _ => false,
    };

    if valid {
        Ok(value)
    } else {
        Err(Error::new(format!("{} cannot represent value: {value}", scalar.name)))
    }
}

fn complete_enum(ctx: &ContextField<'_>, id: EnumId, value: FieldValue) -> Result<ConstValue, Error> {
    let graph = ctx.graph();
    let name = match value.as_value() {
        Some(ConstValue::String(name)) => name.as_str(),
        Some(ConstValue::Enum(name)) => name.as_str(),
        _ => "",
    };

    match graph.enum_value_by_name(id, name) {
        Some(value_id) => Ok(ConstValue::Enum(Name::new(&graph[value_id].name))),
        None => Err(Error::new(format!(
            "Enum \"{}\" cannot represent value: {value:?}",
            graph[id].name
        ))),
    }
}
