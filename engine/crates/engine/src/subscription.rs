use std::panic::AssertUnwindSafe;

use futures_util::{
    future::{select, Either},
    stream::BoxStream,
    Stream, StreamExt,
};
use grove_value::{ConstValue, Name};
use indexmap::IndexMap;

use crate::{
    graph::Definition,
    resolver_utils::{check_permissions, collect_fields, complete_value, PermissionOutcome},
    ContextField, ContextSelectionSet, Error, ErrorCode, FieldFuture, FieldValue, QueryEnv, QueryPath,
    ResolverContext, Response, SchemaEnv, ServerError,
};

/// Responses of a subscription operation, one per event of the source stream of its root field.
///
/// The stream ends with its source, on the first error of the source or once the request is
/// cancelled.
pub(crate) fn subscription_stream<'a>(
    schema_env: &'a SchemaEnv,
    query_env: &'a QueryEnv,
) -> impl Stream<Item = Response> + Send + 'a {
    async_stream::stream! {
        let Some(root) = schema_env.graph.root_operation_types().subscription else {
            yield Response::from_errors(vec![ServerError::new("Schema is not configured for subscriptions.", None)]);
            return;
        };

        let ctx = ContextSelectionSet {
            path: QueryPath::empty(),
            ty: root,
            items: vec![&query_env.operation.node.selection_set],
            schema_env,
            query_env,
        };

        let Some((response_key, fields)) = collect_fields(&ctx).into_iter().next() else {
            return;
        };
        let Some(&first) = fields.first() else {
            return;
        };

        if first.node.name.node == "__typename" {
            let data = ConstValue::Object(IndexMap::from([(
                Name::new(response_key),
                ConstValue::String(schema_env.graph[root].name.clone()),
            )]));
            yield Response::new(data);
            return;
        }

        let Some(field_ctx) = schema_env
            .graph
            .field_by_name(Definition::Object(root), &first.node.name.node)
            .and_then(|field_id| ctx.with_field(field_id, fields))
        else {
            yield Response::from_errors(vec![ServerError::new(
                format!(r#"Cannot query field "{}" on type "{}"."#, first.node.name.node, schema_env.graph[root].name),
                Some(first.pos),
            )]);
            return;
        };

        let mut source = match source_stream(&field_ctx, &query_env.root_value).await {
            Ok(Some(source)) => source,
            Ok(None) => return,
            Err(error) => {
                yield Response::from_errors(vec![error]);
                return;
            }
        };

        loop {
            if query_env.is_cancelled() {
                ::tracing::debug!("subscription cancelled");
                break;
            }

            let item = {
                let cancelled = query_env.cancellation.cancelled();
                futures_util::pin_mut!(cancelled);
                match select(cancelled, source.next()).await {
                    Either::Left(_) => {
                        ::tracing::debug!("subscription cancelled");
                        break;
                    }
                    Either::Right((item, _)) => item,
                }
            };

            match item {
                Some(Ok(value)) => {
                    ::tracing::debug!(field = %first.node.name.node, "subscription event");
                    let fut = execute_event(&field_ctx, response_key, value);
                    futures_util::pin_mut!(fut);
                    yield query_env.extensions.execute(query_env.operation_name.as_deref(), &mut fut).await;
                }
                Some(Err(error)) => {
                    yield Response::from_errors(vec![field_ctx
                        .set_error_path(error)
                        .with_code(ErrorCode::SubscriptionError)]);
                    break;
                }
                None => break,
            }
        }
    }
}

/// Runs the permissions and the resolver of the subscription root field. A field denied
/// silently has no events.
async fn source_stream<'a>(
    ctx: &'a ContextField<'a>,
    root_value: &'a FieldValue,
) -> Result<Option<BoxStream<'a, crate::Result<FieldValue>>>, ServerError> {
    let field = ctx.field();
    let resolver_ctx = ResolverContext {
        ctx,
        args: ctx.arguments(),
        parent_value: root_value,
    };

    if let PermissionOutcome::Denied(_) = check_permissions(&resolver_ctx).await? {
        return Ok(None);
    }

    let Some(resolver) = &field.resolver else {
        return Err(ctx
            .set_error_path(Error::new(format!(
                "Subscription field \"{}\" has no resolver",
                field.name
            )))
            .with_code(ErrorCode::SubscriptionError));
    };

    match std::panic::catch_unwind(AssertUnwindSafe(|| resolver(resolver_ctx))) {
        Ok(FieldFuture::Stream(stream)) => Ok(Some(stream)),
        Ok(_) => Err(ctx
            .set_error_path(Error::new(format!(
                "Subscription field \"{}\" must return a stream",
                field.name
            )))
            .with_code(ErrorCode::SubscriptionError)),
        Err(_) => {
            ::tracing::warn!(path = %ctx.path, "subscription resolver panicked");
            Err(ServerError::new("Internal server error", Some(ctx.item.pos))
                .with_path(&ctx.path)
                .with_code(ErrorCode::InternalServerError))
        }
    }
}

async fn execute_event(ctx: &ContextField<'_>, response_key: &str, value: FieldValue) -> Response {
    let ty = ctx.field().ty;
    let result = if ctx.query_env.extensions.is_empty() {
        complete_value(ctx, ctx.path.clone(), ty, value).await
    } else {
        let complete_fut = complete_value(ctx, ctx.path.clone(), ty, value);
        futures_util::pin_mut!(complete_fut);
        ctx.query_env.extensions.resolve(ctx.info(), &mut complete_fut).await
    };

    let mut errors = Vec::new();
    let data = match result {
        Ok(value) => ConstValue::Object(IndexMap::from([(Name::new(response_key), value)])),
        Err(error) if ty.wrapping.is_nullable() => {
            errors.push(error);
            ConstValue::Object(IndexMap::from([(Name::new(response_key), ConstValue::Null)]))
        }
        Err(error) => {
            errors.push(error);
            ConstValue::Null
        }
    };

    let mut response = Response::new(data);
    response.errors = ctx.query_env.take_errors();
    response.errors.extend(errors);
    response
}
