use std::sync::Arc;

use ::tracing::{debug_span, info_span, Instrument};
use async_graphql_parser::types::ExecutableDocument;
use grove_value::{ConstValue, Variables};

use super::{
    Extension, ExtensionContext, ExtensionFactory, NextExecute, NextParseQuery, NextRequest, NextResolve,
    NextValidation,
};
use crate::{validation::ValidationResult, ResolveInfo, Response, ServerError, ServerResult};

/// Opens a `tracing` span around every stage of a request, fields included.
///
/// ```
/// use grove_engine::{extensions::Tracing, Field, FieldFuture, FieldValue, Object, Schema, TypeRef};
///
/// let query = Object::new("Query").field(
///     Field::new("value", TypeRef::named(TypeRef::INT))
///         .resolver(|_| FieldFuture::from_value(Some(FieldValue::value(10)))),
/// );
/// let schema = Schema::build(query).extension(Tracing).finish().unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracing;

impl ExtensionFactory for Tracing {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(TracingExtension)
    }
}

struct TracingExtension;

#[async_trait::async_trait]
impl Extension for TracingExtension {
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        next.run(ctx).instrument(info_span!("graphql-request")).await
    }

    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let span = info_span!("parse", source = query);
        next.run(ctx, query, variables).instrument(span).await
    }

    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        next.run(ctx).instrument(info_span!("validation")).await
    }

    async fn execute(&self, ctx: &ExtensionContext<'_>, operation_name: Option<&str>, next: NextExecute<'_>) -> Response {
        let span = info_span!("execute", operation_name = operation_name.unwrap_or_default());
        next.run(ctx, operation_name).instrument(span).await
    }

    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<ConstValue> {
        let span = debug_span!(
            "field",
            path = %info.path,
            parent_type = info.parent_type,
            return_type = info.return_type,
        );
        let result = next.run(ctx, info).instrument(span.clone()).await;
        if let Err(error) = &result {
            span.in_scope(|| ::tracing::debug!(error = %error.message, "field error"));
        }
        result
    }
}
