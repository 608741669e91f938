//! Hooks around the stages of a request.
//!
//! Extensions form a chain: each stage of an extension receives the continuation running the
//! rest of the chain and, at its end, the stage itself. The first registered extension is the
//! outermost one.

mod depth_limit;
mod disable_validation;
mod mask_errors;
mod parser_cache;
mod tracing;
mod validation_cache;

use std::{any::Any, future::Future, sync::Arc};

use async_graphql_parser::types::ExecutableDocument;
use grove_value::{ConstValue, Variables};

pub use self::{
    depth_limit::QueryDepthLimiter, disable_validation::DisableValidation, mask_errors::MaskErrors,
    parser_cache::ParserCache, tracing::Tracing, validation_cache::ValidationCache,
};
use crate::{
    context::Data, schema::SchemaEnv, validation::ValidationResult, Error, ResolveInfo, Response, Result, ServerError,
    ServerResult,
};

/// Context of an extension.
pub struct ExtensionContext<'a> {
    #[doc(hidden)]
    pub schema_env: &'a SchemaEnv,
    #[doc(hidden)]
    pub query_data: Option<&'a Data>,
}

impl<'a> ExtensionContext<'a> {
    /// Gets data of type `D`, from the request data first then from the schema data.
    ///
    /// # Errors
    ///
    /// Returns an error if no data of this type exists.
    pub fn data<D: Any + Send + Sync>(&self) -> Result<&'a D> {
        self.data_opt::<D>()
            .ok_or_else(|| Error::new(format!("Data `{}` does not exist.", std::any::type_name::<D>())))
    }

    pub fn data_opt<D: Any + Send + Sync>(&self) -> Option<&'a D> {
        self.query_data
            .and_then(|data| data.get::<D>())
            .or_else(|| self.schema_env.data.get::<D>())
    }
}

type RequestFut<'a> = &'a mut (dyn Future<Output = Response> + Send + Unpin);

type ParseFut<'a> = &'a mut (dyn Future<Output = ServerResult<ExecutableDocument>> + Send + Unpin);

type ValidationFut<'a> = &'a mut (dyn Future<Output = Result<ValidationResult, Vec<ServerError>>> + Send + Unpin);

type ExecuteFut<'a> = &'a mut (dyn Future<Output = Response> + Send + Unpin);

type ResolveFut<'a> = &'a mut (dyn Future<Output = ServerResult<ConstValue>> + Send + Unpin);

/// The remainder of the request stage.
pub struct NextRequest<'a> {
    chain: &'a [Arc<dyn Extension>],
    request_fut: RequestFut<'a>,
}

impl NextRequest<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>) -> Response {
        if let Some((first, next)) = self.chain.split_first() {
            first
                .request(
                    ctx,
                    NextRequest {
                        chain: next,
                        request_fut: self.request_fut,
                    },
                )
                .await
        } else {
            self.request_fut.await
        }
    }
}

/// The remainder of the parsing stage.
pub struct NextParseQuery<'a> {
    chain: &'a [Arc<dyn Extension>],
    parse_query_fut: ParseFut<'a>,
}

impl NextParseQuery<'_> {
    pub async fn run(
        self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
    ) -> ServerResult<ExecutableDocument> {
        if let Some((first, next)) = self.chain.split_first() {
            first
                .parse_query(
                    ctx,
                    query,
                    variables,
                    NextParseQuery {
                        chain: next,
                        parse_query_fut: self.parse_query_fut,
                    },
                )
                .await
        } else {
            self.parse_query_fut.await
        }
    }
}

/// The remainder of the validation stage.
pub struct NextValidation<'a> {
    chain: &'a [Arc<dyn Extension>],
    validation_fut: ValidationFut<'a>,
}

impl NextValidation<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>) -> Result<ValidationResult, Vec<ServerError>> {
        if let Some((first, next)) = self.chain.split_first() {
            first
                .validation(
                    ctx,
                    NextValidation {
                        chain: next,
                        validation_fut: self.validation_fut,
                    },
                )
                .await
        } else {
            self.validation_fut.await
        }
    }
}

/// The remainder of the execution stage.
pub struct NextExecute<'a> {
    chain: &'a [Arc<dyn Extension>],
    execute_fut: ExecuteFut<'a>,
}

impl NextExecute<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>, operation_name: Option<&str>) -> Response {
        if let Some((first, next)) = self.chain.split_first() {
            first
                .execute(
                    ctx,
                    operation_name,
                    NextExecute {
                        chain: next,
                        execute_fut: self.execute_fut,
                    },
                )
                .await
        } else {
            self.execute_fut.await
        }
    }
}

/// The remainder of the resolution of a field.
pub struct NextResolve<'a> {
    chain: &'a [Arc<dyn Extension>],
    resolve_fut: ResolveFut<'a>,
}

impl NextResolve<'_> {
    pub async fn run(self, ctx: &ExtensionContext<'_>, info: ResolveInfo<'_>) -> ServerResult<ConstValue> {
        if let Some((first, next)) = self.chain.split_first() {
            first
                .resolve(
                    ctx,
                    info,
                    NextResolve {
                        chain: next,
                        resolve_fut: self.resolve_fut,
                    },
                )
                .await
        } else {
            self.resolve_fut.await
        }
    }
}

/// Lifecycle hooks of a request. Every stage defaults to running the rest of the chain.
///
/// A stage may run code before and after its continuation, replace its output or not call it
/// at all. The nullability of fields is enforced outside of [`Extension::resolve`]: a `null`
/// returned for a non-null field still propagates to its parent.
#[async_trait::async_trait]
pub trait Extension: Sync + Send + 'static {
    /// The whole request, from parsing to the response.
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        next.run(ctx).await
    }

    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        next.run(ctx, query, variables).await
    }

    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        next.run(ctx).await
    }

    /// Execution of the operation, or of one event for subscriptions.
    async fn execute(&self, ctx: &ExtensionContext<'_>, operation_name: Option<&str>, next: NextExecute<'_>) -> Response {
        next.run(ctx, operation_name).await
    }

    /// Resolution of a field: permissions, resolver and completion of its value.
    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<ConstValue> {
        next.run(ctx, info).await
    }
}

/// Creates the extension instance of a request.
pub trait ExtensionFactory: Send + Sync + 'static {
    fn create(&self) -> Arc<dyn Extension>;
}

#[doc(hidden)]
#[derive(Clone)]
pub struct Extensions {
    extensions: Vec<Arc<dyn Extension>>,
    schema_env: SchemaEnv,
    query_data: Option<Arc<Data>>,
}

impl Extensions {
    pub(crate) fn new(extensions: impl IntoIterator<Item = Arc<dyn Extension>>, schema_env: SchemaEnv) -> Self {
        Extensions {
            extensions: extensions.into_iter().collect(),
            schema_env,
            query_data: None,
        }
    }

    pub(crate) fn attach_query_data(&mut self, data: Arc<Data>) {
        self.query_data = Some(data);
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    fn create_context(&self) -> ExtensionContext<'_> {
        ExtensionContext {
            schema_env: &self.schema_env,
            query_data: self.query_data.as_deref(),
        }
    }

    pub async fn request(&self, request_fut: RequestFut<'_>) -> Response {
        let next = NextRequest {
            chain: &self.extensions,
            request_fut,
        };
        next.run(&self.create_context()).await
    }

    pub async fn parse_query(
        &self,
        query: &str,
        variables: &Variables,
        parse_query_fut: ParseFut<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let next = NextParseQuery {
            chain: &self.extensions,
            parse_query_fut,
        };
        next.run(&self.create_context(), query, variables).await
    }

    pub async fn validation(&self, validation_fut: ValidationFut<'_>) -> Result<ValidationResult, Vec<ServerError>> {
        let next = NextValidation {
            chain: &self.extensions,
            validation_fut,
        };
        next.run(&self.create_context()).await
    }

    pub async fn execute(&self, operation_name: Option<&str>, execute_fut: ExecuteFut<'_>) -> Response {
        let next = NextExecute {
            chain: &self.extensions,
            execute_fut,
        };
        next.run(&self.create_context(), operation_name).await
    }

    pub async fn resolve(&self, info: ResolveInfo<'_>, resolve_fut: ResolveFut<'_>) -> ServerResult<ConstValue> {
        let next = NextResolve {
            chain: &self.extensions,
            resolve_fut,
        };
        next.run(&self.create_context(), info).await
    }
}
