use std::{any::Any, ops::Deref, sync::Arc};

use async_graphql_parser::{
    parse_query,
    types::{Directive, DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, Selection, SelectionSet},
    Positioned,
};
use futures_util::{stream::BoxStream, StreamExt};
use grove_value::{ConstValue, Name, Variables};
use web_time::Instant;

use crate::{
    coercion::{coerce_arguments, coerce_variables},
    context::{Data, QueryEnvInner},
    extensions::{ExtensionFactory, Extensions},
    graph::{Definition, GraphBuilder, RootTypes, SchemaGraph},
    registry::{ResolverFn, TypeDescriptor},
    resolver_utils::{resolve_root_container, resolve_root_container_serial},
    subscription::subscription_stream,
    validation::check_rules,
    ContextSelectionSet, ErrorCode, FieldFuture, QueryEnv, QueryPath, Request, ResolverContext, Response, SchemaConfig,
    SchemaError, ServerError,
};

/// Schema builder
pub struct SchemaBuilder {
    query: TypeDescriptor,
    mutation: Option<TypeDescriptor>,
    subscription: Option<TypeDescriptor>,
    registered: Vec<TypeDescriptor>,
    extensions: Vec<Box<dyn ExtensionFactory>>,
    data: Data,
    config: SchemaConfig,
    default_resolver: Option<ResolverFn>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn mutation(mut self, mutation: impl Into<TypeDescriptor>) -> Self {
        self.mutation = Some(mutation.into());
        self
    }

    /// The fields of the subscription type must return streams.
    #[must_use]
    pub fn subscription(mut self, subscription: impl Into<TypeDescriptor>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    /// Adds a type which may not be reachable from the root types, like the implementations of
    /// an interface only ever returned through it.
    #[must_use]
    pub fn register(mut self, ty: impl Into<TypeDescriptor>) -> Self {
        self.registered.push(ty.into());
        self
    }

    /// Add an extension to the schema. Extensions are nested in registration order, the first
    /// one being the outermost.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grove_engine::{extensions::Tracing, Field, FieldFuture, FieldValue, Object, Schema, TypeRef};
    ///
    /// let query = Object::new("Query").field(
    ///     Field::new("value", TypeRef::named_nn(TypeRef::INT))
    ///         .resolver(|_| FieldFuture::from_value(Some(FieldValue::value(100)))),
    /// );
    /// let schema = Schema::build(query).extension(Tracing).finish().unwrap();
    /// ```
    #[must_use]
    pub fn extension(mut self, extension: impl ExtensionFactory) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Add a global data that can be accessed in the `Schema`. You access it with
    /// `ContextExt::data`.
    #[must_use]
    pub fn data<D: Any + Send + Sync>(mut self, data: D) -> Self {
        self.data.insert(data);
        self
    }

    /// Resolves the fields declared without a resolver, instead of reading them from their
    /// parent object.
    #[must_use]
    pub fn default_resolver<F>(mut self, resolver: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        self.default_resolver = Some(Arc::new(resolver));
        self
    }

    #[must_use]
    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum depth of a query.
    #[must_use]
    pub fn limit_depth(mut self, depth: usize) -> Self {
        self.config.limit_depth = Some(depth);
        self
    }

    /// Whether snake_case field and argument names are exposed in camelCase, enabled by
    /// default.
    #[must_use]
    pub fn auto_camel_case(mut self, enabled: bool) -> Self {
        self.config.auto_camel_case = enabled;
        self
    }

    /// Build the schema, every type reachable from the roots is checked.
    pub fn finish(self) -> Result<Schema, SchemaError> {
        let graph = GraphBuilder::build(
            &self.config,
            RootTypes {
                query: self.query,
                mutation: self.mutation,
                subscription: self.subscription,
                registered: self.registered,
            },
        )?;

        Ok(Schema(Arc::new(SchemaInner {
            extensions: self.extensions,
            env: SchemaEnv(Arc::new(SchemaEnvInner {
                graph,
                data: self.data,
                config: self.config,
                default_resolver: self.default_resolver,
            })),
        })))
    }
}

#[doc(hidden)]
pub struct SchemaEnvInner {
    pub graph: SchemaGraph,
    pub data: Data,
    pub config: SchemaConfig,
    pub(crate) default_resolver: Option<ResolverFn>,
}

#[doc(hidden)]
#[derive(Clone)]
pub struct SchemaEnv(Arc<SchemaEnvInner>);

impl Deref for SchemaEnv {
    type Target = SchemaEnvInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[doc(hidden)]
pub struct SchemaInner {
    pub(crate) extensions: Vec<Box<dyn ExtensionFactory>>,
    pub(crate) env: SchemaEnv,
}

/// An executable schema built from type descriptors.
///
/// Shares its graph behind an `Arc`, clones are shallow.
#[derive(Clone)]
pub struct Schema(Arc<SchemaInner>);

impl Deref for Schema {
    type Target = SchemaInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Schema {
    /// Starts a schema from its query root type.
    ///
    /// The query root type is mandatory, mutation and subscription are added with
    /// [`SchemaBuilder::mutation`] and [`SchemaBuilder::subscription`].
    pub fn build(query: impl Into<TypeDescriptor>) -> SchemaBuilder {
        SchemaBuilder {
            query: query.into(),
            mutation: None,
            subscription: None,
            registered: Vec::new(),
            extensions: Vec::new(),
            data: Data::default(),
            config: SchemaConfig::default(),
            default_resolver: None,
        }
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.env.graph
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.env.config
    }

    /// Renders the schema as SDL, built-in scalars left out.
    pub fn sdl(&self) -> String {
        self.env.graph.sdl()
    }

    fn create_extensions(&self, query_data: Arc<Data>) -> Extensions {
        let mut extensions = Extensions::new(
            self.extensions.iter().map(|factory| factory.create()),
            self.env.clone(),
        );
        extensions.attach_query_data(query_data);
        extensions
    }

    async fn prepare_request(
        &self,
        extensions: Extensions,
        request: Request,
        query_data: Arc<Data>,
    ) -> Result<QueryEnv, Vec<ServerError>> {
        let Request {
            query,
            operation_name,
            variables,
            root_value,
            cancellation,
            deadline,
            ..
        } = request;
        let graph = &self.env.graph;

        let document = {
            let fut_parse = async { parse_query(&query).map_err(Into::<ServerError>::into) };
            futures_util::pin_mut!(fut_parse);
            extensions
                .parse_query(&query, &variables, &mut fut_parse)
                .await
                .map_err(|error| vec![error])?
        };

        let validation_result = {
            let validation_fut = async { check_rules(graph, &document) };
            futures_util::pin_mut!(validation_fut);
            extensions.validation(&mut validation_fut).await?
        };

        if let Some(limit_depth) = self.env.config.limit_depth {
            if validation_result.depth > limit_depth {
                return Err(vec![ServerError::new("Query is nested too deep.", None)
                    .with_code(ErrorCode::OperationValidationError)]);
            }
        }

        let ExecutableDocument { operations, mut fragments } = document;
        let (operation_name, mut operation) =
            select_operation(operations, operation_name.as_deref()).map_err(|error| vec![error])?;

        let variables = coerce_variables(graph, &operation.node, &variables)?;

        prune_conditional_selections(&mut operation.node.selection_set.node, &variables.values);
        fragments
            .values_mut()
            .for_each(|fragment| prune_conditional_selections(&mut fragment.node.selection_set.node, &variables.values));

        let root = root_type(graph, operation.node.ty).ok_or_else(|| {
            vec![ServerError::new(
                format!("Schema is not configured for {}s.", operation.node.ty),
                Some(operation.pos),
            )
            .with_code(ErrorCode::OperationValidationError)]
        })?;
        let arguments = coerce_arguments(graph, Definition::Object(root), &operation.node, &fragments, &variables)?;

        let deadline = deadline.or_else(|| {
            self.env
                .config
                .operation_timeout()
                .map(|timeout| Instant::now() + timeout)
        });

        tracing::debug!(
            operation_name = operation_name.as_deref().unwrap_or_default(),
            "operation ready for execution"
        );

        Ok(QueryEnv::new(QueryEnvInner {
            extensions,
            variables: variables.values,
            operation_name,
            operation,
            fragments,
            arguments,
            root_value,
            ctx_data: query_data,
            errors: Default::default(),
            cancellation: cancellation.unwrap_or_default(),
            deadline,
        }))
    }

    async fn execute_once(&self, env: QueryEnv) -> Response {
        let Some(root) = root_type(&self.env.graph, env.operation.node.ty) else {
            return Response::from_errors(vec![ServerError::new(
                format!("Schema is not configured for {}s.", env.operation.node.ty),
                None,
            )]);
        };

        let ctx = ContextSelectionSet {
            path: QueryPath::empty(),
            ty: root,
            items: vec![&env.operation.node.selection_set],
            schema_env: &self.env,
            query_env: &env,
        };

        let result = match env.operation.node.ty {
            OperationType::Query => resolve_root_container(&ctx, &env.root_value).await,
            OperationType::Mutation => resolve_root_container_serial(&ctx, &env.root_value).await,
            OperationType::Subscription => {
                return Response::from_errors(vec![ServerError::new(
                    "Subscription operations must be executed as a stream.",
                    None,
                )]);
            }
        };

        // A null bubbling up to the root nulls the whole data.
        let (data, root_error) = match result {
            Ok(data) => (data, None),
            Err(error) => (ConstValue::Null, Some(error)),
        };
        let mut response = Response::new(data);
        response.errors = env.take_errors();
        response.errors.extend(root_error);
        response
    }

    /// Runs a query or mutation to a single response.
    pub async fn execute(&self, request: impl Into<Request>) -> Response {
        let mut request = request.into();
        let query_data = Arc::new(std::mem::take(&mut request.data));
        let extensions = self.create_extensions(query_data.clone());
        let request_fut = {
            let extensions = extensions.clone();
            async move {
                match self.prepare_request(extensions, request, query_data).await {
                    Ok(env) => {
                        let fut = async { self.execute_once(env.clone()).await };
                        futures_util::pin_mut!(fut);
                        env.extensions.execute(env.operation_name.as_deref(), &mut fut).await
                    }
                    Err(errors) => Response::from_errors(errors),
                }
            }
        };
        futures_util::pin_mut!(request_fut);
        extensions.request(&mut request_fut).await
    }

    /// Runs any operation as a stream of responses.
    ///
    /// A subscription produces one response per event of its source stream, ending with it.
    /// Queries and mutations produce a single response. Dropping the stream or cancelling the
    /// request stops the source.
    pub fn execute_stream(&self, request: impl Into<Request>) -> BoxStream<'static, Response> {
        let schema = self.clone();
        let mut request = request.into();
        let query_data = Arc::new(std::mem::take(&mut request.data));
        let extensions = self.create_extensions(query_data.clone());

        async_stream::stream! {
            let env = match schema.prepare_request(extensions, request, query_data).await {
                Ok(env) => env,
                Err(errors) => {
                    yield Response::from_errors(errors);
                    return;
                }
            };

            if env.operation.node.ty != OperationType::Subscription {
                let fut = async { schema.execute_once(env.clone()).await };
                futures_util::pin_mut!(fut);
                yield env.extensions.execute(env.operation_name.as_deref(), &mut fut).await;
                return;
            }

            let responses = subscription_stream(&schema.env, &env);
            futures_util::pin_mut!(responses);
            while let Some(response) = responses.next().await {
                yield response;
            }
        }
        .boxed()
    }
}

fn root_type(graph: &SchemaGraph, operation_type: OperationType) -> Option<crate::graph::ObjectId> {
    let roots = graph.root_operation_types();
    match operation_type {
        OperationType::Query => Some(roots.query),
        OperationType::Mutation => roots.mutation,
        OperationType::Subscription => roots.subscription,
    }
}

fn select_operation(
    operations: DocumentOperations,
    operation_name: Option<&str>,
) -> Result<(Option<String>, Positioned<OperationDefinition>), ServerError> {
    if let Some(operation_name) = operation_name {
        return match operations {
            DocumentOperations::Single(_) => None,
            DocumentOperations::Multiple(mut operations) => operations
                .remove(operation_name)
                .map(|operation| (Some(operation_name.to_string()), operation)),
        }
        .ok_or_else(|| ServerError::new(format!(r#"Unknown operation named "{operation_name}""#), None));
    }

    match operations {
        DocumentOperations::Single(operation) => Ok((None, operation)),
        DocumentOperations::Multiple(operations) if operations.len() == 1 => operations
            .into_iter()
            .next()
            .map(|(operation_name, operation)| (Some(operation_name.to_string()), operation))
            .ok_or_else(|| ServerError::new("Operation name required in request.", None)),
        DocumentOperations::Multiple(_) => Err(ServerError::new("Operation name required in request.", None)),
    }
}

/// Drops the selections excluded by `@skip` or `@include` along with the directives themselves.
fn prune_conditional_selections(selection_set: &mut SelectionSet, variables: &Variables) {
    selection_set.items.retain_mut(|selection| {
        if !is_included(selection.node.directives(), variables) {
            return false;
        }
        selection
            .node
            .directives_mut()
            .retain(|directive| !matches!(&*directive.node.name.node, "skip" | "include"));
        match &mut selection.node {
            Selection::Field(field) => prune_conditional_selections(&mut field.node.selection_set.node, variables),
            Selection::InlineFragment(fragment) => {
                prune_conditional_selections(&mut fragment.node.selection_set.node, variables)
            }
            Selection::FragmentSpread(_) => {}
        }
        true
    });
}

fn is_included(directives: &[Positioned<Directive>], variables: &Variables) -> bool {
    directives.iter().all(|directive| {
        let wanted = match &*directive.node.name.node {
            "include" => true,
            "skip" => false,
            _ => return true,
        };
        let Some(condition) = directive.node.get_argument("if") else {
            return true;
        };
        let condition = condition
            .node
            .clone()
            .into_const_with(|name: Name| variables.get(&name).cloned().ok_or(()));
        matches!(condition, Ok(ConstValue::Boolean(true))) == wanted
    })
}
