use std::sync::{Arc, Mutex};

use async_graphql_parser::types::ExecutableDocument;
use grove_engine::{
    extensions::{
        DisableValidation, Extension, ExtensionContext, ExtensionFactory, MaskErrors, NextExecute, NextParseQuery,
        NextRequest, NextResolve, NextValidation, ParserCache, QueryDepthLimiter, Tracing, ValidationCache,
    },
    ConstValue, Error, ErrorCode, Field, FieldFuture, FieldValue, Object, Request, ResolveInfo, Response, Schema, ServerError,
    ServerResult, TypeRef, ValidationResult, Variables,
};
use serde_json::json;

use super::{constant, hello_query, ResponseExt};

#[derive(Clone)]
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn push(&self, event: impl std::fmt::Display) {
        self.log.lock().unwrap().push(format!("{} {event}", self.name));
    }
}

impl ExtensionFactory for Recorder {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(self.clone())
    }
}

#[async_trait::async_trait]
impl Extension for Recorder {
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        self.push("request start");
        let response = next.run(ctx).await;
        self.push("request end");
        response
    }

    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        self.push("parse");
        next.run(ctx, query, variables).await
    }

    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        self.push("validation");
        next.run(ctx).await
    }

    async fn execute(&self, ctx: &ExtensionContext<'_>, operation_name: Option<&str>, next: NextExecute<'_>) -> Response {
        self.push("execute start");
        let response = next.run(ctx, operation_name).await;
        self.push("execute end");
        response
    }

    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<ConstValue> {
        self.push(format_args!("resolve {}.{}", info.parent_type, info.name));
        next.run(ctx, info).await
    }
}

#[tokio::test]
async fn first_registered_extension_is_the_outermost() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = Schema::build(hello_query())
        .extension(Recorder {
            name: "a",
            log: log.clone(),
        })
        .extension(Recorder {
            name: "b",
            log: log.clone(),
        })
        .finish()
        .unwrap();

    let response = schema.execute("{ hello }").await;
    assert_eq!(response.to_json(), json!({"data": {"hello": "world"}}));
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "a request start",
            "b request start",
            "a parse",
            "b parse",
            "a validation",
            "b validation",
            "a execute start",
            "b execute start",
            "a resolve Query.hello",
            "b resolve Query.hello",
            "b execute end",
            "a execute end",
            "b request end",
            "a request end",
        ]
    );
}

struct Override;

impl ExtensionFactory for Override {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(Override)
    }
}

#[async_trait::async_trait]
impl Extension for Override {
    async fn resolve(
        &self,
        ctx: &ExtensionContext<'_>,
        info: ResolveInfo<'_>,
        next: NextResolve<'_>,
    ) -> ServerResult<ConstValue> {
        match info.name {
            "hello" => Ok(ConstValue::Null),
            "version" => Ok(ConstValue::from(42)),
            _ => next.run(ctx, info).await,
        }
    }
}

#[tokio::test]
async fn resolve_stage_may_replace_values_but_not_nullability() {
    let query = Object::new("Query")
        .field(constant("hello", TypeRef::named_nn(TypeRef::STRING), "world"))
        .field(constant("version", TypeRef::named(TypeRef::INT), 1));
    let schema = Schema::build(query).extension(Override).finish().unwrap();

    let response = schema.execute("{ version }").await;
    assert_eq!(response.to_json(), json!({"data": {"version": 42}}));

    let response = schema.execute("{ hello version }").await;
    assert_eq!(response.data, Some(ConstValue::Null));
    assert_eq!(
        response.error_messages(),
        vec!["Cannot return null for non-nullable field Query.hello"]
    );
}

struct TokenEcho;

impl ExtensionFactory for TokenEcho {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(TokenEcho)
    }
}

#[async_trait::async_trait]
impl Extension for TokenEcho {
    async fn request(&self, ctx: &ExtensionContext<'_>, next: NextRequest<'_>) -> Response {
        let token = ctx.data_opt::<String>().cloned();
        let response = next.run(ctx).await;
        match token {
            Some(token) => response.extension("token", ConstValue::String(token)),
            None => response,
        }
    }
}

#[tokio::test]
async fn extensions_see_the_request_data() {
    let schema = Schema::build(hello_query()).extension(TokenEcho).finish().unwrap();

    let response = schema.execute(Request::new("{ hello }").data("secret".to_string())).await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"hello": "world"}, "extensions": {"token": "secret"}})
    );

    let response = schema.execute("{ hello }").await;
    assert!(response.extensions.is_empty());
}

#[tokio::test]
async fn parser_cache_skips_inner_parsing() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = Schema::build(hello_query())
        .extension(ParserCache::new(16))
        .extension(Recorder {
            name: "inner",
            log: log.clone(),
        })
        .finish()
        .unwrap();

    for _ in 0..3 {
        let response = schema.execute("{ hello }").await;
        assert_eq!(response.to_json(), json!({"data": {"hello": "world"}}));
    }

    let parses = log.lock().unwrap().iter().filter(|event| event.ends_with("parse")).count();
    assert_eq!(parses, 1);
}

#[tokio::test]
async fn validation_cache_keeps_outcomes_per_document() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = Schema::build(hello_query())
        .extension(ValidationCache::new(16))
        .extension(Recorder {
            name: "inner",
            log: log.clone(),
        })
        .finish()
        .unwrap();

    for _ in 0..3 {
        let response = schema.execute("{ hello }").await;
        assert_eq!(response.to_json(), json!({"data": {"hello": "world"}}));

        let response = schema.execute("{ goodbye }").await;
        assert_eq!(response.data, None);
        assert_eq!(
            response.error_messages(),
            vec![r#"Cannot query field "goodbye" on type "Query"."#]
        );
    }

    let validations = log
        .lock()
        .unwrap()
        .iter()
        .filter(|event| event.ends_with("validation"))
        .count();
    assert_eq!(validations, 2);
}

#[tokio::test]
async fn disabled_validation_leaves_errors_to_execution() {
    let schema = Schema::build(hello_query())
        .extension(DisableValidation)
        .limit_depth(0)
        .finish()
        .unwrap();

    let response = schema.execute("{ hello @cached }").await;
    assert_eq!(response.to_json(), json!({"data": {"hello": "world"}}));

    let response = schema.execute("{ goodbye }").await;
    assert_eq!(response.data, Some(ConstValue::Null));
    assert_eq!(
        response.error_messages(),
        vec![r#"Cannot query field "goodbye" on type "Query"."#]
    );
}

#[tokio::test]
async fn mask_errors_hides_field_errors_only() {
    let query = Object::new("Query")
        .field(Field::new("secret", TypeRef::named(TypeRef::STRING)).resolver(|_| {
            FieldFuture::from_result(Err(Error::new("database password is hunter2").extension("table", "users")))
        }))
        .field(Field::new("denied", TypeRef::named(TypeRef::STRING)).resolver(|_| {
            FieldFuture::from_result(Err(Error::new("Not allowed").with_code(ErrorCode::Unauthorized)))
        }));
    let schema = Schema::build(query)
        .extension(MaskErrors::new().with_predicate(|error| error.code() != Some(ErrorCode::Unauthorized)))
        .finish()
        .unwrap();

    let response = schema.execute("{ secret denied }").await;
    assert_eq!(response.error_messages(), vec!["Unexpected error.", "Not allowed"]);
    assert_eq!(response.errors[0].extensions, None);
    assert_eq!(response.error_codes(), vec!["UNAUTHORIZED"]);

    let response = schema.execute("{ unknown }").await;
    assert_eq!(
        response.error_messages(),
        vec![r#"Cannot query field "unknown" on type "Query"."#]
    );
}

#[tokio::test]
async fn depth_limiter_and_tracing() {
    super::init_logging();

    let item = Object::new("Item").field(constant("hello", TypeRef::named(TypeRef::STRING), "world"));
    let query = Object::new("Query").field(
        Field::new("nested", item).resolver(|_| {
            FieldFuture::from_value(Some(FieldValue::value(ConstValue::Object(Default::default()))))
        }),
    );
    let schema = Schema::build(query)
        .register(Object::new("Unused").field(constant("x", TypeRef::named(TypeRef::INT), 1)))
        .extension(Tracing)
        .extension(QueryDepthLimiter::new(1))
        .finish()
        .unwrap();

    let response = schema.execute("{ nested { hello } }").await;
    assert_eq!(response.data, None);
    assert_eq!(
        response.error_messages(),
        vec!["Query exceeds maximum operation depth of 1"]
    );
    assert_eq!(response.error_codes(), vec!["OPERATION_VALIDATION_ERROR"]);
}
