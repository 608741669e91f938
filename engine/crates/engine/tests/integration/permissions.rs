use std::sync::{Arc, Mutex};

use grove_engine::{
    ContextExt, ErrorExtensionValues, Field, FieldFuture, FieldValue, Object, Permission, Request, ResolverContext,
    Schema, TypeRef,
};
use serde_json::json;

use super::{constant, ResponseExt};

struct Viewer(&'static str);

struct IsAuthenticated;

#[async_trait::async_trait]
impl Permission for IsAuthenticated {
    async fn has_permission(&self, ctx: &ResolverContext<'_>) -> bool {
        ctx.data_opt::<Viewer>().is_some()
    }

    fn message(&self) -> String {
        "User is not authenticated".to_string()
    }
}

struct HasRole(&'static str);

#[async_trait::async_trait]
impl Permission for HasRole {
    async fn has_permission(&self, ctx: &ResolverContext<'_>) -> bool {
        ctx.data_opt::<Viewer>().is_some_and(|viewer| viewer.0 == self.0)
    }

    fn error_extensions(&self) -> Option<ErrorExtensionValues> {
        let mut extensions = ErrorExtensionValues::default();
        extensions.set("requiredRole", self.0);
        Some(extensions)
    }
}

fn guarded_query() -> Object {
    Object::new("Query")
        .field(constant("public", TypeRef::named_nn(TypeRef::STRING), "hi"))
        .field(constant("profile", TypeRef::named(TypeRef::STRING), "mine").permission(IsAuthenticated))
        .field(
            constant("audit", TypeRef::named(TypeRef::STRING), "all good")
                .permission(IsAuthenticated)
                .permission(HasRole("admin")),
        )
        .field(
            constant("drafts", TypeRef::named_nn_list_nn(TypeRef::STRING), vec!["a", "b"])
                .permission(HasRole("editor"))
                .fail_silently(),
        )
        .field(
            constant("motto", TypeRef::named(TypeRef::STRING), "be kind")
                .permission(HasRole("editor"))
                .fail_silently(),
        )
}

#[tokio::test]
async fn denied_fields_are_unauthorized_errors() {
    let schema = Schema::build(guarded_query()).finish().unwrap();

    let response = schema.execute("{ public profile }").await;
    assert_eq!(
        response.to_json(),
        json!({
            "data": {"public": "hi", "profile": null},
            "errors": [{
                "message": "User is not authenticated",
                "locations": [{"line": 1, "column": 10}],
                "path": ["profile"],
                "extensions": {"code": "UNAUTHORIZED"}
            }]
        })
    );

    let response = schema.execute(Request::new("{ profile }").data(Viewer("guest"))).await;
    assert_eq!(response.to_json(), json!({"data": {"profile": "mine"}}));
}

#[tokio::test]
async fn permissions_run_in_order_and_stop_at_the_first_denial() {
    let schema = Schema::build(guarded_query()).finish().unwrap();

    let response = schema.execute("{ audit }").await;
    assert_eq!(response.error_messages(), vec!["User is not authenticated"]);

    let response = schema.execute(Request::new("{ audit }").data(Viewer("guest"))).await;
    assert_eq!(response.error_messages(), vec!["Permission denied"]);
    assert_eq!(
        response.to_json()["errors"][0]["extensions"],
        json!({"code": "UNAUTHORIZED", "requiredRole": "admin"})
    );

    let response = schema.execute(Request::new("{ audit }").data(Viewer("admin"))).await;
    assert_eq!(response.to_json(), json!({"data": {"audit": "all good"}}));
}

#[tokio::test]
async fn silent_failures_resolve_to_empty_values() {
    let schema = Schema::build(guarded_query()).finish().unwrap();

    let response = schema.execute("{ drafts motto }").await;
    assert_eq!(response.to_json(), json!({"data": {"drafts": [], "motto": null}}));

    let response = schema
        .execute(Request::new("{ drafts motto }").data(Viewer("editor")))
        .await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"drafts": ["a", "b"], "motto": "be kind"}})
    );
}

#[tokio::test]
async fn denied_resolvers_are_never_called() {
    let calls = Arc::new(Mutex::new(0));
    let query = Object::new("Query").field(
        Field::new("secret", TypeRef::named(TypeRef::STRING))
            .permission(IsAuthenticated)
            .resolver({
                let calls = calls.clone();
                move |_| {
                    *calls.lock().unwrap() += 1;
                    FieldFuture::from_value(Some(FieldValue::value("42")))
                }
            }),
    );
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ secret }").await;
    assert_eq!(response.error_codes(), vec!["UNAUTHORIZED"]);
    assert_eq!(*calls.lock().unwrap(), 0);

    let response = schema.execute(Request::new("{ secret }").data(Viewer("guest"))).await;
    assert_eq!(response.to_json(), json!({"data": {"secret": "42"}}));
    assert_eq!(*calls.lock().unwrap(), 1);
}
