use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use grove_engine::{
    ConstValue, ContextExt, Error, Field, FieldFuture, FieldValue, InputValue, Object, Request, Schema, TypeRef,
    Variables,
};
use serde_json::json;

use super::{constant, ResponseExt};

#[tokio::test]
async fn fields_keep_the_order_of_the_selection() {
    let query = Object::new("Query")
        .field(Field::new("slow", TypeRef::named(TypeRef::STRING)).resolver(|_| {
            FieldFuture::new(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(Some(FieldValue::value("slow")))
            })
        }))
        .field(constant("fast", TypeRef::named(TypeRef::STRING), "fast"));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ slow fast }").await;
    assert_eq!(response.to_json(), json!({"data": {"slow": "slow", "fast": "fast"}}));
    assert_eq!(
        serde_json::to_string(&response.to_json()["data"]).unwrap(),
        r#"{"slow":"slow","fast":"fast"}"#
    );
}

#[tokio::test]
async fn aliases_and_repeated_fields() {
    let schema = Schema::build(super::hello_query()).finish().unwrap();

    let response = schema.execute("{ greeting: hello hello ...on Query { hello } }").await;
    assert_eq!(
        serde_json::to_string(&response.to_json()).unwrap(),
        r#"{"data":{"greeting":"world","hello":"world"}}"#
    );
}

#[tokio::test]
async fn typename_of_the_root() {
    let schema = Schema::build(super::hello_query()).finish().unwrap();

    let response = schema.execute("{ __typename kind: __typename }").await;
    assert_eq!(response.to_json(), json!({"data": {"__typename": "Query", "kind": "Query"}}));
}

fn user_object() -> Object {
    Object::new("User")
        .field(Field::new("id", TypeRef::named_nn(TypeRef::ID)))
        .field(Field::new("first_name", TypeRef::named_nn(TypeRef::STRING)))
        .field(Field::new("nickname", TypeRef::named(TypeRef::STRING)))
}

#[tokio::test]
async fn object_members_resolve_fields_without_resolver() {
    let query = Object::new("Query").field(Field::new("me", user_object()).resolver(|_| {
        FieldFuture::from_value(Some(FieldValue::value(
            ConstValue::from_json(json!({"id": 7, "first_name": "Ada"})).unwrap(),
        )))
    }));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ me { id firstName nickname } }").await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"me": {"id": "7", "firstName": "Ada", "nickname": null}}})
    );
}

#[tokio::test]
async fn opaque_parents_are_handed_to_nested_resolvers() {
    struct Account {
        balance: i32,
    }

    let account = Object::new("Account").field(Field::new("balance", TypeRef::named_nn(TypeRef::INT)).resolver(
        |ctx| {
            FieldFuture::new(async move {
                let account = ctx.parent_value.try_downcast_ref::<Account>()?;
                Ok(Some(FieldValue::value(account.balance)))
            })
        },
    ));
    let query = Object::new("Query").field(
        Field::new("account", account)
            .resolver(|_| FieldFuture::from_value(Some(FieldValue::owned_any(Account { balance: 42 })))),
    );
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ account { balance } }").await;
    assert_eq!(response.to_json(), json!({"data": {"account": {"balance": 42}}}));
}

#[tokio::test]
async fn schema_default_resolver_replaces_member_lookup() {
    type Attributes = std::collections::HashMap<String, ConstValue>;

    let book = Object::new("Book")
        .field(Field::new("title", TypeRef::named_nn(TypeRef::STRING)))
        .field(Field::new("page_count", TypeRef::named(TypeRef::INT)))
        .field(constant("format", TypeRef::named_nn(TypeRef::STRING), "paperback"));
    let query = Object::new("Query").field(Field::new("book", book).resolver(|_| {
        FieldFuture::from_value(Some(FieldValue::owned_any(Attributes::from([
            ("title".to_string(), ConstValue::String("Dune".to_string())),
            ("page_count".to_string(), ConstValue::from(412)),
        ]))))
    }));
    let schema = Schema::build(query)
        .default_resolver(|ctx| {
            let value = ctx
                .parent_value
                .try_downcast_ref::<Attributes>()
                .map(|attributes| attributes.get(&ctx.field().declared_name).cloned().map(FieldValue::value));
            FieldFuture::from_result(value)
        })
        .finish()
        .unwrap();

    let response = schema.execute("{ book { title pageCount format } }").await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"book": {"title": "Dune", "pageCount": 412, "format": "paperback"}}})
    );
}

#[tokio::test]
async fn null_propagates_to_the_nearest_nullable_parent() {
    let user = Object::new("User").field(
        Field::new("name", TypeRef::named_nn(TypeRef::STRING))
            .resolver(|_| FieldFuture::from_value(None)),
    );
    let query = Object::new("Query")
        .field(Field::new("user", user).resolver(|_| {
            FieldFuture::from_value(Some(FieldValue::value(ConstValue::Object(Default::default()))))
        }))
        .field(constant("version", TypeRef::named(TypeRef::INT), 3));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ user { name } version }").await;
    assert_eq!(
        response.to_json(),
        json!({
            "data": {"user": null, "version": 3},
            "errors": [{
                "message": "Cannot return null for non-nullable field User.name",
                "locations": [{"line": 1, "column": 10}],
                "path": ["user", "name"]
            }]
        })
    );
}

#[tokio::test]
async fn null_on_a_non_null_root_field_nulls_the_data() {
    let query = Object::new("Query")
        .field(
            Field::new("required", TypeRef::named_nn(TypeRef::STRING))
                .resolver(|_| FieldFuture::from_result(Err(Error::new("boom")))),
        )
        .field(constant("optional", TypeRef::named(TypeRef::STRING), "here"));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ required optional }").await;
    assert_eq!(response.data, Some(ConstValue::Null));
    assert_eq!(response.error_messages(), vec!["boom"]);
    assert_eq!(response.to_json()["errors"][0]["path"], json!(["required"]));
}

#[tokio::test]
async fn list_items_fail_independently_when_nullable() {
    let query = Object::new("Query")
        .field(Field::new("numbers", TypeRef::named_list(TypeRef::INT)).resolver(|_| {
            FieldFuture::from_value(Some(FieldValue::list([
                FieldValue::value(1),
                FieldValue::value("two"),
                FieldValue::value(3),
            ])))
        }))
        .field(Field::new("strict", TypeRef::named_nn_list(TypeRef::INT)).resolver(|_| {
            FieldFuture::from_value(Some(FieldValue::list([FieldValue::value(1), FieldValue::NULL])))
        }));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ numbers strict }").await;
    assert_eq!(response.to_json()["data"], json!({"numbers": [1, null, 3], "strict": null}));
    assert_eq!(
        response.error_messages(),
        vec![
            "Int cannot represent value: \"two\"",
            "Cannot return null for non-nullable field Query.strict"
        ]
    );
    assert_eq!(response.to_json()["errors"][0]["path"], json!(["numbers", 1]));
    assert_eq!(response.to_json()["errors"][1]["path"], json!(["strict", 1]));
}

#[tokio::test]
async fn out_of_range_integers_are_field_errors() {
    let query = Object::new("Query").field(constant("big", TypeRef::named(TypeRef::INT), i64::from(i32::MAX) + 1));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ big }").await;
    assert_eq!(response.to_json()["data"], json!({"big": null}));
    assert_eq!(response.error_messages(), vec!["Int cannot represent value: 2147483648"]);
}

#[tokio::test]
async fn mutations_run_one_after_the_other() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let step = |name: &'static str, delay: u64, log: Arc<Mutex<Vec<&'static str>>>| {
        Field::new(name, TypeRef::named_nn(TypeRef::STRING)).resolver(move |_| {
            let log = log.clone();
            FieldFuture::new(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                log.lock().unwrap().push(name);
                Ok(Some(FieldValue::value(name)))
            })
        })
    };

    let mutation = Object::new("Mutation")
        .field(step("first", 50, log.clone()))
        .field(step("second", 0, log.clone()));
    let schema = Schema::build(super::hello_query())
        .mutation(mutation)
        .finish()
        .unwrap();

    let response = schema.execute("mutation { first second }").await;
    assert_eq!(response.to_json(), json!({"data": {"first": "first", "second": "second"}}));
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn operation_selection() {
    let schema = Schema::build(super::hello_query()).finish().unwrap();
    let document = "query A { a: hello } query B { b: hello }";

    let response = schema.execute(Request::new(document).with_operation_name("B")).await;
    assert_eq!(response.to_json(), json!({"data": {"b": "world"}}));

    let response = schema.execute(document).await;
    assert_eq!(response.data, None);
    assert_eq!(response.error_messages(), vec!["Operation name required in request."]);

    let response = schema.execute(Request::new(document).with_operation_name("C")).await;
    assert_eq!(response.error_messages(), vec![r#"Unknown operation named "C""#]);

    let response = schema.execute(Request::new("query A { hello }")).await;
    assert_eq!(response.to_json(), json!({"data": {"hello": "world"}}));
}

#[tokio::test]
async fn skip_and_include() {
    let query = Object::new("Query")
        .field(constant("a", TypeRef::named(TypeRef::INT), 1))
        .field(constant("b", TypeRef::named(TypeRef::INT), 2))
        .field(constant("c", TypeRef::named(TypeRef::INT), 3));
    let schema = Schema::build(query).finish().unwrap();

    let request = Request::new("query($skip: Boolean!) { a @skip(if: $skip) b @include(if: $skip) ... @include(if: false) { c } }")
        .variables(Variables::from_json(json!({"skip": true})));
    let response = schema.execute(request).await;
    assert_eq!(response.to_json(), json!({"data": {"b": 2}}));
}

#[tokio::test]
async fn request_data_shadows_schema_data() {
    let query = Object::new("Query").field(Field::new("token", TypeRef::named(TypeRef::STRING)).resolver(|ctx| {
        FieldFuture::new(async move {
            let token = ctx.data::<String>()?;
            Ok(Some(FieldValue::value(token.as_str())))
        })
    }));
    let schema = Schema::build(query).data("schema".to_string()).finish().unwrap();

    let response = schema.execute("{ token }").await;
    assert_eq!(response.to_json(), json!({"data": {"token": "schema"}}));

    let response = schema.execute(Request::new("{ token }").data("request".to_string())).await;
    assert_eq!(response.to_json(), json!({"data": {"token": "request"}}));
}

#[tokio::test]
async fn root_value_is_the_parent_of_root_fields() {
    let query = Object::new("Query").field(Field::new("motd", TypeRef::named(TypeRef::STRING)));
    let schema = Schema::build(query).finish().unwrap();

    let request = Request::new("{ motd }").root_value(ConstValue::from_json(json!({"motd": "hi"})).unwrap());
    let response = schema.execute(request).await;
    assert_eq!(response.to_json(), json!({"data": {"motd": "hi"}}));
}

#[tokio::test]
async fn arguments_reach_resolvers_by_their_declared_name() {
    let query = Object::new("Query").field(
        Field::new("add", TypeRef::named_nn(TypeRef::INT))
            .argument(InputValue::new("left_hand", TypeRef::named_nn(TypeRef::INT)))
            .argument(InputValue::new("right_hand", TypeRef::named_nn(TypeRef::INT)))
            .resolver(|ctx| {
                FieldFuture::new(async move {
                    let left = ctx.args.deserialize::<i32>("left_hand")?.unwrap_or_default();
                    let right = ctx.args.deserialize::<i32>("right_hand")?.unwrap_or_default();
                    Ok(Some(FieldValue::value(left + right)))
                })
            }),
    );
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ add(leftHand: 2, rightHand: 40) }").await;
    assert_eq!(response.to_json(), json!({"data": {"add": 42}}));
}

#[tokio::test]
async fn panicking_resolvers_become_internal_errors() {
    let query = Object::new("Query")
        .field(Field::new("explode", TypeRef::named(TypeRef::STRING)).resolver(|_| panic!("kaboom")))
        .field(Field::new("later", TypeRef::named(TypeRef::STRING)).resolver(|ctx| {
            FieldFuture::new(async move {
                tokio::task::yield_now().await;
                if ctx.field().name == "later" {
                    panic!("kaboom");
                }
                Ok(None::<FieldValue>)
            })
        }));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ explode later }").await;
    assert_eq!(response.to_json()["data"], json!({"explode": null, "later": null}));
    assert_eq!(
        response.error_codes(),
        vec!["INTERNAL_SERVER_ERROR", "INTERNAL_SERVER_ERROR"]
    );
}
