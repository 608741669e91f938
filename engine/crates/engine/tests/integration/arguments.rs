use grove_engine::{
    ConstValue, Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, MaybeAbsent, Name, Object, Request,
    Schema, TypeRef, Variables,
};
use serde_json::json;

use super::ResponseExt;

/// Tells how the `value` argument was provided.
fn describe_query() -> Object {
    Object::new("Query").field(
        Field::new("describe", TypeRef::named_nn(TypeRef::STRING))
            .argument(InputValue::new("value", TypeRef::named(TypeRef::INT)))
            .resolver(|ctx| {
                let description = match ctx.args.get("value") {
                    MaybeAbsent::Absent => "absent".to_string(),
                    MaybeAbsent::Null => "null".to_string(),
                    MaybeAbsent::Value(value) => format!("value {value}"),
                };
                FieldFuture::from_value(Some(FieldValue::value(description)))
            }),
    )
}

#[tokio::test]
async fn absent_and_null_arguments_are_told_apart() {
    let schema = Schema::build(describe_query()).finish().unwrap();

    let cases = [
        ("{ describe }", Variables::default(), "absent"),
        ("{ describe(value: null) }", Variables::default(), "null"),
        ("{ describe(value: 3) }", Variables::default(), "value 3"),
        ("query($v: Int) { describe(value: $v) }", Variables::default(), "absent"),
        (
            "query($v: Int) { describe(value: $v) }",
            Variables::from_json(json!({"v": null})),
            "null",
        ),
        (
            "query($v: Int = 5) { describe(value: $v) }",
            Variables::default(),
            "value 5",
        ),
    ];

    for (query, variables, expected) in cases {
        let response = schema.execute(Request::new(query).variables(variables)).await;
        assert_eq!(response.to_json(), json!({"data": {"describe": expected}}), "{query}");
    }
}

#[tokio::test]
async fn literal_of_the_wrong_type_is_a_request_error() {
    let schema = Schema::build(describe_query()).finish().unwrap();

    let response = schema.execute(r#"{ describe(value: "three") }"#).await;
    assert_eq!(response.data, None);
    assert_eq!(response.error_codes(), vec!["BAD_USER_INPUT"]);
    assert!(
        response.errors[0]
            .message
            .starts_with(r#"Argument "value" on field "Query.describe" has an invalid value"#),
        "{}",
        response.errors[0].message
    );
}

#[tokio::test]
async fn required_arguments_and_variables() {
    let query = Object::new("Query").field(
        Field::new("double", TypeRef::named_nn(TypeRef::INT))
            .argument(InputValue::new("n", TypeRef::named_nn(TypeRef::INT)))
            .resolver(|ctx| {
                FieldFuture::new(async move {
                    let n = ctx.args.deserialize::<i32>("n")?.unwrap_or_default();
                    Ok(Some(FieldValue::value(n * 2)))
                })
            }),
    );
    let schema = Schema::build(query).finish().unwrap();

    let request = Request::new("query($n: Int!) { double(n: $n) }").variables(Variables::from_json(json!({"n": 4})));
    let response = schema.execute(request).await;
    assert_eq!(response.to_json(), json!({"data": {"double": 8}}));

    let response = schema.execute("query($n: Int!) { double(n: $n) }").await;
    assert_eq!(response.data, None);
    assert_eq!(
        response.error_messages(),
        vec![r#"Variable "$n" of required type "Int!" was not provided."#]
    );

    let response = schema.execute("{ double }").await;
    assert_eq!(
        response.error_messages(),
        vec![r#"Field "Query.double" argument "n" of type "Int!" is required, but it was not provided."#]
    );

    let request = Request::new("query($n: Int!) { double(n: $n) }").variables(Variables::from_json(json!({"n": "4"})));
    let response = schema.execute(request).await;
    assert_eq!(response.error_codes(), vec!["BAD_USER_INPUT"]);
}

#[tokio::test]
async fn defaults_enums_and_input_objects() {
    let order = Enum::new("Order").item("ASC").item("DESC");
    let page = InputObject::new("Page")
        .field(InputValue::new("size", TypeRef::named_nn(TypeRef::INT)).default_value(10))
        .field(InputValue::new("order", order).default_value(ConstValue::Enum(Name::new("ASC"))));

    let query = Object::new("Query").field(
        Field::new("page", TypeRef::named(TypeRef::STRING))
            .argument(InputValue::new("page", page).default_value(ConstValue::Object(Default::default())))
            .argument(InputValue::new("greeting", TypeRef::named(TypeRef::STRING)).default_value("hello"))
            .resolver(|ctx| {
                let page = ctx.args.try_get("page").map(ToString::to_string);
                let greeting = ctx.args.try_get("greeting").map(ToString::to_string);
                FieldFuture::from_result(
                    page.and_then(|page| greeting.map(|greeting| Some(FieldValue::value(format!("{greeting} {page}"))))),
                )
            }),
    );
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ page }").await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"page": r#""hello" {size: 10, order: ASC}"#}})
    );

    let response = schema.execute("{ page(page: {order: DESC}, greeting: null) }").await;
    assert_eq!(response.to_json()["data"], json!({"page": null}));
    assert_eq!(response.error_messages(), vec![r#"Argument "greeting" was not provided"#]);

    let request = Request::new("query($page: Page) { page(page: $page) }")
        .variables(Variables::from_json(json!({"page": {"size": 3, "order": "DESC"}})));
    let response = schema.execute(request).await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"page": r#""hello" {size: 3, order: DESC}"#}})
    );

    let response = schema.execute(r#"{ page(page: {order: "DESC"}) }"#).await;
    assert_eq!(response.error_codes(), vec!["BAD_USER_INPUT"]);
}
