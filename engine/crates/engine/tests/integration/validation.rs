use grove_engine::{ErrorCode, Field, FieldFuture, FieldValue, InputValue, Object, Schema, TypeRef};
use serde_json::json;

use super::{constant, ResponseExt};

fn schema() -> Schema {
    let user = Object::new("User")
        .field(Field::new("name", TypeRef::named(TypeRef::STRING)))
        .field(Field::new("friends", TypeRef::named_nn_list("User")));
    let query = Object::new("Query")
        .field(constant("hello", TypeRef::named_nn(TypeRef::STRING), "world"))
        .field(
            Field::new("user", user)
                .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)))
                .resolver(|_| {
                    FieldFuture::from_value(Some(FieldValue::value(
                        grove_engine::ConstValue::from_json(json!({"name": "Ada", "friends": []})).unwrap(),
                    )))
                }),
        );
    Schema::build(query).finish().unwrap()
}

async fn errors_of(query: &str) -> Vec<String> {
    let response = schema().execute(query).await;
    assert_eq!(response.data, None, "{query}");
    assert!(
        response
            .errors
            .iter()
            .all(|error| error.code() == Some(ErrorCode::OperationValidationError)),
        "{query}"
    );
    response.errors.into_iter().map(|error| error.message).collect()
}

#[tokio::test]
async fn valid_operations_execute() {
    let response = schema()
        .execute(r#"query Q { user(id: "1") { ...Named friends { name } } } fragment Named on User { name }"#)
        .await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"user": {"name": "Ada", "friends": []}}})
    );
}

#[tokio::test]
async fn unknown_fields_and_arguments() {
    assert_eq!(
        errors_of("{ hello goodbye }").await,
        vec![r#"Cannot query field "goodbye" on type "Query"."#]
    );
    assert_eq!(
        errors_of(r#"{ user(id: "1", name: "x") { name } }"#).await,
        vec![r#"Unknown argument "name" on field "Query.user"."#]
    );
    assert_eq!(
        errors_of(r#"{ user(id: "1", id: "2") { name } }"#).await,
        vec![r#"There can be only one argument named "id"."#]
    );
}

#[tokio::test]
async fn selections_must_match_the_type() {
    assert_eq!(
        errors_of("{ hello { length } }").await,
        vec![r#"Field "hello" must not have a selection since type "String!" has no subfields."#]
    );
    assert_eq!(
        errors_of(r#"{ user(id: "1") }"#).await,
        vec![r#"Field "user" of type "User" must have a selection of subfields. Did you mean "user { ... }"?"#]
    );
    assert_eq!(
        errors_of("{ __typename { name } }").await,
        vec![r#"Field "__typename" must not have a selection since type "String!" has no subfields."#]
    );
}

#[tokio::test]
async fn every_violation_is_reported() {
    assert_eq!(
        errors_of(r#"{ goodbye user(id: "1") { age } }"#).await,
        vec![
            r#"Cannot query field "goodbye" on type "Query"."#,
            r#"Cannot query field "age" on type "User"."#,
        ]
    );
}

#[tokio::test]
async fn fragments() {
    assert_eq!(errors_of("{ ...Missing }").await, vec![r#"Unknown fragment "Missing"."#]);
    assert_eq!(
        errors_of("{ ...F } fragment F on Query { hello ...F }").await,
        vec![r#"Cannot spread fragment "F" within itself."#]
    );
    assert_eq!(
        errors_of("{ ... on Unknown { hello } }").await,
        vec![r#"Unknown type "Unknown"."#]
    );
    assert_eq!(
        errors_of("{ ... on String { hello } }").await,
        vec![r#"Fragment cannot condition on non composite type "String"."#]
    );
    assert_eq!(
        errors_of("{ ... on User { name } }").await,
        vec![r#"Fragment cannot be spread here as objects of type "Query" can never be of type "User"."#]
    );
    assert_eq!(
        errors_of("{ ...U } fragment U on User { name }").await,
        vec![r#"Fragment "U" cannot be spread here as objects of type "Query" can never be of type "User"."#]
    );
}

#[tokio::test]
async fn variables() {
    assert_eq!(
        errors_of(r#"{ user(id: $id) { name } }"#).await,
        vec![r#"Variable "$id" is not defined."#]
    );
    assert_eq!(
        errors_of(r#"query Named { user(id: $id) { name } }"#).await,
        vec![r#"Variable "$id" is not defined by operation "Named"."#]
    );
    assert_eq!(
        errors_of(r#"query($id: ID!, $id: ID!) { user(id: $id) { name } }"#).await,
        vec![r#"There can be only one variable named "$id"."#]
    );
    assert_eq!(
        errors_of(r#"query($id: Identifier!) { user(id: $id) { name } }"#).await,
        vec![r#"Variable "$id" has an unknown type "Identifier!"."#]
    );
    assert_eq!(
        errors_of(r#"query($user: User) { hello }"#).await,
        vec![r#"Variable "$user" cannot be of non-input type "User"."#]
    );
}

#[tokio::test]
async fn variable_types_nest_a_bounded_number_of_lists() {
    let nested = |depth: usize| format!("{}Int{}", "[".repeat(depth), "]".repeat(depth));

    assert_eq!(
        errors_of(&format!("query($v: {}) {{ hello }}", nested(16))).await,
        vec![r#"Variable "$v" nests more than 15 lists."#]
    );

    let response = schema().execute(format!("query($v: {}) {{ hello }}", nested(15))).await;
    assert_eq!(response.to_json(), json!({"data": {"hello": "world"}}));
}

#[tokio::test]
async fn fields_sharing_a_response_key() {
    assert_eq!(
        errors_of("{ x: hello x: __typename }").await,
        vec![
            r#"Fields "x" conflict because "hello" and "__typename" are different fields. Use different aliases on the fields to fetch both if this was intentional."#
        ]
    );
    assert_eq!(
        errors_of(r#"{ user(id: "1") { name } user(id: "2") { name } }"#).await,
        vec![
            r#"Fields "user" conflict because they have differing arguments. Use different aliases on the fields to fetch both if this was intentional."#
        ]
    );
    assert_eq!(
        errors_of(r#"{ user(id: "1") { name } ...U } fragment U on Query { user(id: "1") { name: friends { name } } }"#)
            .await,
        vec![
            r#"Fields "name" conflict because "name" and "friends" are different fields. Use different aliases on the fields to fetch both if this was intentional."#
        ]
    );

    let response = schema()
        .execute(r#"{ user(id: "1") { name } ... on Query { user(id: "1") { name friends { name } } } }"#)
        .await;
    assert_eq!(
        response.to_json(),
        json!({"data": {"user": {"name": "Ada", "friends": []}}})
    );
}

#[tokio::test]
async fn directives() {
    assert_eq!(
        errors_of("{ hello @cached }").await,
        vec![r#"Unknown directive "@cached"."#]
    );
    assert_eq!(
        errors_of("{ hello @skip }").await,
        vec![r#"Directive "@skip" argument "if" of type "Boolean!" is required, but it was not provided."#]
    );
}

#[tokio::test]
async fn operations_need_a_root_type() {
    assert_eq!(
        errors_of("mutation { hello }").await,
        vec!["Schema is not configured for mutations."]
    );
    assert_eq!(
        errors_of("subscription { hello }").await,
        vec!["Schema is not configured for subscriptions."]
    );
}

#[tokio::test]
async fn subscriptions_select_a_single_root_field() {
    let subscription = Object::new("Subscription")
        .field(constant("a", TypeRef::named(TypeRef::INT), 1))
        .field(constant("b", TypeRef::named(TypeRef::INT), 2));
    let schema = Schema::build(super::hello_query())
        .subscription(subscription)
        .finish()
        .unwrap();

    let response = schema.execute("subscription { a b }").await;
    assert_eq!(
        response.error_messages(),
        vec!["Anonymous Subscription must select only one top level field."]
    );

    let response = schema
        .execute("subscription Ticks { ...Both } fragment Both on Subscription { a b }")
        .await;
    assert_eq!(
        response.error_messages(),
        vec![r#"Subscription "Ticks" must select only one top level field."#]
    );
}
