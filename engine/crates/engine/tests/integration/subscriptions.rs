use futures::{stream, StreamExt};
use grove_engine::{
    extensions::MaskErrors, Error, Field, FieldFuture, FieldValue, InputValue, Object, Request, Response, Schema,
    TypeRef,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{constant, hello_query, ResponseExt};

fn ticks() -> Field {
    Field::new("ticks", TypeRef::named_nn(TypeRef::INT))
        .argument(InputValue::new("count", TypeRef::named_nn(TypeRef::INT)))
        .resolver(|ctx| {
            let count = ctx.args.deserialize::<i32>("count").ok().flatten().unwrap_or_default();
            FieldFuture::stream(stream::iter((1..=count).map(|n| Ok(FieldValue::value(n)))))
        })
}

async fn collect(schema: &Schema, request: impl Into<Request>) -> Vec<serde_json::Value> {
    schema
        .execute_stream(request)
        .map(|response| response.to_json())
        .collect()
        .await
}

#[tokio::test]
async fn one_response_per_event() {
    let subscription = Object::new("Subscription").field(ticks());
    let schema = Schema::build(hello_query()).subscription(subscription).finish().unwrap();

    let responses = collect(&schema, "subscription { ticks(count: 3) }").await;
    assert_eq!(
        responses,
        vec![
            json!({"data": {"ticks": 1}}),
            json!({"data": {"ticks": 2}}),
            json!({"data": {"ticks": 3}}),
        ]
    );

    let responses = collect(&schema, "subscription { count: ticks(count: 0) }").await;
    assert!(responses.is_empty());
}

#[tokio::test]
async fn queries_through_a_stream_yield_a_single_response() {
    let subscription = Object::new("Subscription").field(ticks());
    let schema = Schema::build(hello_query()).subscription(subscription).finish().unwrap();

    let responses = collect(&schema, "{ hello }").await;
    assert_eq!(responses, vec![json!({"data": {"hello": "world"}})]);

    let responses = collect(&schema, "subscription { __typename }").await;
    assert_eq!(responses, vec![json!({"data": {"__typename": "Subscription"}})]);

    let response = schema.execute("subscription { ticks(count: 1) }").await;
    assert_eq!(response.data, None);
    assert_eq!(
        response.error_messages(),
        vec!["Subscription operations must be executed as a stream."]
    );
}

#[tokio::test]
async fn request_errors_end_the_stream() {
    let subscription = Object::new("Subscription").field(ticks());
    let schema = Schema::build(hello_query()).subscription(subscription).finish().unwrap();

    let responses: Vec<Response> = schema
        .execute_stream("subscription { a: ticks(count: 1) b: ticks(count: 2) }")
        .collect()
        .await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].data, None);
    assert_eq!(responses[0].error_codes(), vec!["OPERATION_VALIDATION_ERROR"]);
}

#[tokio::test]
async fn resolvers_must_return_a_stream() {
    let subscription =
        Object::new("Subscription").field(constant("broken", TypeRef::named_nn(TypeRef::INT), 1));
    let schema = Schema::build(hello_query()).subscription(subscription).finish().unwrap();

    let responses: Vec<Response> = schema.execute_stream("subscription { broken }").collect().await;
    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0].error_messages(),
        vec![r#"Subscription field "broken" must return a stream"#]
    );
    assert_eq!(responses[0].error_codes(), vec!["SUBSCRIPTION_ERROR"]);
}

#[tokio::test]
async fn source_errors_end_the_stream() {
    let subscription = Object::new("Subscription").field(
        Field::new("feed", TypeRef::named_nn(TypeRef::INT)).resolver(|_| {
            FieldFuture::stream(stream::iter([
                Ok(FieldValue::value(1)),
                Err(Error::new("connection lost")),
                Ok(FieldValue::value(3)),
            ]))
        }),
    );
    let schema = Schema::build(hello_query()).subscription(subscription).finish().unwrap();

    let responses: Vec<Response> = schema.execute_stream("subscription { feed }").collect().await;
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].to_json(), json!({"data": {"feed": 1}}));
    assert_eq!(responses[1].data, None);
    assert_eq!(responses[1].error_messages(), vec!["connection lost"]);
    assert_eq!(responses[1].error_codes(), vec!["SUBSCRIPTION_ERROR"]);
}

#[tokio::test]
async fn cancellation_ends_the_stream() {
    let subscription = Object::new("Subscription").field(
        Field::new("feed", TypeRef::named_nn(TypeRef::INT)).resolver(|_| {
            FieldFuture::stream(stream::iter([Ok(FieldValue::value(1))]).chain(stream::pending()))
        }),
    );
    let schema = Schema::build(hello_query()).subscription(subscription).finish().unwrap();

    let token = CancellationToken::new();
    let mut responses = schema.execute_stream(Request::new("subscription { feed }").cancellation(token.clone()));

    let first = responses.next().await.unwrap();
    assert_eq!(first.to_json(), json!({"data": {"feed": 1}}));

    token.cancel();
    assert!(responses.next().await.is_none());
}

#[tokio::test]
async fn events_are_completed_like_query_results() {
    let message = Object::new("Message")
        .field(Field::new("text", TypeRef::named_nn(TypeRef::STRING)))
        .field(
            Field::new("author", TypeRef::named(TypeRef::STRING))
                .resolver(|_| FieldFuture::from_result(Err(Error::new("users service is down")))),
        );
    let subscription = Object::new("Subscription").field(Field::new("messages", message).resolver(|_| {
        FieldFuture::stream(stream::iter(["hi", "bye"].map(|text| {
            Ok(FieldValue::value(
                grove_engine::ConstValue::from_json(json!({"text": text})).unwrap(),
            ))
        })))
    }));
    let schema = Schema::build(hello_query())
        .subscription(subscription)
        .extension(MaskErrors::new())
        .finish()
        .unwrap();

    let responses = collect(&schema, "subscription { messages { text author } }").await;
    assert_eq!(responses.len(), 2);
    assert_eq!(
        responses[1],
        json!({
            "data": {"messages": {"text": "bye", "author": null}},
            "errors": [{
                "message": "Unexpected error.",
                "locations": [{"line": 1, "column": 32}],
                "path": ["messages", "author"]
            }]
        })
    );
}
