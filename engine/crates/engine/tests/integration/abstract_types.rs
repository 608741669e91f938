use grove_engine::{ConstValue, Field, FieldFuture, FieldValue, Interface, Object, Schema, TypeRef, Union};
use indoc::indoc;
use serde_json::json;

use super::ResponseExt;

fn dog() -> Object {
    Object::new("Dog")
        .field(Field::new("name", TypeRef::named_nn(TypeRef::STRING)))
        .field(Field::new("barks", TypeRef::named_nn(TypeRef::BOOLEAN)))
}

fn cat() -> Object {
    Object::new("Cat")
        .field(Field::new("name", TypeRef::named_nn(TypeRef::STRING)))
        .field(Field::new("meows", TypeRef::named_nn(TypeRef::BOOLEAN)))
}

fn object(value: serde_json::Value) -> FieldValue {
    FieldValue::value(ConstValue::from_json(value).unwrap())
}

const PETS_QUERY: &str = indoc! {"
    {
        pets {
            __typename
            ... on Dog { name barks }
            ... on Cat { name meows }
        }
    }
"};

#[tokio::test]
async fn tagged_values_pick_their_type() {
    let pet = Union::new("Pet").possible_type(dog()).possible_type(cat());
    let query = Object::new("Query").field(
        Field::new("pets", TypeRef::from(pet).non_null().list().non_null()).resolver(|_| {
            FieldFuture::from_value(Some(FieldValue::list([
                object(json!({"name": "Rex", "barks": true, "meows": false})).with_type("Dog"),
                object(json!({"name": "Tom", "barks": false, "meows": false})).with_type("Cat"),
            ])))
        }),
    );
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute(PETS_QUERY).await;
    insta::assert_json_snapshot!(response.to_json(), @r###"
    {
      "data": {
        "pets": [
          {
            "__typename": "Dog",
            "name": "Rex",
            "barks": true
          },
          {
            "__typename": "Cat",
            "name": "Tom",
            "meows": false
          }
        ]
      }
    }
    "###);
}

#[tokio::test]
async fn typename_member_and_structure_of_plain_objects() {
    let pet = Union::new("Pet").possible_type(dog()).possible_type(cat());
    let query = Object::new("Query").field(
        Field::new("pets", TypeRef::from(pet).non_null().list().non_null()).resolver(|_| {
            FieldFuture::from_value(Some(FieldValue::list([
                object(json!({"__typename": "Cat", "name": "Tom", "meows": true})),
                object(json!({"name": "Rex", "barks": false})),
            ])))
        }),
    );
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute(PETS_QUERY).await;
    assert_eq!(
        response.to_json(),
        json!({
            "data": {
                "pets": [
                    {"__typename": "Cat", "name": "Tom", "meows": true},
                    {"__typename": "Dog", "name": "Rex", "barks": false},
                ]
            }
        })
    );
}

struct Robot {
    model: &'static str,
}

struct Person {
    first_name: &'static str,
}

#[tokio::test]
async fn opaque_values_rely_on_is_type_of() {
    let named = Interface::new("Named").field(Field::new("name", TypeRef::named_nn(TypeRef::STRING)));
    let robot = Object::new("Robot")
        .implement("Named")
        .field(Field::new("name", TypeRef::named_nn(TypeRef::STRING)).resolver(|ctx| {
            FieldFuture::from_result(
                ctx.parent_value
                    .try_downcast_ref::<Robot>()
                    .map(|robot| Some(FieldValue::value(robot.model))),
            )
        }))
        .is_type_of(|value| value.downcast_ref::<Robot>().is_some());
    let person = Object::new("Person")
        .implement("Named")
        .field(Field::new("name", TypeRef::named_nn(TypeRef::STRING)).resolver(|ctx| {
            FieldFuture::from_result(
                ctx.parent_value
                    .try_downcast_ref::<Person>()
                    .map(|person| Some(FieldValue::value(person.first_name))),
            )
        }))
        .is_type_of(|value| value.downcast_ref::<Person>().is_some());

    let query = Object::new("Query").field(Field::new("things", TypeRef::named_nn_list_nn("Named")).resolver(|_| {
        FieldFuture::from_value(Some(FieldValue::list([
            FieldValue::owned_any(Person { first_name: "Ada" }),
            FieldValue::owned_any(Robot { model: "R2" }),
        ])))
    }));
    let schema = Schema::build(query)
        .register(named)
        .register(robot)
        .register(person)
        .finish()
        .unwrap();

    let response = schema.execute("{ things { __typename name } }").await;
    assert_eq!(
        response.to_json(),
        json!({
            "data": {
                "things": [
                    {"__typename": "Person", "name": "Ada"},
                    {"__typename": "Robot", "name": "R2"},
                ]
            }
        })
    );
}

#[tokio::test]
async fn resolve_type_of_an_interface() {
    let node = Interface::new("Node")
        .field(Field::new("id", TypeRef::named_nn(TypeRef::ID)))
        .resolve_type(|value| match value.as_value() {
            Some(ConstValue::Object(object)) if object.contains_key("title") => Some("Post".to_string()),
            Some(ConstValue::Object(_)) => Some("Comment".to_string()),
            _ => None,
        });
    // `id` is inherited from the interface.
    let post = Object::new("Post")
        .implement("Node")
        .field(Field::new("title", TypeRef::named(TypeRef::STRING)));
    let comment = Object::new("Comment")
        .implement("Node")
        .field(Field::new("body", TypeRef::named(TypeRef::STRING)));

    let query = Object::new("Query").field(Field::new("nodes", TypeRef::from(node).non_null().list()).resolver(|_| {
        FieldFuture::from_value(Some(FieldValue::list([
            object(json!({"id": 1, "title": "Hello"})),
            object(json!({"id": 2, "body": "First!"})),
        ])))
    }));
    let schema = Schema::build(query).register(post).register(comment).finish().unwrap();

    let response = schema
        .execute("{ nodes { id ... on Post { title } ... on Comment { body } } }")
        .await;
    assert_eq!(
        response.to_json(),
        json!({
            "data": {
                "nodes": [
                    {"id": "1", "title": "Hello"},
                    {"id": "2", "body": "First!"},
                ]
            }
        })
    );
}

#[tokio::test]
async fn unresolvable_abstract_values_are_field_errors() {
    let pet = Union::new("Pet")
        .possible_type(dog())
        .possible_type(cat())
        .resolve_type(|value| match value.as_value() {
            Some(ConstValue::Object(object)) if object.contains_key("wings") => Some("Query".to_string()),
            _ => None,
        });
    let query = Object::new("Query")
        .field(
            Field::new("bird", pet)
                .resolver(|_| FieldFuture::from_value(Some(object(json!({"name": "Tweety", "wings": 2}))))),
        )
        .field(Field::new("ambiguous", "Pet").resolver(|_| {
            FieldFuture::from_value(Some(object(json!({"name": "Rex"}))))
        }));
    let schema = Schema::build(query).finish().unwrap();

    let response = schema.execute("{ bird { __typename } }").await;
    assert_eq!(response.to_json()["data"], json!({"bird": null}));
    assert_eq!(
        response.error_messages(),
        vec![r#"Runtime Object type "Query" is not a possible type for "Pet"."#]
    );
    assert_eq!(response.to_json()["errors"][0]["path"], json!(["bird"]));

    let response = schema.execute("{ ambiguous { __typename } }").await;
    assert_eq!(response.to_json()["data"], json!({"ambiguous": null}));
    assert!(
        response.errors[0]
            .message
            .starts_with(r#"Abstract type "Pet" must resolve to an Object type at runtime for field "Query.ambiguous"."#),
        "{}",
        response.errors[0].message
    );
}
