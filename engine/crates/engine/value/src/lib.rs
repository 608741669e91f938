//! The value model shared by requests, resolvers and responses.

mod variables;

pub use async_graphql_value::{from_value, to_value, ConstValue, DeserializerError, Name, Number, SerializerError, Value};
pub use variables::Variables;
