use async_graphql_parser::Pos;
use grove_value::{ConstValue, Value};

/// A value which can't be coerced to its input type, `path` locating it inside a list or an
/// input object, e.g. ` at path '.filters.0'`.
#[derive(Debug, thiserror::Error)]
#[error("{kind}{path}")]
pub struct InputValueError {
    pub kind: InputValueErrorKind,
    pub path: String,
    pub location: Pos,
}

#[derive(Debug, thiserror::Error)]
pub enum InputValueErrorKind {
    #[error("Found a null where we expected a {expected}")]
    UnexpectedNull { expected: String },
    #[error("Found a {actual} value where we expected a {expected}")]
    MissingList { actual: ValueKind, expected: String },
    #[error("Found a {actual} value where we expected a '{name}' input object")]
    MissingObject { name: String, actual: ValueKind },
    #[error("Found a {actual} value where we expected a {expected} scalar")]
    IncorrectScalarType { actual: ValueKind, expected: String },
    #[error("Found value {actual} which cannot be coerced into a {expected} scalar")]
    IncorrectScalarValue { actual: String, expected: String },
    #[error("Invalid value for the {scalar} scalar: {message}")]
    InvalidCustomScalar { scalar: String, message: String },
    #[error("Found a {actual} value where we expected a {r#enum} enum value")]
    IncorrectEnumValueType { r#enum: String, actual: ValueKind },
    #[error("Unknown enum value '{value}' for enum {r#enum}")]
    UnknownEnumValue { r#enum: String, value: String },
    #[error("Variable ${name} doesn't have the right type. Declared as '{variable_ty}' but used as '{actual_ty}'")]
    IncorrectVariableType {
        name: String,
        variable_ty: String,
        actual_ty: String,
    },
    #[error("Input object {input_object} does not have a field named '{name}'")]
    UnknownInputField { input_object: String, name: String },
    #[error("Unknown variable ${name}")]
    UnknownVariable { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ValueKind {
    String,
    Integer,
    Enum,
    Float,
    Object,
    Boolean,
    List,
    Null,
}

impl From<&ConstValue> for ValueKind {
    fn from(value: &ConstValue) -> Self {
        match value {
            ConstValue::Null => ValueKind::Null,
            ConstValue::Number(number) if number.is_f64() => ValueKind::Float,
            ConstValue::Number(_) => ValueKind::Integer,
            ConstValue::String(_) => ValueKind::String,
            ConstValue::Boolean(_) => ValueKind::Boolean,
            ConstValue::Binary(_) => ValueKind::String,
            ConstValue::Enum(_) => ValueKind::Enum,
            ConstValue::List(_) => ValueKind::List,
            ConstValue::Object(_) => ValueKind::Object,
        }
    }
}

impl From<&Value> for ValueKind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Number(number) if number.is_f64() => ValueKind::Float,
            Value::Number(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Binary(_) => ValueKind::String,
            Value::Enum(_) => ValueKind::Enum,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
            Value::Variable(_) => unreachable!("variables are resolved before inspecting a value"),
        }
    }
}

impl From<Value> for ValueKind {
    fn from(value: Value) -> Self {
        (&value).into()
    }
}
