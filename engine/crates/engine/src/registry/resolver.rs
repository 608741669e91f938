use std::{
    any::Any,
    borrow::Cow,
    fmt::{self, Debug, Formatter},
    future::Future,
    ops::Deref,
};

use futures_util::{future::BoxFuture, stream::BoxStream, FutureExt, Stream, StreamExt, TryStreamExt};
use grove_value::ConstValue;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::{ContextField, Error, Result};

/// The value produced by a resolver, handed over to the resolvers of the nested fields as their
/// parent.
pub struct FieldValue(FieldValueInner);

enum FieldValueInner {
    Value(ConstValue),
    OwnedAny(Box<dyn Any + Send + Sync>),
    List(Vec<FieldValue>),
    WithType {
        value: Box<FieldValue>,
        ty: Cow<'static, str>,
    },
}

impl Debug for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.0 {
            FieldValueInner::Value(value) => write!(f, "{value}"),
            FieldValueInner::OwnedAny(_) => f.write_str("Any"),
            FieldValueInner::List(list) => f.debug_list().entries(list).finish(),
            FieldValueInner::WithType { value, ty } => write!(f, "{value:?} as {ty}"),
        }
    }
}

impl From<ConstValue> for FieldValue {
    fn from(value: ConstValue) -> Self {
        FieldValue(FieldValueInner::Value(value))
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(list: Vec<FieldValue>) -> Self {
        FieldValue(FieldValueInner::List(list))
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::NULL
    }
}

impl FieldValue {
    pub const NULL: FieldValue = FieldValue(FieldValueInner::Value(ConstValue::Null));

    pub fn value(value: impl Into<ConstValue>) -> Self {
        FieldValue(FieldValueInner::Value(value.into()))
    }

    /// An opaque Rust value, only usable by the resolvers of the nested fields through
    /// [`FieldValue::downcast_ref`].
    pub fn owned_any<T: Any + Send + Sync>(value: T) -> Self {
        FieldValue(FieldValueInner::OwnedAny(Box::new(value)))
    }

    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldValue>,
    {
        FieldValue(FieldValueInner::List(values.into_iter().map(Into::into).collect()))
    }

    /// Tags the value with its concrete object type, used when the field returns an interface or
    /// a union.
    #[must_use]
    pub fn with_type(self, ty: impl Into<Cow<'static, str>>) -> Self {
        FieldValue(FieldValueInner::WithType {
            value: Box::new(self),
            ty: ty.into(),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self.as_value(), Some(ConstValue::Null))
    }

    /// The GraphQL value, if this is one.
    pub fn as_value(&self) -> Option<&ConstValue> {
        match &self.0 {
            FieldValueInner::Value(value) => Some(value),
            FieldValueInner::WithType { value, .. } => value.as_value(),
            _ => None,
        }
    }

    pub fn try_to_value(&self) -> Result<&ConstValue> {
        self.as_value()
            .ok_or_else(|| Error::new(format!("internal: \"{self:?}\" is not a GraphQL value")))
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match &self.0 {
            FieldValueInner::List(list) => Some(list),
            FieldValueInner::WithType { value, .. } => value.as_list(),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.0 {
            FieldValueInner::OwnedAny(value) => value.downcast_ref(),
            FieldValueInner::WithType { value, .. } => value.downcast_ref(),
            _ => None,
        }
    }

    pub fn try_downcast_ref<T: Any>(&self) -> Result<&T> {
        self.downcast_ref().ok_or_else(|| {
            Error::new(format!(
                "internal: \"{self:?}\" is not of the expected type \"{}\"",
                std::any::type_name::<T>()
            ))
        })
    }

    /// The concrete type name given with [`FieldValue::with_type`].
    pub(crate) fn type_tag(&self) -> Option<&str> {
        match &self.0 {
            FieldValueInner::WithType { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub(crate) fn into_parts(self) -> FieldValueParts {
        match self.0 {
            FieldValueInner::Value(value) => FieldValueParts::Value(value),
            FieldValueInner::List(list) => FieldValueParts::List(list),
            FieldValueInner::WithType { value, .. } => value.into_parts(),
            inner @ FieldValueInner::OwnedAny(_) => FieldValueParts::Opaque(FieldValue(inner)),
        }
    }
}

/// Shape of a value as seen by the executor when completing it.
pub(crate) enum FieldValueParts {
    Value(ConstValue),
    List(Vec<FieldValue>),
    /// An opaque value, only usable as the parent of nested fields.
    Opaque(FieldValue),
}

/// What a resolver returns: a value right away, a future or, for subscription root fields, a
/// stream of values.
pub enum FieldFuture<'a> {
    Immediate(Result<Option<FieldValue>>),
    Deferred(BoxFuture<'a, Result<Option<FieldValue>>>),
    Stream(BoxStream<'a, Result<FieldValue>>),
}

impl<'a> FieldFuture<'a> {
    pub fn new<F, R>(future: F) -> Self
    where
        F: Future<Output = Result<Option<R>>> + Send + 'a,
        R: Into<FieldValue> + Send,
    {
        FieldFuture::Deferred(future.map(|result| result.map(|value| value.map(Into::into))).boxed())
    }

    pub fn from_value(value: Option<FieldValue>) -> Self {
        FieldFuture::Immediate(Ok(value))
    }

    pub fn from_result(result: Result<Option<FieldValue>>) -> Self {
        FieldFuture::Immediate(result)
    }

    /// Source of a subscription root field.
    pub fn stream<S, R>(stream: S) -> Self
    where
        S: Stream<Item = Result<R>> + Send + 'a,
        R: Into<FieldValue> + Send + 'a,
    {
        FieldFuture::Stream(stream.map_ok(Into::into).boxed())
    }
}

/// An argument value as seen by a resolver, telling apart a value that was not provided from
/// an explicit `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaybeAbsent<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> MaybeAbsent<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, MaybeAbsent::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MaybeAbsent::Null)
    }

    pub fn value(self) -> Option<T> {
        match self {
            MaybeAbsent::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Coerced arguments of a field, keyed by their declared name.
#[derive(Clone, Copy)]
pub struct ArgumentValues<'a>(pub(crate) Option<&'a IndexMap<String, ConstValue>>);

impl<'a> ArgumentValues<'a> {
    pub fn get(&self, name: &str) -> MaybeAbsent<&'a ConstValue> {
        match self.0.and_then(|arguments| arguments.get(name)) {
            None => MaybeAbsent::Absent,
            Some(ConstValue::Null) => MaybeAbsent::Null,
            Some(value) => MaybeAbsent::Value(value),
        }
    }

    /// The value of a argument that must be present and not null.
    pub fn try_get(&self, name: &str) -> Result<&'a ConstValue> {
        self.get(name)
            .value()
            .ok_or_else(|| Error::new(format!("Argument \"{name}\" was not provided")))
    }

    pub fn deserialize<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name).value() {
            Some(value) => Ok(Some(grove_value::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a ConstValue)> + 'a {
        self.0
            .into_iter()
            .flat_map(|arguments| arguments.iter().map(|(name, value)| (name.as_str(), value)))
    }
}

/// Everything a resolver gets to work with.
pub struct ResolverContext<'a> {
    pub ctx: &'a ContextField<'a>,
    pub args: ArgumentValues<'a>,
    pub parent_value: &'a FieldValue,
}

impl<'a> Deref for ResolverContext<'a> {
    type Target = ContextField<'a>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}
