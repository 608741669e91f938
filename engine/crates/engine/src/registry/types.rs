use std::sync::Arc;

use grove_value::ConstValue;

use super::{Deprecation, Field, FieldValue, InputValue, TypeRef};
use crate::Result;

pub(crate) type ResolveTypeFn = Arc<dyn Fn(&FieldValue) -> Option<String> + Send + Sync>;
pub(crate) type IsTypeOfFn = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;
pub(crate) type ScalarParseFn = Arc<dyn Fn(&ConstValue) -> Result<ConstValue> + Send + Sync>;
pub(crate) type ScalarSerializeFn = Arc<dyn Fn(ConstValue) -> Result<ConstValue> + Send + Sync>;

/// An object type declaration.
///
/// ```
/// use grove_engine::{Field, FieldFuture, FieldValue, Object, TypeRef};
///
/// let query = Object::new("Query").field(
///     Field::new("hello", TypeRef::named_nn(TypeRef::STRING))
///         .resolver(|_| FieldFuture::new(async { Ok(Some(FieldValue::value("world"))) })),
/// );
/// ```
pub struct Object {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) fields: Vec<Field>,
    pub(crate) implements: Vec<TypeRef>,
    pub(crate) is_type_of: Option<IsTypeOfFn>,
}

impl Object {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            implements: Vec::new(),
            is_type_of: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares that this object implements an interface. Fields of the interface which are not
    /// declared on the object are inherited, resolvers included.
    #[must_use]
    pub fn implement(mut self, interface: impl Into<TypeRef>) -> Self {
        self.implements.push(interface.into());
        self
    }

    /// Predicate used to find the concrete type of a value returned for an abstract type.
    #[must_use]
    pub fn is_type_of(mut self, is_type_of: impl Fn(&FieldValue) -> bool + Send + Sync + 'static) -> Self {
        self.is_type_of = Some(Arc::new(is_type_of));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }
}

pub struct Interface {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) fields: Vec<Field>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the name of the object type of a value, takes precedence over `is_type_of`.
    #[must_use]
    pub fn resolve_type(
        mut self,
        resolve_type: impl Fn(&FieldValue) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(resolve_type));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }
}

pub struct Union {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) members: Vec<TypeRef>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

impl Union {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            members: Vec::new(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn possible_type(mut self, member: impl Into<TypeRef>) -> Self {
        self.members.push(member.into());
        self
    }

    #[must_use]
    pub fn resolve_type(
        mut self,
        resolve_type: impl Fn(&FieldValue) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(Arc::new(resolve_type));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }
}

pub struct EnumItem {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) deprecation: Deprecation,
}

impl EnumItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            deprecation: Deprecation::NoDeprecated,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn deprecation(mut self, reason: Option<&str>) -> Self {
        self.deprecation = Deprecation::Deprecated {
            reason: reason.map(Into::into),
        };
        self
    }
}

impl<T: Into<String>> From<T> for EnumItem {
    fn from(name: T) -> Self {
        EnumItem::new(name)
    }
}

pub struct Enum {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) items: Vec<EnumItem>,
}

impl Enum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn item(mut self, item: impl Into<EnumItem>) -> Self {
        self.items.push(item.into());
        self
    }

    #[must_use]
    pub fn items(mut self, items: impl IntoIterator<Item = impl Into<EnumItem>>) -> Self {
        self.items.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }
}

/// A custom scalar. Without conversion functions, any value is accepted as input and returned
/// as is in the response.
pub struct Scalar {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) specified_by_url: Option<String>,
    pub(crate) parse_value: Option<ScalarParseFn>,
    pub(crate) serialize: Option<ScalarSerializeFn>,
}

impl Scalar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            specified_by_url: None,
            parse_value: None,
            serialize: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn specified_by_url(mut self, url: impl Into<String>) -> Self {
        self.specified_by_url = Some(url.into());
        self
    }

    /// Validates and converts an input value, from a literal or a variable.
    #[must_use]
    pub fn parse_value(mut self, parse: impl Fn(&ConstValue) -> Result<ConstValue> + Send + Sync + 'static) -> Self {
        self.parse_value = Some(Arc::new(parse));
        self
    }

    /// Converts a resolved value into its response representation.
    #[must_use]
    pub fn serialize(mut self, serialize: impl Fn(ConstValue) -> Result<ConstValue> + Send + Sync + 'static) -> Self {
        self.serialize = Some(Arc::new(serialize));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }
}

pub struct InputObject {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) fields: Vec<InputValue>,
}

impl InputObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: InputValue) -> Self {
        self.fields.push(field);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.name
    }
}
