use std::sync::Arc;

use grove_value::ConstValue;

use super::{FieldFuture, Permission, ResolverContext, TypeRef};

pub(crate) type ResolverFn = Arc<dyn for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Deprecation {
    #[default]
    NoDeprecated,
    Deprecated {
        reason: Option<String>,
    },
}

impl Deprecation {
    pub fn is_deprecated(&self) -> bool {
        matches!(self, Deprecation::Deprecated { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Deprecation::NoDeprecated => None,
            Deprecation::Deprecated { reason } => reason.as_deref(),
        }
    }
}

/// A field of an object or an interface.
///
/// Without a resolver, the value is read from the parent when it is a GraphQL object: first
/// with the declared name, then with the exposed one.
#[derive(Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) ty: TypeRef,
    pub(crate) arguments: Vec<InputValue>,
    pub(crate) deprecation: Deprecation,
    pub(crate) resolver: Option<ResolverFn>,
    pub(crate) permissions: Vec<Arc<dyn Permission>>,
    pub(crate) fail_silently: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty: ty.into(),
            arguments: Vec::new(),
            deprecation: Deprecation::NoDeprecated,
            resolver: None,
            permissions: Vec::new(),
            fail_silently: false,
        }
    }

    #[must_use]
    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: InputValue) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn deprecation(mut self, reason: Option<&str>) -> Self {
        self.deprecation = Deprecation::Deprecated {
            reason: reason.map(Into::into),
        };
        self
    }

    /// Adds a permission, checked in declaration order before the resolver runs.
    #[must_use]
    pub fn permission(mut self, permission: impl Permission) -> Self {
        self.permissions.push(Arc::new(permission));
        self
    }

    /// A denied permission resolves the field to `null`, or an empty list, instead of an error.
    #[must_use]
    pub fn fail_silently(mut self) -> Self {
        self.fail_silently = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An argument of a field or a field of an input object.
#[derive(Clone, Debug)]
pub struct InputValue {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) ty: TypeRef,
    pub(crate) default_value: Option<ConstValue>,
}

impl InputValue {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<ConstValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
