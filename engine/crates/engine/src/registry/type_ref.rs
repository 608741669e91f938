use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, OnceLock},
};

use graphql_wrapping_types::Wrapping;

use super::TypeDescriptor;

/// A reference to a type from a field, an argument or a union, with its List and NonNull
/// modifiers.
///
/// The target is either a name, resolved once every reachable type is known, a thunk for
/// declarations that can't be constructed up front, or a descriptor directly.
#[derive(Clone)]
pub struct TypeRef {
    pub(crate) target: TypeTarget,
    pub(crate) wrapping: Wrapping,
    /// Set when more than [`Wrapping::MAX_LIST_DEPTH`] lists were requested.
    pub(crate) too_many_lists: bool,
}

#[derive(Clone)]
pub(crate) enum TypeTarget {
    Named(String),
    Lazy(LazyType),
    Descriptor(TypeDescriptor),
}

/// A deferred type declaration, evaluated at most once.
#[derive(Clone)]
pub struct LazyType(Arc<LazyTypeInner>);

struct LazyTypeInner {
    thunk: Box<dyn Fn() -> TypeDescriptor + Send + Sync>,
    resolved: OnceLock<TypeDescriptor>,
}

impl LazyType {
    pub fn new(thunk: impl Fn() -> TypeDescriptor + Send + Sync + 'static) -> Self {
        LazyType(Arc::new(LazyTypeInner {
            thunk: Box::new(thunk),
            resolved: OnceLock::new(),
        }))
    }

    pub fn resolve(&self) -> &TypeDescriptor {
        self.0.resolved.get_or_init(|| (self.0.thunk)())
    }
}

impl TypeRef {
    pub const INT: &'static str = "Int";
    pub const FLOAT: &'static str = "Float";
    pub const STRING: &'static str = "String";
    pub const BOOLEAN: &'static str = "Boolean";
    pub const ID: &'static str = "ID";

    fn new(target: TypeTarget, wrapping: Wrapping) -> Self {
        TypeRef {
            target,
            wrapping,
            too_many_lists: false,
        }
    }

    /// `T`
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(TypeTarget::Named(name.into()), Wrapping::nullable())
    }

    /// `T!`
    pub fn named_nn(name: impl Into<String>) -> Self {
        Self::new(TypeTarget::Named(name.into()), Wrapping::required())
    }

    /// `[T]`
    pub fn named_list(name: impl Into<String>) -> Self {
        Self::named(name).list()
    }

    /// `[T!]`
    pub fn named_nn_list(name: impl Into<String>) -> Self {
        Self::named_nn(name).list()
    }

    /// `[T]!`
    pub fn named_list_nn(name: impl Into<String>) -> Self {
        Self::named(name).list().non_null()
    }

    /// `[T!]!`
    pub fn named_nn_list_nn(name: impl Into<String>) -> Self {
        Self::named_nn(name).list().non_null()
    }

    /// A nullable reference to a type produced on demand while building the schema.
    ///
    /// The thunk may build a new declaration on each call: its result is the type already known
    /// under the same name and kind, if any. This is how a type refers to itself.
    pub fn lazy(thunk: impl Fn() -> TypeDescriptor + Send + Sync + 'static) -> Self {
        Self::new(TypeTarget::Lazy(LazyType::new(thunk)), Wrapping::nullable())
    }

    /// Marks the outermost layer as non-null.
    #[must_use]
    pub fn non_null(mut self) -> Self {
        self.wrapping = self.wrapping.non_null();
        self
    }

    /// Wraps the current type in a nullable list.
    #[must_use]
    pub fn list(mut self) -> Self {
        match self.wrapping.list() {
            Some(wrapping) => self.wrapping = wrapping,
            None => self.too_many_lists = true,
        }
        self
    }

    pub fn wrapping(&self) -> Wrapping {
        self.wrapping
    }

    pub fn type_name(&self) -> Cow<'_, str> {
        match &self.target {
            TypeTarget::Named(name) => Cow::Borrowed(name),
            TypeTarget::Lazy(lazy) => Cow::Owned(lazy.resolve().name().to_string()),
            TypeTarget::Descriptor(descriptor) => Cow::Borrowed(descriptor.name()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wrapping.type_display(&self.type_name()))
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.to_string()).finish()
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        TypeRef::named(name)
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        TypeRef::named(name)
    }
}

impl From<TypeDescriptor> for TypeRef {
    fn from(descriptor: TypeDescriptor) -> Self {
        TypeRef::new(TypeTarget::Descriptor(descriptor), Wrapping::nullable())
    }
}

impl From<&TypeDescriptor> for TypeRef {
    fn from(descriptor: &TypeDescriptor) -> Self {
        descriptor.clone().into()
    }
}
