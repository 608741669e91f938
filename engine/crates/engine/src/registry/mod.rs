//! Declarations of the types of a schema, turned into a [`SchemaGraph`](crate::SchemaGraph) by
//! the [`SchemaBuilder`](crate::SchemaBuilder).

mod field;
mod permission;
mod resolver;
mod type_ref;
mod types;

use std::sync::Arc;

pub use field::{Deprecation, Field, InputValue};
pub(crate) use field::ResolverFn;
pub use permission::Permission;
pub(crate) use resolver::FieldValueParts;
pub use resolver::{ArgumentValues, FieldFuture, FieldValue, MaybeAbsent, ResolverContext};
pub use type_ref::{LazyType, TypeRef};
pub(crate) use type_ref::TypeTarget;
pub use types::{Enum, EnumItem, InputObject, Interface, Object, Scalar, Union};
pub(crate) use types::{IsTypeOfFn, ResolveTypeFn, ScalarParseFn, ScalarSerializeFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    InputObject,
}

/// A type declaration. Clones share the same declaration: two descriptors are the same type
/// only if one is a clone of the other.
#[derive(Clone)]
pub enum TypeDescriptor {
    Object(Arc<Object>),
    Interface(Arc<Interface>),
    Union(Arc<Union>),
    Enum(Arc<Enum>),
    Scalar(Arc<Scalar>),
    InputObject(Arc<InputObject>),
}

impl TypeDescriptor {
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Object(object) => &object.name,
            TypeDescriptor::Interface(interface) => &interface.name,
            TypeDescriptor::Union(union) => &union.name,
            TypeDescriptor::Enum(r#enum) => &r#enum.name,
            TypeDescriptor::Scalar(scalar) => &scalar.name,
            TypeDescriptor::InputObject(input_object) => &input_object.name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDescriptor::Object(_) => TypeKind::Object,
            TypeDescriptor::Interface(_) => TypeKind::Interface,
            TypeDescriptor::Union(_) => TypeKind::Union,
            TypeDescriptor::Enum(_) => TypeKind::Enum,
            TypeDescriptor::Scalar(_) => TypeKind::Scalar,
            TypeDescriptor::InputObject(_) => TypeKind::InputObject,
        }
    }

    /// Address of the shared declaration.
    pub(crate) fn identity(&self) -> usize {
        match self {
            TypeDescriptor::Object(object) => Arc::as_ptr(object) as *const () as usize,
            TypeDescriptor::Interface(interface) => Arc::as_ptr(interface) as *const () as usize,
            TypeDescriptor::Union(union) => Arc::as_ptr(union) as *const () as usize,
            TypeDescriptor::Enum(r#enum) => Arc::as_ptr(r#enum) as *const () as usize,
            TypeDescriptor::Scalar(scalar) => Arc::as_ptr(scalar) as *const () as usize,
            TypeDescriptor::InputObject(input_object) => Arc::as_ptr(input_object) as *const () as usize,
        }
    }

    pub fn is_same_declaration(&self, other: &TypeDescriptor) -> bool {
        self.identity() == other.identity()
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind(), self.name())
    }
}

macro_rules! impl_into_descriptor {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for TypeDescriptor {
                fn from(value: $ty) -> Self {
                    TypeDescriptor::$ty(Arc::new(value))
                }
            }

            impl From<$ty> for TypeRef {
                fn from(value: $ty) -> Self {
                    TypeDescriptor::from(value).into()
                }
            }
        )*
    };
}

impl_into_descriptor!(Object, Interface, Union, Enum, Scalar, InputObject);
