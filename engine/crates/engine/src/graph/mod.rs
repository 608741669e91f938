//! The built schema: every declaration reachable from the root types, linked by ids into
//! arenas. Cycles between types are plain ids, so nothing here ever recurses over the graph.

mod builder;
mod sdl;

use std::{collections::HashMap, sync::Arc};

use graphql_wrapping_types::Wrapping;
use grove_id_newtypes::IdRange;
use grove_value::ConstValue;

pub(crate) use builder::{GraphBuilder, RootTypes};

use crate::registry::{
    Deprecation, IsTypeOfFn, Permission, ResolveTypeFn, ResolverFn, ScalarParseFn, ScalarSerializeFn, TypeKind,
};

pub struct SchemaGraph {
    pub(crate) root_operation_types: RootOperationTypes,
    /// Every type in discovery order, built-in scalars first.
    pub(crate) definitions: Vec<Definition>,
    pub(crate) type_names: HashMap<String, Definition>,
    pub(crate) objects: Vec<ObjectDefinition>,
    pub(crate) interfaces: Vec<InterfaceDefinition>,
    pub(crate) unions: Vec<UnionDefinition>,
    pub(crate) enums: Vec<EnumDefinition>,
    pub(crate) enum_values: Vec<EnumValueDefinition>,
    pub(crate) scalars: Vec<ScalarDefinition>,
    pub(crate) input_objects: Vec<InputObjectDefinition>,
    pub(crate) fields: Vec<FieldDefinition>,
    pub(crate) input_values: Vec<InputValueDefinition>,
}

grove_id_newtypes::NonZeroU32! {
    SchemaGraph.objects[ObjectId] => ObjectDefinition,
    SchemaGraph.interfaces[InterfaceId] => InterfaceDefinition,
    SchemaGraph.unions[UnionId] => UnionDefinition,
    SchemaGraph.enums[EnumId] => EnumDefinition,
    SchemaGraph.enum_values[EnumValueId] => EnumValueDefinition,
    SchemaGraph.scalars[ScalarId] => ScalarDefinition,
    SchemaGraph.input_objects[InputObjectId] => InputObjectDefinition,
    SchemaGraph.fields[FieldId] => FieldDefinition,
    SchemaGraph.input_values[InputValueId] => InputValueDefinition,
}

#[derive(Debug, Clone, Copy)]
pub struct RootOperationTypes {
    pub query: ObjectId,
    pub mutation: Option<ObjectId>,
    pub subscription: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Definition {
    Object(ObjectId),
    Interface(InterfaceId),
    Union(UnionId),
    Enum(EnumId),
    Scalar(ScalarId),
    InputObject(InputObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    pub definition: Definition,
    pub wrapping: Wrapping,
}

impl Type {
    #[must_use]
    pub fn without_list(self) -> Type {
        Type {
            definition: self.definition,
            wrapping: self.wrapping.without_list(),
        }
    }
}

pub struct ObjectDefinition {
    pub name: String,
    pub description: Option<String>,
    pub interfaces: Vec<InterfaceId>,
    pub fields: IdRange<FieldId>,
    pub(crate) is_type_of: Option<IsTypeOfFn>,
}

pub struct InterfaceDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: IdRange<FieldId>,
    /// Objects implementing the interface, in discovery order.
    pub possible_types: Vec<ObjectId>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

pub struct UnionDefinition {
    pub name: String,
    pub description: Option<String>,
    pub possible_types: Vec<ObjectId>,
    pub(crate) resolve_type: Option<ResolveTypeFn>,
}

pub struct EnumDefinition {
    pub name: String,
    pub description: Option<String>,
    pub values: IdRange<EnumValueId>,
}

pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Deprecation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[allow(clippy::upper_case_acronyms)]
pub enum BuiltinScalar {
    Int,
    Float,
    String,
    Boolean,
    ID,
}

pub struct ScalarDefinition {
    pub name: String,
    pub description: Option<String>,
    pub specified_by_url: Option<String>,
    pub builtin: Option<BuiltinScalar>,
    pub(crate) parse_value: Option<ScalarParseFn>,
    pub(crate) serialize: Option<ScalarSerializeFn>,
}

pub struct InputObjectDefinition {
    pub name: String,
    pub description: Option<String>,
    pub input_fields: IdRange<InputValueId>,
}

pub struct FieldDefinition {
    /// Name exposed in the schema.
    pub name: String,
    /// Name the field was declared with, used by the default resolver.
    pub declared_name: String,
    pub description: Option<String>,
    pub parent: Definition,
    pub ty: Type,
    /// `ty` as it is printed, e.g. `[User!]`.
    pub ty_display: String,
    pub arguments: IdRange<InputValueId>,
    pub deprecation: Deprecation,
    pub fail_silently: bool,
    pub(crate) resolver: Option<ResolverFn>,
    pub(crate) permissions: Vec<Arc<dyn Permission>>,
}

pub struct InputValueDefinition {
    pub name: String,
    pub declared_name: String,
    pub description: Option<String>,
    pub ty: Type,
    /// Already coerced to `ty`.
    pub default_value: Option<ConstValue>,
}

impl SchemaGraph {
    pub fn root_operation_types(&self) -> RootOperationTypes {
        self.root_operation_types
    }

    pub fn definition_by_name(&self, name: &str) -> Option<Definition> {
        self.type_names.get(name).copied()
    }

    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        match self.definition_by_name(name)? {
            Definition::Object(id) => Some(id),
            _ => None,
        }
    }

    pub fn definition_name(&self, definition: Definition) -> &str {
        match definition {
            Definition::Object(id) => &self[id].name,
            Definition::Interface(id) => &self[id].name,
            Definition::Union(id) => &self[id].name,
            Definition::Enum(id) => &self[id].name,
            Definition::Scalar(id) => &self[id].name,
            Definition::InputObject(id) => &self[id].name,
        }
    }

    pub fn definition_kind(&self, definition: Definition) -> TypeKind {
        match definition {
            Definition::Object(_) => TypeKind::Object,
            Definition::Interface(_) => TypeKind::Interface,
            Definition::Union(_) => TypeKind::Union,
            Definition::Enum(_) => TypeKind::Enum,
            Definition::Scalar(_) => TypeKind::Scalar,
            Definition::InputObject(_) => TypeKind::InputObject,
        }
    }

    pub fn type_display(&self, ty: Type) -> String {
        ty.wrapping.type_display(self.definition_name(ty.definition)).to_string()
    }

    /// Fields of an object or an interface.
    pub fn fields_of(&self, definition: Definition) -> IdRange<FieldId> {
        match definition {
            Definition::Object(id) => self[id].fields,
            Definition::Interface(id) => self[id].fields,
            _ => IdRange::empty(),
        }
    }

    /// Field by its exposed name.
    pub fn field_by_name(&self, definition: Definition, name: &str) -> Option<FieldId> {
        self.fields_of(definition).iter().find(|id| self[*id].name == name)
    }

    /// Argument or input field by its exposed name.
    pub fn input_value_by_name(&self, range: IdRange<InputValueId>, name: &str) -> Option<InputValueId> {
        range.iter().find(|id| self[*id].name == name)
    }

    pub fn enum_value_by_name(&self, id: EnumId, name: &str) -> Option<EnumValueId> {
        self[id].values.iter().find(|value_id| self[*value_id].name == name)
    }

    pub fn is_input_type(&self, definition: Definition) -> bool {
        matches!(
            definition,
            Definition::Scalar(_) | Definition::Enum(_) | Definition::InputObject(_)
        )
    }

    pub fn is_output_type(&self, definition: Definition) -> bool {
        !matches!(definition, Definition::InputObject(_))
    }

    pub fn is_composite(&self, definition: Definition) -> bool {
        matches!(
            definition,
            Definition::Object(_) | Definition::Interface(_) | Definition::Union(_)
        )
    }

    pub fn is_leaf(&self, definition: Definition) -> bool {
        matches!(definition, Definition::Scalar(_) | Definition::Enum(_))
    }

    /// Concrete object types a value of this type may have at runtime.
    pub fn possible_types(&self, definition: Definition) -> &[ObjectId] {
        match definition {
            Definition::Interface(id) => &self[id].possible_types,
            Definition::Union(id) => &self[id].possible_types,
            _ => &[],
        }
    }

    /// Whether an object of type `object` is also of type `definition`.
    pub fn is_possible_type(&self, definition: Definition, object: ObjectId) -> bool {
        match definition {
            Definition::Object(id) => id == object,
            Definition::Interface(_) | Definition::Union(_) => self.possible_types(definition).contains(&object),
            _ => false,
        }
    }

    /// Whether some object could be of both types, used for fragment spreads.
    pub fn types_overlap(&self, a: Definition, b: Definition) -> bool {
        match (a, b) {
            (Definition::Object(a), Definition::Object(b)) => a == b,
            (Definition::Object(object), other) | (other, Definition::Object(object)) => {
                self.is_possible_type(other, object)
            }
            (a, b) => self
                .possible_types(a)
                .iter()
                .any(|object| self.possible_types(b).contains(object)),
        }
    }

    pub fn builtin_scalar(&self, scalar: BuiltinScalar) -> ScalarId {
        // Registered first, in declaration order.
        ScalarId::from(scalar as usize)
    }
}
