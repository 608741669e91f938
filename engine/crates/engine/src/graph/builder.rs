use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use async_graphql_parser::Pos;
use grove_id_newtypes::IdRange;
use grove_value::ConstValue;

use super::{
    BuiltinScalar, Definition, EnumDefinition, EnumId, EnumValueDefinition, FieldDefinition, FieldId, InputObjectDefinition,
    InputObjectId, InputValueDefinition, InputValueId, InterfaceDefinition, InterfaceId, ObjectDefinition, ObjectId,
    RootOperationTypes, ScalarDefinition, ScalarId, SchemaGraph, Type, UnionDefinition, UnionId,
};
use crate::{
    coercion::{CoercionMode, InputValueCoercer},
    registry::{Enum, Field, InputObject, InputValue, Interface, Object, Scalar, TypeDescriptor, TypeRef, TypeTarget, Union},
    SchemaConfig, SchemaError, SchemaViolation,
};

const BUILTIN_SCALARS: [BuiltinScalar; 5] = [
    BuiltinScalar::Int,
    BuiltinScalar::Float,
    BuiltinScalar::String,
    BuiltinScalar::Boolean,
    BuiltinScalar::ID,
];

/// Entry points of the traversal.
pub(crate) struct RootTypes {
    pub query: TypeDescriptor,
    pub mutation: Option<TypeDescriptor>,
    pub subscription: Option<TypeDescriptor>,
    /// Types that are not necessarily reachable from the roots, typically the possible types of
    /// an interface.
    pub registered: Vec<TypeDescriptor>,
}

/// Builds the [`SchemaGraph`] in three passes:
/// - discovery: breadth-first walk over every reachable declaration, each gets its id.
/// - linking: every declaration is converted, type references becoming ids.
/// - validation: checks needing the whole graph, interfaces and default values.
///
/// Violations are accumulated and reported together at the end.
pub(crate) struct GraphBuilder<'a> {
    config: &'a SchemaConfig,
    graph: SchemaGraph,
    violations: Vec<SchemaViolation>,
    /// Declaration identity to its definition.
    seen: HashMap<usize, Definition>,
    objects: Vec<Arc<Object>>,
    interfaces: Vec<Arc<Interface>>,
    unions: Vec<Arc<Union>>,
    enums: Vec<Arc<Enum>>,
    scalars: Vec<Arc<Scalar>>,
    input_objects: Vec<Arc<InputObject>>,
    reported_duplicates: HashSet<String>,
    reported_unknown: HashSet<String>,
    /// Default values, coerced once the graph is complete.
    pending_defaults: Vec<PendingDefault>,
}

struct Discovered {
    descriptor: TypeDescriptor,
    from_thunk: bool,
}

impl Discovered {
    fn declared(descriptor: &TypeDescriptor) -> Self {
        Discovered {
            descriptor: descriptor.clone(),
            from_thunk: false,
        }
    }
}

struct PendingDefault {
    id: InputValueId,
    location: String,
    value: ConstValue,
    is_input_field: bool,
}

impl<'a> GraphBuilder<'a> {
    pub fn build(config: &'a SchemaConfig, roots: RootTypes) -> Result<SchemaGraph, SchemaError> {
        let mut builder = Self::initialize(config);

        builder.discover(&roots);
        builder.link(&roots);
        builder.validate_interfaces();
        builder.coerce_default_values();

        if builder.violations.is_empty() {
            tracing::debug!(
                types = builder.graph.definitions.len(),
                fields = builder.graph.fields.len(),
                "Schema graph built"
            );
            Ok(builder.graph)
        } else {
            tracing::warn!(violations = builder.violations.len(), "Invalid schema");
            Err(SchemaError {
                violations: builder.violations,
            })
        }
    }

    fn initialize(config: &'a SchemaConfig) -> Self {
        let mut graph = SchemaGraph {
            root_operation_types: RootOperationTypes {
                query: ObjectId::from(0),
                mutation: None,
                subscription: None,
            },
            definitions: Vec::new(),
            type_names: HashMap::new(),
            objects: Vec::new(),
            interfaces: Vec::new(),
            unions: Vec::new(),
            enums: Vec::new(),
            enum_values: Vec::new(),
            scalars: Vec::with_capacity(BUILTIN_SCALARS.len()),
            input_objects: Vec::new(),
            fields: Vec::new(),
            input_values: Vec::new(),
        };

        for builtin in BUILTIN_SCALARS {
            let definition = Definition::Scalar(ScalarId::from(graph.scalars.len()));
            graph.scalars.push(ScalarDefinition {
                name: builtin.to_string(),
                description: None,
                specified_by_url: None,
                builtin: Some(builtin),
                parse_value: None,
                serialize: None,
            });
            graph.definitions.push(definition);
            graph.type_names.insert(builtin.to_string(), definition);
        }

        Self {
            config,
            graph,
            violations: Vec::new(),
            seen: HashMap::new(),
            objects: Vec::new(),
            interfaces: Vec::new(),
            unions: Vec::new(),
            enums: Vec::new(),
            scalars: Vec::new(),
            input_objects: Vec::new(),
            reported_duplicates: HashSet::new(),
            reported_unknown: HashSet::new(),
            pending_defaults: Vec::new(),
        }
    }

    fn discover(&mut self, roots: &RootTypes) {
        let mut queue = VecDeque::new();
        queue.push_back(Discovered::declared(&roots.query));
        queue.extend(roots.mutation.iter().map(Discovered::declared));
        queue.extend(roots.subscription.iter().map(Discovered::declared));
        queue.extend(roots.registered.iter().map(Discovered::declared));

        while let Some(Discovered { descriptor, from_thunk }) = queue.pop_front() {
            if self.seen.contains_key(&descriptor.identity()) {
                continue;
            }

            if let Some(existing) = self.graph.type_names.get(descriptor.name()).copied() {
                // Thunks build a fresh declaration on every call, a cycle through one yields
                // the type it started from.
                let is_thunk_cycle = from_thunk && self.graph.definition_kind(existing) == descriptor.kind();
                if !is_thunk_cycle && self.reported_duplicates.insert(descriptor.name().to_string()) {
                    self.violations.push(SchemaViolation::DuplicateType {
                        name: descriptor.name().to_string(),
                    });
                }
                self.seen.insert(descriptor.identity(), existing);
                continue;
            }

            let definition = self.allocate(&descriptor);
            self.seen.insert(descriptor.identity(), definition);
            self.graph.definitions.push(definition);
            self.graph.type_names.insert(descriptor.name().to_string(), definition);

            for type_ref in referenced_types(&descriptor) {
                match &type_ref.target {
                    TypeTarget::Named(_) => {}
                    TypeTarget::Lazy(lazy) => queue.push_back(Discovered {
                        descriptor: lazy.resolve().clone(),
                        from_thunk: true,
                    }),
                    TypeTarget::Descriptor(descriptor) => queue.push_back(Discovered::declared(descriptor)),
                }
            }
        }
    }

    fn allocate(&mut self, descriptor: &TypeDescriptor) -> Definition {
        match descriptor {
            TypeDescriptor::Object(object) => {
                self.objects.push(Arc::clone(object));
                Definition::Object(ObjectId::from(self.objects.len() - 1))
            }
            TypeDescriptor::Interface(interface) => {
                self.interfaces.push(Arc::clone(interface));
                Definition::Interface(InterfaceId::from(self.interfaces.len() - 1))
            }
            TypeDescriptor::Union(union) => {
                self.unions.push(Arc::clone(union));
                Definition::Union(UnionId::from(self.unions.len() - 1))
            }
            TypeDescriptor::Enum(r#enum) => {
                self.enums.push(Arc::clone(r#enum));
                Definition::Enum(EnumId::from(self.enums.len() - 1))
            }
            TypeDescriptor::Scalar(scalar) => {
                self.scalars.push(Arc::clone(scalar));
                Definition::Scalar(ScalarId::from(BUILTIN_SCALARS.len() + self.scalars.len() - 1))
            }
            TypeDescriptor::InputObject(input_object) => {
                self.input_objects.push(Arc::clone(input_object));
                Definition::InputObject(InputObjectId::from(self.input_objects.len() - 1))
            }
        }
    }

    fn link(&mut self, roots: &RootTypes) {
        self.graph.root_operation_types = RootOperationTypes {
            query: self.root_object(&roots.query).unwrap_or(ObjectId::from(0)),
            mutation: roots.mutation.as_ref().and_then(|root| self.root_object(root)),
            subscription: roots.subscription.as_ref().and_then(|root| self.root_object(root)),
        };

        for scalar in std::mem::take(&mut self.scalars) {
            self.graph.scalars.push(ScalarDefinition {
                name: scalar.name.clone(),
                description: scalar.description.clone(),
                specified_by_url: scalar.specified_by_url.clone(),
                builtin: None,
                parse_value: scalar.parse_value.clone(),
                serialize: scalar.serialize.clone(),
            });
        }

        for r#enum in std::mem::take(&mut self.enums) {
            self.insert_enum(&r#enum);
        }

        for input_object in std::mem::take(&mut self.input_objects) {
            let input_fields = self.insert_input_values(&input_object.name, None, &input_object.fields);
            if input_fields.is_empty() {
                self.violations.push(SchemaViolation::NoFields {
                    kind: "Input object",
                    name: input_object.name.clone(),
                });
            }
            self.graph.input_objects.push(InputObjectDefinition {
                name: input_object.name.clone(),
                description: input_object.description.clone(),
                input_fields,
            });
        }

        // Interfaces keep their descriptors around, objects inherit their fields.
        for (index, interface) in self.interfaces.clone().into_iter().enumerate() {
            let parent = Definition::Interface(InterfaceId::from(index));
            let fields = self.insert_fields(parent, &interface.name, interface.fields.iter());
            if fields.is_empty() {
                self.violations.push(SchemaViolation::NoFields {
                    kind: "Interface",
                    name: interface.name.clone(),
                });
            }
            self.graph.interfaces.push(InterfaceDefinition {
                name: interface.name.clone(),
                description: interface.description.clone(),
                fields,
                possible_types: Vec::new(),
                resolve_type: interface.resolve_type.clone(),
            });
        }

        for (index, object) in std::mem::take(&mut self.objects).into_iter().enumerate() {
            self.insert_object(ObjectId::from(index), &object);
        }

        for union in std::mem::take(&mut self.unions) {
            self.insert_union(&union);
        }

        for index in 0..self.graph.fields.len() {
            let ty = self.graph.fields[index].ty;
            self.graph.fields[index].ty_display = self.graph.type_display(ty);
        }
    }

    fn root_object(&mut self, root: &TypeDescriptor) -> Option<ObjectId> {
        match self.seen.get(&root.identity()).copied()? {
            Definition::Object(id) => Some(id),
            _ => {
                self.violations.push(SchemaViolation::RootNotAnObject {
                    name: root.name().to_string(),
                });
                None
            }
        }
    }

    fn insert_enum(&mut self, r#enum: &Enum) {
        if r#enum.items.is_empty() {
            self.violations.push(SchemaViolation::EmptyEnum {
                name: r#enum.name.clone(),
            });
        }

        let start = self.graph.enum_values.len();
        for item in &r#enum.items {
            self.graph.enum_values.push(EnumValueDefinition {
                name: item.name.clone(),
                description: item.description.clone(),
                deprecation: item.deprecation.clone(),
            });
        }

        self.graph.enums.push(EnumDefinition {
            name: r#enum.name.clone(),
            description: r#enum.description.clone(),
            values: IdRange::from_start_and_end(start, self.graph.enum_values.len()),
        });
    }

    fn insert_object(&mut self, id: ObjectId, object: &Object) {
        let mut interfaces = Vec::new();
        let mut inherited = Vec::new();
        let mut declared: HashSet<String> = object.fields.iter().map(|field| field.name.clone()).collect();

        for type_ref in &object.implements {
            let definition = self.resolve_type_ref(type_ref).definition;
            let Definition::Interface(interface_id) = definition else {
                self.violations.push(SchemaViolation::NotAnInterface {
                    object: object.name.clone(),
                    interface: self.graph.definition_name(definition).to_string(),
                });
                continue;
            };
            if interfaces.contains(&interface_id) {
                continue;
            }
            interfaces.push(interface_id);

            let interface = Arc::clone(&self.interfaces[usize::from(interface_id)]);
            for field in &interface.fields {
                if declared.insert(field.name.clone()) {
                    inherited.push(field.clone());
                }
            }
        }

        let parent = Definition::Object(id);
        let fields = self.insert_fields(parent, &object.name, object.fields.iter().chain(&inherited));
        if fields.is_empty() {
            self.violations.push(SchemaViolation::NoFields {
                kind: "Object",
                name: object.name.clone(),
            });
        }

        for interface_id in &interfaces {
            self.graph.interfaces[usize::from(*interface_id)].possible_types.push(id);
        }

        self.graph.objects.push(ObjectDefinition {
            name: object.name.clone(),
            description: object.description.clone(),
            interfaces,
            fields,
            is_type_of: object.is_type_of.clone(),
        });
    }

    fn insert_union(&mut self, union: &Union) {
        if union.members.is_empty() {
            self.violations.push(SchemaViolation::EmptyUnion {
                name: union.name.clone(),
            });
        }

        let mut possible_types = Vec::new();
        for member in &union.members {
            match self.resolve_type_ref(member).definition {
                Definition::Object(id) => {
                    if !possible_types.contains(&id) {
                        possible_types.push(id);
                    }
                }
                definition => self.violations.push(SchemaViolation::NonObjectUnionMember {
                    name: union.name.clone(),
                    member: self.graph.definition_name(definition).to_string(),
                }),
            }
        }

        self.graph.unions.push(UnionDefinition {
            name: union.name.clone(),
            description: union.description.clone(),
            possible_types,
            resolve_type: union.resolve_type.clone(),
        });
    }

    fn insert_fields<'f>(
        &mut self,
        parent: Definition,
        type_name: &str,
        fields: impl Iterator<Item = &'f Field>,
    ) -> IdRange<FieldId> {
        let mut definitions = Vec::new();
        let mut names = HashSet::new();

        for field in fields {
            let name = self.config.exposed_name(&field.name);
            if !names.insert(name.clone()) {
                self.violations.push(SchemaViolation::DuplicateField {
                    type_name: type_name.to_string(),
                    field: name,
                });
                continue;
            }

            let ty = self.resolve_type_ref(&field.ty);
            if !self.graph.is_output_type(ty.definition) {
                self.violations.push(SchemaViolation::InputTypeInOutput {
                    type_name: type_name.to_string(),
                    field: name.clone(),
                    ty: self.graph.type_display(ty),
                });
            }
            if field.fail_silently && ty.wrapping.is_required() && !ty.wrapping.is_list() {
                self.violations.push(SchemaViolation::FailSilentlyOnNonNull {
                    type_name: type_name.to_string(),
                    field: name.clone(),
                    ty: self.graph.type_display(ty),
                });
            }

            let arguments = self.insert_input_values(type_name, Some(&name), &field.arguments);

            definitions.push(FieldDefinition {
                name,
                declared_name: field.name.clone(),
                description: field.description.clone(),
                parent,
                ty,
                ty_display: String::new(),
                arguments,
                deprecation: field.deprecation.clone(),
                fail_silently: field.fail_silently,
                resolver: field.resolver.clone(),
                permissions: field.permissions.clone(),
            });
        }

        let start = self.graph.fields.len();
        self.graph.fields.extend(definitions);
        IdRange::from_start_and_end(start, self.graph.fields.len())
    }

    /// Arguments of `type_name.field`, or fields of the input object `type_name`.
    fn insert_input_values(
        &mut self,
        type_name: &str,
        field: Option<&str>,
        input_values: &[InputValue],
    ) -> IdRange<InputValueId> {
        let start = self.graph.input_values.len();
        let mut names = HashSet::new();

        for input_value in input_values {
            let name = self.config.exposed_name(&input_value.name);
            let location = match field {
                Some(field) => format!("{type_name}.{field}({name}:)"),
                None => format!("{type_name}.{name}"),
            };

            if !names.insert(name.clone()) {
                self.violations.push(match field {
                    Some(field) => SchemaViolation::DuplicateArgument {
                        type_name: type_name.to_string(),
                        field: field.to_string(),
                        argument: name,
                    },
                    None => SchemaViolation::DuplicateField {
                        type_name: type_name.to_string(),
                        field: name,
                    },
                });
                continue;
            }

            let ty = self.resolve_type_ref(&input_value.ty);
            if !self.graph.is_input_type(ty.definition) {
                self.violations.push(SchemaViolation::OutputTypeInInput {
                    location: location.clone(),
                    ty: self.graph.type_display(ty),
                });
            }

            let id = InputValueId::from(self.graph.input_values.len());
            if let Some(value) = &input_value.default_value {
                self.pending_defaults.push(PendingDefault {
                    id,
                    location,
                    value: value.clone(),
                    is_input_field: field.is_none(),
                });
            }

            self.graph.input_values.push(InputValueDefinition {
                name,
                declared_name: input_value.name.clone(),
                description: input_value.description.clone(),
                ty,
                default_value: None,
            });
        }

        IdRange::from_start_and_end(start, self.graph.input_values.len())
    }

    fn resolve_type_ref(&mut self, type_ref: &TypeRef) -> Type {
        if type_ref.too_many_lists {
            let violation = SchemaViolation::TooManyNestedLists {
                ty: type_ref.to_string(),
            };
            if !self.violations.contains(&violation) {
                self.violations.push(violation);
            }
        }

        let definition = match &type_ref.target {
            TypeTarget::Named(name) => self.graph.type_names.get(name).copied(),
            TypeTarget::Lazy(lazy) => self.lookup_descriptor(lazy.resolve()),
            TypeTarget::Descriptor(descriptor) => self.lookup_descriptor(descriptor),
        };

        let definition = definition.unwrap_or_else(|| {
            let name = type_ref.type_name().into_owned();
            if self.reported_unknown.insert(name.clone()) {
                self.violations.push(SchemaViolation::UnknownType { name });
            }
            Definition::Scalar(self.graph.builtin_scalar(BuiltinScalar::String))
        });

        Type {
            definition,
            wrapping: type_ref.wrapping,
        }
    }

    fn lookup_descriptor(&self, descriptor: &TypeDescriptor) -> Option<Definition> {
        self.seen
            .get(&descriptor.identity())
            .or_else(|| self.graph.type_names.get(descriptor.name()))
            .copied()
    }

    fn validate_interfaces(&mut self) {
        let mut violations = Vec::new();
        let graph = &self.graph;

        for object in &graph.objects {
            for interface_id in &object.interfaces {
                let interface = &graph[*interface_id];
                for interface_field_id in interface.fields {
                    let interface_field = &graph[interface_field_id];
                    let Some(field_id) = object.fields.iter().find(|id| graph[*id].name == interface_field.name)
                    else {
                        continue;
                    };
                    let field = &graph[field_id];

                    if !is_valid_implementation(graph, field.ty, interface_field.ty) {
                        violations.push(SchemaViolation::IncompatibleInterfaceField {
                            object: object.name.clone(),
                            interface: interface.name.clone(),
                            field: field.name.clone(),
                            expected: graph.type_display(interface_field.ty),
                            actual: graph.type_display(field.ty),
                        });
                    }

                    for interface_argument_id in interface_field.arguments {
                        let interface_argument = &graph[interface_argument_id];
                        match graph.input_value_by_name(field.arguments, &interface_argument.name) {
                            None => violations.push(SchemaViolation::MissingInterfaceArgument {
                                object: object.name.clone(),
                                interface: interface.name.clone(),
                                field: field.name.clone(),
                                argument: interface_argument.name.clone(),
                            }),
                            Some(argument_id) if graph[argument_id].ty != interface_argument.ty => {
                                violations.push(SchemaViolation::IncompatibleInterfaceArgument {
                                    object: object.name.clone(),
                                    interface: interface.name.clone(),
                                    field: field.name.clone(),
                                    argument: interface_argument.name.clone(),
                                    expected: graph.type_display(interface_argument.ty),
                                    actual: graph.type_display(graph[argument_id].ty),
                                })
                            }
                            Some(_) => {}
                        }
                    }

                    for argument_id in field.arguments {
                        let argument = &graph[argument_id];
                        let is_extra = graph
                            .input_value_by_name(interface_field.arguments, &argument.name)
                            .is_none();
                        if is_extra && argument.ty.wrapping.is_required() {
                            violations.push(SchemaViolation::RequiredArgumentNotInInterface {
                                object: object.name.clone(),
                                interface: interface.name.clone(),
                                field: field.name.clone(),
                                argument: argument.name.clone(),
                            });
                        }
                    }
                }
            }
        }

        self.violations.extend(violations);
    }

    /// Input object fields first, their defaults are used when coercing the ones of arguments.
    /// Nested input objects are discovered after their parent, hence the reverse order.
    fn coerce_default_values(&mut self) {
        let (input_fields, arguments): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_defaults)
            .into_iter()
            .partition(|default| default.is_input_field);

        for default in input_fields.into_iter().rev().chain(arguments) {
            let ty = self.graph[default.id].ty;
            let result = InputValueCoercer::new(&self.graph, CoercionMode::External, Pos { line: 0, column: 0 })
                .coerce(ty, default.value.into_value());
            match result {
                Ok(value) => self.graph[default.id].default_value = Some(value),
                Err(err) => self.violations.push(SchemaViolation::InvalidDefaultValue {
                    location: default.location,
                    message: err.to_string(),
                }),
            }
        }
    }
}

fn referenced_types(descriptor: &TypeDescriptor) -> Vec<&TypeRef> {
    fn field_types(fields: &[Field]) -> impl Iterator<Item = &TypeRef> {
        fields
            .iter()
            .flat_map(|field| std::iter::once(&field.ty).chain(field.arguments.iter().map(|argument| &argument.ty)))
    }

    match descriptor {
        TypeDescriptor::Object(object) => field_types(&object.fields).chain(&object.implements).collect(),
        TypeDescriptor::Interface(interface) => field_types(&interface.fields).collect(),
        TypeDescriptor::Union(union) => union.members.iter().collect(),
        TypeDescriptor::InputObject(input_object) => input_object.fields.iter().map(|field| &field.ty).collect(),
        TypeDescriptor::Enum(_) | TypeDescriptor::Scalar(_) => Vec::new(),
    }
}

/// An object field may return a more precise type than the interface field it implements.
fn is_valid_implementation(graph: &SchemaGraph, field: Type, interface_field: Type) -> bool {
    if !field.wrapping.is_covariant_with(interface_field.wrapping) {
        return false;
    }
    match (field.definition, interface_field.definition) {
        (a, b) if a == b => true,
        (Definition::Object(object), abstract_type @ (Definition::Interface(_) | Definition::Union(_))) => {
            graph.is_possible_type(abstract_type, object)
        }
        _ => false,
    }
}
