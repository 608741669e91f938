//! Coercion of variables and field arguments to the types declared in the schema.
//!
//! Everything is coerced up front, before the first resolver runs: a single invalid input fails
//! the whole operation.

mod error;

use std::{
    collections::{HashMap, HashSet},
    convert::Infallible,
    fmt::Write,
};

use async_graphql_parser::{
    types::{BaseType, FragmentDefinition, OperationDefinition, Selection, SelectionSet},
    Pos, Positioned,
};
use graphql_wrapping_types::{ListWrapping, Wrapping};
use grove_value::{ConstValue, Name, Number, Value, Variables};
use indexmap::IndexMap;

pub use error::{InputValueError, InputValueErrorKind};

use crate::{
    graph::{BuiltinScalar, Definition, EnumId, FieldId, InputObjectId, ScalarId, SchemaGraph, Type},
    ErrorCode, ServerError,
};

/// Coerced arguments of every field of an operation, keyed by the field position in the
/// document and then by the declared argument name.
pub(crate) type CoercedArguments = HashMap<(usize, usize), IndexMap<String, ConstValue>>;

pub(crate) fn field_key(pos: Pos) -> (usize, usize) {
    (pos.line, pos.column)
}

/// Coerced variable values alongside their declared types.
#[derive(Debug, Default)]
pub(crate) struct CoercedVariables {
    pub values: Variables,
    pub types: HashMap<String, Type>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoercionMode {
    /// Literals of the document, which may reference variables.
    Literal,
    /// Values from the request variables or from the schema defaults: enum values may be strings.
    External,
}

enum ValuePathSegment {
    Field(String),
    Index(usize),
}

pub(crate) struct InputValueCoercer<'a> {
    graph: &'a SchemaGraph,
    variables: Option<&'a CoercedVariables>,
    mode: CoercionMode,
    location: Pos,
    value_path: Vec<ValuePathSegment>,
}

impl<'a> InputValueCoercer<'a> {
    pub fn new(graph: &'a SchemaGraph, mode: CoercionMode, location: Pos) -> Self {
        Self {
            graph,
            variables: None,
            mode,
            location,
            value_path: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: &'a CoercedVariables) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn coerce(&mut self, ty: Type, value: Value) -> Result<ConstValue, InputValueError> {
        self.coerce_input_value(ty, value)
    }

    /// A variable reference without any value, not even a default, behaves as if the argument
    /// or input field had not been provided at all.
    pub fn is_absent_variable(&self, value: &Value) -> bool {
        match value {
            Value::Variable(name) => self
                .variables
                .map_or(true, |variables| !variables.values.contains_key(name)),
            _ => false,
        }
    }

    fn coerce_input_value(&mut self, ty: Type, value: Value) -> Result<ConstValue, InputValueError> {
        if let Value::Variable(name) = value {
            return self.coerce_variable(ty, name);
        }

        if ty.wrapping.is_list() && !matches!(value, Value::List(_) | Value::Null) {
            let mut value = self.coerce_named_type(ty.without_list(), value)?;
            for _ in 0..ty.wrapping.list_depth() {
                value = ConstValue::List(vec![value]);
            }
            return Ok(value);
        }

        self.coerce_list(ty, value)
    }

    fn coerce_list(&mut self, mut ty: Type, value: Value) -> Result<ConstValue, InputValueError> {
        let Some(list_wrapping) = ty.wrapping.pop_list_wrapping() else {
            return self.coerce_named_type(ty, value);
        };

        match (value, list_wrapping) {
            (Value::Null, ListWrapping::RequiredList) => Err(self.error(InputValueErrorKind::UnexpectedNull {
                expected: self.type_name(ty, Some(list_wrapping)),
            })),
            (Value::Null, ListWrapping::NullableList) => Ok(ConstValue::Null),
            (Value::List(items), _) => {
                let mut list = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    self.value_path.push(ValuePathSegment::Index(index));
                    let item = if self.is_absent_variable(&item) {
                        self.coerce_input_value(ty, Value::Null)?
                    } else {
                        self.coerce_input_value(ty, item)?
                    };
                    list.push(item);
                    self.value_path.pop();
                }
                Ok(ConstValue::List(list))
            }
            (value, _) => Err(self.error(InputValueErrorKind::MissingList {
                actual: value.into(),
                expected: self.type_name(ty, Some(list_wrapping)),
            })),
        }
    }

    fn coerce_named_type(&mut self, ty: Type, value: Value) -> Result<ConstValue, InputValueError> {
        if let Value::Variable(name) = value {
            return self.coerce_variable(ty, name);
        }

        if matches!(value, Value::Null) {
            if ty.wrapping.is_required() {
                return Err(self.error(InputValueErrorKind::UnexpectedNull {
                    expected: self.type_name(ty, None),
                }));
            }
            return Ok(ConstValue::Null);
        }

        match ty.definition {
            Definition::Scalar(id) => self.coerce_scalar(id, value),
            Definition::Enum(id) => self.coerce_enum(id, value),
            Definition::InputObject(id) => self.coerce_input_object(id, value),
            _ => unreachable!("Cannot be an output type."),
        }
    }

    fn coerce_variable(&mut self, ty: Type, name: Name) -> Result<ConstValue, InputValueError> {
        let Some((variable_ty, variables)) = self
            .variables
            .and_then(|variables| Some((*variables.types.get(name.as_str())?, variables)))
        else {
            return Err(self.error(InputValueErrorKind::UnknownVariable {
                name: name.to_string(),
            }));
        };

        if variable_ty.definition != ty.definition || variable_ty.wrapping.list_depth() > ty.wrapping.list_depth() {
            return Err(self.error(InputValueErrorKind::IncorrectVariableType {
                name: name.to_string(),
                variable_ty: self.graph.type_display(variable_ty),
                actual_ty: self.graph.type_display(ty),
            }));
        }

        let mut value = variables.values.get(&name).cloned().unwrap_or_default();
        if matches!(value, ConstValue::Null) {
            if ty.wrapping.is_required() {
                return Err(self.error(InputValueErrorKind::UnexpectedNull {
                    expected: self.type_name(ty, None),
                }));
            }
            return Ok(value);
        }

        for _ in variable_ty.wrapping.list_depth()..ty.wrapping.list_depth() {
            value = ConstValue::List(vec![value]);
        }
        Ok(value)
    }

    fn coerce_input_object(&mut self, id: InputObjectId, value: Value) -> Result<ConstValue, InputValueError> {
        let graph = self.graph;
        let input_object = &graph[id];
        let Value::Object(mut fields) = value else {
            return Err(self.error(InputValueErrorKind::MissingObject {
                name: input_object.name.clone(),
                actual: value.into(),
            }));
        };

        let mut coerced = IndexMap::with_capacity(input_object.input_fields.len());
        for input_field_id in input_object.input_fields {
            let input_field = &graph[input_field_id];
            let value = fields
                .shift_remove(input_field.name.as_str())
                .filter(|value| !self.is_absent_variable(value));

            self.value_path.push(ValuePathSegment::Field(input_field.name.clone()));
            match value {
                Some(value) => {
                    let value = self.coerce_input_value(input_field.ty, value)?;
                    coerced.insert(Name::new(&input_field.declared_name), value);
                }
                None => {
                    if let Some(default_value) = &input_field.default_value {
                        coerced.insert(Name::new(&input_field.declared_name), default_value.clone());
                    } else if input_field.ty.wrapping.is_required() {
                        return Err(self.error(InputValueErrorKind::UnexpectedNull {
                            expected: self.type_name(input_field.ty, None),
                        }));
                    }
                }
            }
            self.value_path.pop();
        }

        if let Some((name, _)) = fields.into_iter().next() {
            return Err(self.error(InputValueErrorKind::UnknownInputField {
                input_object: input_object.name.clone(),
                name: name.to_string(),
            }));
        }

        Ok(ConstValue::Object(coerced))
    }

    fn coerce_enum(&mut self, id: EnumId, value: Value) -> Result<ConstValue, InputValueError> {
        let name = match value {
            Value::Enum(name) => name,
            Value::String(value) if self.mode == CoercionMode::External => Name::new(value),
            value => {
                return Err(self.error(InputValueErrorKind::IncorrectEnumValueType {
                    r#enum: self.graph[id].name.clone(),
                    actual: value.into(),
                }))
            }
        };

        if self.graph.enum_value_by_name(id, &name).is_none() {
            return Err(self.error(InputValueErrorKind::UnknownEnumValue {
                r#enum: self.graph[id].name.clone(),
                value: name.to_string(),
            }));
        }

        Ok(ConstValue::Enum(name))
    }

    fn coerce_scalar(&mut self, id: ScalarId, value: Value) -> Result<ConstValue, InputValueError> {
        let scalar = &self.graph[id];
        let Some(builtin) = scalar.builtin else {
            let value = self.into_const(value);
            return match &scalar.parse_value {
                Some(parse_value) => parse_value(&value).map_err(|err| {
                    self.error(InputValueErrorKind::InvalidCustomScalar {
                        scalar: scalar.name.clone(),
                        message: err.message,
                    })
                }),
                None => Ok(value),
            };
        };

        match (builtin, &value) {
            (BuiltinScalar::Int, Value::Number(number)) if !number.is_f64() => {
                match number.as_i64().and_then(|n| i32::try_from(n).ok()) {
                    Some(n) => Ok(ConstValue::from(n)),
                    None => Err(self.error(InputValueErrorKind::IncorrectScalarValue {
                        actual: number.to_string(),
                        expected: scalar.name.clone(),
                    })),
                }
            }
            (BuiltinScalar::Float, Value::Number(number)) => number
                .as_f64()
                .and_then(Number::from_f64)
                .map(ConstValue::Number)
                .ok_or_else(|| self.error(InputValueErrorKind::IncorrectScalarValue {
                    actual: number.to_string(),
                    expected: scalar.name.clone(),
                })),
            (BuiltinScalar::String | BuiltinScalar::ID, Value::String(s)) => Ok(ConstValue::String(s.clone())),
            (BuiltinScalar::ID, Value::Number(number)) if !number.is_f64() => Ok(ConstValue::String(number.to_string())),
            (BuiltinScalar::Boolean, Value::Boolean(b)) => Ok(ConstValue::Boolean(*b)),
            _ => Err(self.error(InputValueErrorKind::IncorrectScalarType {
                actual: value.into(),
                expected: scalar.name.clone(),
            })),
        }
    }

    fn into_const(&self, value: Value) -> ConstValue {
        value
            .into_const_with(|name| {
                Ok::<_, Infallible>(
                    self.variables
                        .and_then(|variables| variables.values.get(&name).cloned())
                        .unwrap_or_default(),
                )
            })
            .unwrap_or_else(|never| match never {})
    }

    fn error(&self, kind: InputValueErrorKind) -> InputValueError {
        InputValueError {
            kind,
            path: self.path(),
            location: self.location,
        }
    }

    fn type_name(&self, ty: Type, list_wrapping: Option<ListWrapping>) -> String {
        let wrapping = list_wrapping
            .and_then(|list_wrapping| ty.wrapping.wrapped_by(list_wrapping))
            .unwrap_or(ty.wrapping);
        self.graph.type_display(Type {
            definition: ty.definition,
            wrapping,
        })
    }

    fn path(&self) -> String {
        if self.value_path.is_empty() {
            return String::new();
        }
        let mut path = String::from(" at path '");
        for segment in &self.value_path {
            match segment {
                ValuePathSegment::Field(name) => write!(path, ".{name}"),
                ValuePathSegment::Index(index) => write!(path, ".{index}"),
            }
            .ok();
        }
        path.push('\'');
        path
    }
}

/// Lists wrapping the named type of a document type.
pub(crate) fn ast_list_depth(mut ty: &async_graphql_parser::types::Type) -> usize {
    let mut depth = 0;
    while let BaseType::List(inner) = &ty.base {
        depth += 1;
        ty = inner;
    }
    depth
}

/// Converts a type of the document, e.g. the type of a variable definition. `None` for unknown
/// types and for types nesting too many lists.
pub(crate) fn type_from_ast(graph: &SchemaGraph, ty: &async_graphql_parser::types::Type) -> Option<Type> {
    let mut list_wrappings = Vec::new();
    let mut current = ty;
    let name = loop {
        match &current.base {
            BaseType::Named(name) => break name,
            BaseType::List(inner) => {
                list_wrappings.push(if current.nullable {
                    ListWrapping::NullableList
                } else {
                    ListWrapping::RequiredList
                });
                current = inner;
            }
        }
    };

    let wrapping = list_wrappings
        .into_iter()
        .rev()
        .try_fold(Wrapping::new(!current.nullable), Wrapping::wrapped_by)?;

    Some(Type {
        definition: graph.definition_by_name(name)?,
        wrapping,
    })
}

pub(crate) fn coerce_variables(
    graph: &SchemaGraph,
    operation: &OperationDefinition,
    variables: &Variables,
) -> Result<CoercedVariables, Vec<ServerError>> {
    let mut coerced = CoercedVariables::default();
    let mut errors = Vec::new();

    for definition in &operation.variable_definitions {
        let name = &definition.node.name.node;
        let Some(ty) = type_from_ast(graph, &definition.node.var_type.node) else {
            continue;
        };
        coerced.types.insert(name.to_string(), ty);

        let (value, mode) = match (variables.get(name), &definition.node.default_value) {
            (Some(value), _) => (value.clone().into_value(), CoercionMode::External),
            (None, Some(default_value)) => (default_value.node.clone().into_value(), CoercionMode::Literal),
            (None, None) => {
                if ty.wrapping.is_required() {
                    errors.push(
                        ServerError::new(
                            format!(
                                r#"Variable "${name}" of required type "{}" was not provided."#,
                                graph.type_display(ty)
                            ),
                            Some(definition.pos),
                        )
                        .with_code(ErrorCode::BadUserInput),
                    );
                }
                continue;
            }
        };

        match InputValueCoercer::new(graph, mode, definition.pos).coerce(ty, value) {
            Ok(value) => {
                coerced.values.insert(name.clone(), value);
            }
            Err(err) => errors.push(
                ServerError::new(
                    format!(r#"Variable "${name}" got an invalid value: {err}"#),
                    Some(err.location),
                )
                .with_code(ErrorCode::BadUserInput),
            ),
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// Coerces the arguments of every field reachable from the operation, fragments included.
pub(crate) fn coerce_arguments(
    graph: &SchemaGraph,
    root: Definition,
    operation: &OperationDefinition,
    fragments: &HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &CoercedVariables,
) -> Result<CoercedArguments, Vec<ServerError>> {
    let mut coercion = ArgumentsCoercion {
        graph,
        fragments,
        variables,
        arguments: CoercedArguments::new(),
        errors: Vec::new(),
        visited_fragments: HashSet::new(),
    };
    coercion.visit_selection_set(root, &operation.selection_set.node);

    if coercion.errors.is_empty() {
        Ok(coercion.arguments)
    } else {
        Err(coercion.errors)
    }
}

struct ArgumentsCoercion<'a> {
    graph: &'a SchemaGraph,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    variables: &'a CoercedVariables,
    arguments: CoercedArguments,
    errors: Vec<ServerError>,
    visited_fragments: HashSet<&'a str>,
}

impl<'a> ArgumentsCoercion<'a> {
    fn visit_selection_set(&mut self, parent: Definition, selection_set: &'a SelectionSet) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    let Some(field_id) = self.graph.field_by_name(parent, &field.node.name.node) else {
                        continue;
                    };
                    self.coerce_field_arguments(field_id, field);
                    let child = self.graph[field_id].ty.definition;
                    self.visit_selection_set(child, &field.node.selection_set.node);
                }
                Selection::InlineFragment(fragment) => {
                    let parent = fragment
                        .node
                        .type_condition
                        .as_ref()
                        .and_then(|condition| self.graph.definition_by_name(&condition.node.on.node))
                        .unwrap_or(parent);
                    self.visit_selection_set(parent, &fragment.node.selection_set.node);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    if !self.visited_fragments.insert(name) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(name) else {
                        continue;
                    };
                    let parent = self
                        .graph
                        .definition_by_name(&fragment.node.type_condition.node.on.node)
                        .unwrap_or(parent);
                    self.visit_selection_set(parent, &fragment.node.selection_set.node);
                }
            }
        }
    }

    fn coerce_field_arguments(&mut self, field_id: FieldId, field: &'a Positioned<async_graphql_parser::types::Field>) {
        let graph = self.graph;
        let definition = &graph[field_id];
        let mut values = IndexMap::new();

        for argument_id in definition.arguments {
            let argument = &graph[argument_id];
            let mut coercer = InputValueCoercer::new(self.graph, CoercionMode::Literal, field.pos)
                .with_variables(self.variables);

            let provided = field
                .node
                .arguments
                .iter()
                .find(|(name, _)| name.node.as_str() == argument.name)
                .map(|(_, value)| value)
                .filter(|value| !coercer.is_absent_variable(&value.node));

            match provided {
                Some(value) => {
                    coercer.location = value.pos;
                    match coercer.coerce(argument.ty, value.node.clone()) {
                        Ok(value) => {
                            values.insert(argument.declared_name.clone(), value);
                        }
                        Err(err) => self.errors.push(
                            ServerError::new(
                                format!(
                                    r#"Argument "{}" on field "{}" has an invalid value: {err}"#,
                                    argument.name,
                                    self.field_coordinate(field_id)
                                ),
                                Some(err.location),
                            )
                            .with_code(ErrorCode::BadUserInput),
                        ),
                    }
                }
                None => {
                    if let Some(default_value) = &argument.default_value {
                        values.insert(argument.declared_name.clone(), default_value.clone());
                    } else if argument.ty.wrapping.is_required() {
                        self.errors.push(
                            ServerError::new(
                                format!(
                                    r#"Field "{}" argument "{}" of type "{}" is required, but it was not provided."#,
                                    self.field_coordinate(field_id),
                                    argument.name,
                                    self.graph.type_display(argument.ty)
                                ),
                                Some(field.pos),
                            )
                            .with_code(ErrorCode::BadUserInput),
                        );
                    }
                }
            }
        }

        if !values.is_empty() {
            self.arguments.insert(field_key(field.pos), values);
        }
    }

    fn field_coordinate(&self, field_id: FieldId) -> String {
        let field = &self.graph[field_id];
        format!("{}.{}", self.graph.definition_name(field.parent), field.name)
    }
}
