//! Checks of an operation against the schema, before any variable is coerced or resolver runs.
//!
//! Every violation found is reported, all of them being request errors.

mod utils;

use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    types::{
        Directive, ExecutableDocument, Field, FragmentDefinition, OperationDefinition, OperationType, Selection,
        SelectionSet,
    },
    Pos, Positioned,
};
use graphql_wrapping_types::Wrapping;
use grove_value::Name;
use indexmap::IndexMap;

use crate::{
    coercion::{ast_list_depth, type_from_ast},
    graph::{Definition, ObjectId, SchemaGraph},
    ErrorCode, ServerError,
};

/// What validation learned about the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Deepest nesting of fields among the operations.
    pub depth: usize,
}

pub(crate) fn check_rules(
    graph: &SchemaGraph,
    document: &ExecutableDocument,
) -> Result<ValidationResult, Vec<ServerError>> {
    let mut ctx = VisitorContext {
        graph,
        fragments: &document.fragments,
        errors: Vec::new(),
    };

    ctx.check_fragment_definitions();
    ctx.check_fragment_cycles();

    let mut depth = 0;
    for (name, operation) in document.operations.iter() {
        ctx.check_operation(name.map(Name::as_str), operation);
        let operation_depth =
            utils::selection_set_depth(&operation.node.selection_set.node, &document.fragments, &mut Vec::new());
        depth = depth.max(operation_depth);
    }

    // Needs known fields and acyclic fragments.
    if ctx.errors.is_empty() {
        for (_, operation) in document.operations.iter() {
            if let Some(root) = ctx.root_type(operation.node.ty) {
                ctx.check_field_merging(Definition::Object(root), &[&operation.node.selection_set.node]);
            }
        }
    }

    if ctx.errors.is_empty() {
        Ok(ValidationResult { depth })
    } else {
        Err(ctx.errors)
    }
}

struct VisitorContext<'a> {
    graph: &'a SchemaGraph,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    errors: Vec<ServerError>,
}

impl<'a> VisitorContext<'a> {
    fn report_error(&mut self, pos: Pos, message: impl Into<String>) {
        self.errors
            .push(ServerError::new(message, Some(pos)).with_code(ErrorCode::OperationValidationError));
    }

    fn root_type(&self, operation_type: OperationType) -> Option<ObjectId> {
        let roots = self.graph.root_operation_types();
        match operation_type {
            OperationType::Query => Some(roots.query),
            OperationType::Mutation => roots.mutation,
            OperationType::Subscription => roots.subscription,
        }
    }

    fn check_operation(&mut self, name: Option<&str>, operation: &'a Positioned<OperationDefinition>) {
        let Some(root) = self.root_type(operation.node.ty) else {
            let message = match operation.node.ty {
                OperationType::Mutation => "Schema is not configured for mutations.",
                _ => "Schema is not configured for subscriptions.",
            };
            self.report_error(operation.pos, message);
            return;
        };

        self.check_directives(&operation.node.directives);
        self.check_variables(name, operation);

        if operation.node.ty == OperationType::Subscription {
            let mut response_keys = HashSet::new();
            self.collect_root_response_keys(&operation.node.selection_set.node, &mut HashSet::new(), &mut response_keys);
            if response_keys.len() > 1 {
                let message = match name {
                    Some(name) => format!(r#"Subscription "{name}" must select only one top level field."#),
                    None => "Anonymous Subscription must select only one top level field.".to_string(),
                };
                self.report_error(operation.pos, message);
            }
        }

        self.check_selection_set(Definition::Object(root), &operation.node.selection_set);
    }

    fn check_variables(&mut self, name: Option<&str>, operation: &'a Positioned<OperationDefinition>) {
        let mut declared = HashSet::new();
        for definition in &operation.node.variable_definitions {
            let variable_name = definition.node.name.node.as_str();
            if !declared.insert(variable_name) {
                self.report_error(
                    definition.pos,
                    format!(r#"There can be only one variable named "${variable_name}"."#),
                );
                continue;
            }

            let ty = &definition.node.var_type;
            if ast_list_depth(&ty.node) > Wrapping::MAX_LIST_DEPTH {
                self.report_error(
                    ty.pos,
                    format!(
                        r#"Variable "${variable_name}" nests more than {} lists."#,
                        Wrapping::MAX_LIST_DEPTH
                    ),
                );
                continue;
            }
            match type_from_ast(self.graph, &ty.node) {
                None => self.report_error(
                    ty.pos,
                    format!(r#"Variable "${variable_name}" has an unknown type "{}"."#, ty.node),
                ),
                Some(resolved) if !self.graph.is_input_type(resolved.definition) => self.report_error(
                    ty.pos,
                    format!(r#"Variable "${variable_name}" cannot be of non-input type "{}"."#, ty.node),
                ),
                Some(_) => {}
            }
        }

        let mut used = Vec::new();
        utils::selection_set_variables(
            &operation.node.selection_set.node,
            self.fragments,
            &mut HashSet::new(),
            &mut used,
        );
        let mut reported = HashSet::new();
        for (variable_name, pos) in used {
            if declared.contains(variable_name) || !reported.insert(variable_name) {
                continue;
            }
            let message = match name {
                Some(name) => format!(r#"Variable "${variable_name}" is not defined by operation "{name}"."#),
                None => format!(r#"Variable "${variable_name}" is not defined."#),
            };
            self.report_error(pos, message);
        }
    }

    fn collect_root_response_keys(
        &self,
        selection_set: &'a SelectionSet,
        visited_fragments: &mut HashSet<&'a str>,
        response_keys: &mut HashSet<&'a str>,
    ) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    response_keys.insert(field.node.response_key().node.as_str());
                }
                Selection::InlineFragment(fragment) => {
                    self.collect_root_response_keys(&fragment.node.selection_set.node, visited_fragments, response_keys);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    if let Some(fragment) = self.fragments.get(name).filter(|_| visited_fragments.insert(name)) {
                        self.collect_root_response_keys(&fragment.node.selection_set.node, visited_fragments, response_keys);
                    }
                }
            }
        }
    }

    /// Fields sharing a response key must be the same field with the same arguments, unless they
    /// apply to distinct object types. Sub-selections of merged fields are checked together.
    fn check_field_merging(&mut self, parent: Definition, selection_sets: &[&'a SelectionSet]) {
        let mut fields_by_key = IndexMap::new();
        let mut visited_fragments = HashSet::new();
        for selection_set in selection_sets {
            self.collect_fields_by_response_key(parent, selection_set, &mut visited_fragments, &mut fields_by_key);
        }

        for (response_key, fields) in fields_by_key {
            let Some((&(first_parent, first), others)) = fields.split_first() else {
                continue;
            };
            for &(other_parent, other) in others {
                let on_distinct_objects = matches!(
                    (first_parent, other_parent),
                    (Definition::Object(a), Definition::Object(b)) if a != b
                );
                if on_distinct_objects {
                    continue;
                }
                if first.node.name.node != other.node.name.node {
                    self.report_error(
                        other.pos,
                        format!(
                            r#"Fields "{response_key}" conflict because "{}" and "{}" are different fields. Use different aliases on the fields to fetch both if this was intentional."#,
                            first.node.name.node, other.node.name.node
                        ),
                    );
                } else if !same_arguments(&first.node, &other.node) {
                    self.report_error(
                        other.pos,
                        format!(
                            r#"Fields "{response_key}" conflict because they have differing arguments. Use different aliases on the fields to fetch both if this was intentional."#
                        ),
                    );
                }
            }

            let Some(field_id) = self.graph.field_by_name(first_parent, &first.node.name.node) else {
                continue;
            };
            let child = self.graph[field_id].ty.definition;
            if !self.graph.is_composite(child) {
                continue;
            }
            let child_selection_sets: Vec<_> = fields
                .iter()
                .filter(|(_, field)| field.node.name.node == first.node.name.node)
                .map(|&(_, field)| &field.node.selection_set.node)
                .collect();
            self.check_field_merging(child, &child_selection_sets);
        }
    }

    fn collect_fields_by_response_key(
        &self,
        parent: Definition,
        selection_set: &'a SelectionSet,
        visited_fragments: &mut HashSet<&'a str>,
        fields_by_key: &mut IndexMap<&'a str, Vec<(Definition, &'a Positioned<Field>)>>,
    ) {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => fields_by_key
                    .entry(field.node.response_key().node.as_str())
                    .or_default()
                    .push((parent, field)),
                Selection::InlineFragment(fragment) => {
                    let condition = fragment
                        .node
                        .type_condition
                        .as_ref()
                        .and_then(|condition| self.graph.definition_by_name(&condition.node.on.node))
                        .unwrap_or(parent);
                    self.collect_fields_by_response_key(
                        condition,
                        &fragment.node.selection_set.node,
                        visited_fragments,
                        fields_by_key,
                    );
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    let Some(fragment) = self.fragments.get(name).filter(|_| visited_fragments.insert(name)) else {
                        continue;
                    };
                    let condition = self
                        .graph
                        .definition_by_name(&fragment.node.type_condition.node.on.node)
                        .unwrap_or(parent);
                    self.collect_fields_by_response_key(
                        condition,
                        &fragment.node.selection_set.node,
                        visited_fragments,
                        fields_by_key,
                    );
                }
            }
        }
    }

    fn check_selection_set(&mut self, parent: Definition, selection_set: &'a Positioned<SelectionSet>) {
        for selection in &selection_set.node.items {
            self.check_directives(selection.node.directives());
            match &selection.node {
                Selection::Field(field) => self.check_field(parent, field),
                Selection::InlineFragment(fragment) => {
                    let condition = match &fragment.node.type_condition {
                        Some(condition) => {
                            let type_name = &condition.node.on;
                            let Some(definition) = self.graph.definition_by_name(&type_name.node) else {
                                self.report_error(type_name.pos, format!(r#"Unknown type "{}"."#, type_name.node));
                                continue;
                            };
                            if !self.graph.is_composite(definition) {
                                self.report_error(
                                    type_name.pos,
                                    format!(
                                        r#"Fragment cannot condition on non composite type "{}"."#,
                                        type_name.node
                                    ),
                                );
                                continue;
                            }
                            if !self.graph.types_overlap(parent, definition) {
                                self.report_error(
                                    fragment.pos,
                                    format!(
                                        r#"Fragment cannot be spread here as objects of type "{}" can never be of type "{}"."#,
                                        self.graph.definition_name(parent),
                                        type_name.node
                                    ),
                                );
                                continue;
                            }
                            definition
                        }
                        None => parent,
                    };
                    self.check_selection_set(condition, &fragment.node.selection_set);
                }
                Selection::FragmentSpread(spread) => {
                    let name = &spread.node.fragment_name;
                    let Some(fragment) = self.fragments.get(&name.node) else {
                        self.report_error(name.pos, format!(r#"Unknown fragment "{}"."#, name.node));
                        continue;
                    };
                    // Invalid type conditions are reported with the fragment definition.
                    let Some(condition) = self
                        .graph
                        .definition_by_name(&fragment.node.type_condition.node.on.node)
                        .filter(|definition| self.graph.is_composite(*definition))
                    else {
                        continue;
                    };
                    if !self.graph.types_overlap(parent, condition) {
                        self.report_error(
                            spread.pos,
                            format!(
                                r#"Fragment "{}" cannot be spread here as objects of type "{}" can never be of type "{}"."#,
                                name.node,
                                self.graph.definition_name(parent),
                                self.graph.definition_name(condition)
                            ),
                        );
                    }
                }
            }
        }
    }

    fn check_field(&mut self, parent: Definition, field: &'a Positioned<Field>) {
        let field_name = &field.node.name;
        if field_name.node == "__typename" {
            if !field.node.selection_set.node.items.is_empty() {
                self.report_error(
                    field.pos,
                    r#"Field "__typename" must not have a selection since type "String!" has no subfields."#,
                );
            }
            return;
        }

        let Some(field_id) = self.graph.field_by_name(parent, &field_name.node) else {
            self.report_error(
                field_name.pos,
                format!(
                    r#"Cannot query field "{}" on type "{}"."#,
                    field_name.node,
                    self.graph.definition_name(parent)
                ),
            );
            return;
        };
        let definition = &self.graph[field_id];

        let mut arguments = HashSet::new();
        for (name, _) in &field.node.arguments {
            if self.graph.input_value_by_name(definition.arguments, &name.node).is_none() {
                self.report_error(
                    name.pos,
                    format!(
                        r#"Unknown argument "{}" on field "{}.{}"."#,
                        name.node,
                        self.graph.definition_name(parent),
                        field_name.node
                    ),
                );
            } else if !arguments.insert(name.node.as_str()) {
                self.report_error(
                    name.pos,
                    format!(r#"There can be only one argument named "{}"."#, name.node),
                );
            }
        }

        let child = definition.ty.definition;
        let has_selection = !field.node.selection_set.node.items.is_empty();
        if self.graph.is_leaf(child) {
            if has_selection {
                self.report_error(
                    field.pos,
                    format!(
                        r#"Field "{}" must not have a selection since type "{}" has no subfields."#,
                        field_name.node, definition.ty_display
                    ),
                );
            }
            return;
        }

        if !has_selection {
            self.report_error(
                field.pos,
                format!(
                    r#"Field "{}" of type "{}" must have a selection of subfields. Did you mean "{} {{ ... }}"?"#,
                    field_name.node, definition.ty_display, field_name.node
                ),
            );
            return;
        }

        self.check_selection_set(child, &field.node.selection_set);
    }

    fn check_directives(&mut self, directives: &'a [Positioned<Directive>]) {
        for directive in directives {
            let name = &directive.node.name;
            if !matches!(name.node.as_str(), "skip" | "include") {
                self.report_error(name.pos, format!(r#"Unknown directive "@{}"."#, name.node));
                continue;
            }
            if directive.node.get_argument("if").is_none() {
                self.report_error(
                    directive.pos,
                    format!(
                        r#"Directive "@{}" argument "if" of type "Boolean!" is required, but it was not provided."#,
                        name.node
                    ),
                );
            }
        }
    }

    fn check_fragment_definitions(&mut self) {
        let fragments = self.fragments;
        for (name, fragment) in fragments {
            self.check_directives(&fragment.node.directives);
            let type_name = &fragment.node.type_condition.node.on;
            match self.graph.definition_by_name(&type_name.node) {
                None => self.report_error(type_name.pos, format!(r#"Unknown type "{}"."#, type_name.node)),
                Some(definition) if !self.graph.is_composite(definition) => self.report_error(
                    type_name.pos,
                    format!(
                        r#"Fragment "{name}" cannot condition on non composite type "{}"."#,
                        type_name.node
                    ),
                ),
                Some(definition) => self.check_selection_set(definition, &fragment.node.selection_set),
            }
        }
    }

    fn check_fragment_cycles(&mut self) {
        let fragments = self.fragments;
        for (name, fragment) in fragments {
            let mut visited = HashSet::new();
            let mut stack = Vec::new();
            utils::spread_fragments(&fragment.node.selection_set.node, &mut stack);

            while let Some(spread) = stack.pop() {
                if spread.node == *name {
                    self.report_error(spread.pos, format!(r#"Cannot spread fragment "{name}" within itself."#));
                    break;
                }
                if !visited.insert(spread.node.as_str()) {
                    continue;
                }
                if let Some(next) = fragments.get(&spread.node) {
                    utils::spread_fragments(&next.node.selection_set.node, &mut stack);
                }
            }
        }
    }
}

fn same_arguments(field: &Field, other: &Field) -> bool {
    field.arguments.len() == other.arguments.len()
        && field.arguments.iter().all(|(name, value)| {
            other
                .get_argument(&name.node)
                .is_some_and(|other_value| other_value.node == value.node)
        })
}
