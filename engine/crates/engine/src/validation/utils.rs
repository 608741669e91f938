use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    types::{Directive, FragmentDefinition, Selection, SelectionSet},
    Pos, Positioned,
};
use grove_value::{Name, Value};

pub fn referenced_variables(value: &Value) -> Vec<&str> {
    let mut vars = Vec::new();
    referenced_variables_to_vec(value, &mut vars);
    vars
}

fn referenced_variables_to_vec<'a>(value: &'a Value, vars: &mut Vec<&'a str>) {
    match value {
        Value::Variable(name) => {
            vars.push(name);
        }
        Value::List(values) => values.iter().for_each(|value| referenced_variables_to_vec(value, vars)),
        Value::Object(obj) => obj.values().for_each(|value| referenced_variables_to_vec(value, vars)),
        _ => {}
    }
}

/// Variables used in a selection set, fragments spread in it included, with the position of the
/// value using them.
pub fn selection_set_variables<'a>(
    selection_set: &'a SelectionSet,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    visited_fragments: &mut HashSet<&'a str>,
    variables: &mut Vec<(&'a str, Pos)>,
) {
    fn directive_variables<'a>(directives: &'a [Positioned<Directive>], variables: &mut Vec<(&'a str, Pos)>) {
        for directive in directives {
            for (_, value) in &directive.node.arguments {
                variables.extend(referenced_variables(&value.node).into_iter().map(|name| (name, value.pos)));
            }
        }
    }

    for selection in &selection_set.items {
        directive_variables(selection.node.directives(), variables);
        match &selection.node {
            Selection::Field(field) => {
                for (_, value) in &field.node.arguments {
                    variables.extend(referenced_variables(&value.node).into_iter().map(|name| (name, value.pos)));
                }
                selection_set_variables(&field.node.selection_set.node, fragments, visited_fragments, variables);
            }
            Selection::InlineFragment(fragment) => {
                selection_set_variables(&fragment.node.selection_set.node, fragments, visited_fragments, variables);
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                if !visited_fragments.insert(name) {
                    continue;
                }
                if let Some(fragment) = fragments.get(name) {
                    directive_variables(&fragment.node.directives, variables);
                    selection_set_variables(&fragment.node.selection_set.node, fragments, visited_fragments, variables);
                }
            }
        }
    }
}

/// Nesting of fields, `{ a { b } }` has a depth of 2. Fragments don't add any level.
pub fn selection_set_depth<'a>(
    selection_set: &'a SelectionSet,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    spreading: &mut Vec<&'a str>,
) -> usize {
    let mut depth = 0;
    for selection in &selection_set.items {
        let selection_depth = match &selection.node {
            Selection::Field(field) => {
                let selection_set = &field.node.selection_set.node;
                1 + selection_set_depth(selection_set, fragments, spreading)
            }
            Selection::InlineFragment(fragment) => {
                selection_set_depth(&fragment.node.selection_set.node, fragments, spreading)
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                match fragments.get(name) {
                    Some(fragment) if !spreading.contains(&name) => {
                        spreading.push(name);
                        let depth = selection_set_depth(&fragment.node.selection_set.node, fragments, spreading);
                        spreading.pop();
                        depth
                    }
                    _ => 0,
                }
            }
        };
        depth = depth.max(selection_depth);
    }
    depth
}

/// Names of the fragments spread directly in a selection set, nested fields included.
pub fn spread_fragments<'a>(selection_set: &'a SelectionSet, spreads: &mut Vec<&'a Positioned<Name>>) {
    for selection in &selection_set.items {
        match &selection.node {
            Selection::Field(field) => spread_fragments(&field.node.selection_set.node, spreads),
            Selection::InlineFragment(fragment) => spread_fragments(&fragment.node.selection_set.node, spreads),
            Selection::FragmentSpread(spread) => spreads.push(&spread.node.fragment_name),
        }
    }
}
