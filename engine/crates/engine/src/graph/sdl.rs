use std::fmt::Write;

use grove_id_newtypes::IdRange;
use grove_value::ConstValue;
use itertools::Itertools;

use super::{Definition, FieldId, InputValueId, SchemaGraph};
use crate::registry::Deprecation;

impl SchemaGraph {
    /// Prints the schema in SDL, types in discovery order. Built-in scalars are omitted.
    pub fn sdl(&self) -> String {
        let mut sdl = String::new();
        self.export_schema_definition(&mut sdl);

        for definition in &self.definitions {
            match *definition {
                Definition::Scalar(id) => {
                    let scalar = &self[id];
                    if scalar.builtin.is_some() {
                        continue;
                    }
                    export_description(&mut sdl, scalar.description.as_deref(), 0);
                    write!(sdl, "scalar {}", scalar.name).ok();
                    if let Some(url) = &scalar.specified_by_url {
                        write!(sdl, " @specifiedBy(url: {})", quoted(url)).ok();
                    }
                    writeln!(sdl).ok();
                }
                Definition::Object(id) => {
                    let object = &self[id];
                    export_description(&mut sdl, object.description.as_deref(), 0);
                    write!(sdl, "type {}", object.name).ok();
                    if !object.interfaces.is_empty() {
                        let interfaces = object.interfaces.iter().map(|id| &self[*id].name).join(" & ");
                        write!(sdl, " implements {interfaces}").ok();
                    }
                    writeln!(sdl, " {{").ok();
                    self.export_fields(&mut sdl, object.fields);
                    writeln!(sdl, "}}").ok();
                }
                Definition::Interface(id) => {
                    let interface = &self[id];
                    export_description(&mut sdl, interface.description.as_deref(), 0);
                    writeln!(sdl, "interface {} {{", interface.name).ok();
                    self.export_fields(&mut sdl, interface.fields);
                    writeln!(sdl, "}}").ok();
                }
                Definition::Union(id) => {
                    let union = &self[id];
                    export_description(&mut sdl, union.description.as_deref(), 0);
                    let members = union
                        .possible_types
                        .iter()
                        .map(|id| self[*id].name.as_str())
                        .collect::<Vec<_>>();
                    writeln!(sdl, "union {} = {}", union.name, members.join(" | ")).ok();
                }
                Definition::Enum(id) => {
                    let r#enum = &self[id];
                    export_description(&mut sdl, r#enum.description.as_deref(), 0);
                    writeln!(sdl, "enum {} {{", r#enum.name).ok();
                    for value_id in r#enum.values {
                        let value = &self[value_id];
                        export_description(&mut sdl, value.description.as_deref(), 1);
                        write!(sdl, "\t{}", value.name).ok();
                        export_deprecation(&mut sdl, &value.deprecation);
                        writeln!(sdl).ok();
                    }
                    writeln!(sdl, "}}").ok();
                }
                Definition::InputObject(id) => {
                    let input_object = &self[id];
                    export_description(&mut sdl, input_object.description.as_deref(), 0);
                    writeln!(sdl, "input {} {{", input_object.name).ok();
                    for input_field_id in input_object.input_fields {
                        export_description(&mut sdl, self[input_field_id].description.as_deref(), 1);
                        writeln!(sdl, "\t{}", self.input_value_display(input_field_id)).ok();
                    }
                    writeln!(sdl, "}}").ok();
                }
            }
            writeln!(sdl).ok();
        }

        sdl.truncate(sdl.trim_end().len());
        sdl.push('\n');
        sdl
    }

    fn export_schema_definition(&self, sdl: &mut String) {
        let roots = self.root_operation_types;
        let query = self[roots.query].name.as_str();
        let mutation = roots.mutation.map(|id| self[id].name.as_str());
        let subscription = roots.subscription.map(|id| self[id].name.as_str());

        let conventional = query == "Query"
            && mutation.map_or(true, |name| name == "Mutation")
            && subscription.map_or(true, |name| name == "Subscription");
        if conventional {
            return;
        }

        writeln!(sdl, "schema {{").ok();
        writeln!(sdl, "\tquery: {query}").ok();
        if let Some(mutation) = mutation {
            writeln!(sdl, "\tmutation: {mutation}").ok();
        }
        if let Some(subscription) = subscription {
            writeln!(sdl, "\tsubscription: {subscription}").ok();
        }
        writeln!(sdl, "}}\n").ok();
    }

    fn export_fields(&self, sdl: &mut String, fields: IdRange<FieldId>) {
        for field_id in fields {
            let field = &self[field_id];
            export_description(sdl, field.description.as_deref(), 1);
            write!(sdl, "\t{}", field.name).ok();
            self.export_arguments(sdl, field.arguments);
            write!(sdl, ": {}", field.ty_display).ok();
            export_deprecation(sdl, &field.deprecation);
            writeln!(sdl).ok();
        }
    }

    fn export_arguments(&self, sdl: &mut String, arguments: IdRange<InputValueId>) {
        if arguments.is_empty() {
            return;
        }

        let described = arguments.iter().any(|id| self[id].description.is_some());
        if !described {
            let arguments = arguments
                .iter()
                .map(|id| self.input_value_display(id))
                .collect::<Vec<_>>();
            write!(sdl, "({})", arguments.join(", ")).ok();
            return;
        }

        writeln!(sdl, "(").ok();
        for argument_id in arguments {
            export_description(sdl, self[argument_id].description.as_deref(), 2);
            writeln!(sdl, "\t\t{}", self.input_value_display(argument_id)).ok();
        }
        write!(sdl, "\t)").ok();
    }

    fn input_value_display(&self, id: InputValueId) -> String {
        let input_value = &self[id];
        let mut output = format!("{}: {}", input_value.name, self.type_display(input_value.ty));
        if let Some(default_value) = &input_value.default_value {
            write!(output, " = {default_value}").ok();
        }
        output
    }
}

fn export_description(sdl: &mut String, description: Option<&str>, depth: usize) {
    let Some(description) = description else {
        return;
    };
    let indent = "\t".repeat(depth);
    writeln!(sdl, "{indent}\"\"\"").ok();
    for line in description.replace("\"\"\"", "\\\"\"\"").lines() {
        if line.is_empty() {
            writeln!(sdl).ok();
        } else {
            writeln!(sdl, "{indent}{line}").ok();
        }
    }
    writeln!(sdl, "{indent}\"\"\"").ok();
}

fn export_deprecation(sdl: &mut String, deprecation: &Deprecation) {
    if let Deprecation::Deprecated { reason } = deprecation {
        write!(sdl, " @deprecated").ok();
        if let Some(reason) = reason {
            write!(sdl, "(reason: {})", quoted(reason)).ok();
        }
    }
}

fn quoted(value: &str) -> String {
    ConstValue::String(value.to_string()).to_string()
}
