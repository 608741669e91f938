use std::time::Duration;

/// Schema wide settings, usually loaded from the `[schema]` table of a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    /// Expose snake_case field and argument names in camelCase.
    pub auto_camel_case: bool,
    /// Maximum nesting of the selection sets of an operation.
    pub limit_depth: Option<usize>,
    /// Deadline applied to requests that don't carry their own.
    pub operation_timeout_ms: Option<u64>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            auto_camel_case: true,
            limit_depth: None,
            operation_timeout_ms: None,
        }
    }
}

impl SchemaConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    pub(crate) fn exposed_name(&self, name: &str) -> String {
        if self.auto_camel_case {
            to_camel_case(name)
        } else {
            name.to_string()
        }
    }
}

/// `snake_case` to `camelCase`. Leading underscores are kept and consecutive underscores
/// collapse into a single literal one.
pub fn to_camel_case(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    let mut output = String::with_capacity(name.len());
    output.push_str(&name[..name.len() - trimmed.len()]);

    let mut components = trimmed.split('_');
    if let Some(first) = components.next() {
        output.push_str(first);
    }
    for component in components {
        let mut chars = component.chars();
        match chars.next() {
            Some(first) => {
                output.extend(first.to_uppercase());
                output.push_str(chars.as_str());
            }
            None => output.push('_'),
        }
    }
    output
}
