use std::{
    collections::BTreeMap,
    fmt,
    ops::{Deref, DerefMut},
};

use serde::{Deserialize, Serialize};

use crate::{ConstValue, Name};

/// Values of the variables of a request, keyed by name without the `$`.
///
/// A missing or `null` `variables` member deserializes to an empty map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<BTreeMap<Name, ConstValue>>")]
pub struct Variables(BTreeMap<Name, ConstValue>);

impl From<Option<BTreeMap<Name, ConstValue>>> for Variables {
    fn from(variables: Option<BTreeMap<Name, ConstValue>>) -> Self {
        Variables(variables.unwrap_or_default())
    }
}

impl Variables {
    /// Members of an object value, anything else yields no variable.
    #[must_use]
    pub fn from_value(value: ConstValue) -> Self {
        let ConstValue::Object(members) = value else {
            return Variables::default();
        };
        Variables(members.into_iter().collect())
    }

    /// Same as [`Variables::from_value`] for JSON. Keys which aren't valid names yield no variable.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match ConstValue::from_json(value) {
            Ok(value) => Variables::from_value(value),
            Err(_) => Variables::default(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ConstValue>) -> Self {
        self.0.insert(Name::new(name.into()), value.into());
        self
    }

    #[must_use]
    pub fn into_value(self) -> ConstValue {
        self.into()
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut separator = "";
        f.write_str("{")?;
        for (name, value) in &self.0 {
            write!(f, "{separator}{name}: {value}")?;
            separator = ", ";
        }
        f.write_str("}")
    }
}

impl From<Variables> for ConstValue {
    fn from(Variables(variables): Variables) -> Self {
        ConstValue::Object(variables.into_iter().collect())
    }
}

impl FromIterator<(Name, ConstValue)> for Variables {
    fn from_iter<I: IntoIterator<Item = (Name, ConstValue)>>(iter: I) -> Self {
        Variables(iter.into_iter().collect())
    }
}

impl IntoIterator for Variables {
    type Item = (Name, ConstValue);
    type IntoIter = std::collections::btree_map::IntoIter<Name, ConstValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Deref for Variables {
    type Target = BTreeMap<Name, ConstValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Variables {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
