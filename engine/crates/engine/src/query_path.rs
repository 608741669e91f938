use std::fmt::{self, Display, Formatter};

use grove_value::Name;
use serde::{Deserialize, Serialize};

/// Position of a value in the response, shared between sibling fields while executing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPath(im::Vector<QueryPathSegment>);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryPathSegment {
    Index(usize),
    Name(Name),
}

/// A segment of a response path, as it appears in a response error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<usize> for QueryPathSegment {
    fn from(index: usize) -> Self {
        QueryPathSegment::Index(index)
    }
}

impl From<&str> for QueryPathSegment {
    fn from(name: &str) -> Self {
        QueryPathSegment::Name(Name::new(name))
    }
}

impl From<Name> for QueryPathSegment {
    fn from(name: Name) -> Self {
        QueryPathSegment::Name(name)
    }
}

impl QueryPath {
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(&self, segment: impl Into<QueryPathSegment>) -> QueryPath {
        let mut path = self.0.clone();
        path.push_back(segment.into());
        QueryPath(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryPathSegment> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&QueryPathSegment> {
        self.0.last()
    }

    pub fn to_vec(&self) -> Vec<PathSegment> {
        self.0
            .iter()
            .map(|segment| match segment {
                QueryPathSegment::Index(index) => PathSegment::Index(*index),
                QueryPathSegment::Name(name) => PathSegment::Field(name.to_string()),
            })
            .collect()
    }
}

impl Display for QueryPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                QueryPathSegment::Index(index) => write!(f, "{index}")?,
                QueryPathSegment::Name(name) => f.write_str(name)?,
            }
        }
        Ok(())
    }
}
