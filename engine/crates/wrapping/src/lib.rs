//! Compact representation of the List and NonNull modifiers wrapping a named GraphQL type.
//!
//! A `[[Int!]]!` is stored as a single `u32`: the list depth, whether the innermost named type
//! is required, and one required bit per list level.

use std::fmt;

// Lower 4 bits: number of list wrappers.
const LIST_DEPTH_MASK: u32 = 0b1111;
const INNER_REQUIRED_FLAG: u32 = 1 << 4;
// Bit `LIST_REQUIRED_SHIFT + i` is set when the i-th list (0 being the innermost) is required.
const LIST_REQUIRED_SHIFT: u32 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Wrapping(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListWrapping {
    RequiredList,
    NullableList,
}

impl ListWrapping {
    pub fn is_required(self) -> bool {
        matches!(self, ListWrapping::RequiredList)
    }
}

impl Wrapping {
    /// Lists that can be nested around a named type.
    pub const MAX_LIST_DEPTH: usize = LIST_DEPTH_MASK as usize;

    pub const fn nullable() -> Self {
        Wrapping(0)
    }

    pub const fn required() -> Self {
        Wrapping(INNER_REQUIRED_FLAG)
    }

    pub fn new(required: bool) -> Self {
        if required {
            Self::required()
        } else {
            Self::nullable()
        }
    }

    /// Wraps the current type in a nullable list.
    #[must_use]
    pub fn list(self) -> Option<Self> {
        self.wrapped_by(ListWrapping::NullableList)
    }

    /// Wraps the current type in a required list.
    #[must_use]
    pub fn list_non_null(self) -> Option<Self> {
        self.wrapped_by(ListWrapping::RequiredList)
    }

    /// `None` once [`Wrapping::MAX_LIST_DEPTH`] lists are nested.
    #[must_use]
    pub fn wrapped_by(self, list_wrapping: ListWrapping) -> Option<Self> {
        let depth = self.list_depth_u32();
        if depth >= LIST_DEPTH_MASK {
            return None;
        }
        let mut bits = (self.0 & !LIST_DEPTH_MASK) | (depth + 1);
        if list_wrapping.is_required() {
            bits |= 1 << (LIST_REQUIRED_SHIFT + depth);
        }
        Some(Wrapping(bits))
    }

    /// Marks the outermost layer as required.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self.list_depth_u32() {
            0 => Wrapping(self.0 | INNER_REQUIRED_FLAG),
            depth => Wrapping(self.0 | (1 << (LIST_REQUIRED_SHIFT + depth - 1))),
        }
    }

    /// Whether the outermost layer is required.
    pub fn is_required(self) -> bool {
        match self.list_depth_u32() {
            0 => self.inner_is_required(),
            depth => self.0 & (1 << (LIST_REQUIRED_SHIFT + depth - 1)) != 0,
        }
    }

    pub fn is_nullable(self) -> bool {
        !self.is_required()
    }

    pub fn inner_is_required(self) -> bool {
        self.0 & INNER_REQUIRED_FLAG != 0
    }

    pub fn is_list(self) -> bool {
        self.list_depth_u32() > 0
    }

    pub fn list_depth(self) -> usize {
        self.list_depth_u32() as usize
    }

    /// List wrappers from the innermost to the outermost.
    pub fn list_wrappings(self) -> impl DoubleEndedIterator<Item = ListWrapping> + ExactSizeIterator {
        (0..self.list_depth_u32()).map(move |i| {
            if self.0 & (1 << (LIST_REQUIRED_SHIFT + i)) != 0 {
                ListWrapping::RequiredList
            } else {
                ListWrapping::NullableList
            }
        })
    }

    /// Removes the outermost list wrapper, leaving the type of the list items.
    pub fn pop_list_wrapping(&mut self) -> Option<ListWrapping> {
        let depth = self.list_depth_u32();
        if depth == 0 {
            return None;
        }
        let bit = 1 << (LIST_REQUIRED_SHIFT + depth - 1);
        let list_wrapping = if self.0 & bit != 0 {
            ListWrapping::RequiredList
        } else {
            ListWrapping::NullableList
        };
        self.0 = (self.0 & !bit & !LIST_DEPTH_MASK) | (depth - 1);
        Some(list_wrapping)
    }

    /// The wrapping of the innermost named type, without any list.
    #[must_use]
    pub fn without_list(self) -> Self {
        Wrapping(self.0 & INNER_REQUIRED_FLAG)
    }

    /// Whether a value of type `self` can be used where `other` is expected, ignoring the
    /// named type. Lists must match in depth and a required layer can stand in for a
    /// nullable one but not the other way around.
    pub fn is_covariant_with(self, other: Wrapping) -> bool {
        if self.list_depth_u32() != other.list_depth_u32() {
            return false;
        }
        if other.inner_is_required() && !self.inner_is_required() {
            return false;
        }
        self.list_wrappings()
            .zip(other.list_wrappings())
            .all(|(ours, theirs)| ours.is_required() || !theirs.is_required())
    }

    pub fn type_display(self, name: &str) -> TypeDisplay<'_> {
        TypeDisplay { name, wrapping: self }
    }

    fn list_depth_u32(self) -> u32 {
        self.0 & LIST_DEPTH_MASK
    }
}

impl fmt::Debug for Wrapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapping")
            .field("inner_is_required", &self.inner_is_required())
            .field("list_wrappings", &self.list_wrappings().collect::<Vec<_>>())
            .finish()
    }
}

/// Displays a named type with its wrapping, e.g. `[Int!]!`.
pub struct TypeDisplay<'a> {
    name: &'a str,
    wrapping: Wrapping,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.wrapping.list_depth() {
            f.write_str("[")?;
        }
        f.write_str(self.name)?;
        if self.wrapping.inner_is_required() {
            f.write_str("!")?;
        }
        for list_wrapping in self.wrapping.list_wrappings() {
            f.write_str("]")?;
            if list_wrapping.is_required() {
                f.write_str("!")?;
            }
        }
        Ok(())
    }
}
