mod range;

pub use range::IdRange;

#[macro_export]
macro_rules! debug_display {
    ($name:ident) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = stringify!($name);
                write!(f, "{}#{}", name.strip_suffix("Id").unwrap_or(name), usize::from(*self))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(self, f)
            }
        }
    };
}

/// Implements `Index<Id>` and `Index<IdRange<Id>>` for a container field.
#[macro_export]
macro_rules! index {
    ($($ty:ident$(.$field:ident)+[$name:ident] => $output:ty,)*) => {
        $(
            impl std::ops::Index<$name> for $ty {
                type Output = $output;

                fn index(&self, index: $name) -> &Self::Output {
                    &self$(.$field)+[usize::from(index)]
                }
            }

            impl std::ops::IndexMut<$name> for $ty {
                fn index_mut(&mut self, index: $name) -> &mut Self::Output {
                    &mut self$(.$field)+[usize::from(index)]
                }
            }

            impl std::ops::Index<$crate::IdRange<$name>> for $ty {
                type Output = [$output];

                fn index(&self, range: $crate::IdRange<$name>) -> &Self::Output {
                    let $crate::IdRange { start, end } = range;
                    &self$(.$field)+[usize::from(start)..usize::from(end)]
                }
            }
        )*
    };
}

/// Declares `NonZeroU32` backed ids, so that `Option<Id>` stays 4 bytes, and indexes the
/// container with them.
#[macro_export]
macro_rules! NonZeroU32 {
    ($($ty:ident$(.$field:ident)+[$name:ident] => $output:ty,)*) => {
        $(
            $crate::NonZeroU32! { $name, }
            $crate::index! { $ty$(.$field)+[$name] => $output, }
        )*
    };
    ($($name:ident,)*) => {
        $(
            #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, serde::Serialize, serde::Deserialize)]
            pub struct $name(std::num::NonZeroU32);

            impl From<usize> for $name {
                fn from(value: usize) -> Self {
                    Self(
                        u32::try_from(value)
                            .ok()
                            .and_then(|value| std::num::NonZeroU32::new(value + 1))
                            .expect(concat!("Too many ", stringify!($name)))
                    )
                }
            }

            impl From<$name> for usize {
                fn from(id: $name) -> Self {
                    (id.0.get() - 1) as usize
                }
            }

            $crate::debug_display! { $name }
        )*
    };
}
