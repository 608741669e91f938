//! Utilities for implementing resolution of an operation: selection sets, fields, lists and
//! abstract types.
//!
//! Every resolution returns `Err` only when the error must propagate to the parent, i.e. a
//! non-null value could not be produced. Errors of nullable positions are added to the
//! request errors and the position becomes `null`.

mod abstract_type;
mod container;
mod field;
mod list;

pub(crate) use container::{collect_fields, resolve_root_container, resolve_root_container_serial};
pub(crate) use field::{check_permissions, complete_value, PermissionOutcome};
