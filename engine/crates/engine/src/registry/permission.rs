use crate::{ErrorExtensionValues, ResolverContext};

/// A check guarding a field, run before its resolver.
///
/// ```
/// use grove_engine::{ContextExt, Permission, ResolverContext};
///
/// struct IsAuthenticated;
///
/// #[async_trait::async_trait]
/// impl Permission for IsAuthenticated {
///     async fn has_permission(&self, ctx: &ResolverContext<'_>) -> bool {
///         ctx.data_opt::<String>().is_some()
///     }
///
///     fn message(&self) -> String {
///         "User is not authenticated".to_string()
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Permission: Send + Sync + 'static {
    async fn has_permission(&self, ctx: &ResolverContext<'_>) -> bool;

    /// Message of the error returned when the permission is denied.
    fn message(&self) -> String {
        "Permission denied".to_string()
    }

    /// Added to the `extensions` of the error, next to its `code`.
    fn error_extensions(&self) -> Option<ErrorExtensionValues> {
        None
    }
}
