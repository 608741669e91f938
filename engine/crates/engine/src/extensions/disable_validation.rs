use std::sync::Arc;

use super::{Extension, ExtensionContext, ExtensionFactory, NextValidation};
use crate::{validation::ValidationResult, ServerError};

/// Skips the validation of operations.
///
/// A document that doesn't match the schema then fails while being coerced or executed, and
/// depth limits no longer apply since the depth of the operation is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisableValidation;

impl ExtensionFactory for DisableValidation {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(DisableValidation)
    }
}

#[async_trait::async_trait]
impl Extension for DisableValidation {
    async fn validation(
        &self,
        _ctx: &ExtensionContext<'_>,
        _next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        ::tracing::trace!("Validation skipped");
        Ok(ValidationResult::default())
    }
}
