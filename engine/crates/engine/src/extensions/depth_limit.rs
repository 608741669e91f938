use std::sync::Arc;

use super::{Extension, ExtensionContext, ExtensionFactory, NextValidation};
use crate::{validation::ValidationResult, ErrorCode, ServerError};

/// Rejects operations whose selection sets are nested deeper than a limit.
///
/// Equivalent to [`SchemaBuilder::limit_depth`](crate::SchemaBuilder::limit_depth), but as an
/// extension it can be combined with other validation hooks and reports a validation error.
#[derive(Debug, Clone, Copy)]
pub struct QueryDepthLimiter {
    max_depth: usize,
}

impl QueryDepthLimiter {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl ExtensionFactory for QueryDepthLimiter {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(*self)
    }
}

#[async_trait::async_trait]
impl Extension for QueryDepthLimiter {
    async fn validation(
        &self,
        ctx: &ExtensionContext<'_>,
        next: NextValidation<'_>,
    ) -> Result<ValidationResult, Vec<ServerError>> {
        let result = next.run(ctx).await?;
        if result.depth > self.max_depth {
            return Err(vec![ServerError::new(
                format!("Query exceeds maximum operation depth of {}", self.max_depth),
                None,
            )
            .with_code(ErrorCode::OperationValidationError)]);
        }
        Ok(result)
    }
}
