use std::sync::Arc;

use super::{Extension, ExtensionContext, ExtensionFactory, NextExecute};
use crate::{Response, ServerError};

const MASKED_MESSAGE: &str = "Unexpected error.";

type MaskPredicate = Arc<dyn Fn(&ServerError) -> bool + Send + Sync>;

/// Hides the details of field errors from clients, every field error gets the message
/// `Unexpected error.` and loses its extensions. Request errors are left untouched.
///
/// ```
/// use grove_engine::{extensions::MaskErrors, ErrorCode};
///
/// // Keep permission denials visible.
/// let mask_errors = MaskErrors::new().with_predicate(|error| error.code() != Some(ErrorCode::Unauthorized));
/// ```
#[derive(Clone, Default)]
pub struct MaskErrors {
    predicate: Option<MaskPredicate>,
}

impl MaskErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only masks the field errors for which the predicate returns true.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Fn(&ServerError) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }
}

impl ExtensionFactory for MaskErrors {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(MaskErrorsExtension {
            predicate: self.predicate.clone(),
        })
    }
}

struct MaskErrorsExtension {
    predicate: Option<MaskPredicate>,
}

#[async_trait::async_trait]
impl Extension for MaskErrorsExtension {
    async fn execute(&self, ctx: &ExtensionContext<'_>, operation_name: Option<&str>, next: NextExecute<'_>) -> Response {
        let mut response = next.run(ctx, operation_name).await;
        for error in &mut response.errors {
            if error.path.is_empty() {
                continue;
            }
            if self.predicate.as_ref().map_or(true, |predicate| predicate(error)) {
                error.message = MASKED_MESSAGE.to_string();
                error.extensions = None;
                error.source = None;
            }
        }
        response
    }
}
