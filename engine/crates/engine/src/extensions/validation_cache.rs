use std::sync::{Arc, OnceLock};

use async_graphql_parser::types::ExecutableDocument;
use grove_value::Variables;

use super::{Extension, ExtensionContext, ExtensionFactory, NextParseQuery, NextValidation};
use crate::{validation::ValidationResult, ServerError, ServerResult};

type ValidationOutcome = Result<ValidationResult, Vec<ServerError>>;

/// Keeps the outcome of validating the most used documents, errors included, keyed by their
/// source.
///
/// The source is picked up during parsing. A request whose parsing stage is answered before
/// reaching this extension, by a [`ParserCache`](super::ParserCache) registered ahead of it
/// for instance, is validated without the cache.
#[derive(Clone)]
pub struct ValidationCache {
    outcomes: mini_moka::sync::Cache<String, ValidationOutcome>,
}

impl ValidationCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            outcomes: mini_moka::sync::Cache::builder().max_capacity(capacity).build(),
        }
    }
}

impl Default for ValidationCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ExtensionFactory for ValidationCache {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(CachedValidation {
            outcomes: self.outcomes.clone(),
            query: OnceLock::new(),
        })
    }
}

struct CachedValidation {
    outcomes: mini_moka::sync::Cache<String, ValidationOutcome>,
    query: OnceLock<String>,
}

#[async_trait::async_trait]
impl Extension for CachedValidation {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        self.query.set(query.to_string()).ok();
        next.run(ctx, query, variables).await
    }

    async fn validation(&self, ctx: &ExtensionContext<'_>, next: NextValidation<'_>) -> ValidationOutcome {
        let Some(query) = self.query.get() else {
            return next.run(ctx).await;
        };
        if let Some(outcome) = self.outcomes.get(query) {
            ::tracing::trace!("Validation outcome found in cache");
            return outcome;
        }

        let outcome = next.run(ctx).await;
        self.outcomes.insert(query.clone(), outcome.clone());
        outcome
    }
}
