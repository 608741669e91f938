use std::sync::Arc;

use async_graphql_parser::types::ExecutableDocument;
use grove_value::Variables;

use super::{Extension, ExtensionContext, ExtensionFactory, NextParseQuery};
use crate::ServerResult;

/// Keeps the most used parsed documents, keyed by their source.
///
/// The cache belongs to the factory: every request of a schema shares it and it is dropped
/// with the schema.
#[derive(Clone)]
pub struct ParserCache {
    documents: mini_moka::sync::Cache<String, ExecutableDocument>,
}

impl ParserCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            documents: mini_moka::sync::Cache::builder().max_capacity(capacity).build(),
        }
    }
}

impl Default for ParserCache {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ExtensionFactory for ParserCache {
    fn create(&self) -> Arc<dyn Extension> {
        Arc::new(self.clone())
    }
}

#[async_trait::async_trait]
impl Extension for ParserCache {
    async fn parse_query(
        &self,
        ctx: &ExtensionContext<'_>,
        query: &str,
        variables: &Variables,
        next: NextParseQuery<'_>,
    ) -> ServerResult<ExecutableDocument> {
        let key = query.to_string();
        if let Some(document) = self.documents.get(&key) {
            ::tracing::trace!("Parsed document found in cache");
            return Ok(document);
        }

        let document = next.run(ctx, query, variables).await?;
        self.documents.insert(key, document.clone());
        Ok(document)
    }
}
