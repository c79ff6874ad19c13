//! Expansion of a document into every exercisable operation.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::client::ApiClient;
use crate::document::SchemaDocument;
use crate::operation::OperationTemplate;
use crate::types::Method;

/// All operation templates of a document, indexed by path and method.
///
/// Every path of the document is a key, even when none of its methods are
/// expanded. Iteration follows document path order, then [`Method`] order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EndpointCollection {
    endpoints: IndexMap<String, BTreeMap<Method, OperationTemplate>>,
}

impl EndpointCollection {
    /// Expand every method of every path.
    pub fn build(document: &SchemaDocument) -> Self {
        Self::with_methods(document, Method::ALL)
    }

    /// Expand the document a client is bound to.
    pub fn from_client(client: &ApiClient) -> Self {
        Self::build(client.document())
    }

    /// Expand only the given methods.
    ///
    /// `methods` selects, it does not order: operations of a path are always
    /// kept in [`Method`] order (`get put post delete options head patch`).
    pub fn with_methods(document: &SchemaDocument, methods: &[Method]) -> Self {
        let endpoints = document
            .paths()
            .map(|path| {
                debug!(path, "expanding path");
                let operations: BTreeMap<Method, OperationTemplate> = methods
                    .iter()
                    .filter_map(|method| document.get_operation(path, *method))
                    .map(|handle| (handle.method, OperationTemplate::build(document, handle)))
                    .collect();
                debug!(path, count = operations.len(), "expanded path");
                (path.to_string(), operations)
            })
            .collect();

        Self { endpoints }
    }

    /// The full `path -> method -> template` structure.
    pub fn endpoints(&self) -> &IndexMap<String, BTreeMap<Method, OperationTemplate>> {
        &self.endpoints
    }

    pub fn get(&self, path: &str, method: Method) -> Option<&OperationTemplate> {
        self.endpoints.get(path)?.get(&method)
    }

    /// Every operation template, lazily; calling this again restarts from
    /// the beginning in the same order.
    pub fn iter_operations(&self) -> impl Iterator<Item = &OperationTemplate> + '_ {
        self.endpoints.values().flat_map(BTreeMap::values)
    }

    /// Number of operation templates across all paths.
    pub fn operation_count(&self) -> usize {
        self.endpoints.values().map(BTreeMap::len).sum()
    }
}
