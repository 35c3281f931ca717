//! Query and fetch requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::strategy::QueryEmbeddings;
use crate::types::Id;

/// Nearest-neighbor query against a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_embeddings: QueryEmbeddings,

    /// Results per query row. Falls back to `SearchConfig::default_top_k`,
    /// which is 10 unless configured otherwise.
    #[serde(default)]
    pub n_results: Option<usize>,

    #[serde(default, rename = "where")]
    pub where_clause: Option<Value>,

    #[serde(default)]
    pub where_document: Option<Value>,

    /// Fields to return. `None` means metadatas, documents and distances.
    #[serde(default)]
    pub include: Option<Vec<String>>,
}

impl QueryRequest {
    pub fn new(query_embeddings: QueryEmbeddings) -> Self {
        Self {
            query_embeddings,
            n_results: None,
            where_clause: None,
            where_document: None,
            include: None,
        }
    }

    pub fn with_n_results(mut self, n_results: usize) -> Self {
        self.n_results = Some(n_results);
        self
    }

    pub fn with_where(mut self, where_clause: Value) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn with_where_document(mut self, where_document: Value) -> Self {
        self.where_document = Some(where_document);
        self
    }

    pub fn with_include<S: Into<String>>(mut self, include: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(include.into_iter().map(Into::into).collect());
        self
    }
}

/// Plain fetch of stored items, without ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Restrict to these IDs, returned in the given order.
    #[serde(default)]
    pub ids: Option<Vec<Id>>,

    #[serde(default, rename = "where")]
    pub where_clause: Option<Value>,

    #[serde(default)]
    pub where_document: Option<Value>,

    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default)]
    pub offset: usize,

    /// Fields to return. `None` means metadatas and documents.
    #[serde(default)]
    pub include: Option<Vec<String>>,
}

impl GetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<S: Into<Id>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_where(mut self, where_clause: Value) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn with_where_document(mut self, where_document: Value) -> Self {
        self.where_document = Some(where_document);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_include<S: Into<String>>(mut self, include: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(include.into_iter().map(Into::into).collect());
        self
    }
}
