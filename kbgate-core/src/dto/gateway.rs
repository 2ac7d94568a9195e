//! Gateway DTOs
//!
//! Request and response shapes of the gateway's own HTTP API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dto::envelope::Envelope;

/// Request body for `POST /api/kb/indexing`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingRequest {
    /// Knowledge-base directory name under the KB root
    pub name: String,
}

/// GraphRAG search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMethod {
    Local,
    Global,
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMethod::Local => write!(f, "local"),
            QueryMethod::Global => write!(f, "global"),
        }
    }
}

/// Request body for `POST /api/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub kb: String,
    /// Indexing run under `<kb>/output/` whose artifacts are queried
    pub db: String,
    pub method: QueryMethod,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub text: String,
}

pub type QueryResponse = Envelope<QueryOutput>;
