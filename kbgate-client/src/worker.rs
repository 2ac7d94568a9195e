//! Worker API endpoints

use crate::WorkerClient;
use crate::error::Result;
use kbgate_core::dto::worker::{
    KgcBenchmarkResponse, KgcRequest, KgcResponse, NerRequest, NerResponse,
};

impl WorkerClient {
    /// Run named-entity recognition on a piece of text
    pub async fn ner(&self, req: &NerRequest) -> Result<NerResponse> {
        self.post_json("/ner", req).await
    }

    /// Complete a knowledge-graph triple
    pub async fn kgc(&self, req: &KgcRequest) -> Result<KgcResponse> {
        self.post_json("/kgc", req).await
    }

    /// Fetch the worker's knowledge-graph completion benchmark scores
    pub async fn kgc_benchmark(&self) -> Result<KgcBenchmarkResponse> {
        self.get_json("/kgc_benchmark").await
    }
}
