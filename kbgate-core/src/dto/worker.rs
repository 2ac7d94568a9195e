//! Worker DTOs
//!
//! Request and response shapes of the supervised worker's HTTP API. Responses
//! arrive wrapped in [`Envelope`].

use serde::{Deserialize, Serialize};

use crate::dto::envelope::Envelope;

/// Request body for `POST /ner`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerRequest {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerOutput {
    pub text: String,
}

/// Request body for `POST /kgc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KgcRequest {
    pub head: String,
    pub relation: String,
    pub tail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KgcOutput {
    pub head: String,
    pub relation: String,
    pub tail: String,
}

/// Payload of `GET /kgc_benchmark`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KgcBenchmarkOutput {
    pub hits_at_1: String,
    pub mrr: String,
}

pub type NerResponse = Envelope<NerOutput>;
pub type KgcResponse = Envelope<KgcOutput>;
pub type KgcBenchmarkResponse = Envelope<KgcBenchmarkOutput>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_worker_ner_response() {
        let raw = r#"{"code":0,"msg":"success","text":"[\"PERSON\"]"}"#;
        let rsp: NerResponse = serde_json::from_str(raw).unwrap();

        assert!(rsp.is_success());
        assert_eq!(rsp.payload.text, "[\"PERSON\"]");
    }

    #[test]
    fn test_decode_rejects_missing_payload_field() {
        let raw = r#"{"code":0,"msg":"success","head":"a","relation":"b"}"#;
        assert!(serde_json::from_str::<KgcResponse>(raw).is_err());
    }
}
