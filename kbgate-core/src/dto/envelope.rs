//! Response envelope
//!
//! Every response, from the gateway or from the worker, is a flat JSON object
//! with `code` (0 on success, -1 on failure), `msg`, and the operation's own
//! fields alongside them.

use serde::{Deserialize, Serialize};

use crate::domain::job::JobResult;

pub const CODE_OK: i32 = 0;
pub const CODE_ERR: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub msg: String,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn success(payload: T) -> Self {
        Self {
            code: CODE_OK,
            msg: "success".to_string(),
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_OK
    }
}

impl Envelope<()> {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_ERR,
            msg: msg.into(),
            payload: (),
        }
    }
}

impl From<&JobResult> for Envelope<()> {
    fn from(result: &JobResult) -> Self {
        Self {
            code: if result.is_success() { CODE_OK } else { CODE_ERR },
            msg: result.message.clone(),
            payload: (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::worker::NerOutput;

    #[test]
    fn test_payload_is_flattened() {
        let envelope = Envelope::success(NerOutput {
            text: "entities".to_string(),
        });

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": 0, "msg": "success", "text": "entities" })
        );
    }

    #[test]
    fn test_error_has_no_payload_fields() {
        let json = serde_json::to_value(Envelope::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "code": -1, "msg": "boom" }));
    }

    #[test]
    fn test_from_job_result() {
        let ok: Envelope<()> = (&JobResult::succeeded()).into();
        assert!(ok.is_success());
        assert_eq!(ok.msg, "success");

        let failed: Envelope<()> = (&JobResult::failed("exit status: 1")).into();
        assert_eq!(failed.code, CODE_ERR);
        assert_eq!(failed.msg, "exit status: 1");
    }
}
