//! JSON operation payload shared by the bundled callers

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use yload_core::{RawRequest, RequestId};

/// The operation a request asks the callee to perform
///
/// Encoded as `{"op_name": "...", "op_num": [...]}`; an echoing callee
/// returns it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation name
    pub op_name: String,

    /// Operation arguments
    pub op_num: Vec<u64>,
}

impl Operation {
    /// Create a new operation
    pub fn new(op_name: impl Into<String>, op_num: Vec<u64>) -> Self {
        Self {
            op_name: op_name.into(),
            op_num,
        }
    }

    /// Encode as a JSON payload
    pub fn encode(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    /// Decode a JSON payload
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// Builds one [`Operation`] request per call with a fresh identifier
#[derive(Debug)]
pub(crate) struct OperationTemplate {
    op_name: String,
    next_id: AtomicU64,
}

impl OperationTemplate {
    pub(crate) fn new(op_name: impl Into<String>) -> Self {
        Self {
            op_name: op_name.into(),
            next_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn op_name(&self) -> &str {
        &self.op_name
    }

    pub(crate) fn build(&self) -> RawRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let operation = Operation::new(self.op_name.as_str(), vec![id]);

        // Plain strings and integers always serialize
        let payload = operation.encode().unwrap_or_default();
        RawRequest::new(RequestId(id), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_json_format() {
        let op = Operation::new("op0", vec![1, 2]);
        let payload = op.encode().unwrap();
        assert_eq!(&payload[..], br#"{"op_name":"op0","op_num":[1,2]}"#);
        assert_eq!(Operation::decode(&payload).unwrap(), op);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Operation::decode(b"not json").is_err());
    }

    #[test]
    fn test_template_assigns_fresh_ids() {
        let template = OperationTemplate::new("op0");
        let first = template.build();
        let second = template.build();

        assert_eq!(first.id, RequestId(0));
        assert_eq!(second.id, RequestId(1));
        assert_eq!(
            Operation::decode(&second.payload).unwrap(),
            Operation::new("op0", vec![1])
        );
    }
}
