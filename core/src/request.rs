//! Raw request types

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Unique request identifier, assigned by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A request built by a [`Caller`](crate::Caller) for one call attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest {
    /// Request identifier
    pub id: RequestId,

    /// Opaque payload handed to [`Caller::call`](crate::Caller::call)
    pub payload: Bytes,
}

impl RawRequest {
    /// Create a new raw request
    pub fn new(id: impl Into<RequestId>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_request_new() {
        let req = RawRequest::new(7u64, "ping");
        assert_eq!(req.id, RequestId(7));
        assert_eq!(req.payload, Bytes::from_static(b"ping"));
        assert_eq!(req.id.to_string(), "7");
    }

    #[test]
    fn test_request_id_json_format() {
        assert_eq!(serde_json::to_string(&RequestId(42)).unwrap(), "42");
    }
}
