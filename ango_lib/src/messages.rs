use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::Values;

/// Error type reported when a procedure handler fails.
pub const ERROR_RETURNED: &str = "errorReturned";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "req")]
    Request,
    #[serde(rename = "res")]
    Response,
}

/// Correlates a response with the request that caused it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);
impl CallbackId {
    /// Advances to the next id, wrapping around and skipping 0, which is
    /// what oneway requests carry.
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1).max(1);
    }
}

/// The unit exchanged over a connection once the handshake is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Only set on requests.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub procedure: String,
    #[serde(rename = "cb_id", default)]
    pub callback_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Set instead of `data` on a response whose handler failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl Envelope {
    pub fn request(procedure: impl Into<String>, callback_id: u64, args: Values) -> Self {
        Envelope {
            kind: MessageKind::Request,
            procedure: procedure.into(),
            callback_id,
            data: Some(args.into_value()),
            error: None,
        }
    }

    pub fn response(callback_id: u64, rets: Values) -> Self {
        Envelope {
            kind: MessageKind::Response,
            procedure: String::new(),
            callback_id,
            data: Some(rets.into_value()),
            error: None,
        }
    }

    pub fn error_response(callback_id: u64, error: RemoteError) -> Self {
        Envelope {
            kind: MessageKind::Response,
            procedure: String::new(),
            callback_id,
            data: None,
            error: Some(error),
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

impl TryFrom<Bytes> for Envelope {
    type Error = serde_json::Error;

    fn try_from(bytes: Bytes) -> Result<Envelope, serde_json::Error> {
        serde_json::from_slice(&bytes)
    }
}

/// The error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl RemoteError {
    /// A procedure handler returned an error.
    pub fn returned(message: impl Into<String>) -> Self {
        RemoteError {
            kind: ERROR_RETURNED.to_owned(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
