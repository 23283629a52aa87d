use std::io;

use thiserror::Error;

use crate::codec::CodecError;
use crate::messages::RemoteError;

/// Ends the connection it occurred on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid protocol version: expected {expected:?}, received {received:?}")]
    VersionMismatch { expected: String, received: String },
    #[error("protocol version {0:?} was rejected by the server")]
    HandshakeRejected(String),
    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] serde_json::Error),
    #[error("invalid data for procedure `{procedure}`: {source}")]
    InvalidData {
        procedure: String,
        #[source]
        source: CodecError,
    },
    #[error("unknown procedure `{0}`")]
    UnknownProcedure(String),
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

/// Why an outbound call through a [crate::Peer] failed.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("unknown procedure `{0}`")]
    UnknownProcedure(String),
    #[error("invalid data: {0}")]
    InvalidData(#[from] CodecError),
    #[error("remote error: {0}")]
    Remote(RemoteError),
    #[error("connection closed")]
    ConnectionClosed,
}
