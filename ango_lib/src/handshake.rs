//! The version exchange that opens every connection.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::error::ProtocolError;
use crate::util::Transport;

pub const ACCEPT: &str = "good";
pub const REJECT: &str = "invalid";

/// Server side: reads the client's version and answers it.
pub(crate) async fn accept<RW: AsyncRead + AsyncWrite + Unpin>(
    transport: &mut Transport<RW>,
    version: &str,
) -> Result<(), ProtocolError> {
    let received = read_text(transport).await?;
    if received != version {
        // The connection is dropped either way.
        let _ = transport.send(Bytes::from_static(REJECT.as_bytes())).await;
        return Err(ProtocolError::VersionMismatch {
            expected: version.to_owned(),
            received,
        });
    }
    transport.send(Bytes::from_static(ACCEPT.as_bytes())).await?;
    debug!(version, "valid protocol version detected");
    Ok(())
}

/// Client side: sends our version and waits for the verdict.
pub(crate) async fn initiate<RW: AsyncRead + AsyncWrite + Unpin>(
    transport: &mut Transport<RW>,
    version: &str,
) -> Result<(), ProtocolError> {
    transport
        .send(Bytes::copy_from_slice(version.as_bytes()))
        .await?;
    let reply = read_text(transport).await?;
    match reply.as_str() {
        ACCEPT => Ok(()),
        REJECT => Err(ProtocolError::HandshakeRejected(version.to_owned())),
        _ => Err(ProtocolError::InvalidHandshake(format!(
            "unexpected reply {reply:?}"
        ))),
    }
}

async fn read_text<RW: AsyncRead + AsyncWrite + Unpin>(
    transport: &mut Transport<RW>,
) -> Result<String, ProtocolError> {
    let frame = transport.next().await.ok_or_else(|| {
        ProtocolError::InvalidHandshake("connection closed during handshake".to_owned())
    })??;
    String::from_utf8(frame.to_vec())
        .map_err(|_| ProtocolError::InvalidHandshake("handshake frame is not UTF-8".to_owned()))
}
