//! Runtime for services described by an `.ango` definition.
//!
//! Each connection starts with a handshake: the client sends its protocol
//! version as a text frame and the server answers `"good"` or `"invalid"`.
//! After that both ends exchange JSON [Envelope]s. Requests for procedures
//! implemented locally are dispatched to a [Session]; procedures implemented
//! by the other end are called through a [Peer].

pub use codec::CodecError;
pub use config::{ProtocolConfig, DEFAULT_MAX_FRAME_LENGTH, DEFAULT_PROTOCOL_VERSION};
pub use error::{CallError, ProtocolError};
pub use messages::{Envelope, MessageKind, RemoteError, ERROR_RETURNED};
pub use peer::Peer;
pub use session::{HandlerError, HandlerResult, Session};
pub use values::Values;

pub mod handshake;

mod codec;
mod config;
mod connection;
mod error;
mod messages;
mod peer;
mod pending;
mod session;
mod util;
mod values;

use std::sync::Arc;

use ango_idl::{Direction, Service};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use connection::Connection;

/// Starts a server, accepting new connections in an infinite loop.
///
/// For each connection that completes the handshake, `new_session` creates
/// the session serving it. The session gets a [Peer] for calling the
/// client's procedures.
pub async fn start_server<S, F>(
    listener: TcpListener,
    service: Arc<Service>,
    config: ProtocolConfig,
    new_session: F,
) -> std::io::Result<()>
where
    S: Session + 'static,
    F: Fn(Peer) -> S + Send + Sync + 'static,
{
    let new_session = Arc::new(new_session);
    loop {
        let (socket, address) = listener.accept().await?;
        info!(%address, "accepted connection");
        let service = Arc::clone(&service);
        let config = config.clone();
        let new_session = Arc::clone(&new_session);
        tokio::spawn(async move {
            if let Err(e) =
                serve_connection(socket, service, &config, |peer| new_session(peer)).await
            {
                warn!(%address, "connection handler terminated due to error: {e}");
            }
        });
    }
}

/// Runs the server side of one connection over any byte stream until it ends.
///
/// If the handshake fails, no session is created.
pub async fn serve_connection<RW, S, F>(
    read_write: RW,
    service: Arc<Service>,
    config: &ProtocolConfig,
    new_session: F,
) -> Result<(), ProtocolError>
where
    RW: AsyncRead + AsyncWrite + Unpin,
    S: Session,
    F: FnOnce(Peer) -> S,
{
    let mut transport = util::frame(read_write, config);
    handshake::accept(&mut transport, &config.version).await?;

    let (commands, command_receiver) = mpsc::unbounded_channel();
    let peer = Peer::new(Arc::clone(&service), Direction::Client, commands);
    let session = new_session(peer);
    Connection::new(
        transport,
        service,
        Direction::Server,
        session,
        command_receiver,
    )
    .run()
    .await
}

/// Start a client connection.
///
/// Performs the handshake, then serves the client's procedures with
/// `session` on a spawned task. The returned [Peer] calls the server's
/// procedures.
pub async fn start_client<RW, S>(
    read_write: RW,
    service: Arc<Service>,
    config: &ProtocolConfig,
    session: S,
) -> Result<Peer, ProtocolError>
where
    RW: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    S: Session + 'static,
{
    let mut transport = util::frame(read_write, config);
    handshake::initiate(&mut transport, &config.version).await?;
    debug!(service = %service.name, "handshake accepted");

    let (commands, command_receiver) = mpsc::unbounded_channel();
    let peer = Peer::new(Arc::clone(&service), Direction::Server, commands);
    let connection = Connection::new(
        transport,
        service,
        Direction::Client,
        session,
        command_receiver,
    );
    tokio::spawn(async move {
        if let Err(e) = connection.run().await {
            warn!("client connection terminated due to error: {e}");
        }
    });
    Ok(peer)
}
