use std::io;
use std::sync::Arc;

use ango_idl::{Direction, Procedure, Service};
use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::codec;
use crate::error::{CallError, ProtocolError};
use crate::messages::{CallbackId, Envelope, MessageKind, RemoteError};
use crate::peer::Command;
use crate::pending::{PendingCall, PendingCalls, Reply};
use crate::session::{HandlerError, Session};
use crate::util::Transport;
use crate::values::Values;

enum Event {
    Frame(Option<io::Result<BytesMut>>),
    Command(Option<Command>),
}

/// One connection after a successful handshake.
///
/// Handles one envelope at a time: the next one is only read after the
/// current handler has returned and its response has been written.
pub(crate) struct Connection<RW, S> {
    transport: Transport<RW>,
    service: Arc<Service>,
    /// The side whose procedures this connection serves.
    side: Direction,
    session: S,
    commands: mpsc::UnboundedReceiver<Command>,
    commands_open: bool,
    pending: PendingCalls,
}

impl<RW, S> Connection<RW, S>
where
    RW: AsyncRead + AsyncWrite + Unpin,
    S: Session,
{
    pub(crate) fn new(
        transport: Transport<RW>,
        service: Arc<Service>,
        side: Direction,
        session: S,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Connection {
            transport,
            service,
            side,
            session,
            commands,
            commands_open: true,
            pending: PendingCalls::new(),
        }
    }

    /// Runs until the connection ends, then stops the session.
    pub(crate) async fn run(mut self) -> Result<(), ProtocolError> {
        let result = self.run_loop().await;
        match &result {
            Ok(()) => debug!(side = %self.side, "connection closed"),
            Err(e) => debug!(side = %self.side, "connection terminated: {e}"),
        }
        self.session.stop(result.as_ref().err()).await;
        // Dropping `self` fails the calls still waiting for a response.
        result
    }

    async fn run_loop(&mut self) -> Result<(), ProtocolError> {
        loop {
            let event = tokio::select! {
                frame = self.transport.next() => Event::Frame(frame),
                command = self.commands.recv(), if self.commands_open => Event::Command(command),
            };
            match event {
                Event::Frame(None) => return Ok(()),
                Event::Frame(Some(frame)) => {
                    let envelope = Envelope::try_from(frame?.freeze())?;
                    match envelope.kind {
                        MessageKind::Request => self.handle_request(envelope).await?,
                        MessageKind::Response => self.handle_response(envelope),
                    }
                }
                Event::Command(Some(Command::Call {
                    procedure,
                    args,
                    reply,
                })) => self.send_request(procedure, args, reply).await?,
                Event::Command(Some(Command::Close)) => return Ok(()),
                // Every Peer is gone; keep serving the other side.
                Event::Command(None) => self.commands_open = false,
            }
        }
    }

    async fn handle_request(&mut self, envelope: Envelope) -> Result<(), ProtocolError> {
        let service = Arc::clone(&self.service);
        let procedure = service
            .procedures(self.side)
            .get(envelope.procedure.as_str())
            .ok_or_else(|| ProtocolError::UnknownProcedure(envelope.procedure.clone()))?;
        debug!(procedure = %procedure.name, cb_id = envelope.callback_id, "have request");

        let args = codec::conform(&procedure.args, envelope.data).map_err(|source| {
            ProtocolError::InvalidData {
                procedure: procedure.name.to_string(),
                source,
            }
        })?;
        let result = self.session.call(procedure, args).await;

        if procedure.oneway {
            if let Err(e) = result {
                warn!(procedure = %procedure.name, "oneway procedure failed: {e}");
            }
            return Ok(());
        }

        let rets = result.and_then(|rets| {
            codec::conform(&procedure.rets, Some(rets.into_value())).map_err(HandlerError::from)
        });
        let response = match rets {
            Ok(rets) => Envelope::response(envelope.callback_id, rets),
            Err(e) => Envelope::error_response(
                envelope.callback_id,
                RemoteError::returned(e.to_string()),
            ),
        };
        self.send(&response).await
    }

    fn handle_response(&mut self, envelope: Envelope) {
        let call = match self.pending.take(CallbackId(envelope.callback_id)) {
            Some(call) => call,
            None => {
                warn!(cb_id = envelope.callback_id, "response matches no pending call");
                return;
            }
        };
        debug!(procedure = %call.procedure.name, cb_id = envelope.callback_id, "have response");

        let result = match envelope.error {
            Some(error) => Err(CallError::Remote(error)),
            None => codec::conform(&call.procedure.rets, envelope.data).map_err(CallError::from),
        };
        if call.reply.send(result).is_err() {
            debug!(cb_id = envelope.callback_id, "caller stopped waiting for the response");
        }
    }

    async fn send_request(
        &mut self,
        procedure: Procedure,
        args: Values,
        reply: Option<Reply>,
    ) -> Result<(), ProtocolError> {
        let name = procedure.name.to_string();
        let callback_id = match reply {
            Some(reply) => self.pending.register(PendingCall { procedure, reply }).0,
            None => 0,
        };
        self.send(&Envelope::request(name, callback_id, args)).await
    }

    async fn send(&mut self, envelope: &Envelope) -> Result<(), ProtocolError> {
        self.transport.send(envelope.to_bytes()?).await?;
        Ok(())
    }
}
