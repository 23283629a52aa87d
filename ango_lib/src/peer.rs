use std::fmt;
use std::sync::Arc;

use ango_idl::{Direction, Procedure, Service};
use tokio::sync::{mpsc, oneshot};

use crate::codec;
use crate::error::CallError;
use crate::pending::Reply;
use crate::values::Values;

pub(crate) enum Command {
    Call {
        procedure: Procedure,
        args: Values,
        /// None for oneway procedures.
        reply: Option<Reply>,
    },
    Close,
}

/// Calls the procedures implemented by the other end of a connection.
///
/// Requests are written by the connection's own task between incoming
/// envelopes. A handler must therefore not await a two-way call on its own
/// connection; the response could only be read after the handler returns.
/// Oneway calls never wait and are fine anywhere.
#[derive(Clone)]
pub struct Peer {
    service: Arc<Service>,
    /// The side that implements the procedures this peer calls.
    direction: Direction,
    commands: mpsc::UnboundedSender<Command>,
}

impl Peer {
    pub(crate) fn new(
        service: Arc<Service>,
        direction: Direction,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Peer {
            service,
            direction,
            commands,
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Calls `procedure` on the other end.
    ///
    /// Two-way procedures resolve to the remote return values. Oneway
    /// procedures resolve to no values as soon as the request is queued.
    pub async fn call(&self, procedure: &str, args: Values) -> Result<Values, CallError> {
        let procedure = self
            .service
            .procedures(self.direction)
            .get(procedure)
            .ok_or_else(|| CallError::UnknownProcedure(procedure.to_owned()))?
            .clone();
        let args = codec::conform(&procedure.args, Some(args.into_value()))?;

        if procedure.oneway {
            self.send(Command::Call {
                procedure,
                args,
                reply: None,
            })?;
            return Ok(Values::new());
        }

        let (reply, response) = oneshot::channel();
        self.send(Command::Call {
            procedure,
            args,
            reply: Some(reply),
        })?;
        response.await.map_err(|_| CallError::ConnectionClosed)?
    }

    /// Asks the connection to close once the current envelope is handled.
    pub fn close(&self) {
        // Already closed if the connection is gone.
        let _ = self.commands.send(Command::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), CallError> {
        self.commands
            .send(command)
            .map_err(|_| CallError::ConnectionClosed)
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("service", &self.service.name)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}
