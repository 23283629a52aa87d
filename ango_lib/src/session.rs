use ango_idl::Procedure;
use async_trait::async_trait;
use simple_error::SimpleError;

use crate::error::ProtocolError;
use crate::values::Values;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<Values, HandlerError>;

/// The application end of one connection.
///
/// Receives the calls for the procedures implemented on the local side. The
/// arguments have already been checked against the procedure's declared
/// types, and so are the returned values before they are sent.
#[async_trait]
pub trait Session: Send {
    /// Runs one procedure. Errors are sent back to the caller as an error
    /// response and do not end the connection. For oneway procedures the
    /// result is only logged.
    async fn call(&mut self, procedure: &Procedure, args: Values) -> HandlerResult;

    /// Called exactly once when the connection ends, with the error that
    /// ended it, if any.
    async fn stop(&mut self, _error: Option<&ProtocolError>) {}
}

/// For a side that implements no procedures.
#[async_trait]
impl Session for () {
    async fn call(&mut self, procedure: &Procedure, _args: Values) -> HandlerResult {
        Err(SimpleError::new(format!("no handler for procedure `{}`", procedure.name)).into())
    }
}
