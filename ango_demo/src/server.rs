mod messages;

use ango_idl::Procedure;
use ango_lib::{start_server, HandlerResult, Peer, ProtocolConfig, ProtocolError, Session, Values};
use async_trait::async_trait;
use messages::{Operands, Progress, Quotient, Sum};
use simple_error::SimpleError;
use tokio::net::TcpListener;
use tracing::{info, warn};

struct CalcSession {
    client: Peer,
    calls: u64,
}

impl CalcSession {
    async fn report(&self, percent: u8) -> HandlerResult {
        self.client
            .call("progress", Values::encode(&Progress { percent })?)
            .await?;
        Ok(Values::new())
    }
}

#[async_trait]
impl Session for CalcSession {
    async fn call(&mut self, procedure: &Procedure, args: Values) -> HandlerResult {
        self.calls += 1;
        match procedure.name.as_str() {
            "log" => {
                let text: String = args.get("text")?;
                info!(%text, "client says");
                Ok(Values::new())
            }
            "add" => {
                let Operands { a, b } = args.decode()?;
                let c = a
                    .checked_add(b)
                    .ok_or_else(|| SimpleError::new("integer overflow"))?;
                Ok(Values::encode(&Sum { c })?)
            }
            "divide" => {
                let Operands { a, b } = args.decode()?;
                if b == 0 {
                    return Err(SimpleError::new("division by zero").into());
                }
                self.report(50).await?;
                let quotient = Quotient {
                    quotient: a.wrapping_div(b),
                    remainder: a.wrapping_rem(b),
                };
                self.report(100).await?;
                Ok(Values::encode(&quotient)?)
            }
            other => Err(SimpleError::new(format!("procedure `{other}` is not implemented")).into()),
        }
    }

    async fn stop(&mut self, error: Option<&ProtocolError>) {
        match error {
            None => info!(calls = self.calls, "client disconnected"),
            Some(e) => warn!(calls = self.calls, "client connection failed: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    messages::init_tracing();
    let service = messages::calc_service()?;
    let address = messages::address();
    let listener = TcpListener::bind(&address).await?;
    info!(%address, service = %service.name, "listening");

    start_server(listener, service, ProtocolConfig::default(), |client| {
        CalcSession { client, calls: 0 }
    })
    .await?;
    Ok(())
}
