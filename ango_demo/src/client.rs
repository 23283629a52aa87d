mod messages;

use ango_idl::Procedure;
use ango_lib::{start_client, CallError, HandlerResult, ProtocolConfig, Session, Values};
use async_trait::async_trait;
use messages::{Operands, Progress, Quotient, Sum};
use simple_error::SimpleError;
use tokio::net::TcpStream;
use tracing::info;

struct ProgressSession;

#[async_trait]
impl Session for ProgressSession {
    async fn call(&mut self, procedure: &Procedure, args: Values) -> HandlerResult {
        match procedure.name.as_str() {
            "progress" => {
                let Progress { percent } = args.decode()?;
                info!(percent, "server progress");
                Ok(Values::new())
            }
            other => Err(SimpleError::new(format!("procedure `{other}` is not implemented")).into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    messages::init_tracing();
    let service = messages::calc_service()?;
    let socket = TcpStream::connect(messages::address()).await?;
    let server = start_client(socket, service, &ProtocolConfig::default(), ProgressSession).await?;

    let mut log = Values::new();
    log.insert("text", "hello from the demo client")?;
    server.call("log", log).await?;

    let rets = server
        .call("add", Values::encode(&Operands { a: 40, b: 2 })?)
        .await?;
    let Sum { c } = rets.decode()?;
    info!("40 + 2 = {c}");

    let rets = server
        .call("divide", Values::encode(&Operands { a: 17, b: 5 })?)
        .await?;
    let Quotient { quotient, remainder } = rets.decode()?;
    info!("17 / 5 = {quotient} remainder {remainder}");

    match server
        .call("divide", Values::encode(&Operands { a: 1, b: 0 })?)
        .await
    {
        Err(CallError::Remote(error)) => info!("dividing by zero failed as expected: {error}"),
        other => info!("unexpected result when dividing by zero: {other:?}"),
    }

    server.close();
    Ok(())
}
