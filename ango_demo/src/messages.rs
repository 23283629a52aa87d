use std::sync::Arc;

use ango_idl::{ParseError, Service};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Arguments of `add` and `divide`
#[derive(Debug, Deserialize, Serialize)]
pub struct Operands {
    pub a: i64,
    pub b: i64,
}

/// Return values of `add`
#[derive(Debug, Deserialize, Serialize)]
pub struct Sum {
    pub c: i64,
}

/// Return values of `divide`
#[derive(Debug, Deserialize, Serialize)]
pub struct Quotient {
    pub quotient: i64,
    pub remainder: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Progress {
    pub percent: u8,
}

pub fn calc_service() -> Result<Arc<Service>, ParseError> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/calc.ango");
    ango_idl::parse_file(path).map(Arc::new)
}

/// Where the server listens and the client connects, from `ANGO_DEMO_ADDR`.
pub fn address() -> String {
    std::env::var("ANGO_DEMO_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_owned())
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
