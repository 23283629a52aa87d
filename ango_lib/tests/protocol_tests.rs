use std::sync::{Arc, Mutex};

use ango_idl::{parse_str, Procedure, Service};
use ango_lib::{
    serve_connection, start_client, CallError, HandlerResult, Peer, ProtocolConfig,
    ProtocolError, Session, Values, DEFAULT_PROTOCOL_VERSION,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use simple_error::SimpleError;
use tokio::io::{duplex, DuplexStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

const DEFINITION: &str = "name chat
server oneway notify(text string)
server add(a int, b int)(c int)
server fail()(c int)
client oneway message(text string)
client ask(question string)(answer string)
";

fn service() -> Arc<Service> {
    Arc::new(parse_str(DEFINITION).unwrap())
}

#[derive(Debug, Default, Clone)]
struct Log(Arc<Mutex<Vec<String>>>);
impl Log {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }
    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct ChatSession {
    log: Log,
    peer: Option<Peer>,
}

#[async_trait]
impl Session for ChatSession {
    async fn call(&mut self, procedure: &Procedure, args: Values) -> HandlerResult {
        match procedure.name.as_str() {
            "notify" => {
                let text: String = args.get("text")?;
                self.log.push(format!("notify {text}"));
                if let Some(peer) = &self.peer {
                    peer.call("message", Values::encode(&json!({ "text": text }))?)
                        .await?;
                }
                Ok(Values::new())
            }
            "add" => {
                let a: i64 = args.get("a")?;
                let b: i64 = args.get("b")?;
                Ok(Values::encode(&json!({ "c": a + b }))?)
            }
            "fail" => Err(SimpleError::new("nothing to see").into()),
            other => Err(format!("unexpected procedure {other}").into()),
        }
    }

    async fn stop(&mut self, error: Option<&ProtocolError>) {
        match error {
            None => self.log.push("stop"),
            Some(e) => self.log.push(format!("stop: {e}")),
        }
    }
}

struct ClientSession {
    log: Log,
}

#[async_trait]
impl Session for ClientSession {
    async fn call(&mut self, procedure: &Procedure, args: Values) -> HandlerResult {
        match procedure.name.as_str() {
            "message" => {
                let text: String = args.get("text")?;
                self.log.push(format!("message {text}"));
                Ok(Values::new())
            }
            "ask" => {
                let question: String = args.get("question")?;
                Ok(Values::encode(&json!({ "answer": format!("pong: {question}") }))?)
            }
            other => Err(format!("unexpected procedure {other}").into()),
        }
    }
}

type RawClient = Framed<DuplexStream, LengthDelimitedCodec>;

/// Serves one connection and hands back the raw client end.
fn spawn_server(log: Log) -> (RawClient, JoinHandle<Result<(), ProtocolError>>) {
    let (client, server) = duplex(64 * 1024);
    let handle = tokio::spawn(async move {
        serve_connection(server, service(), &ProtocolConfig::default(), move |_peer| {
            ChatSession { log, peer: None }
        })
        .await
    });
    (Framed::new(client, LengthDelimitedCodec::new()), handle)
}

async fn send_text(client: &mut RawClient, text: &str) {
    client
        .send(Bytes::copy_from_slice(text.as_bytes()))
        .await
        .unwrap();
}

async fn recv_text(client: &mut RawClient) -> String {
    let frame = client.next().await.unwrap().unwrap();
    String::from_utf8(frame.to_vec()).unwrap()
}

async fn send_json(client: &mut RawClient, value: Value) {
    let bytes = serde_json::to_vec(&value).unwrap();
    client.send(Bytes::from(bytes)).await.unwrap();
}

async fn recv_json(client: &mut RawClient) -> Value {
    let frame = client.next().await.unwrap().unwrap();
    serde_json::from_slice(&frame).unwrap()
}

async fn handshake(client: &mut RawClient) {
    send_text(client, DEFAULT_PROTOCOL_VERSION).await;
    assert_eq!("good", recv_text(client).await);
}

#[tokio::test]
async fn version_mismatch_closes_without_session() {
    let log = Log::default();
    let (mut client, server) = spawn_server(log.clone());

    send_text(&mut client, "ango-0.0").await;
    assert_eq!("invalid", recv_text(&mut client).await);
    assert!(client.next().await.is_none());

    match server.await.unwrap() {
        Err(ProtocolError::VersionMismatch { expected, received }) => {
            assert_eq!(DEFAULT_PROTOCOL_VERSION, expected);
            assert_eq!("ango-0.0", received);
        }
        other => panic!("expected a version mismatch, got {other:?}"),
    }
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn response_carries_request_callback_id() {
    let (mut client, _server) = spawn_server(Log::default());
    handshake(&mut client).await;

    send_json(
        &mut client,
        json!({ "type": "req", "procedure": "add", "cb_id": 42, "data": { "a": 2, "b": 3 } }),
    )
    .await;
    assert_eq!(
        json!({ "type": "res", "cb_id": 42, "data": { "c": 5 } }),
        recv_json(&mut client).await
    );
}

#[tokio::test]
async fn oneway_request_gets_no_response() {
    let log = Log::default();
    let (mut client, server) = spawn_server(log.clone());
    handshake(&mut client).await;

    send_json(
        &mut client,
        json!({ "type": "req", "procedure": "notify", "cb_id": 1, "data": { "text": "hello" } }),
    )
    .await;
    send_json(
        &mut client,
        json!({ "type": "req", "procedure": "add", "cb_id": 2, "data": { "a": 1 } }),
    )
    .await;
    // The first response belongs to the second request.
    assert_eq!(
        json!({ "type": "res", "cb_id": 2, "data": { "c": 1 } }),
        recv_json(&mut client).await
    );

    drop(client);
    server.await.unwrap().unwrap();
    assert_eq!(vec!["notify hello", "stop"], log.entries());
}

#[tokio::test]
async fn handler_error_keeps_connection_open() {
    let (mut client, _server) = spawn_server(Log::default());
    handshake(&mut client).await;

    send_json(&mut client, json!({ "type": "req", "procedure": "fail", "cb_id": 7 })).await;
    assert_eq!(
        json!({
            "type": "res",
            "cb_id": 7,
            "error": { "type": "errorReturned", "message": "nothing to see" }
        }),
        recv_json(&mut client).await
    );

    send_json(
        &mut client,
        json!({ "type": "req", "procedure": "add", "cb_id": 8, "data": { "a": 4, "b": 4 } }),
    )
    .await;
    assert_eq!(
        json!({ "type": "res", "cb_id": 8, "data": { "c": 8 } }),
        recv_json(&mut client).await
    );
}

#[tokio::test]
async fn unmatched_response_is_ignored() {
    let (mut client, _server) = spawn_server(Log::default());
    handshake(&mut client).await;

    send_json(&mut client, json!({ "type": "res", "cb_id": 99 })).await;
    send_json(
        &mut client,
        json!({ "type": "req", "procedure": "add", "cb_id": 3, "data": { "a": 1, "b": 1 } }),
    )
    .await;
    assert_eq!(
        json!({ "type": "res", "cb_id": 3, "data": { "c": 2 } }),
        recv_json(&mut client).await
    );
}

#[tokio::test]
async fn unknown_procedure_ends_connection() {
    let log = Log::default();
    let (mut client, server) = spawn_server(log.clone());
    handshake(&mut client).await;

    // `message` is implemented by the client, not the server.
    send_json(&mut client, json!({ "type": "req", "procedure": "message", "cb_id": 1 })).await;
    assert!(client.next().await.is_none());

    match server.await.unwrap() {
        Err(ProtocolError::UnknownProcedure(name)) => assert_eq!("message", name),
        other => panic!("expected an unknown procedure error, got {other:?}"),
    }
    assert_eq!(vec!["stop: unknown procedure `message`"], log.entries());
}

#[tokio::test]
async fn malformed_envelopes_end_connection() {
    let (mut client, server) = spawn_server(Log::default());
    handshake(&mut client).await;
    send_text(&mut client, "hello").await;
    assert!(matches!(
        server.await.unwrap(),
        Err(ProtocolError::MalformedEnvelope(_))
    ));

    let (mut client, server) = spawn_server(Log::default());
    handshake(&mut client).await;
    send_json(
        &mut client,
        json!({ "type": "req", "procedure": "add", "cb_id": 1, "data": { "a": "two" } }),
    )
    .await;
    match server.await.unwrap() {
        Err(ProtocolError::InvalidData { procedure, .. }) => assert_eq!("add", procedure),
        other => panic!("expected invalid data, got {other:?}"),
    }
}

#[tokio::test]
async fn client_and_server_call_each_other() {
    let (client_io, server_io) = duplex(64 * 1024);
    let server_log = Log::default();
    let (peer_sender, peer_receiver) = oneshot::channel();

    let log = server_log.clone();
    let server = tokio::spawn(async move {
        serve_connection(server_io, service(), &ProtocolConfig::default(), move |peer| {
            peer_sender.send(peer.clone()).unwrap();
            ChatSession {
                log,
                peer: Some(peer),
            }
        })
        .await
    });

    let client_log = Log::default();
    let client_session = ClientSession {
        log: client_log.clone(),
    };
    let peer = start_client(client_io, service(), &ProtocolConfig::default(), client_session)
        .await
        .unwrap();
    let server_peer = peer_receiver.await.unwrap();

    let notify_args = Values::encode(&json!({ "text": "hi" })).unwrap();
    assert!(peer.call("notify", notify_args).await.unwrap().is_empty());
    let add_args = Values::encode(&json!({ "a": 20, "b": 22 })).unwrap();
    let rets = peer.call("add", add_args).await.unwrap();
    assert_eq!(42, rets.get::<i64>("c").unwrap());

    let ask_args = Values::encode(&json!({ "question": "ping?" })).unwrap();
    let answer = server_peer.call("ask", ask_args).await.unwrap();
    assert_eq!("pong: ping?", answer.get::<String>("answer").unwrap());
    assert_eq!(vec!["message hi"], client_log.entries());

    match peer.call("fail", Values::new()).await {
        Err(CallError::Remote(error)) => assert_eq!("nothing to see", error.message),
        other => panic!("expected a remote error, got {other:?}"),
    }

    peer.close();
    server.await.unwrap().unwrap();
    assert_eq!(vec!["notify hi", "stop"], server_log.entries());
    assert!(matches!(
        peer.call("add", Values::new()).await,
        Err(CallError::ConnectionClosed)
    ));
}

#[tokio::test]
async fn peer_checks_calls_against_the_definition() {
    let (client_io, server_io) = duplex(64 * 1024);
    tokio::spawn(async move {
        serve_connection(server_io, service(), &ProtocolConfig::default(), |_| ()).await
    });
    let peer = start_client(client_io, service(), &ProtocolConfig::default(), ())
        .await
        .unwrap();

    assert!(matches!(
        peer.call("message", Values::new()).await,
        Err(CallError::UnknownProcedure(_))
    ));
    let bad_args = Values::encode(&json!({ "a": "one" })).unwrap();
    assert!(matches!(
        peer.call("add", bad_args).await,
        Err(CallError::InvalidData(_))
    ));
    // The server side has no handlers at all.
    match peer.call("add", Values::new()).await {
        Err(CallError::Remote(error)) => {
            assert_eq!("no handler for procedure `add`", error.message)
        }
        other => panic!("expected a remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn client_sees_rejected_version() {
    let (client_io, server_io) = duplex(64 * 1024);
    let server = tokio::spawn(async move {
        serve_connection(server_io, service(), &ProtocolConfig::default(), |_| ()).await
    });

    let result = start_client(client_io, service(), &ProtocolConfig::new("ango-9"), ()).await;
    assert!(matches!(result, Err(ProtocolError::HandshakeRejected(_))));
    assert!(matches!(
        server.await.unwrap(),
        Err(ProtocolError::VersionMismatch { .. })
    ));
}

#[tokio::test]
async fn oversized_frames_end_connection() {
    let (client_io, server_io) = duplex(64 * 1024);
    let config = ProtocolConfig::default().with_max_frame_length(64);
    let server = tokio::spawn(async move {
        serve_connection(server_io, service(), &config, |_| ()).await
    });

    let mut client = Framed::new(client_io, LengthDelimitedCodec::new());
    handshake(&mut client).await;
    send_json(
        &mut client,
        json!({ "type": "req", "procedure": "notify", "cb_id": 0, "data": { "text": "x".repeat(100) } }),
    )
    .await;
    assert!(matches!(
        server.await.unwrap(),
        Err(ProtocolError::Transport(_))
    ));
}
