//! End-to-end behaviour of a running server, driven over real TCP sockets.

use flashwire::bind_methods;
use flashwire::commands::{CommandTable, HandlerChain, HandlerError, HandlerResult};
use flashwire::connection::Client;
use flashwire::protocol::{Message, Part, Request};
use flashwire::server::{Server, ServerConfig};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start(chain: HandlerChain) -> SocketAddr {
    let server = Server::new(
        ServerConfig {
            port: 0,
            ..ServerConfig::default()
        },
        chain,
    );
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { server.serve(listener).await });
    addr
}

async fn read_some(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = vec![0u8; 512];
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    buf.truncate(n);
    buf
}

async fn assert_closed(stream: &mut TcpStream) {
    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
}

/// A tiny key-value command set bound by method name.
#[derive(Default)]
struct Strings {
    data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl Strings {
    fn set(&self, args: &[Part]) -> HandlerResult {
        let [key, value] = args else {
            return Ok(Some(Message::err("wrong number of arguments for 'set' command")));
        };
        let mut data = self
            .data
            .lock()
            .map_err(|_| HandlerError::failed("store poisoned"))?;
        data.insert(key.data.to_vec(), value.data.to_vec());
        Ok(Some(Message::ok()))
    }

    fn get(&self, args: &[Part]) -> HandlerResult {
        let [key] = args else {
            return Ok(Some(Message::err("wrong number of arguments for 'get' command")));
        };
        let data = self
            .data
            .lock()
            .map_err(|_| HandlerError::failed("store poisoned"))?;
        Ok(Some(Message::array([data.get(&key.data[..]).cloned()])))
    }
}

fn strings_chain() -> HandlerChain {
    HandlerChain::new().with(bind_methods!(
        CommandTable::new("strings"),
        Arc::new(Strings::default());
        set, get
    ))
}

#[tokio::test]
async fn unknown_command_with_empty_chain_keeps_connection_open() {
    let addr = start(HandlerChain::new()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"*2\r\n$4\r\nPING\r\n$0\r\n\r\n").await.unwrap();
    assert_eq!(read_some(&mut stream).await, b"-ERR unknown command 'PING'\r\n");

    stream.write_all(b"*1\r\n$3\r\nfoo\r\n").await.unwrap();
    assert_eq!(read_some(&mut stream).await, b"-ERR unknown command 'FOO'\r\n");
}

#[tokio::test]
async fn set_replies_ok() {
    let addr = start(strings_chain()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(&Request::new("SET").arg("key").arg("val").encode())
        .await
        .unwrap();
    assert_eq!(read_some(&mut stream).await, b"+OK\r\n");

    stream
        .write_all(&Request::new("get").arg("key").encode())
        .await
        .unwrap();
    assert_eq!(read_some(&mut stream).await, b"*1\r\n$3\r\nval\r\n");
}

#[tokio::test]
async fn disconnect_command_closes_socket() {
    let addr = start(strings_chain()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"*1\r\n$4\r\nQUIT\r\n").await.unwrap();
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn handler_disconnect_sends_its_reply_first() {
    let chain = HandlerChain::new().with(CommandTable::single("bye", |_| {
        Err(HandlerError::disconnect().with_reply(Message::status("BYE")))
    }));
    let addr = start(chain).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"*1\r\n$3\r\nBYE\r\n").await.unwrap();
    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"+BYE\r\n");
}

#[tokio::test]
async fn non_bulk_argument_is_a_protocol_error() {
    let addr = start(strings_chain()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"*3\r\n$3\r\nSET\r\n:1\r\n$1\r\nv\r\n")
        .await
        .unwrap();
    assert_eq!(
        read_some(&mut stream).await,
        b"-ERR Protocol error: expected '$', got ':'\r\n"
    );

    // The session is still usable
    stream
        .write_all(&Request::new("SET").arg("k").arg("v").encode())
        .await
        .unwrap();
    assert_eq!(read_some(&mut stream).await, b"+OK\r\n");
}

#[tokio::test]
async fn two_providers_route_independently() {
    let chain = HandlerChain::new()
        .with(CommandTable::single("alpha", |_| Ok(Some(Message::status("A")))))
        .with(CommandTable::single("beta", |_| Ok(Some(Message::status("B")))));
    let addr = start(chain).await;

    let mut client = Client::connect(addr).await.unwrap();
    assert_eq!(
        client.send(&Request::new("alpha")).await.unwrap(),
        Message::status("A")
    );
    assert_eq!(
        client.send(&Request::new("BETA")).await.unwrap(),
        Message::status("B")
    );

    let unknown = client.send(&Request::new("gamma")).await.unwrap();
    assert!(!unknown.success);
    assert_eq!(unknown.message, "ERR unknown command 'GAMMA'");
}

#[tokio::test]
async fn truncated_frame_closes_session_without_reply() {
    let addr = start(strings_chain()).await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"*2\r\n$3\r\nGET\r\n$10\r\nabc").await.unwrap();
    stream.shutdown().await.unwrap();
    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn requests_on_one_session_are_answered_in_order() {
    let addr = start(strings_chain()).await;
    let mut client = Client::connect(addr).await.unwrap();

    let mut batch = Vec::new();
    for i in 0..5 {
        Request::new("SET")
            .arg(format!("k{}", i))
            .arg(format!("v{}", i))
            .encode_into(&mut batch);
        Request::new("GET").arg(format!("k{}", i)).encode_into(&mut batch);
    }
    client.write(&batch).await.unwrap();

    for i in 0..5 {
        assert_eq!(client.read_reply().await.unwrap(), Message::ok());
        assert_eq!(
            client.read_reply().await.unwrap(),
            Message::array([format!("v{}", i)])
        );
    }
}
