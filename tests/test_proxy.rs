//! Tests for upstream forwarding and the demo routes

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use rawhttp::config::UpstreamConfig;
use rawhttp::proxy::ProxyHandler;
use rawhttp::routes::Router;
use rawhttp::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn handler_for(origin: &str) -> ProxyHandler {
    ProxyHandler::new(
        url::Url::parse(origin).unwrap(),
        Duration::from_secs(5),
        Duration::from_secs(30),
    )
}

/// One-shot origin: records the request head and answers with `response`.
async fn fake_origin(response: &'static [u8]) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 256];
        while !head.ends_with(b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client hung up mid-request");
            head.extend_from_slice(&buf[..n]);
        }
        socket.write_all(response).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8(head).unwrap()
    });

    (addr, task)
}

/// Origin that answers after `delay`, sends part of a 100-byte body and then
/// stops writing without closing the connection.
async fn stalling_origin(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        let _ = socket.read(&mut buf).await.unwrap();
        tokio::time::sleep(delay).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    addr
}

async fn exchange(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

/// Decodes a chunked body, checking the framing along the way.
fn dechunk(mut body: &str) -> String {
    let mut out = String::new();
    loop {
        let (size, rest) = body.split_once("\r\n").expect("chunk size line");
        let size = usize::from_str_radix(size, 16).expect("hex chunk size");
        if size == 0 {
            assert_eq!(rest, "\r\n");
            return out;
        }
        out.push_str(&rest[..size]);
        body = rest[size..].strip_prefix("\r\n").expect("chunk CRLF");
    }
}

#[test]
fn test_upstream_path_strips_prefix() {
    let handler = handler_for("http://localhost:3000");

    assert_eq!(handler.upstream_path("/httpbin/stream/100"), "/stream/100");
    assert_eq!(handler.upstream_path("/httpbin"), "/");
    assert_eq!(handler.upstream_path("/httpbin/"), "/");
    assert_eq!(handler.upstream_path("/httpbin/get?a=1"), "/get?a=1");
}

#[test]
fn test_upstream_path_keeps_origin_base() {
    let handler = handler_for("http://localhost:3000/base/");

    assert_eq!(handler.upstream_path("/httpbin/json"), "/base/json");
}

#[test]
fn test_build_upstream_request() {
    let handler = handler_for("http://localhost:3000");
    let request = handler.build_upstream_request("/api/users");
    let request = String::from_utf8(request).unwrap();

    assert_eq!(
        request,
        "GET /api/users HTTP/1.0\r\nHost: localhost:3000\r\nConnection: close\r\n\r\n"
    );
}

#[test]
fn test_build_upstream_request_default_port() {
    let handler = handler_for("http://httpbin.org");
    let request = String::from_utf8(handler.build_upstream_request("/get")).unwrap();

    assert!(request.contains("Host: httpbin.org\r\n"));
}

#[test]
fn test_from_config_rejects_https() {
    let cfg = UpstreamConfig {
        origin: "https://httpbin.org".to_string(),
        ..UpstreamConfig::default()
    };

    assert!(ProxyHandler::from_config(&cfg).is_err());
}

#[test]
fn test_from_config_rejects_garbage() {
    let cfg = UpstreamConfig {
        origin: "not a url".to_string(),
        ..UpstreamConfig::default()
    };

    assert!(ProxyHandler::from_config(&cfg).is_err());
}

#[tokio::test]
async fn test_proxy_streams_origin_body_chunked() {
    let (origin, origin_task) = fake_origin(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"slideshow\": true}\n",
    )
    .await;
    let proxy = handler_for(&format!("http://{origin}"));
    let server = Server::serve("127.0.0.1:0", Router::new(proxy)).await.unwrap();

    let resp = exchange(server.local_addr(), b"GET /httpbin/json HTTP/1.1\r\n\r\n").await;
    let (head, body) = resp.split_once("\r\n\r\n").unwrap();

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("transfer-encoding: chunked"));
    assert!(!head.contains("content-length"));
    assert!(body.ends_with("0\r\n\r\n"));
    assert_eq!(dechunk(body), "{\"slideshow\": true}\n");

    let seen = origin_task.await.unwrap();
    assert!(seen.starts_with("GET /json HTTP/1.0\r\n"));
    assert!(seen.contains("Connection: close\r\n"));

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_proxy_relays_origin_status() {
    let (origin, _origin_task) =
        fake_origin(b"HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\n\r\nnope").await;
    let proxy = handler_for(&format!("http://{origin}"));
    let server = Server::serve("127.0.0.1:0", Router::new(proxy)).await.unwrap();

    let resp = exchange(server.local_addr(), b"GET /httpbin/missing HTTP/1.1\r\n\r\n").await;
    let (head, body) = resp.split_once("\r\n\r\n").unwrap();

    assert!(head.starts_with("HTTP/1.1 404 \r\n"));
    assert_eq!(dechunk(body), "nope");

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_origin_is_bad_gateway() {
    // Bind and release a port so nothing is listening on it.
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = closed.local_addr().unwrap();
    drop(closed);

    let proxy = handler_for(&format!("http://{origin}"));
    let server = Server::serve("127.0.0.1:0", Router::new(proxy)).await.unwrap();

    let resp = exchange(server.local_addr(), b"GET /httpbin/get HTTP/1.1\r\n\r\n").await;

    assert!(resp.starts_with("HTTP/1.1 502 \r\n"));
    assert!(resp.ends_with("\r\n\r\nBad Gateway\n"));

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_stalled_origin_body_is_not_terminated() {
    let origin = stalling_origin(Duration::from_millis(400)).await;
    let proxy = ProxyHandler::new(
        url::Url::parse(&format!("http://{origin}")).unwrap(),
        Duration::from_secs(5),
        Duration::from_millis(500),
    );
    let server = Server::serve("127.0.0.1:0", Router::new(proxy)).await.unwrap();

    let started = Instant::now();
    let resp = exchange(server.local_addr(), b"GET /httpbin/stream HTTP/1.1\r\n\r\n").await;
    let elapsed = started.elapsed();
    let (head, body) = resp.split_once("\r\n\r\n").unwrap();

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("transfer-encoding: chunked"));
    assert_eq!(body, "7\r\npartial\r\n");
    // The timeout spans both the head and the body, not each one separately.
    assert!(elapsed < Duration::from_millis(800), "took {elapsed:?}");

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_routes() {
    let server = Server::serve("127.0.0.1:0", Router::new(handler_for("http://127.0.0.1:9")))
        .await
        .unwrap();
    let addr = server.local_addr();

    let resp = exchange(addr, b"GET /yourproblem HTTP/1.1\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(resp.contains("content-type: text/html\r\n"));
    assert!(resp.contains("<h1>Bad Request</h1>"));

    let resp = exchange(addr, b"GET /myproblem HTTP/1.1\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(resp.contains("<h1>Internal Server Error</h1>"));

    let resp = exchange(addr, b"GET /anything/else HTTP/1.1\r\n\r\n").await;
    assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(resp.contains("<h1>Success!</h1>"));

    server.close().await.unwrap();
}
