//! Upstream forwarding
//!
//! Relays a request to a plain-HTTP origin and streams the origin's body
//! back to the client with chunked transfer coding.

use std::time::Duration;

use anyhow::{Context, Result};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::ResponseWriter;
use crate::server::handler::{Handler, HandlerError};

/// Request targets under this prefix are forwarded.
pub const PREFIX: &str = "/httpbin";

/// Read size when relaying the origin's body.
const RELAY_CHUNK_SIZE: usize = 1024;
const HEAD_BUFFER_SIZE: usize = 8192;
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Forwards `/httpbin/...` requests to an origin server.
pub struct ProxyHandler {
    origin: Url,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ProxyHandler {
    pub fn new(origin: Url, connect_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            origin,
            connect_timeout,
            request_timeout,
        }
    }

    pub fn from_config(cfg: &UpstreamConfig) -> Result<Self> {
        let origin = Url::parse(&cfg.origin).context("Invalid upstream origin URL")?;
        if origin.scheme() != "http" {
            anyhow::bail!("Unsupported upstream scheme: {}", origin.scheme());
        }
        origin.host_str().context("Upstream origin missing host")?;

        Ok(Self::new(
            origin,
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.request_timeout_secs),
        ))
    }

    /// Maps a client request target onto the origin, dropping [`PREFIX`].
    pub fn upstream_path(&self, target: &str) -> String {
        let rest = target.strip_prefix(PREFIX).unwrap_or(target);
        let base = self.origin.path().trim_end_matches('/');

        match rest {
            "" => format!("{base}/"),
            r if r.starts_with('/') => format!("{base}{r}"),
            r => format!("{base}/{r}"),
        }
    }

    /// Builds the request bytes sent to the origin.
    ///
    /// HTTP/1.0 keeps the origin from chunking its own response, so its body
    /// can be relayed as-is.
    pub fn build_upstream_request(&self, path: &str) -> Vec<u8> {
        let host = match (self.origin.host_str(), self.origin.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        format!("GET {path} HTTP/1.0\r\nHost: {host}\r\nConnection: close\r\n\r\n").into_bytes()
    }

    /// Sends the request and reads the origin's response head.
    ///
    /// Returns the connected stream, the origin's status and whatever body
    /// bytes arrived together with the head.
    async fn open(&self, path: &str) -> Result<(TcpStream, StatusCode, BytesMut)> {
        let host = self.origin.host_str().context("Upstream origin missing host")?;
        let port = self.origin.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}");

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to origin")?;

        stream.write_all(&self.build_upstream_request(path)).await?;
        stream.flush().await?;

        let mut buffer = BytesMut::with_capacity(HEAD_BUFFER_SIZE);
        loop {
            let n = stream.read_buf(&mut buffer).await?;
            if n == 0 {
                anyhow::bail!("Connection closed before response head received");
            }

            if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = buffer.split_to(end + 4);
                let status = parse_status_line(&head)?;
                return Ok((stream, status, buffer));
            }

            if buffer.len() > MAX_HEAD_SIZE {
                anyhow::bail!("Response head too large");
            }
        }
    }

    async fn relay_body<W>(
        &self,
        stream: &mut TcpStream,
        leftover: BytesMut,
        w: &mut ResponseWriter<W>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        w.write_chunked_body(&leftover).await?;

        let mut buf = [0u8; RELAY_CHUNK_SIZE];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            debug!(bytes = n, "Read chunk from origin");
            w.write_chunked_body(&buf[..n]).await?;
        }
    }
}

impl Handler for ProxyHandler {
    async fn handle<W>(&self, req: &Request, w: &mut ResponseWriter<W>) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let path = self.upstream_path(req.target());
        info!(origin = %self.origin, path = %path, "Proxying request");

        // One deadline covers the whole exchange with the origin.
        let deadline = Instant::now() + self.request_timeout;

        let opened = timeout_at(deadline, self.open(&path))
            .await
            .context("Request timeout")
            .and_then(|r| r);

        let (mut stream, status, leftover) = match opened {
            Ok(v) => v,
            Err(e) => {
                warn!(origin = %self.origin, error = %format!("{e:#}"), "Origin request failed");
                return Err(HandlerError::new(StatusCode::BAD_GATEWAY, "Bad Gateway\n"));
            }
        };

        w.write_status_line(status).await?;

        let mut headers = default_headers(0);
        headers.delete("content-length");
        headers.set("transfer-encoding", "chunked");
        w.write_headers(&headers).await?;

        let relayed = timeout_at(deadline, self.relay_body(&mut stream, leftover, w))
            .await
            .context("Request timeout")
            .and_then(|r| r);

        // Without the terminating chunk the client can tell the body was cut off.
        if let Err(e) = relayed {
            warn!(origin = %self.origin, error = %format!("{e:#}"), "Relaying origin body failed");
            return Err(HandlerError::new(StatusCode::BAD_GATEWAY, "Bad Gateway\n"));
        }

        w.write_chunked_body_done().await?;
        Ok(())
    }
}

/// Extracts the status code from a response head (`HTTP/1.x NNN reason`).
pub fn parse_status_line(head: &[u8]) -> Result<StatusCode> {
    let head = std::str::from_utf8(head).context("Invalid UTF-8 in response head")?;
    let line = head.lines().next().context("Empty response")?;

    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        anyhow::bail!("Invalid status line: {}", line);
    }

    let code = parts.next().context("Status line missing code")?;
    if code.len() != 3 {
        anyhow::bail!("Invalid status code: {}", code);
    }
    let code: u16 = code.parse().context("Invalid status code")?;

    Ok(StatusCode(code))
}
