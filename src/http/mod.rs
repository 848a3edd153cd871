//! HTTP/1.1 protocol implementation.
//!
//! Requests are parsed incrementally straight off the socket and responses
//! are emitted through a writer that enforces message framing. Every
//! connection carries exactly one request/response pair and is then closed.
//!
//! # Architecture
//!
//! - **`headers`**: case-normalizing header store and header-line parser
//! - **`request`**: the request data model and parser state
//! - **`parser`**: the incremental request parser and its read loop
//! - **`response`**: status codes and the default response headers
//! - **`writer`**: the response writer state machine, incl. chunked bodies
//! - **`connection`**: drives one parser/writer pair for an accepted socket
//!
//! # Request parser
//!
//! ```text
//!   ┌─────────────┐  request line   ┌────────────────┐
//!   │ Initialized │ ──────────────▶ │ ParsingHeaders │ ◀─┐ header line
//!   └─────────────┘                 └───────┬────────┘ ──┘
//!                                           │ blank line
//!                                           ▼
//!   ┌──────┐   body complete /      ┌─────────────┐
//!   │ Done │ ◀───────────────────── │ ParsingBody │
//!   └──────┘   no Content-Length    └─────────────┘
//! ```
//!
//! # Response writer
//!
//! ```text
//!   AwaitingStatusLine ─▶ AwaitingHeaders ─▶ AwaitingBody ─▶ Done
//!                                              │    ▲
//!                                              └────┘ chunk
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rawhttp::http::request::Request;
//! use rawhttp::http::response::{StatusCode, default_headers};
//! use rawhttp::http::writer::ResponseWriter;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:42069").await?;
//!     let (mut socket, _addr) = listener.accept().await?;
//!
//!     let req = Request::from_reader(&mut socket).await?;
//!     let body = format!("you asked for {}\n", req.target());
//!
//!     let mut w = ResponseWriter::new(socket);
//!     w.write_status_line(StatusCode::OK).await?;
//!     w.write_headers(&default_headers(body.len())).await?;
//!     w.write_body(body.as_bytes()).await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
