use std::fmt;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::response::StatusCode;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Where a [`ResponseWriter`] is in the response. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    AwaitingStatusLine,
    AwaitingHeaders,
    AwaitingBody,
    Done,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriterState::AwaitingStatusLine => "awaiting status line",
            WriterState::AwaitingHeaders => "awaiting headers",
            WriterState::AwaitingBody => "awaiting body",
            WriterState::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot write {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: WriterState,
    },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Emits one response onto `W`, enforcing status line, headers, body order.
///
/// A call made in the wrong state fails with [`WriteError::InvalidState`]
/// and writes nothing.
pub struct ResponseWriter<W> {
    inner: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            state: WriterState::AwaitingStatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        self.expect(WriterState::AwaitingStatusLine, "status line")?;

        let line = format!(
            "{} {} {}\r\n",
            HTTP_VERSION,
            status.as_u16(),
            status.reason_phrase()
        );
        self.inner.write_all(line.as_bytes()).await?;

        self.state = WriterState::AwaitingHeaders;
        Ok(())
    }

    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriteError> {
        self.expect(WriterState::AwaitingHeaders, "headers")?;

        let mut buf = Vec::new();
        for (k, v) in headers.iter() {
            buf.extend_from_slice(k.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(v.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");

        self.inner.write_all(&buf).await?;
        self.inner.flush().await?;

        self.state = WriterState::AwaitingBody;
        Ok(())
    }

    /// Writes the whole body in one go. Only one call per response.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<(), WriteError> {
        self.expect(WriterState::AwaitingBody, "body")?;

        self.inner.write_all(body).await?;
        self.inner.flush().await?;

        self.state = WriterState::Done;
        Ok(())
    }

    /// Writes one chunk of a `transfer-encoding: chunked` body.
    ///
    /// An empty chunk is skipped: a zero-size chunk on the wire would end
    /// the body. Use [`write_chunked_body_done`](Self::write_chunked_body_done)
    /// for that.
    pub async fn write_chunked_body(&mut self, chunk: &[u8]) -> Result<(), WriteError> {
        self.expect(WriterState::AwaitingBody, "chunked body")?;

        if chunk.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::with_capacity(chunk.len() + 12);
        buf.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        buf.extend_from_slice(chunk);
        buf.extend_from_slice(b"\r\n");

        self.inner.write_all(&buf).await?;
        Ok(())
    }

    /// Terminates a chunked body.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), WriteError> {
        self.expect(WriterState::AwaitingBody, "end of chunked body")?;

        self.inner.write_all(b"0\r\n\r\n").await?;
        self.inner.flush().await?;

        self.state = WriterState::Done;
        Ok(())
    }

    fn expect(&self, state: WriterState, operation: &'static str) -> Result<(), WriteError> {
        if self.state != state {
            return Err(WriteError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}
