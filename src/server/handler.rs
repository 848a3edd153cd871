use std::future::Future;

use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::{ResponseWriter, WriteError};

/// Produces the response for a parsed request.
///
/// The writer handed in is fresh: nothing has been sent yet. On `Ok(())` the
/// handler is expected to have driven the writer all the way to
/// [`WriterState::Done`](crate::http::writer::WriterState::Done); the
/// connection writes nothing more. On `Err` the connection sends a canned
/// response built from the [`HandlerError`] instead.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        req: &Request,
        w: &mut ResponseWriter<W>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

/// A status code and plain-text message to answer with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status_code}: {message}")]
pub struct HandlerError {
    pub status_code: StatusCode,
    pub message: String,
}

impl HandlerError {
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// The response sent when a request cannot be parsed.
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request\n")
    }

    /// Writes this error as a complete `text/plain` response.
    pub async fn write_to<W>(&self, w: &mut ResponseWriter<W>) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        w.write_status_line(self.status_code).await?;
        w.write_headers(&default_headers(self.message.len())).await?;
        w.write_body(self.message.as_bytes()).await
    }
}

impl From<WriteError> for HandlerError {
    fn from(e: WriteError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n"))
    }
}
