use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::http::parser::ParseError;
use crate::http::request::Request;
use crate::http::writer::{ResponseWriter, WriterState};
use crate::server::handler::{Handler, HandlerError};

/// One accepted connection, serving exactly one request.
pub struct Connection<S> {
    stream: S,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Handling(Request),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: ConnectionState::Reading,
        }
    }

    /// Reads the request, answers it through `handler` and shuts the
    /// stream down, whatever the outcome.
    pub async fn run<H: Handler>(mut self, handler: &H) -> anyhow::Result<()> {
        let result = self.exchange(handler).await;

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Shutdown after response failed");
        }

        result
    }

    async fn exchange<H: Handler>(&mut self, handler: &H) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match Request::from_reader(&mut self.stream).await {
                    Ok(req) => {
                        self.state = ConnectionState::Handling(req);
                    }

                    Err(ParseError::Io(e)) => {
                        return Err(e).context("reading request");
                    }

                    Err(e) => {
                        warn!(error = %e, "Malformed request");
                        let mut w = ResponseWriter::new(&mut self.stream);
                        HandlerError::bad_request()
                            .write_to(&mut w)
                            .await
                            .context("writing 400 response")?;
                    }
                },

                ConnectionState::Handling(req) => {
                    debug!(method = req.method(), target = req.target(), "Handling request");

                    let mut w = ResponseWriter::new(&mut self.stream);
                    match handler.handle(&req, &mut w).await {
                        Ok(()) if w.state() != WriterState::Done => {
                            warn!(state = %w.state(), "Handler returned before finishing the response");
                        }
                        Ok(()) => {}
                        Err(herr) => Self::write_handler_error(&mut w, &herr).await?,
                    }
                }

                ConnectionState::Closed => return Ok(()),
            }
        }
    }

    async fn write_handler_error(
        w: &mut ResponseWriter<&mut S>,
        herr: &HandlerError,
    ) -> anyhow::Result<()> {
        // Once the status line is out a second one cannot be framed.
        if w.state() != WriterState::AwaitingStatusLine {
            warn!(
                status = herr.status_code.as_u16(),
                state = %w.state(),
                "Handler failed after the response had started"
            );
            return Ok(());
        }

        debug!(status = herr.status_code.as_u16(), "Handler returned an error");
        herr.write_to(w)
            .await
            .context("writing handler error response")
    }
}
