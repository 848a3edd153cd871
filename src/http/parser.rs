use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::headers::{HeaderError, find_crlf};
use crate::http::request::{ParseState, Request, RequestLine};

/// Initial read buffer size. Kept tiny so partial reads are the normal case.
const INITIAL_BUFFER_SIZE: usize = 8;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid number of parts in request line: {0}")]
    InvalidRequestLine(usize),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid method: {0}")]
    InvalidMethod(String),

    #[error("request line is not valid UTF-8")]
    InvalidEncoding,

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("body longer than reported content length")]
    BodyTooLong,

    #[error("body shorter than reported content length")]
    BodyTooShort,

    #[error("trying to read data in a done state")]
    ReadInDoneState,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl Request {
    /// Reads and parses a single request from `reader`.
    ///
    /// Bytes are pulled into a growable buffer which doubles whenever it
    /// fills up; whatever the parser consumes is shifted out so the next read
    /// appends after the leftover.
    pub async fn from_reader<R>(reader: &mut R) -> Result<Request, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; INITIAL_BUFFER_SIZE];
        let mut read_to = 0;
        let mut req = Request::new();

        while !req.is_done() {
            if read_to >= buf.len() {
                buf.resize(buf.len() * 2, 0);
            }

            let n = reader.read(&mut buf[read_to..]).await?;
            if n == 0 {
                req.finish_at_eof()?;
                break;
            }
            read_to += n;

            let consumed = req.parse(&buf[..read_to])?;
            if consumed > 0 {
                buf.copy_within(consumed..read_to, 0);
                read_to -= consumed;
            }
        }

        Ok(req)
    }

    /// Advances the state machine as far as `data` allows.
    ///
    /// Returns the number of bytes consumed from the front of `data`. The
    /// caller keeps the rest and passes it again, with more bytes appended,
    /// on the next call.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut total = 0;

        while self.state != ParseState::Done {
            let before = self.state;
            let n = self.parse_single(&data[total..])?;
            total += n;

            // Nothing consumed and nothing moved: wait for more input.
            if n == 0 && self.state == before {
                break;
            }
        }

        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParseState::Initialized => {
                let Some((consumed, line)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = line;
                self.state = ParseState::ParsingHeaders;
                Ok(consumed)
            }

            ParseState::ParsingHeaders => {
                let (n, done) = self.headers.parse(data)?;
                if done {
                    self.state = ParseState::ParsingBody;
                }
                Ok(n)
            }

            ParseState::ParsingBody => {
                let Some(expected) = self.content_length()? else {
                    self.state = ParseState::Done;
                    return Ok(0);
                };

                self.body.extend_from_slice(data);
                if self.body.len() > expected {
                    return Err(ParseError::BodyTooLong);
                }
                if self.body.len() == expected {
                    self.state = ParseState::Done;
                }
                Ok(data.len())
            }

            ParseState::Done => Err(ParseError::ReadInDoneState),
        }
    }

    /// Handles end of stream: a declared body must already be complete.
    fn finish_at_eof(&mut self) -> Result<(), ParseError> {
        if self.state == ParseState::ParsingBody {
            if let Some(expected) = self.content_length()? {
                if self.body.len() < expected {
                    return Err(ParseError::BodyTooShort);
                }
            }
        }
        self.state = ParseState::Done;
        Ok(())
    }

    /// Declared body length, if the request carries `Content-Length`.
    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        self.headers
            .get("content-length")
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| ParseError::InvalidContentLength(v.to_string()))
            })
            .transpose()
    }
}

/// Parses the request line at the front of `data`.
///
/// `Ok(None)` means the line's CRLF has not arrived yet.
fn parse_request_line(data: &[u8]) -> Result<Option<(usize, RequestLine)>, ParseError> {
    let Some(idx) = find_crlf(data) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&data[..idx]).map_err(|_| ParseError::InvalidEncoding)?;
    let parts: Vec<&str> = line.split_whitespace().collect();

    let &[method, target, version] = parts.as_slice() else {
        return Err(ParseError::InvalidRequestLine(parts.len()));
    };

    if version != "HTTP/1.1" {
        return Err(ParseError::InvalidVersion(version.to_string()));
    }

    if !method.bytes().all(|c| c.is_ascii_uppercase()) {
        return Err(ParseError::InvalidMethod(method.to_string()));
    }

    Ok(Some((
        idx + 2,
        RequestLine {
            method: method.to_string(),
            target: target.to_string(),
            version: "1.1".to_string(),
        },
    )))
}
