use crate::http::headers::Headers;

/// Progress of the incremental request parser.
///
/// The parser only ever moves forward through these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Waiting for the request line.
    Initialized,
    /// Request line read; consuming header lines.
    ParsingHeaders,
    /// Blank line seen; accumulating the body.
    ParsingBody,
    /// The request is complete.
    Done,
}

/// The first line of an HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    /// Request method, e.g. `GET`. Uppercase ASCII letters only.
    pub method: String,
    /// Request target as sent by the client (e.g. `/search?q=rust`).
    pub target: String,
    /// HTTP version without the `HTTP/` prefix. Always `"1.1"`.
    pub version: String,
}

/// A request as reconstructed from the wire.
///
/// Built up by [`Request::from_reader`] (or by feeding bytes to
/// [`Request::parse`]); once the state reaches [`ParseState::Done`] the
/// parser never touches it again.
#[derive(Debug, Clone)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub(crate) state: ParseState,
}

impl Request {
    /// Creates an empty request, ready to consume its request line.
    pub fn new() -> Self {
        Self {
            request_line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),
            state: ParseState::Initialized,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
