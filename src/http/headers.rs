use std::collections::HashMap;

use thiserror::Error;

/// Errors produced while parsing a single header line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid header: no colon found")]
    NoColon,

    #[error("invalid header: whitespace before colon")]
    WhitespaceBeforeColon,

    #[error("invalid header: invalid character in key")]
    InvalidKeyCharacter,

    #[error("invalid header: value is not valid UTF-8")]
    InvalidValueEncoding,
}

/// Header field store.
///
/// Keys are always stored lowercased, so every lookup is case-insensitive.
/// A key parsed more than once keeps all of its values, joined with `", "`
/// in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses at most one header line from the front of `data`.
    ///
    /// Returns the number of bytes consumed and whether the blank line that
    /// ends the header block was reached. `(0, false)` means the line is not
    /// complete yet; call again once more bytes are available.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let idx = match find_crlf(data) {
            Some(idx) => idx,
            None => return Ok((0, false)),
        };

        if idx == 0 {
            return Ok((2, true));
        }

        let line = &data[..idx];
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(HeaderError::NoColon)?;

        let key = &line[..colon];
        if key.trim_ascii() != key {
            return Err(HeaderError::WhitespaceBeforeColon);
        }
        if !is_token(key) {
            return Err(HeaderError::InvalidKeyCharacter);
        }

        let value = std::str::from_utf8(line[colon + 1..].trim_ascii())
            .map_err(|_| HeaderError::InvalidValueEncoding)?;
        // A token is pure ASCII, so this conversion cannot lose anything.
        let key = String::from_utf8_lossy(key).to_ascii_lowercase();

        self.inner
            .entry(key)
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());

        Ok((idx + 2, false))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Sets a header, replacing any existing value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.inner.insert(key.to_ascii_lowercase(), value.into());
    }

    /// Removes a header, returning its value if it was present.
    pub fn delete(&mut self, key: &str) -> Option<String> {
        self.inner.remove(&key.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

/// `token = 1*tchar` (RFC 9110, section 5.6.2).
pub fn is_token(s: &[u8]) -> bool {
    !s.is_empty() && s.iter().all(|&c| is_tchar(c))
}

fn is_tchar(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_rejects_separators() {
        assert!(is_token(b"Content-Type"));
        assert!(is_token(b"x!#$%&'*+-.^_`|~9"));
        assert!(!is_token(b""));
        assert!(!is_token(b"H@st"));
        assert!(!is_token(b"a b"));
        assert!(!is_token("H©st".as_bytes()));
    }
}
