use std::str::FromStr;

use crate::foundation::error::{IngestError, IngestResult};

/// Cursor over the ASCII header of a simple text-prefixed format.
pub(crate) struct HeaderReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Next whitespace-delimited token.
    pub(crate) fn token(&mut self) -> IngestResult<&'a str> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.bytes.len() && !self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(IngestError::decode("unexpected end of header"));
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| IngestError::decode("header is not valid text"))
    }

    /// Next token parsed as `T`; `what` names the field in errors.
    pub(crate) fn parse<T: FromStr>(&mut self, what: &str) -> IngestResult<T> {
        let token = self.token()?;
        token
            .parse()
            .map_err(|_| IngestError::decode(format!("invalid {what} '{token}'")))
    }

    /// Leading decimal digits after optional whitespace, stopping at the first non-digit.
    pub(crate) fn digits(&mut self, what: &str) -> IngestResult<usize> {
        self.skip_whitespace();
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IngestError::decode(format!("missing {what}")))
    }

    /// Exactly `len` raw bytes.
    pub(crate) fn take(&mut self, len: usize) -> IngestResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.bytes.len()).ok_or_else(|| {
            IngestError::decode(format!(
                "not enough bytes to read ({} vs {len})",
                self.bytes.len() - self.pos
            ))
        })?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Consume bytes up to and including the next line break.
    pub(crate) fn skip_line(&mut self) {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            self.pos += 1;
            if b == b'\n' || b == b'\r' {
                break;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }
}
