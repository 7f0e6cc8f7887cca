use crate::constants;
use bytes::Bytes;
use memchr::memmem;
use std::ops::Range;

/// An immutable view over a fully received multipart body.
///
/// Slicing hands out [`Bytes`] that share the underlying allocation, so part
/// bodies are never copied out of the request.
pub(crate) struct StreamBuffer {
    pub(crate) buf: Bytes,
}

impl StreamBuffer {
    pub fn new(buf: Bytes) -> Self {
        StreamBuffer { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns the offset of every `--{boundary}` delimiter in the buffer.
    ///
    /// A match only counts when it starts a line (offset zero or right after
    /// CRLF) and is followed by CRLF, `--`, or the end of the buffer.
    pub fn delimiter_positions(&self, boundary: &str) -> Vec<usize> {
        let delimiter = format!("{}{}", constants::BOUNDARY_EXT, boundary);
        let finder = memmem::Finder::new(delimiter.as_bytes());

        let mut positions = Vec::new();
        let mut from = 0;

        while let Some(rel_idx) = finder.find(&self.buf[from..]) {
            let idx = from + rel_idx;
            let end = idx + delimiter.len();

            if self.starts_line(idx) && self.ends_delimiter(end) {
                positions.push(idx);
                from = end;
            } else {
                from = idx + 1;
            }
        }

        positions
    }

    /// Whether the bytes at `idx` are the `--` suffix of a closing delimiter.
    pub fn is_closing_at(&self, idx: usize) -> bool {
        self.buf[idx..].starts_with(constants::BOUNDARY_EXT.as_bytes())
    }

    pub fn has_crlf_at(&self, idx: usize) -> bool {
        self.buf[idx..].starts_with(constants::CRLF.as_bytes())
    }

    pub fn slice(&self, range: Range<usize>) -> Bytes {
        self.buf.slice(range)
    }

    fn starts_line(&self, idx: usize) -> bool {
        idx == 0 || (idx >= 2 && &self.buf[idx - 2..idx] == constants::CRLF.as_bytes())
    }

    fn ends_delimiter(&self, end: usize) -> bool {
        end == self.buf.len() || self.has_crlf_at(end) || self.is_closing_at(end)
    }
}

/// Finds the first occurrence of `needle` in `haystack`.
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    memmem::find(haystack, needle)
}
