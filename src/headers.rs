use std::slice;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::{constants, helpers};

/// The headers of a single part, in the order they appeared on the wire.
///
/// Header names are case-insensitive and a name may occur more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl PartHeaders {
    pub(crate) fn with_capacity(capacity: usize) -> PartHeaders {
        PartHeaders {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.push((name, value));
    }

    /// Returns the first value of the header `name`.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns every value of the header `name`, in wire order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over all headers in wire order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.entries.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies the headers into an [`http::HeaderMap`].
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            map.append(name.clone(), value.clone());
        }
        map
    }
}

impl<'a> IntoIterator for &'a PartHeaders {
    type Item = (&'a HeaderName, &'a HeaderValue);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over [`PartHeaders`] entries.
#[derive(Debug)]
pub struct Iter<'a> {
    inner: slice::Iter<'a, (HeaderName, HeaderValue)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a HeaderName, &'a HeaderValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(n, v)| (n, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Locates the blank line ending a header block.
///
/// Returns `(block_len, consumed_len)`: the header lines including their own
/// line breaks, and that plus the blank line. Both `\r\n` and `\n` line
/// breaks are accepted.
pub(crate) fn find_header_block_end(buf: &[u8]) -> Option<(usize, usize)> {
    if buf.starts_with(b"\r\n") {
        return Some((0, 2));
    }
    if buf.starts_with(b"\n") {
        return Some((0, 1));
    }

    for idx in memchr::memchr_iter(b'\n', buf) {
        let rest = &buf[idx + 1..];
        if rest.starts_with(b"\n") {
            return Some((idx + 1, idx + 2));
        }
        if rest.starts_with(b"\r\n") {
            return Some((idx + 1, idx + 3));
        }
    }

    None
}

/// Parses the header lines of one part.
///
/// Continuation lines (starting with a space or tab) are folded into the
/// previous value and line breaks are normalised to `\r\n` before the block
/// is tokenised by `httparse`.
pub(crate) fn parse_header_block(block: &[u8]) -> crate::Result<PartHeaders> {
    let normalized = unfold_lines(block)?;

    // One slot per unfolded line; the header block limit bounds the count.
    let line_count = memchr::memchr_iter(b'\n', &normalized).count();
    let mut raw_headers = vec![httparse::EMPTY_HEADER; line_count];

    match httparse::parse_headers(&normalized, &mut raw_headers) {
        Ok(httparse::Status::Complete((_, raw_headers))) => helpers::convert_raw_headers(raw_headers),
        Ok(httparse::Status::Partial) => Err(crate::Error::invalid_headers("incomplete header block")),
        Err(err) => Err(crate::Error::invalid_headers(err.to_string())),
    }
}

fn unfold_lines(block: &[u8]) -> crate::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(block.len() + constants::CRLF.len());

    for line in block.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        if constants::is_transport_padding(line[0]) {
            if out.is_empty() {
                return Err(crate::Error::invalid_headers("continuation line without a preceding header"));
            }

            let continuation = trim_start(line);
            if !continuation.is_empty() {
                // replace the previous line break with a single space.
                out.truncate(out.len() - constants::CRLF.len());
                out.push(b' ');
                out.extend_from_slice(continuation);
                out.extend_from_slice(constants::CRLF.as_bytes());
            }
            continue;
        }

        if memchr::memchr(b':', line).is_none() {
            return Err(crate::Error::invalid_headers(format!(
                "header line without a colon: {:?}",
                String::from_utf8_lossy(line)
            )));
        }

        out.extend_from_slice(line);
        out.extend_from_slice(constants::CRLF.as_bytes());
    }

    out.extend_from_slice(constants::CRLF.as_bytes());
    Ok(out)
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| !constants::is_transport_padding(b))
        .unwrap_or(bytes.len());
    &bytes[start..]
}
