pub(crate) const DEFAULT_WHOLE_STREAM_SIZE_LIMIT: u64 = u64::MAX;
pub(crate) const DEFAULT_PER_PART_SIZE_LIMIT: u64 = u64::MAX;
pub(crate) const DEFAULT_PER_FILE_SIZE_LIMIT: u64 = u64::MAX;
pub(crate) const DEFAULT_HEADER_BLOCK_SIZE_LIMIT: u64 = 8 * 1024;

pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CRLF: &str = "\r\n";

pub(crate) const DEFAULT_TEXT_MEDIA_TYPE: &str = "text/plain";

/// The delimiter searched for inside the stream: `\r\n--{boundary}`.
pub(crate) fn boundary_delimiter(boundary: &str) -> Vec<u8> {
    format!("{}{}{}", CRLF, BOUNDARY_EXT, boundary).into_bytes()
}

/// Linear whitespace allowed between a boundary and its line break.
pub(crate) fn is_transport_padding(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}
