use crate::size_limit::SizeLimit;

/// Everything one parse needs besides the byte stream: the boundary, the
/// size limits and how part bodies are decoded as text.
///
/// # Examples
///
/// ```
/// use formwire::{MultipartOptions, SizeLimit};
///
/// let options = MultipartOptions::new("X-BOUNDARY")
///     .max_header_bytes(4 * 1024)
///     .max_part_bytes(64 * 1024)
///     .max_file_bytes(10 * 1024 * 1024)
///     .size_limit(SizeLimit::new().whole_stream(20 * 1024 * 1024).per_part(64 * 1024));
///
/// assert_eq!(options.boundary(), "X-BOUNDARY");
/// ```
#[derive(Debug, Clone)]
pub struct MultipartOptions {
    pub(crate) boundary: String,
    pub(crate) size_limit: SizeLimit,
    pub(crate) strict_text: bool,
}

impl MultipartOptions {
    /// Creates options for the given boundary, as found in the
    /// `Content-Type: multipart/form-data; boundary=...` parameter.
    pub fn new<B: Into<String>>(boundary: B) -> MultipartOptions {
        MultipartOptions {
            boundary: boundary.into(),
            size_limit: SizeLimit::default(),
            strict_text: true,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Limits the header block of each part.
    pub fn max_header_bytes(mut self, limit: u64) -> MultipartOptions {
        self.size_limit = self.size_limit.header_block(limit);
        self
    }

    /// Limits the body of each part.
    pub fn max_part_bytes(mut self, limit: u64) -> MultipartOptions {
        self.size_limit = self.size_limit.per_part(limit);
        self
    }

    /// Limits the body of each file part.
    pub fn max_file_bytes(mut self, limit: u64) -> MultipartOptions {
        self.size_limit = self.size_limit.per_file(limit);
        self
    }

    /// Replaces all size limits at once.
    pub fn size_limit(mut self, size_limit: SizeLimit) -> MultipartOptions {
        self.size_limit = size_limit;
        self
    }

    /// Whether [`Part::text`](crate::Part::text) rejects malformed input with
    /// [`Error::InvalidEncoding`](crate::Error::InvalidEncoding) (the default)
    /// or replaces it with U+FFFD.
    pub fn strict_text(mut self, strict: bool) -> MultipartOptions {
        self.strict_text = strict;
        self
    }
}
