use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while parsing a multipart stream and in
/// other operations.
///
/// Every variant is terminal for the parse it came from: once an error has
/// been returned, the [`Multipart`](crate::Multipart) yields no more parts.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// The input ended before any boundary was found.
    #[display(fmt = "multipart boundary not found in the stream")]
    MissingBoundary,

    /// A boundary delimiter was followed by something other than `--`,
    /// transport padding or a line break.
    #[display(fmt = "invalid characters after the multipart boundary")]
    InvalidBoundaryLine,

    /// A part's header block is malformed or lacks the `name` parameter of
    /// its `Content-Disposition` header.
    #[display(fmt = "invalid part headers: {}", reason)]
    InvalidPartHeaders { reason: String },

    /// A part's header block is larger than the configured limit.
    #[display(fmt = "part headers exceeded the maximum size limit: {} bytes", limit)]
    HeaderTooLarge { limit: u64 },

    /// A part's body is larger than the configured limit.
    #[display(
        fmt = "part '{}' exceeded the maximum size limit: {} bytes",
        "part_name.as_deref().unwrap_or(\"<unknown>\")",
        limit
    )]
    PartTooLarge { limit: u64, part_name: Option<String> },

    /// The whole stream is larger than the configured limit.
    #[display(fmt = "stream size exceeded the maximum limit: {} bytes", limit)]
    StreamTooLarge { limit: u64 },

    /// The source stream closed before the final boundary was observed.
    #[display(fmt = "incomplete multipart stream")]
    UnexpectedEndOfInput,

    /// The body is not valid text in the given encoding.
    #[display(fmt = "part body is not valid {}", encoding)]
    InvalidEncoding { encoding: &'static str },

    /// The part body was already consumed, or the parser has moved past the
    /// part.
    #[display(fmt = "part body was already consumed")]
    PartAlreadyConsumed,

    /// Reading from the source stream failed.
    #[display(fmt = "failed to read stream: {}", _0)]
    StreamReadFailed(BoxError),

    /// The `Content-Type` is not `multipart/form-data`.
    #[display(fmt = "Content-Type is not multipart/form-data")]
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`].
    #[display(fmt = "failed to decode Content-Type: {}", _0)]
    DecodeContentType(mime::FromStrError),

    /// No boundary parameter found in the `Content-Type`.
    #[display(fmt = "multipart boundary not found in Content-Type")]
    NoBoundary,

    /// Failed to decode the part body as JSON in
    /// [`part.json()`](crate::Part::json).
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    #[display(fmt = "failed to decode part data as JSON: {}", _0)]
    DecodeJson(serde_json::Error),
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StreamReadFailed(e) => Some(e.as_ref()),
            Error::DecodeContentType(e) => Some(e),
            #[cfg(feature = "json")]
            Error::DecodeJson(e) => Some(e),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

impl Error {
    pub(crate) fn invalid_headers<R: Into<String>>(reason: R) -> Self {
        Error::InvalidPartHeaders { reason: reason.into() }
    }
}
