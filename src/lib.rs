//! A pull-based, streaming parser for `multipart/form-data` content.
//!
//! It turns a stream of byte chunks into a sequence of [`Part`]s, each with
//! its headers, its `Content-Disposition` name and file name, and a body that
//! can be read once as a stream of chunks, as bytes or as text. Nothing is
//! read from the source before it is asked for, and memory stays bounded by
//! the configured limits no matter how the input is chunked.
//!
//! # Examples
//!
//! ```
//! use formwire::{Multipart, MultipartOptions};
//! use bytes::Bytes;
//! use std::convert::Infallible;
//! use futures_util::stream::once;
//!
//! # async fn run() {
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_file\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\nHello\r\n--X-BOUNDARY--\r\n";
//! let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
//!
//! let options = MultipartOptions::new("X-BOUNDARY").max_part_bytes(1024);
//! let mut multipart = Multipart::with_options(stream, options);
//!
//! while let Some(part) = multipart.next_part().await.unwrap() {
//!     println!("Name: {}, File name: {:?}", part.name(), part.file_name());
//!     println!("Content: {:?}", part.bytes().await.unwrap());
//! }
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run());
//! ```
//!
//! ## Optional features
//!
//! * `json`: adds [`Part::json`].
//! * `tokio-io`: adds [`Multipart::with_reader`] for tokio's `AsyncRead`.
//! * `log`: logs parser transitions through the `log` crate.

#![cfg_attr(nightly, feature(doc_cfg))]

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)+) => { log::trace!($($arg)+) };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)+) => {
        if false {
            let _ = format_args!($($arg)+);
        }
    };
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($arg:tt)+) => { log::debug!($($arg)+) };
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)+) => {
        if false {
            let _ = format_args!($($arg)+);
        }
    };
}

pub use bytes;
pub use error::Error;
pub use headers::PartHeaders;
pub use multipart::Multipart;
pub use options::MultipartOptions;
pub use part::Part;
pub use size_limit::SizeLimit;

mod buffer;
mod constants;
mod content_disposition;
mod error;
mod finder;
mod headers;
mod helpers;
mod multipart;
mod options;
mod part;
mod size_limit;
mod state;

/// A Result type often returned from methods that can have `formwire` errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parses the `Content-Type` header to extract the boundary value.
///
/// # Examples
///
/// ```
/// let content_type = "multipart/form-data; boundary=ABCDEFG";
///
/// assert_eq!(formwire::parse_boundary(content_type), Ok("ABCDEFG".to_owned()));
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .ok_or(Error::NoBoundary)
}
