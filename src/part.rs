use std::fmt::{self, Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use futures_util::future;
use futures_util::ready;
use futures_util::stream::{FusedStream, Stream};
use http::header;
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;
use spin::mutex::spin::SpinMutex as Mutex;

use crate::constants;
use crate::headers::PartHeaders;
use crate::state::{MultipartState, PartHead};

/// A single part of a `multipart/form-data` stream: its headers, the fields
/// of its `Content-Disposition` and a body that can be read once.
///
/// # Examples
///
/// ```
/// use formwire::Multipart;
/// use bytes::Bytes;
/// use std::convert::Infallible;
/// use futures_util::stream::once;
///
/// # async fn run() {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
/// let mut multipart = Multipart::new(stream, "X-BOUNDARY");
///
/// while let Some(part) = multipart.next_part().await.unwrap() {
///     let content = part.text().await.unwrap();
///     assert_eq!(content, "abcd");
/// }
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
///
/// ## Warning About Leaks
///
/// A `Part` borrows the byte source of its [`Multipart`](crate::Multipart)
/// and is only valid until the next part is requested. Requesting the next
/// part closes this one: body bytes that were not read yet are skipped and
/// any later read fails with
/// [`Error::PartAlreadyConsumed`](crate::Error::PartAlreadyConsumed). Read a
/// part's body before advancing if you need it.
pub struct Part<'r> {
    state: Arc<Mutex<MultipartState<'r>>>,
    headers: PartHeaders,
    body: BodyState,
    meta: PartMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    Unread,
    Streaming,
    // The last bytes were handed out; the next read reports the end.
    Ended,
    Consumed,
}

struct PartMeta {
    name: String,
    file_name: Option<String>,
    media_type: Option<String>,
    content_type: Option<mime::Mime>,
    strict_text: bool,
    idx: usize,
}

impl<'r> Part<'r> {
    pub(crate) fn new(state: Arc<Mutex<MultipartState<'r>>>, head: PartHead, strict_text: bool) -> Self {
        let PartHead {
            idx,
            headers,
            disposition,
        } = head;

        let explicit_type = headers
            .get(header::CONTENT_TYPE.as_str())
            .and_then(|val| std::str::from_utf8(val.as_bytes()).ok())
            .map(|val| val.trim().to_owned());

        let media_type = match (explicit_type, disposition.file_name.is_some()) {
            (Some(media_type), _) => Some(media_type),
            (None, false) => Some(constants::DEFAULT_TEXT_MEDIA_TYPE.to_owned()),
            (None, true) => None,
        };

        let content_type = media_type.as_deref().and_then(|val| val.parse::<mime::Mime>().ok());

        Part {
            state,
            headers,
            body: BodyState::Unread,
            meta: PartMeta {
                name: disposition.field_name,
                file_name: disposition.file_name,
                media_type,
                content_type,
                strict_text,
                idx,
            },
        }
    }

    /// The `name` parameter of the `Content-Disposition` header.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// The `filename` parameter of the `Content-Disposition` header, or the
    /// decoded `filename*` parameter when both are present.
    pub fn file_name(&self) -> Option<&str> {
        self.meta.file_name.as_deref()
    }

    /// Whether a file name parameter was present, even an empty one.
    pub fn is_file(&self) -> bool {
        self.meta.file_name.is_some()
    }

    /// The `Content-Type` header of the part.
    ///
    /// Defaults to `text/plain` for parts that are not files. File parts
    /// without a `Content-Type` have no media type; the caller decides.
    pub fn media_type(&self) -> Option<&str> {
        self.meta.media_type.as_deref()
    }

    /// The media type parsed as [`mime::Mime`], if it is well formed.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.meta.content_type.as_ref()
    }

    /// All headers of the part, in wire order.
    pub fn headers(&self) -> &PartHeaders {
        &self.headers
    }

    /// The position of the part in the stream, starting at zero.
    pub fn index(&self) -> usize {
        self.meta.idx
    }

    /// Reads the whole body into one buffer.
    ///
    /// Fails with [`Error::PartTooLarge`](crate::Error::PartTooLarge) if a
    /// size limit is exceeded, and with
    /// [`Error::PartAlreadyConsumed`](crate::Error::PartAlreadyConsumed) if
    /// the body was already partially read through [`chunk`](Self::chunk).
    pub async fn bytes(mut self) -> crate::Result<Bytes> {
        if self.body != BodyState::Unread {
            return Err(crate::Error::PartAlreadyConsumed);
        }

        let mut buf = BytesMut::new();

        while let Some(bytes) = self.chunk().await? {
            buf.extend_from_slice(&bytes);
        }

        Ok(buf.freeze())
    }

    /// Reads the next chunk of the body.
    ///
    /// Returns `Ok(None)` once the body ended. Reading again after that, or
    /// after the next part has been requested, fails with
    /// [`Error::PartAlreadyConsumed`](crate::Error::PartAlreadyConsumed).
    ///
    /// # Examples
    ///
    /// ```
    /// use formwire::Multipart;
    /// use bytes::Bytes;
    /// use std::convert::Infallible;
    /// use futures_util::stream::once;
    ///
    /// # async fn run() {
    /// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let stream = once(async move { Result::<Bytes, Infallible>::Ok(Bytes::from(data)) });
    /// let mut multipart = Multipart::new(stream, "X-BOUNDARY");
    ///
    /// while let Some(mut part) = multipart.next_part().await.unwrap() {
    ///     while let Some(chunk) = part.chunk().await.unwrap() {
    ///         println!("Chunk: {:?}", chunk);
    ///     }
    /// }
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    pub async fn chunk(&mut self) -> crate::Result<Option<Bytes>> {
        future::poll_fn(|cx| self.poll_chunk(cx)).await
    }

    /// Polls for the next chunk of the body. See [`chunk`](Self::chunk).
    pub fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<Option<Bytes>>> {
        match self.body {
            BodyState::Consumed => return Poll::Ready(Err(crate::Error::PartAlreadyConsumed)),
            BodyState::Ended => {
                self.body = BodyState::Consumed;
                return Poll::Ready(Ok(None));
            }
            BodyState::Unread | BodyState::Streaming => {}
        }

        self.body = BodyState::Streaming;

        let res = {
            let mut state = self.state.lock();
            ready!(state.poll_part_chunk(cx, self.meta.idx))
        };

        match res {
            Ok((false, bytes)) => Poll::Ready(Ok(Some(bytes))),
            Ok((true, bytes)) if bytes.is_empty() => {
                self.body = BodyState::Consumed;
                Poll::Ready(Ok(None))
            }
            Ok((true, bytes)) => {
                self.body = BodyState::Ended;
                Poll::Ready(Ok(Some(bytes)))
            }
            Err(err) => {
                self.body = BodyState::Consumed;
                Poll::Ready(Err(err))
            }
        }
    }

    /// Reads the body as JSON.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub async fn json<T: DeserializeOwned>(self) -> crate::Result<T> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(crate::Error::DecodeJson)
    }

    /// Reads the body as text.
    ///
    /// The `charset` parameter of the part's `Content-Type` selects the
    /// encoding, UTF-8 otherwise. Malformed input fails with
    /// [`Error::InvalidEncoding`](crate::Error::InvalidEncoding) unless
    /// strict text decoding was turned off in the
    /// [`MultipartOptions`](crate::MultipartOptions).
    pub async fn text(self) -> crate::Result<String> {
        let strict = self.meta.strict_text;
        let encoding = self.encoding_or(UTF_8);
        let bytes = self.bytes().await?;

        if strict {
            encoding
                .decode_without_bom_handling_and_without_replacement(&bytes)
                .map(|text| text.into_owned())
                .ok_or(crate::Error::InvalidEncoding {
                    encoding: encoding.name(),
                })
        } else {
            let (text, _, _) = encoding.decode(&bytes);
            Ok(text.into_owned())
        }
    }

    /// Reads the body as text, falling back to `default_encoding` when the
    /// part declares no known charset. Malformed input is always replaced
    /// with U+FFFD.
    pub async fn text_with_charset(self, default_encoding: &str) -> crate::Result<String> {
        let default = Encoding::for_label(default_encoding.as_bytes()).unwrap_or(UTF_8);
        let encoding = self.encoding_or(default);

        let bytes = self.bytes().await?;
        let (text, _, _) = encoding.decode(&bytes);

        Ok(text.into_owned())
    }

    fn encoding_or(&self, default: &'static Encoding) -> &'static Encoding {
        self.content_type()
            .and_then(|mime| mime.get_param(mime::CHARSET))
            .and_then(|charset| Encoding::for_label(charset.as_str().as_bytes()))
            .unwrap_or(default)
    }
}

/// The stream ends for good once the body was read to its end or a read
/// failed; [`chunk`](Part::chunk) keeps reporting misuse as an error instead.
impl Stream for Part<'_> {
    type Item = crate::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.body == BodyState::Consumed {
            return Poll::Ready(None);
        }

        match ready!(this.poll_chunk(cx)) {
            Ok(Some(bytes)) => Poll::Ready(Some(Ok(bytes))),
            Ok(None) => Poll::Ready(None),
            Err(err) => Poll::Ready(Some(Err(err))),
        }
    }
}

impl FusedStream for Part<'_> {
    fn is_terminated(&self) -> bool {
        self.body == BodyState::Consumed
    }
}

impl Debug for Part<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("index", &self.meta.idx)
            .field("name", &self.meta.name)
            .field("file_name", &self.meta.file_name)
            .field("media_type", &self.meta.media_type)
            .field("headers", &self.headers)
            .finish()
    }
}
