use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::future;
use futures_util::ready;
use futures_util::stream::{Stream, TryStreamExt};
use spin::mutex::spin::SpinMutex as Mutex;
#[cfg(feature = "tokio-io")]
use {tokio::io::AsyncRead, tokio_util::io::ReaderStream};

use crate::buffer::StreamBuffer;
use crate::options::MultipartOptions;
use crate::part::Part;
use crate::state::MultipartState;

/// A pull-based parser over a `multipart/form-data` byte stream.
///
/// Parts are produced in wire order by [`next_part`](Self::next_part) or the
/// [`Stream`] implementation, and nothing is read from the source before it
/// is asked for.
///
/// At most one [`Part`] is live at a time: requesting the next part closes
/// the previous one and skips whatever is left of its body. Dropping the
/// `Multipart` drops the source stream right away, even while a `Part` is
/// still held; reading that part afterwards fails with
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
/// while let Some(part) = multipart.next_part().await.unwrap() {
///     println!("Part: {:?}", part.text().await)
/// }
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
pub struct Multipart<'r> {
    state: Arc<Mutex<MultipartState<'r>>>,
    strict_text: bool,
}

impl<'r> Multipart<'r> {
    /// Construct a new `Multipart` instance with the given [`Bytes`] stream
    /// and the boundary.
    pub fn new<S, O, E, B>(stream: S, boundary: B) -> Self
    where
        S: Stream<Item = Result<O, E>> + Send + 'r,
        O: Into<Bytes> + 'r,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'r,
        B: Into<String>,
    {
        Multipart::with_options(stream, MultipartOptions::new(boundary))
    }

    /// Construct a new `Multipart` instance with the given [`Bytes`] stream
    /// and options.
    pub fn with_options<S, O, E>(stream: S, options: MultipartOptions) -> Self
    where
        S: Stream<Item = Result<O, E>> + Send + 'r,
        O: Into<Bytes> + 'r,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'r,
    {
        let stream = stream
            .map_ok(|b| b.into())
            .map_err(|err| crate::Error::StreamReadFailed(err.into()));

        let MultipartOptions {
            boundary,
            size_limit,
            strict_text,
        } = options;

        let buffer = StreamBuffer::new(stream, size_limit.whole_stream);
        let state = MultipartState::new(buffer, boundary, size_limit);

        Multipart {
            state: Arc::new(Mutex::new(state)),
            strict_text,
        }
    }

    /// Construct a new `Multipart` instance with the given [`AsyncRead`]
    /// reader and the boundary.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use formwire::Multipart;
    ///
    /// # async fn run() {
    /// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let reader = data.as_bytes();
    /// let mut multipart = Multipart::with_reader(reader, "X-BOUNDARY");
    ///
    /// while let Some(mut part) = multipart.next_part().await.unwrap() {
    ///     while let Some(chunk) = part.chunk().await.unwrap() {
    ///         println!("Chunk: {:?}", chunk);
    ///     }
    /// }
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub fn with_reader<R, B>(reader: R, boundary: B) -> Self
    where
        R: AsyncRead + Unpin + Send + 'r,
        B: Into<String>,
    {
        Multipart::with_reader_with_options(reader, MultipartOptions::new(boundary))
    }

    /// Construct a new `Multipart` instance with the given [`AsyncRead`]
    /// reader and options.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub fn with_reader_with_options<R>(reader: R, options: MultipartOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'r,
    {
        let stream = ReaderStream::new(reader);
        Multipart::with_options(stream, options)
    }

    /// Yields the next [`Part`] if available.
    ///
    /// Any previous part is closed first: its unread body bytes are skipped.
    /// Returns `Ok(None)` once the final boundary has been seen and the
    /// epilogue drained, and after an error has been returned.
    ///
    /// For more info, go to [`Part`](Part#warning-about-leaks).
    pub async fn next_part(&mut self) -> crate::Result<Option<Part<'r>>> {
        future::poll_fn(|cx| self.poll_next_part(cx)).await
    }

    /// Polls for the next [`Part`]. See [`next_part`](Self::next_part).
    pub fn poll_next_part(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<Option<Part<'r>>>> {
        let res = {
            let mut state = self.state.lock();
            ready!(state.poll_next_part(cx))
        };

        Poll::Ready(res.map(|head| head.map(|head| Part::new(Arc::clone(&self.state), head, self.strict_text))))
    }

    /// Yields the next [`Part`] with its positioning index as a tuple
    /// `(usize, Part)`.
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
    /// while let Some((idx, part)) = multipart.next_part_with_idx().await.unwrap() {
    ///     println!("Index: {:?}, Content: {:?}", idx, part.text().await)
    /// }
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    pub async fn next_part_with_idx(&mut self) -> crate::Result<Option<(usize, Part<'r>)>> {
        self.next_part().await.map(|part| part.map(|part| (part.index(), part)))
    }
}

impl Drop for Multipart<'_> {
    fn drop(&mut self) {
        self.state.lock().abandon();
    }
}

impl<'r> Stream for Multipart<'r> {
    type Item = crate::Result<Part<'r>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match ready!(self.get_mut().poll_next_part(cx)) {
            Ok(Some(part)) => Poll::Ready(Some(Ok(part))),
            Ok(None) => Poll::Ready(None),
            Err(err) => Poll::Ready(Some(Err(err))),
        }
    }
}
