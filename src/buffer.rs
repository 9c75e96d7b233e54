use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use futures_util::stream::{self, Stream};

use crate::constants;
use crate::finder::BoundaryFinder;

/// Pulls chunks from the source stream on demand and holds the bytes that
/// have not been handed out yet.
///
/// While a part body is streamed, the held bytes never outgrow one chunk plus
/// the withheld tail that might be the start of a split delimiter.
pub(crate) struct StreamBuffer<'r> {
    pub(crate) eof: bool,
    pub(crate) buf: BytesMut,
    pub(crate) stream: Pin<Box<dyn Stream<Item = Result<Bytes, crate::Error>> + Send + 'r>>,
    pub(crate) whole_stream_size_limit: u64,
    pub(crate) stream_size_counter: u64,
}

impl<'r> StreamBuffer<'r> {
    pub fn new<S>(stream: S, whole_stream_size_limit: u64) -> Self
    where
        S: Stream<Item = Result<Bytes, crate::Error>> + Send + 'r,
    {
        // The first delimiter may sit at the very start of the message without
        // its leading line break; seeding one lets a single search cover both.
        let mut buf = BytesMut::with_capacity(constants::CRLF.len());
        buf.extend_from_slice(constants::CRLF.as_bytes());

        StreamBuffer {
            eof: false,
            buf,
            stream: Box::pin(stream),
            whole_stream_size_limit,
            stream_size_counter: 0,
        }
    }

    /// Pulls at most one chunk from the source.
    ///
    /// `Ready(Ok(()))` means either new bytes were appended or the source
    /// reached its end; the caller re-examines the buffer in both cases.
    pub fn poll_stream(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), crate::Error>> {
        if self.eof {
            return Poll::Ready(Ok(()));
        }

        match self.stream.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(data))) => {
                self.stream_size_counter += data.len() as u64;

                if self.stream_size_counter > self.whole_stream_size_limit {
                    return Poll::Ready(Err(crate::Error::StreamTooLarge {
                        limit: self.whole_stream_size_limit,
                    }));
                }

                self.buf.extend_from_slice(&data);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Err(err)),
            Poll::Ready(None) => {
                self.eof = true;
                Poll::Ready(Ok(()))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    /// Drops everything up to the first delimiter, leaving `--{boundary}` at
    /// the front of the buffer. Returns `false` if no delimiter is buffered
    /// yet, in which case only the ambiguous tail is kept.
    pub fn skip_to_boundary(&mut self, finder: &BoundaryFinder) -> bool {
        match finder.find(&self.buf) {
            Some(idx) => {
                self.buf.advance(idx + constants::CRLF.len());
                true
            }
            None => {
                let keep = finder.ambiguous_suffix_len(&self.buf);
                self.buf.advance(self.buf.len() - keep);
                false
            }
        }
    }

    /// Hands out body bytes that are known not to belong to a delimiter.
    ///
    /// Returns `Some((true, bytes))` with the last bytes of the body once the
    /// delimiter is found, leaving `--{boundary}` at the front of the buffer.
    /// Returns `Some((false, bytes))` for an intermediate span and `None` if
    /// every buffered byte might still be the start of a delimiter.
    pub fn read_part_data(&mut self, finder: &BoundaryFinder) -> crate::Result<Option<(bool, Bytes)>> {
        match finder.find(&self.buf) {
            Some(idx) => {
                let bytes = self.buf.split_to(idx).freeze();

                // discard \r\n.
                self.buf.advance(constants::CRLF.len());

                Ok(Some((true, bytes)))
            }
            None => {
                if self.eof {
                    return Err(crate::Error::UnexpectedEndOfInput);
                }

                let safe_len = self.buf.len() - finder.ambiguous_suffix_len(&self.buf);

                if safe_len == 0 {
                    Ok(None)
                } else {
                    Ok(Some((false, self.buf.split_to(safe_len).freeze())))
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drops the source stream and everything buffered from it.
    pub fn release(&mut self) {
        self.eof = true;
        self.buf.clear();
        self.stream = Box::pin(stream::empty());
    }
}
