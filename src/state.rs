use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use futures_util::ready;

use crate::buffer::StreamBuffer;
use crate::constants;
use crate::content_disposition::ContentDisposition;
use crate::finder::BoundaryFinder;
use crate::headers::{self, PartHeaders};
use crate::size_limit::SizeLimit;

pub(crate) struct MultipartState<'r> {
    pub(crate) buffer: StreamBuffer<'r>,
    pub(crate) finder: BoundaryFinder,
    pub(crate) boundary: String,
    pub(crate) size_limit: SizeLimit,
    pub(crate) stage: StreamingStage,
    pub(crate) next_part_idx: usize,
    // The part whose body may currently be read. Cleared as soon as the body
    // ends or the parser moves on.
    pub(crate) curr_part_idx: Option<usize>,
    pub(crate) curr_part_name: Option<String>,
    pub(crate) curr_part_size_limit: u64,
    pub(crate) curr_part_size_counter: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamingStage {
    FindingFirstBoundary,
    ReadingBoundary,
    ReadingPartHeaders,
    ReadingPartData,
    ReadingEpilogue,
    Eof,
    Failed,
}

/// Everything known about a part once its header block has been parsed.
pub(crate) struct PartHead {
    pub(crate) idx: usize,
    pub(crate) headers: PartHeaders,
    pub(crate) disposition: ContentDisposition,
}

impl<'r> MultipartState<'r> {
    pub(crate) fn new(buffer: StreamBuffer<'r>, boundary: String, size_limit: SizeLimit) -> Self {
        let finder = BoundaryFinder::new(constants::boundary_delimiter(&boundary));

        MultipartState {
            buffer,
            finder,
            boundary,
            size_limit,
            stage: StreamingStage::FindingFirstBoundary,
            next_part_idx: 0,
            curr_part_idx: None,
            curr_part_name: None,
            curr_part_size_limit: constants::DEFAULT_PER_PART_SIZE_LIMIT,
            curr_part_size_counter: 0,
        }
    }

    /// Drives the parser up to the next header block.
    ///
    /// A body that was not read to its end is drained and its bytes are
    /// discarded first. `Ok(None)` means the final boundary was seen and the
    /// epilogue was drained, or that the parse already failed.
    pub(crate) fn poll_next_part(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<Option<PartHead>>> {
        let res = ready!(self.advance_to_next_part(cx));

        if let Err(ref err) = res {
            self.fail(err);
        }

        Poll::Ready(res)
    }

    /// Reads the next span of the body of the part at `idx`.
    ///
    /// Returns `(true, bytes)` with the last span once the delimiter ending
    /// the body has been found.
    pub(crate) fn poll_part_chunk(&mut self, cx: &mut Context<'_>, idx: usize) -> Poll<crate::Result<(bool, Bytes)>> {
        if self.stage != StreamingStage::ReadingPartData || self.curr_part_idx != Some(idx) {
            return Poll::Ready(Err(crate::Error::PartAlreadyConsumed));
        }

        loop {
            let res = match self.read_part_chunk() {
                Ok(Some(chunk)) => Ok(chunk),
                Ok(None) => match ready!(self.buffer.poll_stream(cx)) {
                    Ok(()) => continue,
                    Err(err) => Err(err),
                },
                Err(err) => Err(err),
            };

            if let Err(ref err) = res {
                self.fail(err);
            }

            return Poll::Ready(res);
        }
    }

    fn advance_to_next_part(&mut self, cx: &mut Context<'_>) -> Poll<crate::Result<Option<PartHead>>> {
        loop {
            match self.stage {
                StreamingStage::Eof | StreamingStage::Failed => return Poll::Ready(Ok(None)),

                StreamingStage::FindingFirstBoundary => {
                    if self.buffer.skip_to_boundary(&self.finder) {
                        trace!("found the first boundary, preamble discarded");
                        self.stage = StreamingStage::ReadingBoundary;
                        continue;
                    }

                    if self.buffer.eof {
                        return Poll::Ready(Err(crate::Error::MissingBoundary));
                    }
                }

                StreamingStage::ReadingPartData => {
                    // The previous part is closed before anything else is read;
                    // its remaining body bytes are skipped, not delivered.
                    if let Some(idx) = self.curr_part_idx.take() {
                        debug!("discarding the unread body of part #{}", idx);
                    }

                    if self.read_part_chunk()?.is_some() {
                        continue;
                    }
                }

                StreamingStage::ReadingBoundary => match self.read_boundary_line()? {
                    Some(true) => {
                        trace!("final boundary found");
                        self.stage = StreamingStage::ReadingEpilogue;
                        continue;
                    }
                    Some(false) => {
                        self.stage = StreamingStage::ReadingPartHeaders;
                        continue;
                    }
                    None if self.buffer.eof => return Poll::Ready(Err(crate::Error::UnexpectedEndOfInput)),
                    None => {}
                },

                StreamingStage::ReadingPartHeaders => {
                    if let Some(head) = self.read_part_headers()? {
                        return Poll::Ready(Ok(Some(head)));
                    }

                    if self.buffer.eof {
                        return Poll::Ready(Err(crate::Error::UnexpectedEndOfInput));
                    }
                }

                StreamingStage::ReadingEpilogue => {
                    self.buffer.clear();

                    if self.buffer.eof {
                        trace!("epilogue drained, multipart stream complete");
                        self.stage = StreamingStage::Eof;
                        return Poll::Ready(Ok(None));
                    }
                }
            }

            ready!(self.buffer.poll_stream(cx))?;
        }
    }

    /// Hands out the next safe span of the current body and enforces the
    /// body size limit on it.
    fn read_part_chunk(&mut self) -> crate::Result<Option<(bool, Bytes)>> {
        let (done, bytes) = match self.buffer.read_part_data(&self.finder)? {
            Some(chunk) => chunk,
            None => return Ok(None),
        };

        self.curr_part_size_counter += bytes.len() as u64;

        if self.curr_part_size_counter > self.curr_part_size_limit {
            return Err(crate::Error::PartTooLarge {
                limit: self.curr_part_size_limit,
                part_name: self.curr_part_name.clone(),
            });
        }

        if done {
            trace!("body ended after {} bytes", self.curr_part_size_counter);
            self.stage = StreamingStage::ReadingBoundary;
            self.curr_part_idx = None;
        }

        Ok(Some((done, bytes)))
    }

    /// Consumes `--{boundary}` and what follows it on the same line.
    ///
    /// Returns `Some(true)` for the final boundary, `Some(false)` when a part
    /// follows and `None` if more input is needed to tell.
    fn read_boundary_line(&mut self) -> crate::Result<Option<bool>> {
        let delimiter_len = constants::BOUNDARY_EXT.len() + self.boundary.len();
        let buf = &self.buffer.buf;

        if buf.len() < delimiter_len + 2 {
            return Ok(None);
        }

        let rest = &buf[delimiter_len..];

        if rest.starts_with(constants::BOUNDARY_EXT.as_bytes()) {
            self.buffer.buf.advance(delimiter_len + constants::BOUNDARY_EXT.len());
            return Ok(Some(true));
        }

        let padding = rest
            .iter()
            .take_while(|&&b| constants::is_transport_padding(b))
            .count();
        let rest = &rest[padding..];

        if rest.starts_with(constants::CRLF.as_bytes()) {
            self.buffer.buf.advance(delimiter_len + padding + constants::CRLF.len());
            return Ok(Some(false));
        }

        if rest.len() >= constants::CRLF.len() || padding as u64 > self.size_limit.header_block {
            return Err(crate::Error::InvalidBoundaryLine);
        }

        // Either nothing or a lone `\r` follows the padding so far.
        if rest.is_empty() || rest == b"\r" {
            Ok(None)
        } else {
            Err(crate::Error::InvalidBoundaryLine)
        }
    }

    /// Parses the header block once its terminating blank line is buffered
    /// and opens the body of the new part.
    fn read_part_headers(&mut self) -> crate::Result<Option<PartHead>> {
        let limit = self.size_limit.header_block;

        let (block_len, consumed_len) = match headers::find_header_block_end(&self.buffer.buf) {
            Some(end) => end,
            None => {
                // A block within the limit would have its blank line inside
                // the first `limit + 2` bytes.
                if self.buffer.buf.len() as u64 >= limit.saturating_add(2) {
                    return Err(crate::Error::HeaderTooLarge { limit });
                }
                return Ok(None);
            }
        };

        if block_len as u64 > limit {
            return Err(crate::Error::HeaderTooLarge { limit });
        }

        let block = self.buffer.buf.split_to(consumed_len);
        let headers = headers::parse_header_block(&block[..block_len])?;
        let disposition = ContentDisposition::parse(&headers)?;

        let idx = self.next_part_idx;
        self.next_part_idx += 1;

        let is_file = disposition.file_name.is_some();

        self.stage = StreamingStage::ReadingPartData;
        self.curr_part_idx = Some(idx);
        self.curr_part_size_limit = self
            .size_limit
            .extract_size_limit_for(&disposition.field_name, is_file);
        self.curr_part_size_counter = 0;
        self.curr_part_name = Some(disposition.field_name.clone());

        debug!(
            "part #{} opened: name={:?}, file_name={:?}",
            idx, disposition.field_name, disposition.file_name
        );

        Ok(Some(PartHead {
            idx,
            headers,
            disposition,
        }))
    }

    /// Ends the parse without an error and lets go of the source, leaving
    /// any live part unreadable.
    pub(crate) fn abandon(&mut self) {
        if self.stage != StreamingStage::Eof {
            debug!("multipart parsing abandoned");
        }

        self.stage = StreamingStage::Failed;
        self.curr_part_idx = None;
        self.buffer.release();
    }

    fn fail(&mut self, err: &crate::Error) {
        debug!("multipart parsing failed: {}", err);

        self.stage = StreamingStage::Failed;
        self.curr_part_idx = None;
        self.buffer.clear();
    }
}
