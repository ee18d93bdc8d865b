//! Resumable serialization of the queue's head packet into a consumer buffer.

use thiserror::Error;

use tapwire_queue::{BoundedPacketQueue, Cancelled};

use crate::framing::{frame_header, FRAME_HEADER_LEN};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// The initial blocking wait for a frame was interrupted.
    ///
    /// No bytes have been consumed when this is returned; the caller sees it
    /// as an interrupted read and may simply retry.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Destination for framed bytes.
///
/// The destination may be only partially writable (think of a user-memory
/// copy that can fail mid-buffer), so `accept` reports how many of the
/// offered bytes were actually taken. A short acceptance terminates the
/// current read request; the cursor accounts for exactly the accepted bytes
/// and resumes from there on the next call.
pub trait ReadSink {
    fn accept(&mut self, src: &[u8]) -> usize;
}

/// [`ReadSink`] over a caller-supplied byte slice; accepts until full.
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    filled: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, filled: 0 }
    }

    pub fn filled(&self) -> usize {
        self.filled
    }
}

impl ReadSink for SliceSink<'_> {
    fn accept(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.buf.len() - self.filled);
        self.buf[self.filled..self.filled + n].copy_from_slice(&src[..n]);
        self.filled += n;
        n
    }
}

/// Per-reader state tracking how many bytes of the current head frame
/// (length prefix plus payload) have already been delivered.
///
/// Owned by the single consumer; the head packet is stable between peek and
/// pop because only that consumer pops. The cursor resets to zero exactly
/// when a frame completes, so a reader using any buffer size observes the
/// same byte stream as one reading whole frames at a time.
#[derive(Debug, Default)]
pub struct FramedReadCursor {
    /// In `[0, FRAME_HEADER_LEN + head.len()]`.
    delivered: usize,
}

impl FramedReadCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the current head frame already handed to the consumer.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Service one read request for up to `count` bytes.
    ///
    /// Blocks only while the queue is empty *at the start* of the request;
    /// once at least one frame has been (partially) delivered, draining the
    /// queue ends the request with a short read rather than suspending
    /// mid-stream. Returns the number of bytes delivered.
    pub fn read_into(
        &mut self,
        queue: &BoundedPacketQueue,
        sink: &mut dyn ReadSink,
        count: usize,
    ) -> Result<usize, ReadError> {
        let mut total = 0usize;

        while total < count {
            let head = if total == 0 {
                match queue.peek_blocking() {
                    Ok(head) => head,
                    Err(cancelled) => {
                        // The stream is shut down: any partially-delivered
                        // frame is gone with the queue it lived in, so the
                        // cursor must not be applied to a later head.
                        self.delivered = 0;
                        return Err(cancelled.into());
                    }
                }
            } else {
                match queue.try_peek() {
                    Some(head) => head,
                    // Short read: never block past the first frame boundary
                    // within one request.
                    None => break,
                }
            };

            let framed_len = head.framed_len();
            debug_assert!(self.delivered < framed_len);

            let budget = count - total;
            let accepted;
            let offered;
            if self.delivered < FRAME_HEADER_LEN {
                let header = frame_header(head.len());
                let section = &header[self.delivered..];
                offered = section.len().min(budget);
                accepted = sink.accept(&section[..offered]);
            } else {
                let section = &head.payload()[self.delivered - FRAME_HEADER_LEN..];
                offered = section.len().min(budget);
                accepted = sink.accept(&section[..offered]);
            }
            debug_assert!(accepted <= offered);

            self.delivered += accepted;
            total += accepted;

            if self.delivered == framed_len {
                self.delivered = 0;
                queue.pop();
            }

            // A partial transfer still terminates the request; the exact
            // accounting above lets the next call resume mid-frame.
            if accepted < offered {
                break;
            }
        }

        Ok(total)
    }

    /// Convenience wrapper: fill as much of `buf` as possible.
    pub fn read(
        &mut self,
        queue: &BoundedPacketQueue,
        buf: &mut [u8],
    ) -> Result<usize, ReadError> {
        let count = buf.len();
        let mut sink = SliceSink::new(buf);
        self.read_into(queue, &mut sink, count)
    }
}
