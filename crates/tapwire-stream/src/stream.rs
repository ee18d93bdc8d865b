//! Consumer-facing byte-stream surface over one packet queue.

use std::sync::Arc;

use bitflags::bitflags;
use thiserror::Error;

use tapwire_queue::{BoundedPacketQueue, QueueWaker};

use crate::cursor::{FramedReadCursor, ReadError, ReadSink};

bitflags! {
    /// Readiness bitmask reported by [`CharStream::poll`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Readiness: u8 {
        /// A read would currently deliver bytes without suspending.
        const READABLE = 1 << 0;
        /// Always set: the write path is a stub that accepts calls
        /// immediately (and rejects them immediately).
        const WRITABLE = 1 << 1;
    }
}

/// Seek origin for [`CharStream::seek`]. Only `Start` can ever succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    Current(i64),
    End(i64),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SeekError {
    /// The stream is sequential; anything but a no-op seek to offset zero is
    /// rejected.
    #[error("framed stream does not support seeking")]
    InvalidSeek,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The consumer-to-network direction is declared but not wired; see the
    /// bridge crate's ingest stub.
    #[error("write path is not implemented")]
    Unsupported,
}

/// Sequential byte-stream view of one [`BoundedPacketQueue`], exclusively
/// owned by the single consumer.
///
/// This is the character-device analogue: `read` drains framed packets,
/// `poll` answers readiness queries, `seek` is a no-op at offset zero only,
/// and `write` is an explicit stub.
pub struct CharStream {
    queue: Arc<BoundedPacketQueue>,
    cursor: FramedReadCursor,
}

impl CharStream {
    pub fn new(queue: Arc<BoundedPacketQueue>) -> Self {
        Self {
            queue,
            cursor: FramedReadCursor::new(),
        }
    }

    pub fn queue(&self) -> &Arc<BoundedPacketQueue> {
        &self.queue
    }

    /// Bytes of the current head frame already delivered; non-zero while a
    /// frame is being drained across calls.
    pub fn pending_frame_bytes(&self) -> usize {
        self.cursor.delivered()
    }

    /// Read up to `buf.len()` framed bytes, blocking only while the stream
    /// has no frame at all.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        self.cursor.read(&self.queue, buf)
    }

    /// Read up to `count` bytes into an arbitrary (possibly partially
    /// writable) destination.
    pub fn read_into(
        &mut self,
        sink: &mut dyn ReadSink,
        count: usize,
    ) -> Result<usize, ReadError> {
        self.cursor.read_into(&self.queue, sink, count)
    }

    /// Non-blocking readiness query, optionally registering `waker` for a
    /// wake-up when the stream becomes readable.
    pub fn poll(&self, waker: Option<&Arc<dyn QueueWaker>>) -> Readiness {
        let mut readiness = Readiness::WRITABLE;
        if self.queue.poll_ready(waker) {
            readiness |= Readiness::READABLE;
        }
        readiness
    }

    /// Only an absolute seek to offset zero is accepted, as a no-op.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, SeekError> {
        match pos {
            SeekFrom::Start(0) => Ok(0),
            _ => Err(SeekError::InvalidSeek),
        }
    }

    /// Consumer-to-network write path: declared, not wired.
    pub fn write(&mut self, _buf: &[u8]) -> Result<usize, WriteError> {
        Err(WriteError::Unsupported)
    }
}

impl std::fmt::Debug for CharStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharStream")
            .field("queue", &self.queue)
            .field("pending_frame_bytes", &self.cursor.delivered())
            .finish()
    }
}
