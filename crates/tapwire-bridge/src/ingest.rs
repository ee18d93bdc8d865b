use thiserror::Error;

use tapwire_queue::BoundedPacketQueue;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    /// The consumer→network direction is declared but not wired.
    #[error("consumer-to-network ingest is not implemented")]
    Unsupported,
}

/// Placeholder buffer for the consumer→network direction.
///
/// The interface surface exists — bytes can be offered and the buffer is
/// drained at teardown — but no parsing, buffering, or injection back into
/// the network stack happens: [`ingest`](Self::ingest) always fails with
/// [`IngestError::Unsupported`]. The backing queue therefore stays empty; it
/// is allocated anyway so teardown ordering matches the outbound path.
///
/// The wire format a completed implementation would accept is deliberately
/// left undefined rather than guessed at; nothing downstream may assume
/// symmetry with the read path.
pub struct WriteIngest {
    pending: BoundedPacketQueue,
}

impl WriteIngest {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: BoundedPacketQueue::new(capacity),
        }
    }

    /// Offer consumer bytes to the (inert) write path.
    pub fn ingest(&self, _bytes: &[u8]) -> Result<usize, IngestError> {
        Err(IngestError::Unsupported)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Free anything resident. Teardown path; returns the number of packets
    /// dropped (always zero while the path stays a stub).
    pub fn drain(&self) -> usize {
        self.pending.clear()
    }
}

impl std::fmt::Debug for WriteIngest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteIngest")
            .field("pending", &self.pending)
            .finish()
    }
}
