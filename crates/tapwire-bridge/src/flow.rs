use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use tapwire_queue::{BoundedPacketQueue, Packet, PacketError, PushError};

use crate::gate::ProducerGate;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The queue is at capacity. The frame has been dropped and the producer
    /// paused; submission must stop until [`ProducerGate::resume`] fires.
    #[error("frame rejected: queue full")]
    Rejected,

    /// The bridge is shut down. The frame has been dropped and no resume
    /// will ever follow; the producer must stop for good rather than wait.
    #[error("frame rejected: bridge is shut down")]
    Shutdown,

    /// The frame could not be turned into an owned packet (allocation
    /// failure or over-long frame). The frame is dropped; the producer is
    /// not paused.
    #[error(transparent)]
    Packet(#[from] PacketError),
}

/// Best-effort counters for the producer→consumer direction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlowStats {
    pub submitted_frames: u64,
    pub submitted_bytes: u64,
    pub rejected_full: u64,
    pub dropped_alloc: u64,
    pub pauses: u64,
    pub resumes: u64,
}

/// Couples queue occupancy to the producer.
///
/// `submit_frame` runs in the producer context and never blocks; a push
/// against a full queue drops the frame, pauses the gate, and reports
/// [`SubmitError::Rejected`]. `after_read` runs in the consumer context after
/// every completed read (even a zero-byte one) and resumes the gate if an
/// overflow had paused it — unconditionally by default, or once occupancy
/// reaches the configured low watermark.
pub struct FlowController {
    queue: Arc<BoundedPacketQueue>,
    gate: Arc<dyn ProducerGate>,
    resume_watermark: Option<usize>,
    stats: Mutex<FlowStats>,
}

impl FlowController {
    pub fn new(queue: Arc<BoundedPacketQueue>, gate: Arc<dyn ProducerGate>) -> Self {
        Self::with_resume_watermark(queue, gate, None)
    }

    pub fn with_resume_watermark(
        queue: Arc<BoundedPacketQueue>,
        gate: Arc<dyn ProducerGate>,
        resume_watermark: Option<usize>,
    ) -> Self {
        Self {
            queue,
            gate,
            resume_watermark,
            stats: Mutex::new(FlowStats::default()),
        }
    }

    pub fn queue(&self) -> &Arc<BoundedPacketQueue> {
        &self.queue
    }

    pub fn stats(&self) -> FlowStats {
        *self.lock_stats()
    }

    fn lock_stats(&self) -> MutexGuard<'_, FlowStats> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Producer entry point: copy `frame` into the queue.
    pub fn submit_frame(&self, frame: &[u8]) -> Result<(), SubmitError> {
        let packet = match Packet::copy_from(frame) {
            Ok(packet) => packet,
            Err(err) => {
                self.lock_stats().dropped_alloc += 1;
                return Err(err.into());
            }
        };
        self.submit(packet)
    }

    /// Producer entry point for an already-built packet.
    pub fn submit(&self, packet: Packet) -> Result<(), SubmitError> {
        let len = u64::from(packet.len());
        match self.queue.try_push(packet) {
            Ok(()) => {
                let mut stats = self.lock_stats();
                stats.submitted_frames += 1;
                stats.submitted_bytes += len;
                Ok(())
            }
            Err(PushError::Full) => {
                self.gate.pause();
                let mut stats = self.lock_stats();
                stats.rejected_full += 1;
                stats.pauses += 1;
                Err(SubmitError::Rejected)
            }
            // Not an overflow: pausing would promise a resume that can never
            // come.
            Err(PushError::Cancelled) => Err(SubmitError::Shutdown),
        }
    }

    /// Consumer hook: to be called after every completed read.
    ///
    /// Returns whether a resume was issued.
    pub fn after_read(&self) -> bool {
        let resume = match self.resume_watermark {
            None => self.queue.take_resume_signal(),
            Some(watermark) => self.queue.take_resume_signal_below(watermark),
        };
        if resume {
            tracing::debug!("resuming paused producer");
            self.gate.resume();
            self.lock_stats().resumes += 1;
        }
        resume
    }
}

impl std::fmt::Debug for FlowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowController")
            .field("queue", &self.queue)
            .field("resume_watermark", &self.resume_watermark)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[derive(Default)]
    struct RecordingGate {
        pauses: AtomicU64,
        resumes: AtomicU64,
    }

    impl ProducerGate for RecordingGate {
        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }

        fn resume(&self) {
            self.resumes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn controller(capacity: usize, watermark: Option<usize>) -> (FlowController, Arc<RecordingGate>) {
        let queue = Arc::new(BoundedPacketQueue::new(capacity));
        let gate = Arc::new(RecordingGate::default());
        (
            FlowController::with_resume_watermark(queue, gate.clone(), watermark),
            gate,
        )
    }

    #[test]
    fn overflow_pauses_and_a_read_resumes() {
        let (flow, gate) = controller(2, None);

        flow.submit_frame(&[1]).unwrap();
        flow.submit_frame(&[2]).unwrap();
        assert_eq!(flow.submit_frame(&[3]), Err(SubmitError::Rejected));
        assert_eq!(gate.pauses.load(Ordering::SeqCst), 1);
        assert_eq!(gate.resumes.load(Ordering::SeqCst), 0);

        // Any completed read drains at least the pause state.
        flow.queue().pop();
        assert!(flow.after_read());
        assert_eq!(gate.resumes.load(Ordering::SeqCst), 1);

        // No pending pause: the hook is a no-op.
        assert!(!flow.after_read());
        assert_eq!(gate.resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_byte_read_still_resumes() {
        let (flow, gate) = controller(1, None);
        flow.submit_frame(&[1]).unwrap();
        assert_eq!(flow.submit_frame(&[2]), Err(SubmitError::Rejected));

        // Nothing was popped, but the contract is resume-on-drain-activity.
        assert!(flow.after_read());
        assert_eq!(gate.resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn watermark_defers_resume_until_drained() {
        let (flow, gate) = controller(2, Some(0));
        flow.submit_frame(&[1]).unwrap();
        flow.submit_frame(&[2]).unwrap();
        assert_eq!(flow.submit_frame(&[3]), Err(SubmitError::Rejected));

        assert!(!flow.after_read());
        flow.queue().pop();
        assert!(!flow.after_read());
        flow.queue().pop();
        assert!(flow.after_read());
        assert_eq!(gate.resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_rejection_does_not_pause_the_producer() {
        let (flow, gate) = controller(2, None);
        flow.queue().cancel();

        assert_eq!(flow.submit_frame(&[1]), Err(SubmitError::Shutdown));
        assert_eq!(gate.pauses.load(Ordering::SeqCst), 0);

        // Nothing to resume either: the pause bookkeeping stays untouched.
        assert!(!flow.after_read());
        let stats = flow.stats();
        assert_eq!(stats.rejected_full, 0);
        assert_eq!(stats.pauses, 0);
    }

    #[test]
    fn stats_track_both_directions_of_the_contract() {
        let (flow, _gate) = controller(1, None);
        flow.submit_frame(&[1, 2, 3]).unwrap();
        let _ = flow.submit_frame(&[4]);
        flow.after_read();

        let stats = flow.stats();
        assert_eq!(stats.submitted_frames, 1);
        assert_eq!(stats.submitted_bytes, 3);
        assert_eq!(stats.rejected_full, 1);
        assert_eq!(stats.pauses, 1);
        assert_eq!(stats.resumes, 1);
    }
}
