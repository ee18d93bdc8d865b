use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};

use thiserror::Error;

use crate::packet::Packet;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// The queue holds `capacity` packets. The offered packet has been
    /// dropped and the producer-paused flag set; the producer should stop
    /// submitting until resumed.
    #[error("packet queue is full")]
    Full,

    /// The queue has been cancelled. The offered packet has been dropped;
    /// no resume will ever follow, so the producer must stop for good.
    #[error("packet queue has been shut down")]
    Cancelled,
}

/// A blocking wait was interrupted by [`BoundedPacketQueue::cancel`].
///
/// Queue contents are left untouched; only the waiter is released.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("wait on packet queue was cancelled")]
pub struct Cancelled;

/// Interest registration for readiness polls.
///
/// A waker registered via [`BoundedPacketQueue::poll_ready`] is invoked (at
/// most once per registration) when a push makes the queue readable. This is
/// the monitor's analogue of registering with a poll wait table.
pub trait QueueWaker: Send + Sync {
    fn wake(&self);
}

struct Shared {
    packets: VecDeque<Arc<Packet>>,
    /// Sticky: once set, blocking peeks fail with [`Cancelled`].
    cancelled: bool,
    /// Set when a push is rejected; cleared via `take_resume_signal*`.
    ///
    /// Lives inside the queue's critical section so flow-control state can
    /// never be observed inconsistently with occupancy.
    producer_paused: bool,
    wakers: Vec<Weak<dyn QueueWaker>>,
}

/// Capacity-limited FIFO of [`Packet`]s guarded by one mutex and one
/// condition variable.
///
/// Exactly one producer role and one consumer role share the queue, from
/// independent execution contexts. The producer side never blocks; the
/// consumer's [`peek_blocking`](Self::peek_blocking) is the only suspension
/// point and is interruptible via [`cancel`](Self::cancel). Packets are
/// delivered in exactly push order.
pub struct BoundedPacketQueue {
    shared: Mutex<Shared>,
    readable: Condvar,
    capacity: usize,
}

impl BoundedPacketQueue {
    /// Create a queue bounded at `capacity` packets.
    ///
    /// Panics if `capacity` is zero, matching the constructor contract of the
    /// other bounded buffers in this workspace.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            shared: Mutex::new(Shared {
                packets: VecDeque::with_capacity(capacity),
                cancelled: false,
                producer_paused: false,
                wakers: Vec::new(),
            }),
            readable: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current occupancy. Always mirrors the number of resident packets and
    /// never exceeds [`capacity`](Self::capacity).
    pub fn len(&self) -> usize {
        self.lock().packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().packets.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `packet` to the tail, or drop it and fail with
    /// [`PushError::Full`] when the queue already holds `capacity` packets.
    ///
    /// Never blocks: the transmit path this is called from cannot afford to
    /// wait on the consumer. A rejected push also sets the producer-paused
    /// flag under the same lock, so the flow controller observes (full,
    /// paused) atomically.
    pub fn try_push(&self, packet: Packet) -> Result<(), PushError> {
        let wakers;
        {
            let mut shared = self.lock();
            // Cancellation is terminal for both sides: a packet admitted
            // after teardown drained the queue would be paired with a
            // reader's stale mid-frame state.
            if shared.cancelled {
                return Err(PushError::Cancelled);
            }
            // Rejection kicks in at exactly `capacity` items; a `>` comparison
            // here would admit one extra packet past the stated bound.
            if shared.packets.len() >= self.capacity {
                shared.producer_paused = true;
                drop(shared);
                tracing::warn!(capacity = self.capacity, "packet queue is full");
                return Err(PushError::Full);
            }
            shared.packets.push_back(Arc::new(packet));
            wakers = std::mem::take(&mut shared.wakers);
        }
        // Wake outside the lock: the push that caused non-emptiness
        // happens-before both notifications.
        self.readable.notify_all();
        for waker in wakers {
            if let Some(waker) = waker.upgrade() {
                waker.wake();
            }
        }
        Ok(())
    }

    /// Return the head packet without removing it, suspending while the queue
    /// is empty.
    ///
    /// The wait is a classic check-then-wait loop under the queue lock, so a
    /// push between the emptiness check and the suspension cannot be lost,
    /// and spurious wake-ups simply re-check. [`cancel`](Self::cancel)
    /// aborts the wait with [`Cancelled`]; there is no timeout.
    pub fn peek_blocking(&self) -> Result<Arc<Packet>, Cancelled> {
        let mut shared = self.lock();
        while shared.packets.is_empty() {
            if shared.cancelled {
                return Err(Cancelled);
            }
            shared = self
                .readable
                .wait(shared)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        Ok(Arc::clone(&shared.packets[0]))
    }

    /// Non-blocking variant of [`peek_blocking`](Self::peek_blocking):
    /// returns `None` instead of suspending on an empty queue.
    pub fn try_peek(&self) -> Option<Arc<Packet>> {
        self.lock().packets.front().map(Arc::clone)
    }

    /// Remove and free the head packet. Idempotent no-op on an empty queue.
    pub fn pop(&self) {
        self.lock().packets.pop_front();
    }

    /// Non-blocking readiness query: report whether a peek would currently
    /// succeed, optionally registering `waker` to fire on the next push.
    pub fn poll_ready(&self, waker: Option<&Arc<dyn QueueWaker>>) -> bool {
        let mut shared = self.lock();
        if let Some(waker) = waker {
            // Registrations are only consumed by a push; prune dead ones
            // here so a never-pushed queue cannot accumulate them without
            // bound.
            shared.wakers.retain(|waker| waker.strong_count() > 0);
            shared.wakers.push(Arc::downgrade(waker));
        }
        !shared.packets.is_empty()
    }

    #[cfg(test)]
    fn registered_waker_count(&self) -> usize {
        self.lock().wakers.len()
    }

    /// Abort all current and future blocking waits with [`Cancelled`].
    ///
    /// Queue contents are untouched; this stands in for an external
    /// interrupt/signal delivered to a blocked consumer (and is also issued
    /// on teardown so no reader is left suspended).
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.readable.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Clear-and-return the producer-paused flag.
    ///
    /// Called by the consumer side after every completed read; a `true`
    /// return obliges the caller to resume the producer.
    pub fn take_resume_signal(&self) -> bool {
        let mut shared = self.lock();
        std::mem::replace(&mut shared.producer_paused, false)
    }

    /// Like [`take_resume_signal`](Self::take_resume_signal), but only
    /// clears the flag once occupancy has drained to at most `watermark`.
    ///
    /// The unconditional variant can oscillate pause/resume under sustained
    /// overflow; a low watermark trades resume latency for stability.
    pub fn take_resume_signal_below(&self, watermark: usize) -> bool {
        let mut shared = self.lock();
        if shared.producer_paused && shared.packets.len() <= watermark {
            shared.producer_paused = false;
            return true;
        }
        false
    }

    /// Whether a rejected push has paused the producer and no resume has been
    /// taken yet.
    pub fn is_producer_paused(&self) -> bool {
        self.lock().producer_paused
    }

    /// Drop every resident packet, returning how many were freed. Teardown
    /// path.
    pub fn clear(&self) -> usize {
        let mut shared = self.lock();
        let drained = shared.packets.len();
        shared.packets.clear();
        drained
    }
}

impl std::fmt::Debug for BoundedPacketQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.lock();
        f.debug_struct("BoundedPacketQueue")
            .field("capacity", &self.capacity)
            .field("len", &shared.packets.len())
            .field("cancelled", &shared.cancelled)
            .field("producer_paused", &shared.producer_paused)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn pkt(byte: u8, len: usize) -> Packet {
        Packet::from_vec(vec![byte; len]).unwrap()
    }

    #[test]
    fn occupancy_mirrors_resident_packets() {
        let queue = BoundedPacketQueue::new(4);
        assert!(queue.is_empty());

        queue.try_push(pkt(1, 8)).unwrap();
        queue.try_push(pkt(2, 8)).unwrap();
        assert_eq!(queue.len(), 2);

        queue.pop();
        assert_eq!(queue.len(), 1);
        queue.pop();
        assert_eq!(queue.len(), 0);

        // Popping an empty queue is an idempotent no-op.
        queue.pop();
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn push_beyond_capacity_rejects_exactly_the_excess() {
        let queue = BoundedPacketQueue::new(10);

        let mut rejected = 0;
        for i in 0..12u8 {
            match queue.try_push(pkt(i, 64)) {
                Ok(()) => {}
                Err(PushError::Full) => rejected += 1,
                Err(other) => panic!("unexpected rejection: {other}"),
            }
        }

        assert_eq!(rejected, 2);
        assert_eq!(queue.len(), 10);
        assert!(queue.is_producer_paused());
    }

    #[test]
    fn admission_boundary_is_exactly_capacity() {
        // Regression guard: a `>` admission check would accept one packet
        // past the stated limit. The bound is exact.
        let queue = BoundedPacketQueue::new(1);
        queue.try_push(pkt(0, 1)).unwrap();
        assert_eq!(queue.try_push(pkt(1, 1)), Err(PushError::Full));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = BoundedPacketQueue::new(3);
        for i in 0..3u8 {
            queue.try_push(pkt(i, 2)).unwrap();
        }
        for i in 0..3u8 {
            let head = queue.try_peek().unwrap();
            assert_eq!(head.payload(), &[i, i]);
            queue.pop();
        }
        assert!(queue.try_peek().is_none());
    }

    #[test]
    fn peek_does_not_remove_the_head() {
        let queue = BoundedPacketQueue::new(2);
        queue.try_push(pkt(7, 3)).unwrap();

        assert_eq!(queue.try_peek().unwrap().payload(), &[7, 7, 7]);
        assert_eq!(queue.try_peek().unwrap().payload(), &[7, 7, 7]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn blocking_peek_wakes_on_concurrent_push() {
        let queue = Arc::new(BoundedPacketQueue::new(2));

        let reader = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.peek_blocking())
        };

        // Give the reader a chance to reach the wait before pushing.
        std::thread::sleep(Duration::from_millis(20));
        queue.try_push(pkt(5, 4)).unwrap();

        let head = reader.join().unwrap().unwrap();
        assert_eq!(head.payload(), &[5, 5, 5, 5]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn cancel_aborts_a_blocked_peek_and_leaves_state_unchanged() {
        let queue = Arc::new(BoundedPacketQueue::new(2));

        let reader = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.peek_blocking())
        };

        std::thread::sleep(Duration::from_millis(20));
        queue.cancel();

        assert_eq!(reader.join().unwrap(), Err(Cancelled));
        assert!(queue.is_empty());
        assert!(queue.is_cancelled());
        // Sticky: later blocking peeks fail immediately.
        assert_eq!(queue.peek_blocking(), Err(Cancelled));
    }

    #[test]
    fn push_after_cancel_is_rejected() {
        let queue = BoundedPacketQueue::new(4);
        queue.try_push(pkt(1, 1)).unwrap();
        queue.cancel();
        queue.clear();

        assert_eq!(queue.try_push(pkt(2, 1)), Err(PushError::Cancelled));
        assert!(queue.is_empty());
        // A shutdown rejection is not an overflow: no resume is owed.
        assert!(!queue.is_producer_paused());
    }

    #[test]
    fn cancel_does_not_disturb_resident_packets() {
        let queue = BoundedPacketQueue::new(2);
        queue.try_push(pkt(1, 1)).unwrap();
        queue.cancel();

        assert_eq!(queue.len(), 1);
        // Non-empty peeks still succeed after cancellation.
        assert_eq!(queue.peek_blocking().unwrap().payload(), &[1]);
    }

    struct CountingWaker(AtomicUsize);

    impl QueueWaker for CountingWaker {
        fn wake(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn poll_ready_reports_readability_and_fires_registered_waker() {
        let queue = BoundedPacketQueue::new(2);
        let waker: Arc<CountingWaker> = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let as_dyn: Arc<dyn QueueWaker> = waker.clone();

        assert!(queue.try_peek().is_none());
        assert!(!queue.poll_ready(Some(&as_dyn)));

        queue.try_push(pkt(9, 1)).unwrap();
        assert!(queue.poll_ready(None));
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);

        // Registrations are one-shot: a second push without re-registering
        // does not fire again.
        queue.try_push(pkt(9, 1)).unwrap();
        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_wakers_are_ignored() {
        let queue = BoundedPacketQueue::new(2);
        {
            let waker: Arc<dyn QueueWaker> = Arc::new(CountingWaker(AtomicUsize::new(0)));
            queue.poll_ready(Some(&waker));
        }
        // The registration is now dangling; the push must not panic.
        queue.try_push(pkt(1, 1)).unwrap();
    }

    #[test]
    fn stale_waker_registrations_do_not_accumulate_without_a_push() {
        let queue = BoundedPacketQueue::new(2);
        for _ in 0..64 {
            let waker: Arc<dyn QueueWaker> = Arc::new(CountingWaker(AtomicUsize::new(0)));
            assert!(!queue.poll_ready(Some(&waker)));
        }
        // Each registration prunes the dead ones left by its predecessors;
        // at most the last (now dangling) entry survives.
        assert!(queue.registered_waker_count() <= 1);
    }

    #[test]
    fn resume_signal_is_cleared_on_take() {
        let queue = BoundedPacketQueue::new(1);
        queue.try_push(pkt(0, 1)).unwrap();
        assert_eq!(queue.try_push(pkt(1, 1)), Err(PushError::Full));

        assert!(queue.take_resume_signal());
        assert!(!queue.take_resume_signal());
        assert!(!queue.is_producer_paused());
    }

    #[test]
    fn watermark_resume_waits_for_drain() {
        let queue = BoundedPacketQueue::new(2);
        queue.try_push(pkt(0, 1)).unwrap();
        queue.try_push(pkt(1, 1)).unwrap();
        assert_eq!(queue.try_push(pkt(2, 1)), Err(PushError::Full));

        // Still two resident packets: above the watermark, keep paused.
        assert!(!queue.take_resume_signal_below(1));
        queue.pop();
        assert!(queue.take_resume_signal_below(1));
        assert!(!queue.is_producer_paused());
    }

    #[test]
    fn clear_drains_everything() {
        let queue = BoundedPacketQueue::new(4);
        for i in 0..3u8 {
            queue.try_push(pkt(i, 4)).unwrap();
        }
        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }
}
