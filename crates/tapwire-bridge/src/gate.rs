use std::sync::Arc;

/// Control surface of the frame producer (the virtual network interface).
///
/// The bridge calls `pause` when a push is rejected and `resume` once the
/// consumer has drained; the producer must not submit while paused. Both
/// calls may arrive from either execution context and must not block.
pub trait ProducerGate: Send + Sync {
    fn pause(&self);
    fn resume(&self);
}

impl<T: ProducerGate + ?Sized> ProducerGate for Arc<T> {
    fn pause(&self) {
        <T as ProducerGate>::pause(self);
    }

    fn resume(&self) {
        <T as ProducerGate>::resume(self);
    }
}

impl<T: ProducerGate + ?Sized> ProducerGate for Box<T> {
    fn pause(&self) {
        <T as ProducerGate>::pause(self);
    }

    fn resume(&self) {
        <T as ProducerGate>::resume(self);
    }
}

/// Gate for producers that need no pause/resume signalling (tests, loopback).
impl ProducerGate for () {
    fn pause(&self) {}
    fn resume(&self) {}
}
