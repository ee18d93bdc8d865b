//! Bounded FIFO of owned network frames, shared between one producer and one
//! consumer.
//!
//! Design goals:
//! - Lossy on overflow: the producer context (a transmit path) must never
//!   block, so a push against a full queue drops the frame and reports
//!   [`PushError::Full`] instead of waiting.
//! - Blocking consumer: [`BoundedPacketQueue::peek_blocking`] suspends on a
//!   condition variable until a frame arrives or the wait is cancelled.
//! - One mutual-exclusion domain: queue contents, occupancy, the
//!   producer-paused flag and poll-waker registrations all live under a single
//!   mutex; no payload bytes are copied while it is held.
#![forbid(unsafe_code)]

pub mod packet;
pub mod queue;

pub use packet::{Packet, PacketError, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN};
pub use queue::{BoundedPacketQueue, Cancelled, PushError, QueueWaker};
