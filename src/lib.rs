//! tapwire: bridges a virtual network interface to a sequential byte stream.
//!
//! Outbound frames from the producer are buffered in a bounded FIFO
//! ([`tapwire_queue`]), length-framed and drained by a single sequential
//! reader ([`tapwire_stream`]), with pause/resume flow control back to the
//! producer and explicit lifecycle management ([`tapwire_bridge`]).
//!
//! This crate only re-exports the member crates for convenience.
#![forbid(unsafe_code)]

pub use tapwire_bridge as bridge;
pub use tapwire_queue as queue;
pub use tapwire_stream as stream;

pub use tapwire_bridge::{BridgeConfig, BridgedReader, FlowController, Instance, ProducerGate};
pub use tapwire_queue::{BoundedPacketQueue, Packet};
pub use tapwire_stream::{CharStream, FramedReadCursor, Readiness};
