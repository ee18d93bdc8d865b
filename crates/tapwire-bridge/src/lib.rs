//! Wiring between a frame producer (a virtual network interface), the bounded
//! packet queue, and the byte-stream consumer.
//!
//! The bridge owns the joint lifecycle:
//! 1. [`Instance::bring_up`] allocates the queue/stream/ingest state and
//!    registers the byte-stream device and the network interface with their
//!    external managers, unwinding in reverse order on failure.
//! 2. While running, [`FlowController`] couples queue occupancy to the
//!    producer: a rejected push pauses it, a completed read resumes it.
//! 3. [`Instance::tear_down`] deregisters (network path first), cancels any
//!    blocked reader, then drains remaining buffers.
#![forbid(unsafe_code)]

pub mod config;
pub mod flow;
pub mod gate;
pub mod ingest;
pub mod instance;
pub mod registry;

pub use config::{BridgeConfig, Mode, DEFAULT_QUEUE_CAPACITY};
pub use flow::{FlowController, FlowStats, SubmitError};
pub use gate::ProducerGate;
pub use ingest::{IngestError, WriteIngest};
pub use instance::{BridgedReader, Instance, LifecycleState, SetupError};
pub use registry::{InterfaceManager, Registration, RegistrationError, StreamDeviceManager};
