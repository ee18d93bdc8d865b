use std::sync::Arc;

use thiserror::Error;

use tapwire_queue::{BoundedPacketQueue, QueueWaker};
use tapwire_stream::{CharStream, ReadError, ReadSink, Readiness, SeekError, SeekFrom, WriteError};

use crate::config::BridgeConfig;
use crate::flow::{FlowController, FlowStats, SubmitError};
use crate::gate::ProducerGate;
use crate::ingest::WriteIngest;
use crate::registry::{InterfaceManager, Registration, RegistrationError, StreamDeviceManager};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("stream device registration failed")]
    StreamDevice(#[source] RegistrationError),

    /// Interface registration failed; the already-registered stream device
    /// has been deregistered before this surfaces.
    #[error("network interface registration failed")]
    Interface(#[source] RegistrationError),
}

/// Constructed lifecycle states.
///
/// The full machine is `Uninitialized → Registered → Running → TornDown`;
/// the first two are transient inside [`Instance::bring_up`] (the
/// `Registered → Running` transition is implicit once both collaborators are
/// live), so an `Instance` value is only ever observed in one of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    TornDown,
}

/// One bridge: an outbound packet queue with its framed consumer stream, the
/// inert write-ingest buffer, and the registrations tying them to the
/// external device and interface managers.
///
/// Explicitly constructed and explicitly owned — deliberately not a
/// process-wide singleton.
pub struct Instance {
    config: BridgeConfig,
    queue: Arc<BoundedPacketQueue>,
    flow: Arc<FlowController>,
    ingest: Arc<WriteIngest>,
    device_registration: Option<Box<dyn Registration>>,
    interface_registration: Option<Box<dyn Registration>>,
    state: LifecycleState,
}

impl Instance {
    /// Allocate queue/stream/ingest state and register both collaborators.
    ///
    /// Registration order is stream device first, then network interface;
    /// any failure unwinds the registrations already completed, in reverse
    /// order, before the error surfaces. Nothing leaks on a failed startup.
    pub fn bring_up(
        config: BridgeConfig,
        devices: &mut dyn StreamDeviceManager,
        interfaces: &mut dyn InterfaceManager,
        gate: Arc<dyn ProducerGate>,
    ) -> Result<Self, SetupError> {
        tracing::debug!(
            mode = ?config.mode,
            capacity = config.queue_capacity,
            device = %config.device_name,
            interface = %config.interface_name,
            "bringing up bridge"
        );

        let queue = Arc::new(BoundedPacketQueue::new(config.queue_capacity));
        let ingest = Arc::new(WriteIngest::new(config.queue_capacity));
        let flow = Arc::new(FlowController::with_resume_watermark(
            Arc::clone(&queue),
            gate,
            config.resume_watermark,
        ));

        let mut device_registration = devices
            .register_stream_device(&config.device_name)
            .map_err(SetupError::StreamDevice)?;

        let interface_registration = match interfaces.register_interface(&config.interface_name) {
            Ok(registration) => registration,
            Err(err) => {
                // Strict reverse-order unwind of what already succeeded.
                device_registration.deregister();
                return Err(SetupError::Interface(err));
            }
        };

        Ok(Self {
            config,
            queue,
            flow,
            ingest,
            device_registration: Some(device_registration),
            interface_registration: Some(interface_registration),
            state: LifecycleState::Running,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<BoundedPacketQueue> {
        &self.queue
    }

    /// Producer-side entry point; see [`FlowController::submit_frame`].
    pub fn submit_frame(&self, frame: &[u8]) -> Result<(), SubmitError> {
        self.flow.submit_frame(frame)
    }

    pub fn flow(&self) -> &Arc<FlowController> {
        &self.flow
    }

    pub fn flow_stats(&self) -> FlowStats {
        self.flow.stats()
    }

    /// Consumer-side handle. The queue supports exactly one consumer; open
    /// one reader and keep it for the life of the bridge.
    pub fn open_reader(&self) -> BridgedReader {
        BridgedReader {
            stream: CharStream::new(Arc::clone(&self.queue)),
            flow: Arc::clone(&self.flow),
            ingest: Arc::clone(&self.ingest),
        }
    }

    /// Deregister the network interface, then the stream device, then drain
    /// the remaining buffers — network path first, buffers last, mirroring
    /// acquisition order reversed. A reader blocked in `read` observes
    /// `Cancelled`.
    pub fn tear_down(mut self) {
        self.teardown_impl();
    }

    fn teardown_impl(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        if let Some(mut registration) = self.interface_registration.take() {
            registration.deregister();
        }
        if let Some(mut registration) = self.device_registration.take() {
            registration.deregister();
        }
        self.queue.cancel();
        let queue_packets = self.queue.clear();
        let ingest_packets = self.ingest.drain();
        tracing::debug!(queue_packets, ingest_packets, "bridge torn down");
        self.state = LifecycleState::TornDown;
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.teardown_impl();
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("state", &self.state)
            .field("queue", &self.queue)
            .field("config", &self.config)
            .finish()
    }
}

/// Consumer handle combining the framed stream with the flow-control hook:
/// every completed read, including a zero-byte one, may resume a paused
/// producer.
pub struct BridgedReader {
    stream: CharStream,
    flow: Arc<FlowController>,
    ingest: Arc<WriteIngest>,
}

impl BridgedReader {
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError> {
        let n = self.stream.read(buf)?;
        self.flow.after_read();
        Ok(n)
    }

    pub fn read_into(
        &mut self,
        sink: &mut dyn ReadSink,
        count: usize,
    ) -> Result<usize, ReadError> {
        let n = self.stream.read_into(sink, count)?;
        self.flow.after_read();
        Ok(n)
    }

    pub fn poll(&self, waker: Option<&Arc<dyn QueueWaker>>) -> Readiness {
        self.stream.poll(waker)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, SeekError> {
        self.stream.seek(pos)
    }

    /// Routed to the inert ingest buffer; always `Unsupported` today.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, WriteError> {
        self.ingest
            .ingest(buf)
            .map_err(|_| WriteError::Unsupported)
    }
}

impl std::fmt::Debug for BridgedReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgedReader")
            .field("stream", &self.stream)
            .finish()
    }
}
