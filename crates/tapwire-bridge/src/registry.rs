use thiserror::Error;

/// A collaborator refused or failed a registration during startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("registration failed: {reason}")]
pub struct RegistrationError {
    pub reason: String,
}

impl RegistrationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Handle to a completed registration.
///
/// `deregister` is called exactly once, either during normal teardown or
/// while unwinding a failed startup. Handles are held by the bridge
/// instance, which is shared across the producer and consumer contexts.
pub trait Registration: Send + Sync {
    fn deregister(&mut self);
}

/// External manager of byte-stream device nodes (the character-device
/// registry analogue). Only the registration contract matters to the core;
/// node naming and numbering stay on the collaborator's side.
pub trait StreamDeviceManager {
    fn register_stream_device(
        &mut self,
        name: &str,
    ) -> Result<Box<dyn Registration>, RegistrationError>;
}

/// External manager of virtual network interfaces.
pub trait InterfaceManager {
    fn register_interface(
        &mut self,
        name: &str,
    ) -> Result<Box<dyn Registration>, RegistrationError>;
}
