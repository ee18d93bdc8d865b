use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default queue bound, in packets.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Role of this end of the bridge.
///
/// Read once at initialization and logged; the core queue/framing behavior is
/// identical in both modes. Any string other than `"server"` selects
/// [`Mode::Client`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Server,
    Client,
}

impl FromStr for Mode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("server") {
            Ok(Mode::Server)
        } else {
            Ok(Mode::Client)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub mode: Mode,
    /// Maximum number of packets resident in the outbound queue.
    pub queue_capacity: usize,
    /// When set, a paused producer is only resumed once occupancy has
    /// drained to at most this many packets. `None` resumes after any
    /// completed read, which is eager and can oscillate between pause and
    /// resume under sustained overflow.
    pub resume_watermark: Option<usize>,
    /// Name under which the byte-stream device is registered.
    pub device_name: String,
    /// Name under which the virtual network interface is registered.
    pub interface_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Client,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            resume_watermark: None,
            device_name: "tapwire".into(),
            interface_name: "tapwire0".into(),
        }
    }
}
