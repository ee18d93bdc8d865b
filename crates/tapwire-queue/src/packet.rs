use thiserror::Error;

/// Maximum payload length representable by the 4-byte wire length field.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// Number of bytes the length prefix occupies on the wire.
pub const FRAME_HEADER_LEN: usize = 4;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// The allocation for the packet's payload copy failed.
    ///
    /// The producer drops the frame and surfaces this to its caller; it is
    /// never fatal to the queue.
    #[error("out of memory copying a {len}-byte frame")]
    OutOfMemory { len: usize },

    /// The frame does not fit in the 4-byte length field.
    #[error("frame of {len} bytes exceeds the maximum framable payload")]
    TooLarge { len: usize },
}

/// One discrete unit of network data: an owned byte buffer plus its length.
///
/// Immutable once created. A packet is exclusively owned by whichever queue
/// slot (or peek handle) holds it and is freed when dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    payload: Vec<u8>,
}

impl Packet {
    /// Copy `frame` into an owned packet.
    ///
    /// Allocation failure is reported as [`PacketError::OutOfMemory`] rather
    /// than aborting, mirroring a transmit path that must shed load instead
    /// of failing hard.
    pub fn copy_from(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() > MAX_PAYLOAD_LEN {
            return Err(PacketError::TooLarge { len: frame.len() });
        }
        let mut payload = Vec::new();
        payload
            .try_reserve_exact(frame.len())
            .map_err(|_| PacketError::OutOfMemory { len: frame.len() })?;
        payload.extend_from_slice(frame);
        Ok(Self { payload })
    }

    /// Take ownership of an already-allocated frame buffer.
    pub fn from_vec(payload: Vec<u8>) -> Result<Self, PacketError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(PacketError::TooLarge { len: payload.len() });
        }
        Ok(Self { payload })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length as carried in the wire length field.
    pub fn len(&self) -> u32 {
        self.payload.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Total on-wire size of this packet: length prefix plus payload.
    pub fn framed_len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload.len()
    }
}
