//! Wire framing constants and helpers.

use tapwire_queue::Packet;

pub use tapwire_queue::packet::FRAME_HEADER_LEN;

/// Encode the length prefix for a payload of `len` bytes.
///
/// Host byte order: the prefix is a `u32` written straight into the byte
/// stream, and the stream is consumed on the same host it is produced on, so
/// no canonical network order is imposed.
pub fn frame_header(len: u32) -> [u8; FRAME_HEADER_LEN] {
    len.to_ne_bytes()
}

/// Serialize one packet into its complete framed representation.
///
/// Only used by tests and diagnostics; the read path streams the same bytes
/// incrementally via [`crate::FramedReadCursor`] without building this
/// intermediate buffer.
pub fn frame_packet(packet: &Packet) -> Vec<u8> {
    let mut out = Vec::with_capacity(packet.framed_len());
    out.extend_from_slice(&frame_header(packet.len()));
    out.extend_from_slice(packet.payload());
    out
}
