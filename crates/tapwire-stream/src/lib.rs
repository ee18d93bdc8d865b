//! Length-prefix framing of queued packets into a sequential byte stream.
//!
//! The consumer sees repeating units of `[4-byte length][length payload
//! bytes]`, one unit per queued frame, in FIFO order. Reads are resumable: a
//! consumer buffer smaller than one frame drains the head packet across
//! multiple calls, and the observed byte stream is identical for any chunking
//! of the same queue contents.
#![forbid(unsafe_code)]

pub mod cursor;
pub mod framing;
pub mod stream;

pub use cursor::{FramedReadCursor, ReadError, ReadSink, SliceSink};
pub use framing::{frame_header, FRAME_HEADER_LEN};
pub use stream::{CharStream, Readiness, SeekError, SeekFrom, WriteError};
