//! Chunked transfer protocol.
//!
//! One transfer is a header frame followed by zero or more chunk frames;
//! the end of the byte stream ends the payload. The same codec and
//! receiver drive uploads (server receives) and downloads (client
//! receives).

pub mod chunker;
pub mod codec;
pub mod receiver;

pub use chunker::{chunk_count, chunk_payload, encode_transfer, transfer_frames};
pub use codec::{MAX_FRAME_LENGTH, TransferCodec, TransferCodecError, framed_reader};
pub use receiver::{Received, TransferReceiver, receive_all};
