use bytes::Bytes;
use futures::Stream;
use imgrepo_model::{MAX_CHUNK_SIZE, TransferFrame};
use serde::Serialize;

use crate::transfer::codec::{TransferCodecError, encode_frame};

/// Number of chunk frames needed for a payload of `len` bytes.
pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(MAX_CHUNK_SIZE)
}

/// Split a payload into in-order chunks of at most [`MAX_CHUNK_SIZE`]
/// bytes. Slices share the payload's buffer.
pub fn chunk_payload(payload: Bytes) -> impl Iterator<Item = Bytes> + Send {
    let len = payload.len();
    (0..chunk_count(len)).map(move |index| {
        let start = index * MAX_CHUNK_SIZE;
        let end = (start + MAX_CHUNK_SIZE).min(len);
        payload.slice(start..end)
    })
}

/// Header frame followed by the payload's chunk frames.
pub fn transfer_frames<H>(
    header: H,
    payload: Bytes,
) -> impl Iterator<Item = TransferFrame<H>> + Send
where
    H: Send,
{
    std::iter::once(TransferFrame::Header(header))
        .chain(chunk_payload(payload).map(TransferFrame::Chunk))
}

/// Wire bytes of a whole transfer, one item per frame, ready to become a
/// streaming HTTP body.
pub fn encode_transfer<H>(
    header: H,
    payload: Bytes,
) -> impl Stream<Item = Result<Bytes, TransferCodecError>> + Send + 'static
where
    H: Serialize + Send + 'static,
{
    futures::stream::iter(transfer_frames(header, payload).map(encode_frame))
}
