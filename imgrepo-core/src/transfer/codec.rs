use std::io;
use std::marker::PhantomData;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use imgrepo_model::{MAX_CHUNK_SIZE, TransferFrame};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, Encoder, FramedRead, LengthDelimitedCodec};

use crate::error::RepoError;

/// Largest frame accepted on the wire: a full chunk plus headroom for the
/// tag byte and a JSON header.
pub const MAX_FRAME_LENGTH: usize = MAX_CHUNK_SIZE + 16 * 1024;

const TAG_HEADER: u8 = 0x01;
const TAG_CHUNK: u8 = 0x02;

#[derive(Debug, Error)]
pub enum TransferCodecError {
    #[error("transfer I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed transfer header: {0}")]
    Header(#[from] serde_json::Error),

    #[error("unknown frame tag {0:#04x}")]
    UnknownTag(u8),

    #[error("empty frame")]
    EmptyFrame,

    #[error("chunk of {0} bytes exceeds the {MAX_CHUNK_SIZE} byte limit")]
    OversizeChunk(usize),
}

impl From<TransferCodecError> for RepoError {
    fn from(err: TransferCodecError) -> Self {
        match err {
            // LengthDelimitedCodec reports oversize frames as InvalidData
            TransferCodecError::Io(io) if io.kind() == io::ErrorKind::InvalidData => {
                RepoError::Validation(format!("invalid transfer frame: {io}"))
            }
            TransferCodecError::Io(io) => RepoError::Transport(io.to_string()),
            other => RepoError::Validation(other.to_string()),
        }
    }
}

/// Length-prefixed (u32 big-endian) frames of `tag | payload`.
///
/// Header payloads are JSON, chunk payloads are raw bytes.
#[derive(Debug)]
pub struct TransferCodec<H> {
    inner: LengthDelimitedCodec,
    _header: PhantomData<fn() -> H>,
}

impl<H> TransferCodec<H> {
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec(),
            _header: PhantomData,
        }
    }
}

impl<H> Default for TransferCodec<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Clone for TransferCodec<H> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<H: DeserializeOwned> Decoder for TransferCodec<H> {
    type Item = TransferFrame<H>;
    type Error = TransferCodecError;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<Self::Item>, Self::Error> {
        let Some(mut frame) = self.inner.decode(src)? else {
            return Ok(None);
        };
        if frame.is_empty() {
            return Err(TransferCodecError::EmptyFrame);
        }

        match frame.get_u8() {
            TAG_HEADER => Ok(Some(TransferFrame::Header(serde_json::from_slice(
                &frame,
            )?))),
            TAG_CHUNK => {
                if frame.len() > MAX_CHUNK_SIZE {
                    return Err(TransferCodecError::OversizeChunk(frame.len()));
                }
                Ok(Some(TransferFrame::Chunk(frame.freeze())))
            }
            other => Err(TransferCodecError::UnknownTag(other)),
        }
    }
}

impl<H: Serialize> Encoder<TransferFrame<H>> for TransferCodec<H> {
    type Error = TransferCodecError;

    fn encode(
        &mut self,
        item: TransferFrame<H>,
        dst: &mut BytesMut,
    ) -> Result<(), Self::Error> {
        let payload = match item {
            TransferFrame::Header(header) => {
                let mut writer = BytesMut::new().writer();
                writer.get_mut().put_u8(TAG_HEADER);
                serde_json::to_writer(&mut writer, &header)?;
                writer.into_inner().freeze()
            }
            TransferFrame::Chunk(data) => {
                if data.len() > MAX_CHUNK_SIZE {
                    return Err(TransferCodecError::OversizeChunk(data.len()));
                }
                let mut buf = BytesMut::with_capacity(1 + data.len());
                buf.put_u8(TAG_CHUNK);
                buf.extend_from_slice(&data);
                buf.freeze()
            }
        };
        self.inner.encode(payload, dst)?;
        Ok(())
    }
}

/// Decode frames from any byte source, e.g. an HTTP body adapted with
/// `StreamReader`.
pub fn framed_reader<H, R>(reader: R) -> FramedRead<R, TransferCodec<H>>
where
    H: DeserializeOwned,
    R: AsyncRead,
{
    FramedRead::new(reader, TransferCodec::new())
}

/// Encode a single frame into its wire bytes.
pub(crate) fn encode_frame<H: Serialize>(
    frame: TransferFrame<H>,
) -> Result<Bytes, TransferCodecError> {
    let mut buf = BytesMut::new();
    TransferCodec::<H>::new().encode(frame, &mut buf)?;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgrepo_model::{ImageID, ImageRecord, Visibility};

    fn header() -> ImageRecord {
        ImageRecord {
            id: ImageID::new(),
            name: "a.png".into(),
            owner: "alice".into(),
            visibility: Visibility::Public,
        }
    }

    #[test]
    fn decodes_frames_split_across_reads() {
        let record = header();
        let mut wire = BytesMut::new();
        let mut codec = TransferCodec::<ImageRecord>::new();
        codec
            .encode(TransferFrame::Header(record.clone()), &mut wire)
            .unwrap();
        codec
            .encode(TransferFrame::Chunk(Bytes::from_static(b"abc")), &mut wire)
            .unwrap();

        // Feed one byte at a time.
        let mut src = BytesMut::new();
        let mut frames = Vec::new();
        for byte in wire.iter() {
            src.put_u8(*byte);
            while let Some(frame) = codec.decode(&mut src).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(
            frames,
            vec![
                TransferFrame::Header(record),
                TransferFrame::Chunk(Bytes::from_static(b"abc")),
            ]
        );
    }

    #[test]
    fn rejects_unknown_tags_and_empty_frames() {
        let mut codec = TransferCodec::<ImageRecord>::new();

        let mut src = BytesMut::from(&[0, 0, 0, 2, 0x7f, 0][..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(TransferCodecError::UnknownTag(0x7f))
        ));

        let mut src = BytesMut::from(&[0, 0, 0, 0][..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(TransferCodecError::EmptyFrame)
        ));
    }

    #[test]
    fn rejects_oversize_frames() {
        let mut codec = TransferCodec::<ImageRecord>::new();
        let len = (MAX_FRAME_LENGTH + 1) as u32;
        let mut src = BytesMut::from(&len.to_be_bytes()[..]);
        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(RepoError::from(err), RepoError::Validation(_)));

        let oversized = Bytes::from(vec![0u8; MAX_CHUNK_SIZE + 1]);
        let mut dst = BytesMut::new();
        assert!(matches!(
            codec.encode(TransferFrame::Chunk(oversized), &mut dst),
            Err(TransferCodecError::OversizeChunk(_))
        ));
    }

    #[test]
    fn malformed_header_is_a_validation_error() {
        let mut codec = TransferCodec::<ImageRecord>::new();
        let mut src = BytesMut::from(&[0, 0, 0, 3, TAG_HEADER, b'{', b'x'][..]);
        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(err, TransferCodecError::Header(_)));
        assert!(matches!(RepoError::from(err), RepoError::Validation(_)));
    }
}
