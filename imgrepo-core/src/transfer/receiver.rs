use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use imgrepo_model::{MAX_CHUNK_SIZE, TransferFrame};
use tracing::debug;

use crate::error::{RepoError, Result};
use crate::transfer::codec::TransferCodecError;

enum ReceiverState<H> {
    AwaitHeader,
    Accumulating {
        header: H,
        buffer: BytesMut,
        chunks: usize,
    },
}

/// A completed transfer.
#[derive(Debug)]
pub struct Received<H> {
    pub header: H,
    pub payload: Bytes,
    pub chunks: usize,
}

/// Receiving half of the transfer protocol.
///
/// Dropping the receiver before [`TransferReceiver::finish`] discards any
/// accumulated bytes, which is what happens on transport errors and
/// deadline expiry.
pub struct TransferReceiver<H> {
    state: ReceiverState<H>,
    max_len: usize,
}

impl<H> std::fmt::Debug for TransferReceiver<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (phase, received) = match &self.state {
            ReceiverState::AwaitHeader => ("await_header", 0),
            ReceiverState::Accumulating { buffer, .. } => {
                ("accumulating", buffer.len())
            }
        };
        f.debug_struct("TransferReceiver")
            .field("phase", &phase)
            .field("received", &received)
            .field("max_len", &self.max_len)
            .finish()
    }
}

impl<H> TransferReceiver<H> {
    pub fn new(max_len: usize) -> Self {
        Self {
            state: ReceiverState::AwaitHeader,
            max_len,
        }
    }

    pub fn header(&self) -> Option<&H> {
        match &self.state {
            ReceiverState::AwaitHeader => None,
            ReceiverState::Accumulating { header, .. } => Some(header),
        }
    }

    /// Feed one frame. Returns the header when this frame was the header,
    /// so the caller can validate it before any chunk is accepted.
    pub fn accept(&mut self, frame: TransferFrame<H>) -> Result<Option<&H>> {
        match frame {
            TransferFrame::Header(header) => {
                if !matches!(self.state, ReceiverState::AwaitHeader) {
                    return Err(RepoError::Validation("duplicate header".into()));
                }
                self.state = ReceiverState::Accumulating {
                    header,
                    buffer: BytesMut::new(),
                    chunks: 0,
                };
                Ok(self.header())
            }
            TransferFrame::Chunk(data) => {
                let ReceiverState::Accumulating { buffer, chunks, .. } =
                    &mut self.state
                else {
                    return Err(RepoError::Validation(
                        "chunk received before header".into(),
                    ));
                };
                if data.len() > MAX_CHUNK_SIZE {
                    return Err(RepoError::Validation(format!(
                        "chunk of {} bytes exceeds {MAX_CHUNK_SIZE}",
                        data.len()
                    )));
                }
                if buffer.len() + data.len() > self.max_len {
                    return Err(RepoError::Validation(format!(
                        "payload exceeds the {} byte limit",
                        self.max_len
                    )));
                }
                buffer.extend_from_slice(&data);
                *chunks += 1;
                Ok(None)
            }
        }
    }

    /// Stream ended: the accumulated buffer is the complete payload.
    pub fn finish(self) -> Result<Received<H>> {
        match self.state {
            ReceiverState::AwaitHeader => Err(RepoError::Validation(
                "stream closed before header".into(),
            )),
            ReceiverState::Accumulating {
                header,
                buffer,
                chunks,
            } => {
                debug!(bytes = buffer.len(), chunks, "transfer complete");
                Ok(Received {
                    header,
                    payload: buffer.freeze(),
                    chunks,
                })
            }
        }
    }
}

/// Drain a decoded frame stream into a completed transfer.
pub async fn receive_all<H, S>(mut frames: S, max_len: usize) -> Result<Received<H>>
where
    S: Stream<Item = std::result::Result<TransferFrame<H>, TransferCodecError>>
        + Unpin,
{
    let mut receiver = TransferReceiver::new(max_len);
    while let Some(frame) = frames.next().await {
        receiver.accept(frame?)?;
    }
    receiver.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::chunker::transfer_frames;

    #[test]
    fn reassembles_in_arrival_order() {
        let payload: Bytes = (0..300_000u32).map(|i| (i % 7) as u8).collect();
        let mut receiver = TransferReceiver::new(usize::MAX);

        for frame in transfer_frames("header", payload.clone()) {
            receiver.accept(frame).unwrap();
        }
        let received = receiver.finish().unwrap();
        assert_eq!(received.header, "header");
        assert_eq!(received.payload, payload);
        assert_eq!(received.chunks, 3);
    }

    #[test]
    fn header_is_surfaced_once() {
        let mut receiver = TransferReceiver::new(16);
        assert_eq!(
            receiver.accept(TransferFrame::Header("h")).unwrap(),
            Some(&"h")
        );
        assert_eq!(
            receiver
                .accept(TransferFrame::Chunk(Bytes::from_static(b"x")))
                .unwrap(),
            None
        );
        assert!(matches!(
            receiver.accept(TransferFrame::Header("again")),
            Err(RepoError::Validation(_))
        ));
    }

    #[test]
    fn protocol_violations_are_validation_errors() {
        let mut receiver = TransferReceiver::<&str>::new(16);
        assert!(matches!(
            receiver.accept(TransferFrame::Chunk(Bytes::from_static(b"x"))),
            Err(RepoError::Validation(_))
        ));
        assert!(matches!(
            TransferReceiver::<&str>::new(16).finish(),
            Err(RepoError::Validation(_))
        ));

        let mut receiver = TransferReceiver::new(4);
        receiver.accept(TransferFrame::Header("h")).unwrap();
        assert!(matches!(
            receiver.accept(TransferFrame::Chunk(Bytes::from_static(b"12345"))),
            Err(RepoError::Validation(_))
        ));
    }

    #[test]
    fn empty_payload_is_just_a_header() {
        let mut receiver = TransferReceiver::new(16);
        receiver.accept(TransferFrame::Header(())).unwrap();
        let received = receiver.finish().unwrap();
        assert!(received.payload.is_empty());
        assert_eq!(received.chunks, 0);
    }

    #[tokio::test]
    async fn transport_error_aborts_the_transfer() {
        let frames = futures::stream::iter(vec![
            Ok(TransferFrame::Header("h")),
            Ok(TransferFrame::Chunk(Bytes::from_static(b"partial"))),
            Err(TransferCodecError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ]);
        let err = receive_all(frames, 1024).await.unwrap_err();
        assert!(matches!(err, RepoError::Transport(_)));
    }
}
