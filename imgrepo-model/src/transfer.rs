//! Frame types of the chunked transfer protocol.
//!
//! A transfer is one header frame followed by zero or more chunk frames; the
//! end of the stream marks the end of the payload.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::image::{ImageRecord, NewImage, Visibility};

/// Maximum payload carried by a single chunk frame.
pub const MAX_CHUNK_SIZE: usize = 128 * 1024;

/// Content type of framed transfer bodies.
pub const TRANSFER_CONTENT_TYPE: &str = "application/x-imgrepo-transfer";

/// Header sent by the uploader. Authentication happens when it arrives.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHeader {
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub owner: String,
    pub visibility: Visibility,
}

impl UploadHeader {
    pub fn new(token: impl Into<String>, image: NewImage) -> Self {
        Self {
            token: token.into(),
            name: image.name,
            owner: image.owner,
            visibility: image.visibility,
        }
    }

    pub fn into_new_image(self) -> NewImage {
        NewImage {
            name: self.name,
            owner: self.owner,
            visibility: self.visibility,
        }
    }
}

impl fmt::Debug for UploadHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHeader")
            .field("token", &"<redacted>")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// Header sent by the server ahead of a download payload.
pub type DownloadHeader = ImageRecord;

/// One frame of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFrame<H> {
    Header(H),
    Chunk(Bytes),
}
