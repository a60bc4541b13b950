use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::ImageID;

/// Binary access flag on a stored image.
///
/// Encoded on the wire and in storage as `0 = Public`, `1 = Private`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "i32", into = "i32")]
pub enum Visibility {
    Public = 0,
    #[default]
    Private = 1,
}

impl Visibility {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Visibility {
    type Error = ModelError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Visibility::Public),
            1 => Ok(Visibility::Private),
            other => Err(ModelError::InvalidVisibility(other)),
        }
    }
}

impl From<Visibility> for i32 {
    fn from(value: Visibility) -> Self {
        value.as_i32()
    }
}

impl FromStr for Visibility {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "0" => Ok(Visibility::Public),
            "private" | "1" => Ok(Visibility::Private),
            _ => Err(ModelError::UnknownVisibility(s.trim().to_string())),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// Metadata entry describing one stored image. The payload lives in the
/// blob store under the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageID,
    pub name: String,
    pub owner: String,
    pub visibility: Visibility,
}

impl ImageRecord {
    /// Visible to `requester` iff they own it or it is public.
    pub fn is_visible_to(&self, requester: &str) -> bool {
        self.owner == requester || self.visibility == Visibility::Public
    }
}

/// Metadata supplied by the uploader before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub name: String,
    pub owner: String,
    pub visibility: Visibility,
}

impl NewImage {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            visibility,
        }
    }

    pub fn into_record(self, id: ImageID) -> ImageRecord {
        ImageRecord {
            id,
            name: self.name,
            owner: self.owner,
            visibility: self.visibility,
        }
    }
}

/// A record together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub record: ImageRecord,
    pub data: Bytes,
}
