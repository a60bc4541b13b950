use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Strongly typed ID for stored images.
///
/// Backed by a UUIDv7, so ids sort by creation time and double as the
/// keyset pagination cursor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ImageID(pub Uuid);

impl Default for ImageID {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageID {
    pub fn new() -> Self {
        ImageID(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }

    /// Creation time embedded in the id, if it carries one.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let (secs, nanos) = self.0.get_timestamp()?.to_unix();
        DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
    }
}

impl AsRef<Uuid> for ImageID {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ImageID {
    fn from(value: Uuid) -> Self {
        ImageID(value)
    }
}

impl std::fmt::Display for ImageID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ImageID {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(ImageID)
            .map_err(|_| ModelError::InvalidId(s.to_string()))
    }
}
