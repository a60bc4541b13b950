use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::ImageID;
use crate::image::ImageRecord;

/// Page size used when a list request does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(error),
            message: None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

// ===== Auth =====

#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    /// Session lifetime in seconds.
    pub expires_in: u64,
}

// ===== Images =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: ImageID,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub requester: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Last id of the previous page; absent or empty starts from the newest.
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub cursor: Option<ImageID>,
}

fn empty_string_as_none<'de, D>(
    deserializer: D,
) -> Result<Option<ImageID>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResponse {
    pub images: Vec<ImageRecord>,
}

impl ListResponse {
    /// Cursor for the following page, `None` once a page comes back empty.
    pub fn next_cursor(&self) -> Option<ImageID> {
        self.images.last().map(|record| record.id)
    }
}

// ===== Errors =====

/// Wire name of an error taxonomy variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Authorization,
    NotFound,
    Validation,
    Storage,
    Duplicate,
    Credential,
    Transport,
    DeadlineExceeded,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_treats_empty_cursor_as_newest() {
        let query: ListQuery =
            serde_json::from_str(r#"{"cursor":"","page_size":3}"#).unwrap();
        assert!(query.cursor.is_none());
        assert_eq!(query.page_size, Some(3));

        let id = ImageID::new();
        let query: ListQuery =
            serde_json::from_value(serde_json::json!({ "cursor": id }))
                .unwrap();
        assert_eq!(query.cursor, Some(id));
    }

    #[test]
    fn error_kind_is_snake_case() {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: ErrorKind::DeadlineExceeded,
                message: "took too long".into(),
                status: 504,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["kind"], "deadline_exceeded");
    }

    #[test]
    fn credentials_are_redacted() {
        let req = LoginRequest {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{req:?}").contains("hunter2"));
    }
}
