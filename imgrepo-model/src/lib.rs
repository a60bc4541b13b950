//! Core data model definitions shared across imgrepo crates.
#![allow(missing_docs)]

pub mod api;
pub mod error;
pub mod ids;
pub mod image;
pub mod routes;
pub mod transfer;

pub use api::{
    ApiResponse, ErrorBody, ErrorDetail, ErrorKind, ListQuery, ListResponse,
    LoginRequest, LoginResponse, RegisterRequest, UploadResponse,
    DownloadQuery, DEFAULT_PAGE_SIZE,
};
pub use error::{ModelError, Result};
pub use ids::ImageID;
pub use image::{Image, ImageRecord, NewImage, Visibility};
pub use transfer::{
    DownloadHeader, MAX_CHUNK_SIZE, TRANSFER_CONTENT_TYPE, TransferFrame,
    UploadHeader,
};
