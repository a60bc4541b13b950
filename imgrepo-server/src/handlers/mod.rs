//! HTTP request handlers organized by functionality

pub mod auth;
pub mod bearer;
pub mod health;
pub mod images;

pub use bearer::BearerToken;
