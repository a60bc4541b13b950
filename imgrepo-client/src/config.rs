use std::time::Duration;

use imgrepo_model::DEFAULT_PAGE_SIZE;

/// Tunables for [`crate::RepositoryClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for metadata calls: register, login and list.
    pub request_timeout: Duration,
    /// Deadline for a whole upload or download. `None` leaves active
    /// transfers unbounded.
    pub transfer_timeout: Option<Duration>,
    /// Page size requested by `list`.
    pub page_size: u32,
    /// Largest payload accepted from a download.
    pub max_image_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            transfer_timeout: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_image_bytes: 64 * 1024 * 1024,
        }
    }
}
