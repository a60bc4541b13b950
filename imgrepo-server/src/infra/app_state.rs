use std::{fmt, sync::Arc};

use imgrepo_config::Config;

use crate::service::RepositoryService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RepositoryService>,
    pub config: Option<Arc<Config>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(service: RepositoryService) -> Self {
        Self {
            service: Arc::new(service),
            config: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(Arc::new(config));
        self
    }
}
