use std::sync::Arc;

use crate::config::StationConfig;
use crate::storage::DefectStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DefectStore>,
    pub config: Arc<StationConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn DefectStore>, config: StationConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
