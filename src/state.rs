use std::sync::Arc;

use crate::config::Config;
use crate::db::RecordStore;

pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }
}
