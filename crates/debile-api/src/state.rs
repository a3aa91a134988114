//! Application state.

use debile_config::MasterConfig;
use debile_db::Store;
use debile_scheduler::{
    BroadcastEmitter, FanoutEmitter, FingerprintKeyring, LogEmitter, MasterInterface,
};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub master: Arc<MasterInterface>,
    pub events: BroadcastEmitter,
}

impl AppState {
    pub fn new(store: Store, config: &MasterConfig) -> Self {
        let events = BroadcastEmitter::new(config.events.buffer);
        let sink = FanoutEmitter::new()
            .with(Arc::new(events.clone()))
            .with(Arc::new(LogEmitter));

        let master = Arc::new(MasterInterface::new(
            &store,
            &config.repo,
            Arc::new(sink),
            Arc::new(FingerprintKeyring),
        ));

        Self {
            store,
            master,
            events,
        }
    }
}
