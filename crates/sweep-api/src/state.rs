use std::sync::Arc;

use sweep_store::JobStore;

/// Shared state injected into every handler, per spec §9's "inject the
/// store handle rather than relying on module-level state" guidance.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub status_change_pin: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>, status_change_pin: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            status_change_pin: status_change_pin.into(),
        }
    }
}
