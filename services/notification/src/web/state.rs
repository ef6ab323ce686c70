//! services/notification/src/web/state.rs
//!
//! Defines the service's shared state.

use guardiancare_core::ports::DeviceRepository;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub devices: Arc<dyn DeviceRepository>,
}
