use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::dispatch::{DispatchConfig, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<SessionRegistry>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let registry = Arc::new(SessionRegistry::new(DispatchConfig::from(&settings.dispatch)));

        Self {
            settings: Arc::new(settings),
            registry,
            start_time: Instant::now(),
        }
    }
}
