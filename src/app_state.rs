use crate::gateway::LookupGateway;
use std::{sync::Arc, time::Instant};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<LookupGateway>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Arc<LookupGateway>) -> Self {
        Self {
            gateway,
            started_at: Instant::now(),
        }
    }
}
