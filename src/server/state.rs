//! Application state shared across handlers

use chrono::{DateTime, Utc};

use crate::inference::{ScoringFacade, ServingConfig};

/// Read-only state: the facade is never swapped while the server runs
pub struct AppState {
    pub facade: ScoringFacade,
    pub config: ServingConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(facade: ScoringFacade, config: ServingConfig) -> Self {
        Self {
            facade,
            config,
            started_at: Utc::now(),
        }
    }
}
