//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::report::{ReportService, Renderer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    reports: ReportService,
}

impl AppState {
    /// Create a new application state around the given renderer
    pub fn new(config: Config, renderer: Arc<dyn Renderer>) -> Self {
        let reports = ReportService::new(&config, renderer);
        Self {
            inner: Arc::new(AppStateInner { config, reports }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the report generation service
    pub fn reports(&self) -> &ReportService {
        &self.inner.reports
    }
}
