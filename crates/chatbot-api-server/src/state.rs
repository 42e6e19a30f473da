use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::SettingsHandle;
use crate::services::MessagePipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MessagePipeline>,
    pub settings: SettingsHandle,
}

impl FromRef<AppState> for Arc<MessagePipeline> {
    fn from_ref(state: &AppState) -> Self {
        state.pipeline.clone()
    }
}

impl FromRef<AppState> for SettingsHandle {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}
