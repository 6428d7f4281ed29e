use crate::{ApiError, ApiResult};
use std::sync::Arc;
use summarizer_ai::{
    AssistantsApi, CleanupGate, OpenAIAssistantsProvider, SummarizeWorkflow, WorkflowSettings,
};
use summarizer_core::ConfigManager;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigManager>,
    /// `None` when no provider could be built (e.g. missing API key)
    pub workflow: Option<Arc<SummarizeWorkflow>>,
}

impl AppState {
    pub fn new(config: Arc<ConfigManager>) -> Self {
        match OpenAIAssistantsProvider::new(&config.config().openai) {
            Ok(provider) => Self::with_api(config, Arc::new(provider)),
            Err(e) => {
                warn!("Summarization disabled: {:#}", e);
                Self {
                    config,
                    workflow: None,
                }
            }
        }
    }

    /// Build state around an already constructed provider
    pub fn with_api(config: Arc<ConfigManager>, api: Arc<dyn AssistantsApi>) -> Self {
        let settings = WorkflowSettings::from_config(config.config());
        info!(
            provider = api.provider_name(),
            cleanup = %settings.cleanup_scope,
            "Summarization workflow ready"
        );
        let workflow = SummarizeWorkflow::new(api, settings, CleanupGate::new());

        Self {
            config,
            workflow: Some(Arc::new(workflow)),
        }
    }

    pub fn workflow(&self) -> ApiResult<&SummarizeWorkflow> {
        self.workflow.as_deref().ok_or_else(|| {
            ApiError::ServiceUnavailable("no Assistants API key configured".to_string())
        })
    }
}
