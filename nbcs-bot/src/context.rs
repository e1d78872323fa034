//! Shared state handed to every interaction handler.

use crate::ai_config::{ConfigStore, PartialAiConfig};
use crate::completion::{CompletionClient, CompletionTransport, HttpTransport};
use crate::pagination::PaginationRegistry;
use crate::progress::PreviewPolicy;
use crate::prompt::PromptStore;
use crate::session::SessionManager;
use crate::store::{JsonFileStore, MemoryStore, SettingsStore};
use nbcs_common::{AiDefaultsConfig, Config};
use std::sync::Arc;
use std::time::Duration;

pub struct BotContext {
    pub prompts: Arc<PromptStore>,
    pub sessions: Arc<SessionManager>,
    pub configs: Arc<ConfigStore>,
    pub completion: Arc<CompletionClient>,
    pub pagination: Arc<PaginationRegistry>,
    pub preview: PreviewPolicy,
}

impl BotContext {
    pub fn new(
        prompt_store: Arc<dyn SettingsStore<String>>,
        config_store: Arc<dyn SettingsStore<PartialAiConfig>>,
        transport: Arc<dyn CompletionTransport>,
        ai: &AiDefaultsConfig,
        preview: PreviewPolicy,
    ) -> Self {
        let prompts = Arc::new(PromptStore::new(prompt_store, ai.default_system_prompt.clone()));
        let sessions = Arc::new(SessionManager::new(prompts.clone()));
        let pagination = Arc::new(PaginationRegistry::new(sessions.clone()));

        Self {
            prompts,
            sessions,
            configs: Arc::new(ConfigStore::new(config_store, ai)),
            completion: Arc::new(CompletionClient::new(transport)),
            pagination,
            preview,
        }
    }

    /// Production wiring: JSON files under the data directory and HTTP completions.
    pub fn from_config(config: &Config) -> Self {
        let prompt_store = Arc::new(JsonFileStore::<String>::open(config.storage.system_prompts_path()));
        let config_store = Arc::new(JsonFileStore::<PartialAiConfig>::open(config.storage.ai_config_path()));
        let transport = Arc::new(HttpTransport::new(Duration::from_secs(
            config.ai.request_timeout_secs,
        )));

        Self::new(
            prompt_store,
            config_store,
            transport,
            &config.ai,
            PreviewPolicy::from_config(&config.presentation),
        )
    }

    /// Nothing persisted; completions go through `transport`.
    pub fn in_memory(ai: &AiDefaultsConfig, transport: Arc<dyn CompletionTransport>) -> Self {
        Self::new(
            Arc::new(MemoryStore::<String>::new()),
            Arc::new(MemoryStore::<PartialAiConfig>::new()),
            transport,
            ai,
            PreviewPolicy::Deferred,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_uses_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_path_buf();

        let ctx = BotContext::from_config(&config);
        ctx.sessions.set_system_prompt("u1", "persisted");

        let raw = std::fs::read_to_string(dir.path().join("system_prompts.json")).unwrap();
        assert!(raw.contains("persisted"));
        assert_eq!(ctx.preview, PreviewPolicy::Deferred);
    }
}
