//! Per-user system prompt overrides.

use crate::store::SettingsStore;
use std::sync::Arc;

/// Durable mapping of user → custom system prompt.
pub struct PromptStore {
    store: Arc<dyn SettingsStore<String>>,
    default_prompt: String,
}

impl PromptStore {
    pub fn new(store: Arc<dyn SettingsStore<String>>, default_prompt: impl Into<String>) -> Self {
        Self {
            store,
            default_prompt: default_prompt.into(),
        }
    }

    /// The prompt used for users without an override.
    pub fn default_prompt(&self) -> &str {
        &self.default_prompt
    }

    /// The user's stored override, if any.
    pub fn get(&self, user_id: &str) -> Option<String> {
        self.store.get(user_id)
    }

    /// The prompt that applies to the user: override or default.
    pub fn effective(&self, user_id: &str) -> String {
        self.get(user_id)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.default_prompt.clone())
    }

    pub fn set(&self, user_id: &str, prompt: &str) {
        self.store.set(user_id, prompt.to_string());
        tracing::debug!(user_id = %user_id, "System prompt stored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> PromptStore {
        PromptStore::new(Arc::new(MemoryStore::<String>::new()), "default prompt")
    }

    #[test]
    fn falls_back_to_default() {
        let prompts = store();
        assert!(prompts.get("u1").is_none());
        assert_eq!(prompts.effective("u1"), "default prompt");
    }

    #[test]
    fn override_wins() {
        let prompts = store();
        prompts.set("u1", "talk like a pirate");
        assert_eq!(prompts.effective("u1"), "talk like a pirate");
        assert_eq!(prompts.effective("u2"), "default prompt");
    }
}
