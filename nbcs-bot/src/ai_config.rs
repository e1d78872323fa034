//! Per-user AI settings (endpoint, credential, model, sampling parameters).

use crate::store::SettingsStore;
use nbcs_common::validation::{check_http_url, check_range};
use nbcs_common::{AiDefaultsConfig, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error from a `/configai` update.
#[derive(Debug, thiserror::Error)]
pub enum ConfigAiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Fully resolved AI settings for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

impl UserAiConfig {
    /// Settings for a user who has configured nothing.
    pub fn from_defaults(defaults: &AiDefaultsConfig) -> Self {
        Self {
            base_url: defaults.base_url.clone(),
            api_key: None,
            model: defaults.model.clone(),
            temperature: defaults.temperature,
            top_p: defaults.top_p,
            max_tokens: defaults.max_tokens,
            stream: defaults.stream,
        }
    }

    /// Overlay every field that `patch` sets.
    pub fn apply(&mut self, patch: &PartialAiConfig) {
        if let Some(ref base_url) = patch.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(ref api_key) = patch.api_key {
            self.api_key = Some(api_key.clone());
        }
        if let Some(ref model) = patch.model {
            self.model = model.clone();
        }
        if let Some(temperature) = patch.temperature {
            self.temperature = temperature;
        }
        if let Some(top_p) = patch.top_p {
            self.top_p = top_p;
        }
        if let Some(max_tokens) = patch.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(stream) = patch.stream {
            self.stream = stream;
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// A set of explicitly provided AI settings.
///
/// This is both the shape of a `/configai` update and the on-disk record,
/// which uses the field names of the original settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialAiConfig {
    #[serde(rename = "baseURL", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(rename = "apiKey", default)]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl PartialAiConfig {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Reject values outside the accepted ranges.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref base_url) = self.base_url {
            check_http_url("baseurl", base_url)?;
        }
        if let Some(ref model) = self.model {
            if model.trim().is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "model".into(),
                    reason: "must not be empty".into(),
                });
            }
        }
        if let Some(temperature) = self.temperature {
            check_range("temperature", temperature, 0.0, 2.0)?;
        }
        if let Some(top_p) = self.top_p {
            check_range("top_p", top_p, 0.0, 1.0)?;
        }
        if let Some(max_tokens) = self.max_tokens {
            check_range("max_tokens", f64::from(max_tokens), 1.0, 8192.0)?;
        }
        Ok(())
    }
}

impl From<&UserAiConfig> for PartialAiConfig {
    fn from(config: &UserAiConfig) -> Self {
        Self {
            base_url: Some(config.base_url.clone()),
            api_key: config.api_key.clone(),
            model: Some(config.model.clone()),
            temperature: Some(config.temperature),
            top_p: Some(config.top_p),
            max_tokens: Some(config.max_tokens),
            stream: Some(config.stream),
        }
    }
}

/// Durable per-user AI settings.
pub struct ConfigStore {
    store: Arc<dyn SettingsStore<PartialAiConfig>>,
    defaults: UserAiConfig,
}

impl ConfigStore {
    pub fn new(store: Arc<dyn SettingsStore<PartialAiConfig>>, defaults: &AiDefaultsConfig) -> Self {
        Self {
            store,
            defaults: UserAiConfig::from_defaults(defaults),
        }
    }

    pub fn defaults(&self) -> &UserAiConfig {
        &self.defaults
    }

    /// Effective settings: defaults overlaid with whatever the user stored.
    pub fn get(&self, user_id: &str) -> UserAiConfig {
        let mut config = self.defaults.clone();
        if let Some(stored) = self.store.get(user_id) {
            config.apply(&stored);
        }
        config
    }

    /// Merge `patch` into the user's settings and persist the full record.
    pub fn update(&self, user_id: &str, patch: &PartialAiConfig) -> Result<UserAiConfig, ConfigAiError> {
        patch.validate()?;

        let mut config = self.get(user_id);
        config.apply(patch);
        self.store.set(user_id, PartialAiConfig::from(&config));

        tracing::info!(
            user_id = %user_id,
            model = %config.model,
            stream = config.stream,
            credential_changed = patch.api_key.is_some(),
            "AI config updated"
        );

        Ok(config)
    }

    /// Replace the user's settings with the defaults (credential included).
    pub fn reset(&self, user_id: &str) -> UserAiConfig {
        self.store.set(user_id, PartialAiConfig::from(&self.defaults));
        tracing::info!(user_id = %user_id, "AI config reset to defaults");
        self.defaults.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};

    fn config_store() -> ConfigStore {
        ConfigStore::new(Arc::new(MemoryStore::<PartialAiConfig>::new()), &AiDefaultsConfig::default())
    }

    #[test]
    fn unknown_user_gets_defaults() {
        let store = config_store();
        let config = store.get("u1");
        assert_eq!(config.model, "google/gemini-2.0-flash-001");
        assert_eq!(config.temperature, 1.0);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.max_tokens, 2048);
        assert!(!config.stream);
        assert!(!config.has_credential());
    }

    #[test]
    fn update_merges_fields() {
        let store = config_store();
        store
            .update(
                "u1",
                &PartialAiConfig {
                    api_key: Some("sk-test".into()),
                    temperature: Some(0.2),
                    ..Default::default()
                },
            )
            .unwrap();

        let config = store
            .update(
                "u1",
                &PartialAiConfig {
                    model: Some("gpt-4o".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(store.get("u1"), config);
        assert_eq!(store.get("u2"), *store.defaults());
    }

    #[test]
    fn out_of_range_update_is_rejected_and_not_stored() {
        let store = config_store();
        let err = store
            .update(
                "u1",
                &PartialAiConfig {
                    top_p: Some(1.5),
                    api_key: Some("sk".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("top_p"));
        assert!(!store.get("u1").has_credential());
    }

    #[test]
    fn reset_drops_credential() {
        let store = config_store();
        store
            .update(
                "u1",
                &PartialAiConfig {
                    api_key: Some("sk".into()),
                    stream: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let config = store.reset("u1");
        assert!(!config.has_credential());
        assert!(!store.get("u1").stream);
    }

    #[test]
    fn file_uses_original_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ai_config.json");
        let store = ConfigStore::new(
            Arc::new(JsonFileStore::<PartialAiConfig>::open(&path)),
            &AiDefaultsConfig::default(),
        );
        store
            .update(
                "42",
                &PartialAiConfig {
                    api_key: Some("sk-abc".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["42"]["apiKey"], "sk-abc");
        assert_eq!(raw["42"]["baseURL"], "https://openrouter.ai/api/v1");
        assert_eq!(raw["42"]["max_tokens"], 2048);
        assert_eq!(raw["42"]["stream"], false);
    }

    #[test]
    fn partial_record_on_disk_is_filled_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ai_config.json");
        std::fs::write(&path, r#"{"7": {"apiKey": "k", "model": "m"}}"#).unwrap();

        let store = ConfigStore::new(
            Arc::new(JsonFileStore::<PartialAiConfig>::open(&path)),
            &AiDefaultsConfig::default(),
        );
        let config = store.get("7");
        assert_eq!(config.model, "m");
        assert_eq!(config.top_p, 0.9);
        assert!(config.has_credential());
    }
}
