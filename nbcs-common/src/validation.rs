//! Configuration validation for nbcs services.
//!
//! Provides validation logic for configuration fields to ensure
//! all required values are present and within valid ranges.

use thiserror::Error;

use crate::config::{AiDefaultsConfig, Config, DiscordConfig, ObservabilityConfig};

/// Shortest plausible Discord bot token.
const MIN_TOKEN_LEN: usize = 50;

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Check that `value` lies in `[min, max]`.
pub fn check_range(field: &str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::InvalidValue {
            field: field.into(),
            reason: format!("must be between {min} and {max}, got {value}"),
        });
    }
    Ok(())
}

/// Check that `value` parses as an http(s) URL.
pub fn check_http_url(field: &str, value: &str) -> ValidationResult<()> {
    let parsed = url::Url::parse(value).map_err(|e| ValidationError::InvalidValue {
        field: field.into(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ValidationError::InvalidValue {
            field: field.into(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.discord_token().is_none() {
            errors.push(ValidationError::MissingField {
                field: "discord.token".into(),
            });
        } else if let Err(e) = self.discord.validate() {
            errors.push(e);
        }

        if let Err(e) = self.ai.validate() {
            errors.push(e);
        }

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }
}

impl Validate for DiscordConfig {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(ref token) = self.token {
            if token.len() < MIN_TOKEN_LEN {
                return Err(ValidationError::InvalidValue {
                    field: "discord.token".into(),
                    reason: "token is too short to be a Discord bot token".into(),
                });
            }
        }

        match self.application_id.as_deref() {
            None | Some("") => Err(ValidationError::MissingField {
                field: "discord.application_id".into(),
            }),
            Some(id) if !id.chars().all(|c| c.is_ascii_digit()) => {
                Err(ValidationError::InvalidValue {
                    field: "discord.application_id".into(),
                    reason: "must be a numeric snowflake".into(),
                })
            }
            Some(_) => Ok(()),
        }
    }
}

impl Validate for AiDefaultsConfig {
    fn validate(&self) -> ValidationResult<()> {
        check_http_url("ai.base_url", &self.base_url)?;
        check_range("ai.temperature", self.temperature, 0.0, 2.0)?;
        check_range("ai.top_p", self.top_p, 0.0, 1.0)?;
        check_range("ai.max_tokens", f64::from(self.max_tokens), 1.0, 8192.0)?;

        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "ai.model".into(),
            });
        }

        if self.default_system_prompt.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "ai.default_system_prompt".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ValidationError::InvalidValue {
                    field: "observability.log_level".into(),
                    reason: format!("unknown level '{other}'"),
                })
            }
        }

        match self.log_format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("unknown format '{other}', expected json or pretty"),
            }),
        }
    }
}
