//! `/configai`: view, change or reset per-user AI settings.

use super::EMBED_COLOR;
use crate::ai_config::{PartialAiConfig, UserAiConfig};
use crate::context::BotContext;
use crate::dispatcher::HandlerError;
use crate::interaction::ConfigAiOptions;
use crate::message::{Embed, Reply};
use crate::traits::Responder;
use nbcs_common::logging::mask_secret;

pub async fn handle(
    ctx: &BotContext,
    user_id: &str,
    options: ConfigAiOptions,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    let reply = if options.reset {
        ctx.configs.reset(user_id);
        Reply::text("Your AI settings have been reset to the defaults.")
    } else if options.patch.is_empty() {
        Reply::embed(config_embed(&ctx.configs.get(user_id)))
    } else {
        ctx.configs.update(user_id, &options.patch)?;
        Reply::text(change_summary(&options.patch))
    };

    responder.reply(reply.ephemeral()).await?;
    Ok(())
}

fn config_embed(config: &UserAiConfig) -> Embed {
    let api_key = if config.has_credential() {
        mask_secret(config.api_key.as_deref()).to_string()
    } else {
        "Not set (use `/configai apikey: YOUR_KEY` to set it)".to_string()
    };

    Embed::new("Current AI configuration")
        .color(EMBED_COLOR)
        .field("Base URL", &config.base_url)
        .field("API Key", api_key)
        .field("Model", &config.model)
        .field("Temperature", config.temperature.to_string())
        .field("Top P", config.top_p.to_string())
        .field("Max Tokens", config.max_tokens.to_string())
        .field("Stream", config.stream.to_string())
}

/// One line per field the user changed. Never echoes the key.
fn change_summary(patch: &PartialAiConfig) -> String {
    let mut lines = vec!["AI settings updated:".to_string()];

    if let Some(ref base_url) = patch.base_url {
        lines.push(format!("- Base URL: {base_url}"));
    }
    if patch.api_key.is_some() {
        lines.push(format!("- API Key: {}", mask_secret(patch.api_key.as_deref())));
    }
    if let Some(ref model) = patch.model {
        lines.push(format!("- Model: {model}"));
    }
    if let Some(temperature) = patch.temperature {
        lines.push(format!("- Temperature: {temperature}"));
    }
    if let Some(top_p) = patch.top_p {
        lines.push(format!("- Top P: {top_p}"));
    }
    if let Some(max_tokens) = patch.max_tokens {
        lines.push(format!("- Max Tokens: {max_tokens}"));
    }
    if let Some(stream) = patch.stream {
        lines.push(format!("- Stream: {stream}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::HttpTransport;
    use crate::traits::{RecordingResponder, ResponderCall};
    use nbcs_common::AiDefaultsConfig;
    use std::sync::Arc;

    fn context() -> BotContext {
        BotContext::in_memory(&AiDefaultsConfig::default(), Arc::new(HttpTransport::default()))
    }

    fn patch(api_key: &str, top_p: f64) -> ConfigAiOptions {
        ConfigAiOptions {
            reset: false,
            patch: PartialAiConfig {
                api_key: Some(api_key.into()),
                top_p: Some(top_p),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn no_options_shows_masked_config() {
        let ctx = context();
        let responder = RecordingResponder::new();
        handle(&ctx, "u1", patch("sk-secret", 0.5), &RecordingResponder::new())
            .await
            .unwrap();

        handle(&ctx, "u1", ConfigAiOptions::default(), &responder)
            .await
            .unwrap();

        let ResponderCall::Reply(reply) = &responder.calls()[0] else {
            panic!("expected a reply");
        };
        assert!(reply.ephemeral);
        let fields = &reply.embeds[0].fields;
        let key = fields.iter().find(|f| f.name == "API Key").unwrap();
        assert_eq!(key.value, "******");
        assert!(!format!("{reply:?}").contains("sk-secret"));
    }

    #[tokio::test]
    async fn update_summarises_changes_without_key() {
        let ctx = context();
        let responder = RecordingResponder::new();
        handle(&ctx, "u1", patch("sk-secret", 0.5), &responder)
            .await
            .unwrap();

        let text = &responder.texts()[0];
        assert!(text.contains("- Top P: 0.5"));
        assert!(text.contains("- API Key: ******"));
        assert!(!text.contains("sk-secret"));
        assert_eq!(ctx.configs.get("u1").top_p, 0.5);
    }

    #[tokio::test]
    async fn invalid_value_is_an_error() {
        let ctx = context();
        let responder = RecordingResponder::new();
        let err = handle(&ctx, "u1", patch("sk", 3.0), &responder)
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Config(_)));
        assert!(err.user_message().contains("top_p"));
        assert!(responder.calls().is_empty());
    }

    #[tokio::test]
    async fn reset_wins_over_other_options() {
        let ctx = context();
        handle(&ctx, "u1", patch("sk", 0.5), &RecordingResponder::new())
            .await
            .unwrap();

        let mut options = patch("other", 0.1);
        options.reset = true;
        handle(&ctx, "u1", options, &RecordingResponder::new())
            .await
            .unwrap();

        assert!(!ctx.configs.get("u1").has_credential());
        assert_eq!(ctx.configs.get("u1").top_p, 0.9);
    }
}
