//! `/clear`, `/system` and `/reset_system`.

use crate::chunking::MAX_MESSAGE_LENGTH;
use crate::context::BotContext;
use crate::dispatcher::HandlerError;
use crate::message::Reply;
use crate::traits::Responder;
use nbcs_common::util::truncate_with_ellipsis;

pub async fn clear(
    ctx: &BotContext,
    user_id: &str,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    // Waits for an in-flight `/ai` so its reply cannot land after the reset
    let turn = ctx.sessions.turn_lock(user_id).await;
    ctx.sessions.reset(user_id);
    drop(turn);

    responder
        .reply(
            Reply::text("Your conversation history has been cleared. Your system prompt is unchanged.")
                .ephemeral(),
        )
        .await?;
    Ok(())
}

/// Set the prompt when one is given, otherwise show the current one.
pub async fn system(
    ctx: &BotContext,
    user_id: &str,
    prompt: Option<String>,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    let reply = match prompt {
        Some(prompt) => {
            let _turn = ctx.sessions.turn_lock(user_id).await;
            ctx.sessions.set_system_prompt(user_id, &prompt);
            tracing::info!(user_id = %user_id, "System prompt updated");
            format!("System prompt updated to: \"{prompt}\"")
        }
        None => format!("Current system prompt: \"{}\"", ctx.sessions.system_prompt(user_id)),
    };

    let reply = truncate_with_ellipsis(&reply, MAX_MESSAGE_LENGTH);
    responder.reply(Reply::text(reply).ephemeral()).await?;
    Ok(())
}

pub async fn reset_system(
    ctx: &BotContext,
    user_id: &str,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    let prompt = {
        let _turn = ctx.sessions.turn_lock(user_id).await;
        ctx.sessions.reset_system_prompt(user_id)
    };
    let reply = truncate_with_ellipsis(
        &format!("System prompt reset to the default: \"{prompt}\""),
        MAX_MESSAGE_LENGTH,
    );
    responder.reply(Reply::text(reply).ephemeral()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;
    use crate::completion::HttpTransport;
    use crate::traits::{RecordingResponder, ResponderCall};
    use nbcs_common::AiDefaultsConfig;
    use std::sync::Arc;

    fn context() -> BotContext {
        BotContext::in_memory(&AiDefaultsConfig::default(), Arc::new(HttpTransport::default()))
    }

    #[tokio::test]
    async fn clear_resets_history() {
        let ctx = context();
        ctx.sessions.reset("u1");
        ctx.sessions.append("u1", ChatMessage::user("hi")).unwrap();

        let responder = RecordingResponder::new();
        clear(&ctx, "u1", &responder).await.unwrap();

        assert_eq!(ctx.sessions.history_len("u1"), 1);
        let calls = responder.calls();
        assert!(matches!(calls[0], ResponderCall::Reply(ref r) if r.ephemeral));
    }

    #[tokio::test]
    async fn system_without_prompt_shows_current() {
        let ctx = context();
        let responder = RecordingResponder::new();
        system(&ctx, "u1", None, &responder).await.unwrap();
        assert_eq!(
            responder.texts(),
            vec!["Current system prompt: \"You are a helpful assistant.\""]
        );
    }

    #[tokio::test]
    async fn system_sets_prompt_and_rewrites_session() {
        let ctx = context();
        ctx.sessions.reset("u1");
        ctx.sessions.append("u1", ChatMessage::user("hi")).unwrap();

        let responder = RecordingResponder::new();
        system(&ctx, "u1", Some("be brief".into()), &responder)
            .await
            .unwrap();

        assert_eq!(ctx.sessions.snapshot("u1")[0], ChatMessage::system("be brief"));
        assert_eq!(ctx.prompts.get("u1").as_deref(), Some("be brief"));
    }

    #[tokio::test]
    async fn reset_system_restores_default() {
        let ctx = context();
        ctx.sessions.set_system_prompt("u1", "custom");

        let responder = RecordingResponder::new();
        reset_system(&ctx, "u1", &responder).await.unwrap();

        assert_eq!(ctx.sessions.system_prompt("u1"), "You are a helpful assistant.");
        assert!(responder.texts()[0].contains("default"));
    }

    #[tokio::test]
    async fn long_prompt_replies_fit_one_message() {
        let ctx = context();
        let prompt = "p".repeat(3000);

        let responder = RecordingResponder::new();
        system(&ctx, "u1", Some(prompt.clone()), &responder)
            .await
            .unwrap();
        system(&ctx, "u1", None, &responder).await.unwrap();

        let texts = responder.texts();
        assert_eq!(texts.len(), 2);
        for text in &texts {
            assert_eq!(text.chars().count(), MAX_MESSAGE_LENGTH);
            assert!(text.ends_with("..."));
        }
        // Only the reply is cut, the stored prompt is whole
        assert_eq!(ctx.sessions.system_prompt("u1"), prompt);
    }

    #[tokio::test]
    async fn clear_waits_for_running_turn() {
        let ctx = context();
        ctx.sessions.reset("u1");
        ctx.sessions.append("u1", ChatMessage::user("hi")).unwrap();
        let responder = RecordingResponder::new();

        let turn = ctx.sessions.turn_lock("u1").await;
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            clear(&ctx, "u1", &responder),
        )
        .await;
        assert!(blocked.is_err());
        assert_eq!(ctx.sessions.history_len("u1"), 2);
        assert!(responder.calls().is_empty());

        drop(turn);
        clear(&ctx, "u1", &responder).await.unwrap();
        assert_eq!(ctx.sessions.history_len("u1"), 1);
    }
}
