//! `/ai`: send a message to the user's model and post the answer.

use crate::chat::ChatMessage;
use crate::chunking::{split_message, MAX_MESSAGE_LENGTH};
use crate::completion::{CompletionError, CompletionReply, DeltaStream};
use crate::context::BotContext;
use crate::dispatcher::HandlerError;
use crate::message::Reply;
use crate::progress::{PreviewPolicy, StreamPresenter};
use crate::traits::Responder;
use futures_util::StreamExt;
use std::time::Instant;

pub const EMPTY_REPLY: &str = "The AI returned no content.";

pub async fn handle(
    ctx: &BotContext,
    user_id: &str,
    message: String,
    pic: Option<String>,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    let config = ctx.configs.get(user_id);
    if !config.has_credential() {
        return Err(CompletionError::MissingCredential.into());
    }

    // Nothing is recorded unless the interaction could be acknowledged
    responder.defer(false).await?;

    // Held until the reply is delivered so turns from one user never interleave
    let _turn = ctx.sessions.turn_lock(user_id).await;

    ctx.sessions.ensure(user_id);
    let user_turn = match pic {
        Some(url) => ChatMessage::user_with_image(message, url),
        None => ChatMessage::user(message),
    };
    ctx.sessions.append(user_id, user_turn)?;

    let reply = ctx
        .completion
        .send(user_id, ctx.sessions.snapshot(user_id), &config)
        .await?;

    let (text, chunks) = match reply {
        CompletionReply::Text(text) => {
            let chunks = split_message(&text, MAX_MESSAGE_LENGTH);
            (text, chunks)
        }
        CompletionReply::Stream(deltas) => {
            let presenter = drain(deltas, ctx.preview, responder).await?;
            (presenter.text().to_string(), presenter.finish())
        }
    };

    if text.trim().is_empty() {
        tracing::warn!("Completion returned no content");
        responder.edit_original(Reply::text(EMPTY_REPLY)).await?;
        return Ok(());
    }

    ctx.sessions.append(user_id, ChatMessage::assistant(text))?;
    ctx.sessions.trim(user_id);

    deliver(responder, chunks).await
}

/// Read a streamed reply to the end, editing in previews as the policy allows.
async fn drain(
    mut deltas: DeltaStream,
    policy: PreviewPolicy,
    responder: &dyn Responder,
) -> Result<StreamPresenter, HandlerError> {
    let mut presenter = StreamPresenter::new(policy, MAX_MESSAGE_LENGTH);

    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        if let Some(preview) = presenter.push(&delta, Instant::now()) {
            if let Err(e) = responder.edit_original(Reply::text(preview)).await {
                tracing::warn!(error = %e, "Failed to show stream preview");
            }
        }
    }

    Ok(presenter)
}

/// First chunk replaces the deferred reply, the rest follow up.
async fn deliver(responder: &dyn Responder, chunks: Vec<String>) -> Result<(), HandlerError> {
    let mut first = true;
    for chunk in chunks.into_iter().filter(|c| !c.is_empty()) {
        if first {
            responder.edit_original(Reply::text(chunk)).await?;
            first = false;
        } else {
            responder.follow_up(Reply::text(chunk)).await?;
        }
    }
    Ok(())
}
