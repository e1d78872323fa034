//! Routes interactions to their handlers and reports handler failures.

use crate::ai_config::ConfigAiError;
use crate::chunking::MAX_MESSAGE_LENGTH;
use crate::commands;
use crate::completion::CompletionError;
use crate::context::BotContext;
use crate::interaction::{Action, InteractionError};
use crate::message::{Interaction, Reply};
use crate::pagination::PaginationError;
use crate::session::SessionError;
use crate::traits::{ChannelError, ReplyState, Responder};
use nbcs_common::logging::generate_trace_id;
use nbcs_common::util::truncate_with_ellipsis;
use std::sync::Arc;
use tracing::Instrument;

/// Any failure inside a handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigAiError),

    #[error(transparent)]
    Interaction(#[from] InteractionError),

    #[error("Reply delivery failed: {0}")]
    Channel(#[from] ChannelError),
}

impl HandlerError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Completion(CompletionError::MissingCredential) => {
                "You have not set an API key yet. Use `/configai apikey:` to configure one."
                    .to_string()
            }
            Self::Completion(e) => truncate_with_ellipsis(
                &format!("Sorry, the AI request failed: {e}"),
                MAX_MESSAGE_LENGTH,
            ),
            Self::Pagination(PaginationError::NoActiveSession(_)) => {
                "This history view has expired. Please run /listhis again.".to_string()
            }
            Self::Config(ConfigAiError::Validation(e)) => format!("Invalid setting: {e}"),
            Self::Interaction(e) => format!("Invalid command: {e}"),
            Self::Session(_) | Self::Channel(_) => {
                "Something went wrong while handling your request.".to_string()
            }
        }
    }
}

pub struct InteractionDispatcher {
    ctx: Arc<BotContext>,
}

impl InteractionDispatcher {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Handle one interaction to completion. Never fails; errors are logged
    /// and reported to the user where possible.
    pub async fn dispatch(&self, interaction: Interaction, responder: &dyn Responder) {
        let span = tracing::info_span!(
            "interaction",
            trace_id = %generate_trace_id(),
            user_id = %interaction.user_id,
            interaction_id = %interaction.id,
        );

        self.dispatch_inner(interaction, responder)
            .instrument(span)
            .await
    }

    async fn dispatch_inner(&self, interaction: Interaction, responder: &dyn Responder) {
        let action = match Action::try_from(&interaction.kind) {
            Ok(action) => action,
            Err(e @ (InteractionError::UnknownCommand(_) | InteractionError::UnknownButton(_))) => {
                tracing::warn!(error = %e, "Ignoring unrecognised interaction");
                return;
            }
            Err(e) => {
                report_failure(responder, &HandlerError::from(e)).await;
                return;
            }
        };

        let result = match action {
            Action::Command(command) => {
                tracing::info!(command = command.name(), "Handling command");
                commands::handle_command(&self.ctx, &interaction.user_id, command, responder).await
            }
            Action::Button(button) => {
                tracing::debug!(button = button.custom_id(), "Handling button");
                commands::history::handle_button(&self.ctx, &interaction.user_id, button, responder)
                    .await
            }
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "Interaction handler failed");
            report_failure(responder, &e).await;
        }
    }
}

/// Tell the user about a failure through whatever channel is still open.
async fn report_failure(responder: &dyn Responder, error: &HandlerError) {
    let message = error.user_message();

    let delivered = match responder.state() {
        ReplyState::Deferred => responder.edit_original(Reply::text(message)).await,
        ReplyState::Pending => responder.reply(Reply::text(message).ephemeral()).await,
        ReplyState::Replied => responder.follow_up(Reply::text(message).ephemeral()).await,
    };

    if let Err(e) = delivered {
        tracing::warn!(error = %e, "Failed to deliver error reply");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages() {
        let missing = HandlerError::from(CompletionError::MissingCredential);
        assert!(missing.user_message().contains("/configai apikey:"));

        let upstream = HandlerError::from(CompletionError::Upstream {
            status: Some(401),
            message: "Invalid API key".into(),
        });
        assert_eq!(
            upstream.user_message(),
            "Sorry, the AI request failed: Invalid API key"
        );

        let expired = HandlerError::from(PaginationError::NoActiveSession("u1".into()));
        assert!(expired.user_message().contains("/listhis"));
    }

    #[test]
    fn long_upstream_message_is_truncated() {
        let err = HandlerError::from(CompletionError::Upstream {
            status: None,
            message: "x".repeat(5000),
        });
        let text = err.user_message();
        assert_eq!(text.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(text.ends_with("..."));
    }
}
