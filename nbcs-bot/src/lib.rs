//! nbcs Bot - Discord chat bot backed by OpenAI-compatible completion APIs.
//!
//! Each Discord user gets their own conversation session, system prompt and
//! AI endpoint settings. Slash commands are received over the gateway and
//! answered through the interaction REST API.
//!
//! ## Architecture
//!
//! ```text
//! Discord gateway → InteractionDispatcher → command handler
//!                                              ↓
//!   sessions / prompts / AI settings  ←→  CompletionClient → /chat/completions
//!                                              ↓
//! Discord REST  ←── DiscordResponder ←── chunked reply
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod ai_config;
pub mod chat;
pub mod chunking;
pub mod commands;
pub mod completion;
pub mod context;
pub mod discord;
pub mod dispatcher;
pub mod interaction;
pub mod message;
pub mod pagination;
pub mod progress;
pub mod prompt;
pub mod session;
pub mod store;
pub mod traits;

// Re-export commonly used types
pub use ai_config::{ConfigStore, PartialAiConfig, UserAiConfig};
pub use chat::{ChatMessage, MessageContent, Role};
pub use chunking::{split_message, MAX_MESSAGE_LENGTH};
pub use completion::{CompletionClient, CompletionError, CompletionTransport, HttpTransport};
pub use context::BotContext;
pub use discord::rest::{DiscordResponder, DiscordRest};
pub use discord::DiscordGateway;
pub use dispatcher::{HandlerError, InteractionDispatcher};
pub use message::{Interaction, InteractionKind, Reply};
pub use pagination::PaginationRegistry;
pub use prompt::PromptStore;
pub use session::SessionManager;
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
pub use traits::{ChannelError, ChannelResult, ReplyState, Responder};

use anyhow::Context;
use nbcs_common::config::Config;
use std::sync::Arc;
use std::time::Duration;

const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Run the bot until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let token = config
        .discord_token()
        .context("Discord token is not configured")?
        .to_string();
    let application_id = config
        .discord
        .application_id
        .clone()
        .context("Discord application id is not configured")?;

    let ctx = Arc::new(BotContext::from_config(&config));
    tracing::info!(
        data_dir = %config.storage.data_dir.display(),
        model = %config.ai.model,
        stream = config.ai.stream,
        "Bot context ready"
    );

    let sweeper = ctx
        .pagination
        .clone()
        .spawn_sweeper(pagination::SWEEP_INTERVAL);

    let rest = Arc::new(DiscordRest::new(token.clone(), application_id));
    let gateway = DiscordGateway::new(token, rest.clone());
    gateway.init().await.context("Discord login failed")?;

    if let Err(e) = rest
        .register_commands(
            config.discord.guild_id.as_deref(),
            &discord::commands::command_definitions(),
        )
        .await
    {
        tracing::error!(error = %e, "Failed to register slash commands");
    }

    let dispatcher = Arc::new(InteractionDispatcher::new(ctx));

    tokio::select! {
        _ = listen_forever(&gateway, dispatcher) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    sweeper.abort();
    Ok(())
}

/// Keep a gateway session open, reconnecting with exponential backoff.
async fn listen_forever(gateway: &DiscordGateway, dispatcher: Arc<InteractionDispatcher>) {
    let mut delay = RECONNECT_BASE_DELAY;

    loop {
        let rest = gateway.rest().clone();
        let dispatcher = dispatcher.clone();
        let result = gateway
            .listen(move |interaction| {
                let responder =
                    DiscordResponder::new(rest.clone(), interaction.id.clone(), interaction.token.clone());
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher.dispatch(interaction, &responder).await;
                });
            })
            .await;

        match result {
            Ok(()) => {
                tracing::info!("Discord: gateway session ended, reconnecting");
                delay = RECONNECT_BASE_DELAY;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_in_secs = delay.as_secs(),
                    "Discord: gateway connection failed"
                );
                delay = (delay * 2).min(RECONNECT_MAX_DELAY);
            }
        }

        tokio::time::sleep(delay).await;
    }
}
