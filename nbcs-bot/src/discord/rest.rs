//! Discord REST calls used to answer interactions.

use super::format::{
    callback_body, message_payload, CALLBACK_DEFERRED_MESSAGE, CALLBACK_MESSAGE,
    CALLBACK_UPDATE_MESSAGE, EPHEMERAL_FLAG,
};
use crate::message::Reply;
use crate::traits::{ChannelError, ChannelResult, ReplyState, Responder};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

pub struct DiscordRest {
    client: Client,
    bot_token: String,
    application_id: String,
    api_base: String,
}

impl DiscordRest {
    pub fn new(bot_token: impl Into<String>, application_id: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            bot_token: bot_token.into(),
            application_id: application_id.into(),
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ChannelResult<Value> {
        let url = format!("{}{}", self.api_base, path);
        let mut req = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.bot_token));
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Discord request error: {e}")))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body: Value = resp.json().await.unwrap_or_default();
            let retry_after = body
                .get("retry_after")
                .and_then(Value::as_f64)
                .unwrap_or(1.0);
            return Err(ChannelError::RateLimited {
                retry_after_secs: retry_after.ceil() as u64,
            });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ChannelError::Auth("Discord rejected the bot token".into()));
        }
        if !status.is_success() {
            let error = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!(
                "Discord API error ({status}): {error}"
            )));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(resp.json().await.unwrap_or(Value::Null))
    }

    /// Verify the token by fetching the bot's own user.
    pub async fn current_user(&self) -> ChannelResult<Value> {
        self.request(Method::GET, "/users/@me", None).await
    }

    /// WebSocket URL for the gateway.
    pub async fn gateway_url(&self) -> ChannelResult<String> {
        let resp = self
            .request(Method::GET, "/gateway/bot", None)
            .await
            .map_err(|e| ChannelError::Connection(format!("Failed to get gateway: {e}")))?;
        Ok(resp
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("wss://gateway.discord.gg")
            .to_string())
    }

    pub async fn create_response(
        &self,
        interaction_id: &str,
        token: &str,
        body: &Value,
    ) -> ChannelResult<()> {
        let path = format!("/interactions/{interaction_id}/{token}/callback");
        self.request(Method::POST, &path, Some(body)).await.map(|_| ())
    }

    pub async fn edit_original(&self, token: &str, body: &Value) -> ChannelResult<()> {
        let path = format!("/webhooks/{}/{token}/messages/@original", self.application_id);
        self.request(Method::PATCH, &path, Some(body)).await.map(|_| ())
    }

    pub async fn create_follow_up(&self, token: &str, body: &Value) -> ChannelResult<()> {
        let path = format!("/webhooks/{}/{token}", self.application_id);
        self.request(Method::POST, &path, Some(body)).await.map(|_| ())
    }

    /// Replace the registered command table, guild-scoped when `guild_id` is set.
    pub async fn register_commands(&self, guild_id: Option<&str>, commands: &Value) -> ChannelResult<()> {
        let path = match guild_id {
            Some(guild) => format!("/applications/{}/guilds/{guild}/commands", self.application_id),
            None => format!("/applications/{}/commands", self.application_id),
        };
        self.request(Method::PUT, &path, Some(commands)).await?;
        tracing::info!(
            guild_id = guild_id.unwrap_or("global"),
            count = commands.as_array().map_or(0, Vec::len),
            "Slash commands registered"
        );
        Ok(())
    }
}

/// Answers one interaction through the REST API.
pub struct DiscordResponder {
    rest: Arc<DiscordRest>,
    interaction_id: String,
    token: String,
    state: Mutex<ReplyState>,
}

impl DiscordResponder {
    pub fn new(rest: Arc<DiscordRest>, interaction_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            rest,
            interaction_id: interaction_id.into(),
            token: token.into(),
            state: Mutex::new(ReplyState::Pending),
        }
    }

    fn set_state(&self, state: ReplyState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[async_trait]
impl Responder for DiscordResponder {
    async fn reply(&self, reply: Reply) -> ChannelResult<()> {
        let body = callback_body(CALLBACK_MESSAGE, Some(message_payload(&reply, true)));
        self.rest
            .create_response(&self.interaction_id, &self.token, &body)
            .await?;
        self.set_state(ReplyState::Replied);
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> ChannelResult<()> {
        let data = ephemeral.then(|| json!({ "flags": EPHEMERAL_FLAG }));
        let body = callback_body(CALLBACK_DEFERRED_MESSAGE, data);
        self.rest
            .create_response(&self.interaction_id, &self.token, &body)
            .await?;
        self.set_state(ReplyState::Deferred);
        Ok(())
    }

    async fn edit_original(&self, reply: Reply) -> ChannelResult<()> {
        self.rest
            .edit_original(&self.token, &message_payload(&reply, false))
            .await?;
        self.set_state(ReplyState::Replied);
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> ChannelResult<()> {
        self.rest
            .create_follow_up(&self.token, &message_payload(&reply, true))
            .await
    }

    async fn update(&self, reply: Reply) -> ChannelResult<()> {
        let body = callback_body(CALLBACK_UPDATE_MESSAGE, Some(message_payload(&reply, false)));
        self.rest
            .create_response(&self.interaction_id, &self.token, &body)
            .await?;
        self.set_state(ReplyState::Replied);
        Ok(())
    }

    fn state(&self) -> ReplyState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
