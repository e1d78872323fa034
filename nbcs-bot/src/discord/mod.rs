//! Discord adapter.
//!
//! Connects via the Discord Gateway WebSocket to receive interactions and
//! answers them through the REST API.

pub mod commands;
pub mod format;
pub mod rest;

use crate::message::{CommandOptions, Interaction, InteractionKind, OptionValue};
use crate::traits::{ChannelError, ChannelResult};
use futures_util::{SinkExt, StreamExt};
use rest::DiscordRest;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;

/// GUILDS. Interactions are delivered regardless of intents.
const GATEWAY_INTENTS: u64 = 1;

const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;

const INTERACTION_APPLICATION_COMMAND: u64 = 2;
const INTERACTION_MESSAGE_COMPONENT: u64 = 3;

/// Discord gateway listener.
pub struct DiscordGateway {
    bot_token: String,
    rest: Arc<DiscordRest>,
}

impl DiscordGateway {
    pub fn new(bot_token: impl Into<String>, rest: Arc<DiscordRest>) -> Self {
        Self {
            bot_token: bot_token.into(),
            rest,
        }
    }

    pub fn rest(&self) -> &Arc<DiscordRest> {
        &self.rest
    }

    /// Verify the bot token.
    pub async fn init(&self) -> ChannelResult<()> {
        let me = self
            .rest
            .current_user()
            .await
            .map_err(|e| ChannelError::Auth(format!("Failed to verify Discord token: {e}")))?;
        let bot = me
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!(bot = %bot, "Discord channel initialized");
        Ok(())
    }

    /// Run one gateway session, passing every interaction to `callback`.
    ///
    /// Returns when the connection closes or Discord asks for a reconnect;
    /// the caller decides whether to connect again.
    pub async fn listen<F>(&self, callback: F) -> ChannelResult<()>
    where
        F: Fn(Interaction) + Send + Sync + 'static,
    {
        let gw_url = self.rest.gateway_url().await?;
        let ws_url = format!("{gw_url}/?v=10&encoding=json");
        tracing::info!("Discord: connecting to gateway...");

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .map_err(|e| ChannelError::Connection(format!("WebSocket connection failed: {e}")))?;

        let (mut write, mut read) = ws_stream.split();

        // Read Hello (opcode 10)
        let hello = read
            .next()
            .await
            .ok_or_else(|| ChannelError::Connection("No hello from gateway".into()))?
            .map_err(|e| ChannelError::Connection(format!("WebSocket error: {e}")))?;

        let hello_data: Value = serde_json::from_str(&hello.to_string())
            .map_err(|e| ChannelError::Connection(format!("Invalid hello: {e}")))?;

        if hello_data.get("op").and_then(Value::as_u64) != Some(OP_HELLO) {
            return Err(ChannelError::Connection("Expected hello from gateway".into()));
        }

        let heartbeat_interval = hello_data
            .get("d")
            .and_then(|d| d.get("heartbeat_interval"))
            .and_then(Value::as_u64)
            .unwrap_or(41250);

        let identify = json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.bot_token,
                "intents": GATEWAY_INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "nbcs-bot",
                    "device": "nbcs-bot"
                }
            }
        });

        write
            .send(Message::Text(identify.to_string()))
            .await
            .map_err(|e| ChannelError::Connection(format!("Failed to identify: {e}")))?;

        tracing::info!("Discord: connected and identified");

        let mut heartbeat =
            tokio::time::interval(std::time::Duration::from_millis(heartbeat_interval));
        // The first tick completes immediately
        heartbeat.tick().await;

        let mut sequence: Option<u64> = None;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let hb = json!({ "op": OP_HEARTBEAT, "d": sequence });
                    if write.send(Message::Text(hb.to_string())).await.is_err() {
                        break;
                    }
                }
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(Message::Text(t))) => t,
                        Some(Ok(Message::Close(frame))) => {
                            tracing::warn!(?frame, "Discord: gateway closed the connection");
                            break;
                        }
                        None => break,
                        Some(Err(e)) => {
                            return Err(ChannelError::Connection(format!("WebSocket error: {e}")));
                        }
                        _ => continue,
                    };

                    let event: Value = match serde_json::from_str(&msg) {
                        Ok(e) => e,
                        Err(_) => continue,
                    };

                    if let Some(s) = event.get("s").and_then(Value::as_u64) {
                        sequence = Some(s);
                    }

                    match event.get("op").and_then(Value::as_u64) {
                        Some(OP_DISPATCH) => {}
                        Some(OP_HEARTBEAT) => {
                            let hb = json!({ "op": OP_HEARTBEAT, "d": sequence });
                            if write.send(Message::Text(hb.to_string())).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        Some(OP_RECONNECT) | Some(OP_INVALID_SESSION) => {
                            tracing::info!("Discord: gateway requested reconnect");
                            break;
                        }
                        _ => continue,
                    }

                    match event.get("t").and_then(Value::as_str) {
                        Some("READY") => tracing::info!("Discord: session ready"),
                        Some("INTERACTION_CREATE") => {
                            let Some(d) = event.get("d") else {
                                continue;
                            };
                            match parse_interaction(d) {
                                Some(interaction) => callback(interaction),
                                None => tracing::debug!("Discord: ignoring unsupported interaction"),
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(())
    }
}

/// Convert an `INTERACTION_CREATE` payload into an [`Interaction`].
///
/// Returns `None` for interaction types the bot does not handle (pings,
/// autocomplete, modals) or payloads missing required fields.
pub fn parse_interaction(d: &Value) -> Option<Interaction> {
    let id = d.get("id")?.as_str()?.to_string();
    let token = d.get("token")?.as_str()?.to_string();

    // Guild interactions carry the user under `member`, DMs directly
    let user_id = d
        .get("member")
        .and_then(|m| m.get("user"))
        .or_else(|| d.get("user"))
        .and_then(|u| u.get("id"))
        .and_then(Value::as_str)?
        .to_string();

    let channel_id = d
        .get("channel_id")
        .and_then(Value::as_str)
        .map(String::from);

    let data = d.get("data")?;
    let kind = match d.get("type").and_then(Value::as_u64)? {
        INTERACTION_APPLICATION_COMMAND => InteractionKind::Command {
            name: data.get("name")?.as_str()?.to_string(),
            options: parse_options(data.get("options")),
        },
        INTERACTION_MESSAGE_COMPONENT => InteractionKind::Component {
            custom_id: data.get("custom_id")?.as_str()?.to_string(),
        },
        _ => return None,
    };

    Some(Interaction {
        id,
        token,
        user_id,
        channel_id,
        kind,
    })
}

fn parse_options(options: Option<&Value>) -> CommandOptions {
    let mut parsed = CommandOptions::new();
    let Some(options) = options.and_then(Value::as_array) else {
        return parsed;
    };

    for option in options {
        let Some(name) = option.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = option.get("value") else {
            continue;
        };
        let value = match option.get("type").and_then(Value::as_u64) {
            Some(3) => value.as_str().map(|s| OptionValue::String(s.to_string())),
            Some(4) => value.as_i64().map(OptionValue::Integer),
            Some(5) => value.as_bool().map(OptionValue::Boolean),
            Some(10) => value.as_f64().map(OptionValue::Number),
            _ => None,
        };
        if let Some(value) = value {
            parsed.insert(name, value);
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_guild_command() {
        let payload = json!({
            "id": "i1",
            "token": "tok",
            "type": 2,
            "channel_id": "c1",
            "member": { "user": { "id": "u1" } },
            "data": {
                "name": "configai",
                "options": [
                    { "name": "model", "type": 3, "value": "gpt-4o" },
                    { "name": "max_tokens", "type": 4, "value": 100 },
                    { "name": "temperature", "type": 10, "value": 0.5 },
                    { "name": "stream", "type": 5, "value": true }
                ]
            }
        });

        let interaction = parse_interaction(&payload).unwrap();
        assert_eq!(interaction.user_id, "u1");
        assert_eq!(interaction.channel_id.as_deref(), Some("c1"));
        let InteractionKind::Command { name, options } = interaction.kind else {
            panic!("expected a command");
        };
        assert_eq!(name, "configai");
        assert_eq!(options.get_string("model"), Some("gpt-4o"));
        assert_eq!(options.get_integer("max_tokens"), Some(100));
        assert_eq!(options.get_number("temperature"), Some(0.5));
        assert_eq!(options.get_bool("stream"), Some(true));
    }

    #[test]
    fn parses_dm_button() {
        let payload = json!({
            "id": "i2",
            "token": "tok",
            "type": 3,
            "user": { "id": "u2" },
            "data": { "custom_id": "next_page", "component_type": 2 }
        });

        let interaction = parse_interaction(&payload).unwrap();
        assert_eq!(interaction.user_id, "u2");
        assert_eq!(
            interaction.kind,
            InteractionKind::Component {
                custom_id: "next_page".into()
            }
        );
    }

    #[test]
    fn ignores_other_types_and_broken_payloads() {
        let ping = json!({ "id": "i", "token": "t", "type": 1, "user": { "id": "u" }, "data": {} });
        assert!(parse_interaction(&ping).is_none());

        let no_user = json!({ "id": "i", "token": "t", "type": 2, "data": { "name": "ai" } });
        assert!(parse_interaction(&no_user).is_none());
    }

    #[test]
    fn command_without_options() {
        let payload = json!({
            "id": "i", "token": "t", "type": 2,
            "user": { "id": "u" },
            "data": { "name": "clear" }
        });
        let interaction = parse_interaction(&payload).unwrap();
        assert!(matches!(
            interaction.kind,
            InteractionKind::Command { ref options, .. } if options.is_empty()
        ));
    }

    #[tokio::test]
    async fn init_verifies_token() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .and(header("authorization", "Bot good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "nbcs" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let gateway = |token: &str| {
            let rest = DiscordRest::new(token, "app1").with_api_base(server.uri());
            DiscordGateway::new(token, Arc::new(rest))
        };

        assert!(gateway("good").init().await.is_ok());
        assert!(matches!(
            gateway("bad").init().await,
            Err(ChannelError::Auth(_))
        ));
    }
}
