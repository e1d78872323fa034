//! Platform-neutral interaction and reply types.
//!
//! The Discord adapter turns gateway events into [`Interaction`]s and renders
//! [`Reply`]s back into Discord payloads; handlers only ever see these types.

use std::collections::HashMap;

/// A typed slash-command option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

/// Options supplied with a slash command, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOptions {
    values: HashMap<String, OptionValue>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// A number option. Integer values are accepted too.
    pub fn get_number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(OptionValue::Number(n)) => Some(*n),
            Some(OptionValue::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(OptionValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(OptionValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// What the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionKind {
    /// Slash command invocation
    Command { name: String, options: CommandOptions },
    /// Button press on a message the bot sent
    Component { custom_id: String },
}

/// One inbound interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Interaction ID (Discord snowflake)
    pub id: String,
    /// Continuation token used for callbacks and follow-ups
    pub token: String,
    pub user_id: String,
    pub channel_id: Option<String>,
    pub kind: InteractionKind,
}

// ============================================================================
// Outgoing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rich embed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

/// A horizontal row of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRow {
    pub buttons: Vec<Button>,
}

/// A message sent in response to an interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    /// Only visible to the invoking user
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn with_row(mut self, row: ActionRow) -> Self {
        self.components.push(row);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_getters_are_typed() {
        let options = CommandOptions::new()
            .with("message", OptionValue::String("hi".into()))
            .with("temperature", OptionValue::Integer(1))
            .with("stream", OptionValue::Boolean(true));

        assert_eq!(options.get_string("message"), Some("hi"));
        assert_eq!(options.get_number("temperature"), Some(1.0));
        assert_eq!(options.get_bool("stream"), Some(true));
        assert_eq!(options.get_string("stream"), None);
        assert_eq!(options.get_integer("missing"), None);
    }

    #[test]
    fn reply_builders() {
        let reply = Reply::text("done").ephemeral();
        assert_eq!(reply.content.as_deref(), Some("done"));
        assert!(reply.ephemeral);

        let embed = Embed::new("Title").field("a", "b").color(0x0099ff);
        let reply = Reply::embed(embed.clone());
        assert_eq!(reply.embeds, vec![embed]);
        assert!(!reply.ephemeral);
    }
}
