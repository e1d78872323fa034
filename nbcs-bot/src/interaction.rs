//! The bot's command and button vocabulary.

use crate::ai_config::PartialAiConfig;
use crate::message::{CommandOptions, InteractionKind};

pub const CMD_AI: &str = "ai";
pub const CMD_CLEAR: &str = "clear";
pub const CMD_SYSTEM: &str = "system";
pub const CMD_RESET_SYSTEM: &str = "reset_system";
pub const CMD_LIST_HISTORY: &str = "listhis";
pub const CMD_CONFIG_AI: &str = "configai";

pub const BUTTON_PREV_PAGE: &str = "prev_page";
pub const BUTTON_NEXT_PAGE: &str = "next_page";

#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown button: {0}")]
    UnknownButton(String),

    #[error("Missing required option '{0}'")]
    MissingOption(&'static str),

    #[error("Invalid value for option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

/// Options of `/configai`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigAiOptions {
    pub reset: bool,
    pub patch: PartialAiConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ai { message: String, pic: Option<String> },
    Clear,
    System { prompt: Option<String> },
    ResetSystem,
    ListHistory,
    ConfigAi(ConfigAiOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    PrevPage,
    NextPage,
}

impl Button {
    pub fn custom_id(self) -> &'static str {
        match self {
            Self::PrevPage => BUTTON_PREV_PAGE,
            Self::NextPage => BUTTON_NEXT_PAGE,
        }
    }
}

/// A recognised interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Command(Command),
    Button(Button),
}

impl TryFrom<&InteractionKind> for Action {
    type Error = InteractionError;

    fn try_from(kind: &InteractionKind) -> Result<Self, Self::Error> {
        match kind {
            InteractionKind::Command { name, options } => {
                Command::parse(name, options).map(Action::Command)
            }
            InteractionKind::Component { custom_id } => {
                Button::parse(custom_id).map(Action::Button)
            }
        }
    }
}

impl Button {
    pub fn parse(custom_id: &str) -> Result<Self, InteractionError> {
        match custom_id {
            BUTTON_PREV_PAGE => Ok(Self::PrevPage),
            BUTTON_NEXT_PAGE => Ok(Self::NextPage),
            other => Err(InteractionError::UnknownButton(other.to_string())),
        }
    }
}

impl Command {
    pub fn parse(name: &str, options: &CommandOptions) -> Result<Self, InteractionError> {
        match name {
            CMD_AI => {
                let message = options
                    .get_string("message")
                    .ok_or(InteractionError::MissingOption("message"))?;
                Ok(Self::Ai {
                    message: message.to_string(),
                    pic: non_empty(options.get_string("pic")),
                })
            }
            CMD_CLEAR => Ok(Self::Clear),
            CMD_SYSTEM => Ok(Self::System {
                prompt: non_empty(options.get_string("prompt")),
            }),
            CMD_RESET_SYSTEM => Ok(Self::ResetSystem),
            CMD_LIST_HISTORY => Ok(Self::ListHistory),
            CMD_CONFIG_AI => parse_config_ai(options).map(Self::ConfigAi),
            other => Err(InteractionError::UnknownCommand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ai { .. } => CMD_AI,
            Self::Clear => CMD_CLEAR,
            Self::System { .. } => CMD_SYSTEM,
            Self::ResetSystem => CMD_RESET_SYSTEM,
            Self::ListHistory => CMD_LIST_HISTORY,
            Self::ConfigAi(_) => CMD_CONFIG_AI,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_config_ai(options: &CommandOptions) -> Result<ConfigAiOptions, InteractionError> {
    let max_tokens = options
        .get_integer("max_tokens")
        .map(|n| {
            u32::try_from(n).map_err(|_| InteractionError::InvalidOption {
                name: "max_tokens",
                reason: format!("{n} is out of range"),
            })
        })
        .transpose()?;

    Ok(ConfigAiOptions {
        reset: options.get_bool("reset").unwrap_or(false),
        patch: PartialAiConfig {
            base_url: non_empty(options.get_string("baseurl")),
            api_key: non_empty(options.get_string("apikey")),
            model: non_empty(options.get_string("model")),
            temperature: options.get_number("temperature"),
            top_p: options.get_number("top_p"),
            max_tokens,
            stream: options.get_bool("stream"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::OptionValue;

    fn command(name: &str, options: CommandOptions) -> Result<Action, InteractionError> {
        Action::try_from(&InteractionKind::Command {
            name: name.into(),
            options,
        })
    }

    #[test]
    fn ai_requires_message() {
        assert!(matches!(
            command("ai", CommandOptions::new()),
            Err(InteractionError::MissingOption("message"))
        ));

        let action = command(
            "ai",
            CommandOptions::new()
                .with("message", OptionValue::String("hi".into()))
                .with("pic", OptionValue::String("https://e.com/x.png".into())),
        )
        .unwrap();
        assert_eq!(
            action,
            Action::Command(Command::Ai {
                message: "hi".into(),
                pic: Some("https://e.com/x.png".into()),
            })
        );
    }

    #[test]
    fn simple_commands() {
        for (name, expected) in [
            ("clear", Command::Clear),
            ("reset_system", Command::ResetSystem),
            ("listhis", Command::ListHistory),
            ("system", Command::System { prompt: None }),
        ] {
            let action = command(name, CommandOptions::new()).unwrap();
            assert_eq!(action, Action::Command(expected.clone()));
            assert_eq!(expected.name(), name);
        }
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(matches!(
            command("setme", CommandOptions::new()),
            Err(InteractionError::UnknownCommand(_))
        ));
        assert!(matches!(
            Action::try_from(&InteractionKind::Component {
                custom_id: "other".into()
            }),
            Err(InteractionError::UnknownButton(_))
        ));
    }

    #[test]
    fn buttons() {
        assert_eq!(Button::parse("prev_page").unwrap(), Button::PrevPage);
        assert_eq!(Button::parse("next_page").unwrap(), Button::NextPage);
        assert_eq!(Button::NextPage.custom_id(), "next_page");
    }

    #[test]
    fn configai_options_become_patch() {
        let action = command(
            "configai",
            CommandOptions::new()
                .with("apikey", OptionValue::String("sk".into()))
                .with("baseurl", OptionValue::String(String::new()))
                .with("temperature", OptionValue::Number(0.3))
                .with("max_tokens", OptionValue::Integer(512))
                .with("stream", OptionValue::Boolean(true)),
        )
        .unwrap();

        let Action::Command(Command::ConfigAi(options)) = action else {
            panic!("expected configai");
        };
        assert!(!options.reset);
        assert_eq!(options.patch.api_key.as_deref(), Some("sk"));
        assert_eq!(options.patch.base_url, None);
        assert_eq!(options.patch.temperature, Some(0.3));
        assert_eq!(options.patch.max_tokens, Some(512));
        assert_eq!(options.patch.stream, Some(true));
    }

    #[test]
    fn negative_max_tokens_rejected() {
        let result = command(
            "configai",
            CommandOptions::new().with("max_tokens", OptionValue::Integer(-1)),
        );
        assert!(matches!(
            result,
            Err(InteractionError::InvalidOption { name: "max_tokens", .. })
        ));
    }
}
