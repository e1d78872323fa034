//! Slash command definitions registered with Discord at startup.

use crate::interaction::{
    CMD_AI, CMD_CLEAR, CMD_CONFIG_AI, CMD_LIST_HISTORY, CMD_RESET_SYSTEM, CMD_SYSTEM,
};
use serde_json::{json, Value};

const OPTION_STRING: u8 = 3;
const OPTION_INTEGER: u8 = 4;
const OPTION_BOOLEAN: u8 = 5;
const OPTION_NUMBER: u8 = 10;

/// The full command table, in the shape of a bulk-overwrite request body.
pub fn command_definitions() -> Value {
    json!([
        {
            "name": CMD_AI,
            "description": "Send a message to the AI",
            "options": [
                { "type": OPTION_STRING, "name": "message", "description": "Your message", "required": true },
                { "type": OPTION_STRING, "name": "pic", "description": "Image URL", "required": false }
            ]
        },
        {
            "name": CMD_CLEAR,
            "description": "Clear your conversation history with the AI"
        },
        {
            "name": CMD_SYSTEM,
            "description": "Set a custom system prompt for the AI",
            "options": [
                { "type": OPTION_STRING, "name": "prompt", "description": "The system prompt to set (leave empty to view current)", "required": false }
            ]
        },
        {
            "name": CMD_RESET_SYSTEM,
            "description": "Reset the system prompt to default"
        },
        {
            "name": CMD_LIST_HISTORY,
            "description": "View your current conversation history with the AI"
        },
        {
            "name": CMD_CONFIG_AI,
            "description": "Configure AI settings",
            "options": [
                { "type": OPTION_STRING, "name": "baseurl", "description": "API base URL", "required": false },
                { "type": OPTION_STRING, "name": "apikey", "description": "Your API key", "required": false },
                { "type": OPTION_STRING, "name": "model", "description": "AI model to use", "required": false },
                { "type": OPTION_NUMBER, "name": "temperature", "description": "Temperature (0.0-2.0)", "min_value": 0, "max_value": 2, "required": false },
                { "type": OPTION_NUMBER, "name": "top_p", "description": "Top P (0.0-1.0)", "min_value": 0, "max_value": 1, "required": false },
                { "type": OPTION_INTEGER, "name": "max_tokens", "description": "Maximum tokens in response", "min_value": 1, "max_value": 8192, "required": false },
                { "type": OPTION_BOOLEAN, "name": "stream", "description": "Enable or disable streaming response", "required": false },
                { "type": OPTION_BOOLEAN, "name": "reset", "description": "Reset to default settings", "required": false }
            ]
        }
    ])
}
