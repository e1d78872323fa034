//! Rendering of replies into Discord JSON payloads.
//!
//! Discord message payloads carry `content`, up to ten `embeds` and rows of
//! `components`. Ephemeral messages set the `EPHEMERAL` bit in `flags`.

use crate::message::{ActionRow, ButtonStyle, Embed, Reply};
use serde_json::{json, Map, Value};

/// Message flag: only the invoking user can see the message.
pub const EPHEMERAL_FLAG: u64 = 1 << 6;

/// Interaction callback: reply with a message.
pub const CALLBACK_MESSAGE: u8 = 4;
/// Interaction callback: acknowledge, reply later.
pub const CALLBACK_DEFERRED_MESSAGE: u8 = 5;
/// Interaction callback: edit the message the component is attached to.
pub const CALLBACK_UPDATE_MESSAGE: u8 = 7;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;

/// Message payload for a reply.
///
/// `with_flags` is false for edits, where Discord ignores or rejects a
/// visibility change.
pub fn message_payload(reply: &Reply, with_flags: bool) -> Value {
    let mut payload = Map::new();

    payload.insert(
        "content".into(),
        reply
            .content
            .as_ref()
            .map_or(Value::String(String::new()), |c| Value::String(c.clone())),
    );
    payload.insert(
        "embeds".into(),
        Value::Array(reply.embeds.iter().map(embed_json).collect()),
    );
    payload.insert(
        "components".into(),
        Value::Array(reply.components.iter().map(row_json).collect()),
    );

    if with_flags && reply.ephemeral {
        payload.insert("flags".into(), json!(EPHEMERAL_FLAG));
    }

    Value::Object(payload)
}

pub fn embed_json(embed: &Embed) -> Value {
    let mut obj = Map::new();
    if let Some(ref title) = embed.title {
        obj.insert("title".into(), json!(title));
    }
    if let Some(ref description) = embed.description {
        obj.insert("description".into(), json!(description));
    }
    if let Some(color) = embed.color {
        obj.insert("color".into(), json!(color));
    }
    if !embed.fields.is_empty() {
        let fields: Vec<Value> = embed
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
            .collect();
        obj.insert("fields".into(), Value::Array(fields));
    }
    if let Some(ref footer) = embed.footer {
        obj.insert("footer".into(), json!({ "text": footer }));
    }
    Value::Object(obj)
}

pub fn row_json(row: &ActionRow) -> Value {
    let buttons: Vec<Value> = row
        .buttons
        .iter()
        .map(|b| {
            json!({
                "type": COMPONENT_BUTTON,
                "custom_id": b.custom_id,
                "label": b.label,
                "style": button_style(b.style),
                "disabled": b.disabled,
            })
        })
        .collect();

    json!({ "type": COMPONENT_ACTION_ROW, "components": buttons })
}

const fn button_style(style: ButtonStyle) -> u8 {
    match style {
        ButtonStyle::Primary => 1,
        ButtonStyle::Secondary => 2,
    }
}

/// Body of an interaction callback.
pub fn callback_body(kind: u8, data: Option<Value>) -> Value {
    match data {
        Some(data) => json!({ "type": kind, "data": data }),
        None => json!({ "type": kind }),
    }
}
