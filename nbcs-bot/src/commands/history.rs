//! `/listhis` and its page buttons.

use super::EMBED_COLOR;
use crate::context::BotContext;
use crate::dispatcher::HandlerError;
use crate::interaction::Button;
use crate::message::{ActionRow, Button as ButtonComponent, ButtonStyle, Embed, Reply};
use crate::pagination::Direction;
use crate::session::HistoryPage;
use crate::traits::Responder;

pub const NO_HISTORY: &str = "You don't have any conversation history yet.";

pub async fn list(
    ctx: &BotContext,
    user_id: &str,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    if !ctx.sessions.has_history(user_id) {
        responder.reply(Reply::text(NO_HISTORY).ephemeral()).await?;
        return Ok(());
    }

    let page = ctx.pagination.open(user_id, 0);
    responder.reply(render_page(&page).ephemeral()).await?;
    Ok(())
}

pub async fn handle_button(
    ctx: &BotContext,
    user_id: &str,
    button: Button,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    let direction = match button {
        Button::PrevPage => Direction::Prev,
        Button::NextPage => Direction::Next,
    };

    let page = ctx.pagination.advance(user_id, direction)?;
    responder.update(render_page(&page)).await?;
    Ok(())
}

/// History embed plus the prev/next row.
pub fn render_page(page: &HistoryPage) -> Reply {
    let mut embed = Embed::new("Conversation history")
        .color(EMBED_COLOR)
        .description(format!(
            "Showing messages {} to {} of {}",
            page.start(),
            page.end(),
            page.total_messages
        ))
        .footer(format!("Page {} of {}", page.page + 1, page.total_pages));

    for item in &page.items {
        // Discord rejects empty field values
        let value = if item.display.is_empty() {
            "(empty)"
        } else {
            item.display.as_str()
        };
        embed = embed.field(format!("{}:", item.speaker()), value);
    }

    Reply::embed(embed).with_row(page_buttons(page))
}

fn page_buttons(page: &HistoryPage) -> ActionRow {
    ActionRow {
        buttons: vec![
            ButtonComponent {
                custom_id: Button::PrevPage.custom_id().to_string(),
                label: "Previous".to_string(),
                style: ButtonStyle::Primary,
                disabled: !page.has_prev(),
            },
            ButtonComponent {
                custom_id: Button::NextPage.custom_id().to_string(),
                label: "Next".to_string(),
                style: ButtonStyle::Primary,
                disabled: !page.has_next(),
            },
        ],
    }
}
