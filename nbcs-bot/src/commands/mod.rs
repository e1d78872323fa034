//! Slash command handlers.

pub mod ai;
pub mod configai;
pub mod history;
pub mod system;

use crate::context::BotContext;
use crate::dispatcher::HandlerError;
use crate::interaction::Command;
use crate::traits::Responder;

/// Embed accent colour.
pub const EMBED_COLOR: u32 = 0x0099ff;

pub async fn handle_command(
    ctx: &BotContext,
    user_id: &str,
    command: Command,
    responder: &dyn Responder,
) -> Result<(), HandlerError> {
    match command {
        Command::Ai { message, pic } => ai::handle(ctx, user_id, message, pic, responder).await,
        Command::Clear => system::clear(ctx, user_id, responder).await,
        Command::System { prompt } => system::system(ctx, user_id, prompt, responder).await,
        Command::ResetSystem => system::reset_system(ctx, user_id, responder).await,
        Command::ListHistory => history::list(ctx, user_id, responder).await,
        Command::ConfigAi(options) => configai::handle(ctx, user_id, options, responder).await,
    }
}
