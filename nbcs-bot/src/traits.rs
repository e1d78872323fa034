//! Reply delivery trait implemented by platform adapters.

use crate::message::Reply;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Channel error type.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Where an interaction is in its reply lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Nothing sent yet
    Pending,
    /// A "thinking…" placeholder was sent; the original reply can be edited
    Deferred,
    /// Visible content was sent: an initial reply, a message update, or an
    /// edit of the deferred placeholder
    Replied,
}

/// Sends the responses for one interaction.
///
/// Exactly one of `reply`, `defer` or `update` may be the initial response;
/// `edit_original` and `follow_up` are only valid after it.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Send the initial reply.
    async fn reply(&self, reply: Reply) -> ChannelResult<()>;

    /// Acknowledge now and reply later.
    async fn defer(&self, ephemeral: bool) -> ChannelResult<()>;

    /// Replace the initial (or deferred) reply.
    async fn edit_original(&self, reply: Reply) -> ChannelResult<()>;

    /// Send an additional message after the initial reply.
    async fn follow_up(&self, reply: Reply) -> ChannelResult<()>;

    /// Update the message a button belongs to.
    async fn update(&self, reply: Reply) -> ChannelResult<()>;

    fn state(&self) -> ReplyState;
}

/// Something a [`RecordingResponder`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderCall {
    Reply(Reply),
    Defer { ephemeral: bool },
    EditOriginal(Reply),
    FollowUp(Reply),
    Update(Reply),
}

/// In-memory responder for testing.
#[derive(Debug)]
pub struct RecordingResponder {
    calls: Mutex<Vec<ResponderCall>>,
    state: Mutex<ReplyState>,
    fail_defers: bool,
    fail_edits: bool,
    fail_follow_ups: bool,
}

impl RecordingResponder {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            state: Mutex::new(ReplyState::Pending),
            fail_defers: false,
            fail_edits: false,
            fail_follow_ups: false,
        }
    }

    /// A responder whose `defer` always fails, as with an expired token.
    pub fn failing_defers() -> Self {
        Self {
            fail_defers: true,
            ..Self::new()
        }
    }

    /// A responder whose `edit_original` always fails.
    pub fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Self::new()
        }
    }

    /// A responder whose `follow_up` is always rate limited.
    pub fn failing_follow_ups() -> Self {
        Self {
            fail_follow_ups: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<ResponderCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Text of every message sent, in order.
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ResponderCall::Reply(r)
                | ResponderCall::EditOriginal(r)
                | ResponderCall::FollowUp(r)
                | ResponderCall::Update(r) => r.content,
                ResponderCall::Defer { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: ResponderCall, next: Option<ReplyState>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if let Some(next) = next {
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        }
    }
}

impl Default for RecordingResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn reply(&self, reply: Reply) -> ChannelResult<()> {
        self.record(ResponderCall::Reply(reply), Some(ReplyState::Replied));
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> ChannelResult<()> {
        if self.fail_defers {
            return Err(ChannelError::SendFailed("unknown interaction".into()));
        }
        self.record(ResponderCall::Defer { ephemeral }, Some(ReplyState::Deferred));
        Ok(())
    }

    async fn edit_original(&self, reply: Reply) -> ChannelResult<()> {
        if self.fail_edits {
            return Err(ChannelError::SendFailed("edit rejected".into()));
        }
        self.record(ResponderCall::EditOriginal(reply), Some(ReplyState::Replied));
        Ok(())
    }

    async fn follow_up(&self, reply: Reply) -> ChannelResult<()> {
        if self.fail_follow_ups {
            return Err(ChannelError::RateLimited { retry_after_secs: 1 });
        }
        self.record(ResponderCall::FollowUp(reply), None);
        Ok(())
    }

    async fn update(&self, reply: Reply) -> ChannelResult<()> {
        self.record(ResponderCall::Update(reply), Some(ReplyState::Replied));
        Ok(())
    }

    fn state(&self) -> ReplyState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_responder_tracks_state() {
        let responder = RecordingResponder::new();
        assert_eq!(responder.state(), ReplyState::Pending);

        responder.defer(false).await.unwrap();
        assert_eq!(responder.state(), ReplyState::Deferred);

        responder.edit_original(Reply::text("one")).await.unwrap();
        assert_eq!(responder.state(), ReplyState::Replied);
        responder.follow_up(Reply::text("two")).await.unwrap();
        assert_eq!(responder.texts(), vec!["one", "two"]);
        assert_eq!(responder.calls().len(), 3);
    }

    #[tokio::test]
    async fn failing_edits() {
        let responder = RecordingResponder::failing_edits();
        assert!(responder.edit_original(Reply::text("x")).await.is_err());
        assert!(responder.calls().is_empty());
    }
}
