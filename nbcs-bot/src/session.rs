//! Per-user conversation sessions.
//!
//! A session is the ordered history sent to the completion endpoint. When it
//! is non-empty, element 0 is always the system message. History lives only
//! in memory and is lost on restart.

use crate::chat::{ChatMessage, MessageContent, Role};
use crate::prompt::PromptStore;
use dashmap::DashMap;
use nbcs_common::util::truncate_with_ellipsis;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Maximum number of non-system messages kept after a trim.
pub const MAX_HISTORY_LENGTH: usize = 50;

/// History entries per page in `/listhis`.
pub const PAGE_SIZE: usize = 5;

/// Longest rendering of one history entry (embed field value limit).
pub const ENTRY_PREVIEW_LIMIT: usize = 1024;

/// Shown in place of structured content when listing history.
pub const IMAGE_PLACEHOLDER: &str = "[message with image]";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No conversation session for user {0}")]
    NotInitialized(String),
}

/// One rendered history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    /// 1-based position among the non-system messages
    pub index: usize,
    pub role: Role,
    pub display: String,
}

impl HistoryItem {
    /// Label shown to the user for the speaker.
    pub fn speaker(&self) -> &'static str {
        match self.role {
            Role::User => "You",
            Role::Assistant => "AI",
            Role::System => "System",
        }
    }
}

/// One page of a user's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub items: Vec<HistoryItem>,
    /// Page actually shown, after clamping
    pub page: usize,
    pub total_pages: usize,
    pub total_messages: usize,
}

impl HistoryPage {
    /// 1-based index of the first entry on this page.
    pub fn start(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.page * PAGE_SIZE + 1
        }
    }

    /// 1-based index of the last entry on this page.
    pub fn end(&self) -> usize {
        self.page * PAGE_SIZE + self.items.len()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

/// Owner of every user's conversation history.
pub struct SessionManager {
    sessions: DashMap<String, Vec<ChatMessage>>,
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
    prompts: Arc<PromptStore>,
}

impl SessionManager {
    pub fn new(prompts: Arc<PromptStore>) -> Self {
        Self {
            sessions: DashMap::new(),
            turn_locks: DashMap::new(),
            prompts,
        }
    }

    /// Start the user over with only their system message.
    pub fn reset(&self, user_id: &str) {
        let system = ChatMessage::system(self.prompts.effective(user_id));
        self.sessions.insert(user_id.to_string(), vec![system]);
        tracing::debug!(user_id = %user_id, "Session reset");
    }

    /// Create the session if the user has none yet.
    pub fn ensure(&self, user_id: &str) {
        if self.sessions.contains_key(user_id) {
            return;
        }
        let system = ChatMessage::system(self.prompts.effective(user_id));
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| vec![system]);
    }

    /// Append a message to the end of the user's history.
    pub fn append(&self, user_id: &str, message: ChatMessage) -> Result<(), SessionError> {
        match self.sessions.get_mut(user_id) {
            Some(mut history) => {
                history.push(message);
                Ok(())
            }
            None => Err(SessionError::NotInitialized(user_id.to_string())),
        }
    }

    /// Persist a new system prompt and apply it to the live session.
    pub fn set_system_prompt(&self, user_id: &str, prompt: &str) {
        self.prompts.set(user_id, prompt);

        if let Some(mut history) = self.sessions.get_mut(user_id) {
            let system = ChatMessage::system(prompt);
            match history.first_mut() {
                Some(first) if first.role == Role::System => *first = system,
                Some(_) => history.insert(0, system),
                None => {}
            }
        }
    }

    /// Put the global default prompt back in place.
    pub fn reset_system_prompt(&self, user_id: &str) -> String {
        let prompt = self.prompts.default_prompt().to_string();
        self.set_system_prompt(user_id, &prompt);
        prompt
    }

    /// The prompt that applies to the user right now.
    pub fn system_prompt(&self, user_id: &str) -> String {
        self.prompts.effective(user_id)
    }

    /// Drop the oldest non-system messages beyond `MAX_HISTORY_LENGTH`.
    pub fn trim(&self, user_id: &str) {
        if let Some(mut history) = self.sessions.get_mut(user_id) {
            let len = history.len();
            if len > MAX_HISTORY_LENGTH + 1 {
                let excess = len - (MAX_HISTORY_LENGTH + 1);
                history.drain(1..=excess);
                tracing::debug!(user_id = %user_id, dropped = excess, "History trimmed");
            }
        }
    }

    /// Copy of the user's history for an outbound request.
    pub fn snapshot(&self, user_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .get(user_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    pub fn history_len(&self, user_id: &str) -> usize {
        self.sessions.get(user_id).map(|h| h.len()).unwrap_or(0)
    }

    /// Whether the user has anything beyond the system message.
    pub fn has_history(&self, user_id: &str) -> bool {
        self.history_len(user_id) > 1
    }

    /// Render one page of the user's non-system history.
    ///
    /// `page` is clamped to the valid range, so callers may pass a page one
    /// past either end.
    pub fn read_page(&self, user_id: &str, page: i64) -> HistoryPage {
        let entries: Vec<ChatMessage> = self
            .sessions
            .get(user_id)
            .map(|h| h.iter().skip(1).cloned().collect())
            .unwrap_or_default();

        let total_messages = entries.len();
        let total_pages = total_messages.div_ceil(PAGE_SIZE).max(1);
        let page = page.clamp(0, (total_pages - 1) as i64) as usize;

        let items = entries
            .iter()
            .enumerate()
            .skip(page * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|(i, msg)| HistoryItem {
                index: i + 1,
                role: msg.role,
                display: render_entry(&msg.content),
            })
            .collect();

        HistoryPage {
            items,
            page,
            total_pages,
            total_messages,
        }
    }

    /// Serialize whole exchanges for one user.
    pub async fn turn_lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .turn_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

fn render_entry(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => truncate_with_ellipsis(text, ENTRY_PREVIEW_LIMIT),
        MessageContent::Parts(_) => IMAGE_PLACEHOLDER.to_string(),
    }
}
