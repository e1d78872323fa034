//! Presentation of streamed replies.
//!
//! While a reply streams in, the pending Discord message can be edited with
//! the partial text. Edits are rate limited by Discord, so the presenter
//! decides when a preview is due.
//!
//! # Policies
//!
//! - **Throttled** → edit the pending reply at most once per interval with the
//!   text so far (cut to the message limit)
//! - **Deferred** → no previews; the reply appears once the stream drains
//!
//! Both policies finish the same way: the full text is split into
//! Discord-sized chunks.

use crate::chunking::split_message;
use nbcs_common::util::take_chars;
use nbcs_common::{PresentationConfig, StreamPreview};
use std::time::{Duration, Instant};

/// When partial text is shown while a stream is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewPolicy {
    Throttled { interval: Duration },
    #[default]
    Deferred,
}

impl PreviewPolicy {
    pub fn from_config(config: &PresentationConfig) -> Self {
        match config.stream_preview {
            StreamPreview::Throttled => Self::Throttled {
                interval: Duration::from_millis(config.preview_interval_ms),
            },
            StreamPreview::Deferred => Self::Deferred,
        }
    }
}

/// Accumulates a streamed reply and decides when to preview it.
#[derive(Debug)]
pub struct StreamPresenter {
    policy: PreviewPolicy,
    max_len: usize,
    buffer: String,
    last_preview: Option<Instant>,
    /// Text of the last preview, to skip edits that would change nothing
    last_shown: String,
}

impl StreamPresenter {
    pub fn new(policy: PreviewPolicy, max_len: usize) -> Self {
        Self {
            policy,
            max_len,
            buffer: String::new(),
            last_preview: None,
            last_shown: String::new(),
        }
    }

    /// Add a delta. Returns the preview to show, if one is due at `now`.
    pub fn push(&mut self, delta: &str, now: Instant) -> Option<String> {
        self.buffer.push_str(delta);

        let PreviewPolicy::Throttled { interval } = self.policy else {
            return None;
        };

        if self.buffer.is_empty() {
            return None;
        }
        if let Some(last) = self.last_preview {
            if now.saturating_duration_since(last) < interval {
                return None;
            }
        }

        let preview = take_chars(&self.buffer, self.max_len);
        if preview == self.last_shown {
            return None;
        }

        self.last_preview = Some(now);
        self.last_shown = preview.to_string();
        Some(self.last_shown.clone())
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Final text split into deliverable chunks.
    pub fn finish(self) -> Vec<String> {
        split_message(&self.buffer, self.max_len)
    }
}
