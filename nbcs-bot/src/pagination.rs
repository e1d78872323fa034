//! Paginated `/listhis` views.
//!
//! Each user has at most one view, remembering which page of their history
//! is shown. Views idle for longer than [`VIEW_EXPIRY`] are swept away, after
//! which the page buttons report that the session expired.

use crate::session::{HistoryPage, SessionManager};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Idle time after which a view is evicted.
pub const VIEW_EXPIRY: Duration = Duration::from_secs(30 * 60);

/// How often expired views are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("History view expired for user {0}")]
    NoActiveSession(String),
}

/// Page navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    fn step(self) -> i64 {
        match self {
            Self::Prev => -1,
            Self::Next => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationView {
    pub user_id: String,
    pub current_page: usize,
    pub last_accessed: Instant,
}

pub struct PaginationRegistry {
    views: DashMap<String, PaginationView>,
    sessions: Arc<SessionManager>,
    expiry: Duration,
}

impl PaginationRegistry {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self::with_expiry(sessions, VIEW_EXPIRY)
    }

    pub fn with_expiry(sessions: Arc<SessionManager>, expiry: Duration) -> Self {
        Self {
            views: DashMap::new(),
            sessions,
            expiry,
        }
    }

    /// Show `page` to the user, replacing any previous view.
    pub fn open(&self, user_id: &str, page: usize) -> HistoryPage {
        self.open_at(user_id, page, Instant::now())
    }

    pub fn open_at(&self, user_id: &str, page: usize, now: Instant) -> HistoryPage {
        let rendered = self.sessions.read_page(user_id, page as i64);
        self.views.insert(
            user_id.to_string(),
            PaginationView {
                user_id: user_id.to_string(),
                current_page: rendered.page,
                last_accessed: now,
            },
        );
        rendered
    }

    /// Move the user's view one page in `direction`.
    ///
    /// Moving past either end leaves the view on the boundary page.
    pub fn advance(&self, user_id: &str, direction: Direction) -> Result<HistoryPage, PaginationError> {
        self.advance_at(user_id, direction, Instant::now())
    }

    pub fn advance_at(
        &self,
        user_id: &str,
        direction: Direction,
        now: Instant,
    ) -> Result<HistoryPage, PaginationError> {
        let mut view = self
            .views
            .get_mut(user_id)
            .ok_or_else(|| PaginationError::NoActiveSession(user_id.to_string()))?;

        let requested = view.current_page as i64 + direction.step();
        let rendered = self.sessions.read_page(user_id, requested);

        view.current_page = rendered.page;
        view.last_accessed = now;
        Ok(rendered)
    }

    pub fn view(&self, user_id: &str) -> Option<PaginationView> {
        self.views.get(user_id).map(|v| v.clone())
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Evict views idle for longer than the expiry. Returns how many went.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.views.len();
        self.views
            .retain(|_, view| now.saturating_duration_since(view.last_accessed) <= self.expiry);
        let removed = before.saturating_sub(self.views.len());
        if removed > 0 {
            tracing::debug!(removed, "Expired history views swept");
        }
        removed
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}
