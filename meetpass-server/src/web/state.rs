//! Application state for the web layer.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::schedule::Baseline;
use crate::session::Session;

/// The loaded session and the start times it is judged against.
#[derive(Debug, Default)]
pub struct Workspace {
    pub session: Session,
    pub baseline: Baseline,
}

impl Workspace {
    /// Wrap a session, capturing its current starts as the baseline.
    pub fn new(session: Session) -> Self {
        let baseline = Baseline::capture(session.trains());
        Self { session, baseline }
    }

    /// Replace the session and recapture the baseline.
    pub fn replace(&mut self, session: Session) {
        *self = Self::new(session);
    }
}

/// Shared application state.
///
/// One workspace per process. The mutex is held for the whole of a
/// resolution request, so at most one resolution runs at a time.
#[derive(Clone, Default)]
pub struct AppState {
    pub workspace: Arc<Mutex<Workspace>>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(session: Session) -> Self {
        Self {
            workspace: Arc::new(Mutex::new(Workspace::new(session))),
        }
    }
}
