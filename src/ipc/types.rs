use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::session::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Arc<Session>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            db: None,
            session: None,
        }
    }

    /// Swaps in a fully built session. The previous session is torn down in
    /// the same step, so records and statistics always change together.
    pub fn install_session(&mut self, session: Session) -> Arc<Session> {
        let next = Arc::new(session);
        if let Some(prev) = self.session.replace(Arc::clone(&next)) {
            info!(previous = %prev.key, next = %next.key, "session replaced");
        }
        next
    }

    pub fn close_session(&mut self) -> Option<String> {
        let prev = self.session.take()?;
        info!(session = %prev.key, "session closed");
        Some(prev.key.clone())
    }
}
