pub mod analytics;
pub mod cache;
pub mod core;
pub mod session;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use std::sync::Arc;

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing params.{}", key), None))
}

fn optional_str(req: &Request, key: &str) -> Result<Option<String>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_str() {
            Some(s) => Ok(Some(s.to_string())),
            None => Err(err(
                &req.id,
                "bad_params",
                format!("params.{} must be string or null", key),
                None,
            )),
        },
    }
}

/// Snapshot of the current session. Handlers keep the `Arc` for the whole
/// request, so a concurrent replacement can never mix two result sets.
fn current_session(state: &AppState, req: &Request) -> Result<Arc<Session>, serde_json::Value> {
    state
        .session
        .as_ref()
        .map(Arc::clone)
        .ok_or_else(|| err(&req.id, "no_session", "load a result set first", None))
}
