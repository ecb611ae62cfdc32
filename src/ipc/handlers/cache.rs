use super::required_str;
use crate::db::{self, CacheEntry};
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::ResultsPayload;
use crate::session::Session;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Writes the session's validated records and statistics under its key.
pub fn persist_session(conn: &Connection, session: &Session) -> anyhow::Result<()> {
    let payload = serde_json::to_value(session.stored())?;
    let statistics = serde_json::to_value(&session.statistics)?;
    db::cache_put(
        conn,
        &CacheEntry {
            hash: &session.key,
            filename: session.filename.as_deref(),
            student_count: session.records.len(),
            college_count: session.college_count(),
            exam_info: session.exam_info.as_ref(),
            payload: &payload,
            statistics: &statistics,
        },
    )?;
    info!(session = %session.key, "result set cached");
    Ok(())
}

fn handle_cache_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::cache_list(conn) {
        Ok(rows) => ok(&req.id, json!({ "results": rows })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:?}"), None),
    }
}

fn handle_cache_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let hash = match required_str(req, "hash") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let cached = {
        let conn = match db_conn(state, req) {
            Ok(v) => v,
            Err(e) => return e,
        };
        match db::cache_get(conn, &hash) {
            Ok(Some(v)) => v,
            Ok(None) => {
                return err(
                    &req.id,
                    "not_found",
                    "no cached result for hash",
                    Some(json!({ "hash": hash })),
                )
            }
            Err(e) => return err(&req.id, "db_query_failed", format!("{e:?}"), None),
        }
    };

    let payload: ResultsPayload = match serde_json::from_value(cached.payload) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "cache_corrupt", e.to_string(), None),
    };
    let session = match Session::build(payload, cached.hash, cached.filename) {
        Ok(v) => v,
        Err(e) => return engine_err(&req.id, &e),
    };
    let session = state.install_session(session);
    let mut result = session.summary_json();
    result["statistics"] = json!(session.statistics);
    ok(&req.id, result)
}

fn handle_cache_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let hash = match required_str(req, "hash") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::cache_delete(conn, &hash) {
        Ok(deleted) => ok(&req.id, json!({ "hash": hash, "deleted": deleted })),
        Err(e) => err(&req.id, "db_delete_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "cache.list" => Some(handle_cache_list(state, req)),
        "cache.load" => Some(handle_cache_load(state, req)),
        "cache.delete" => Some(handle_cache_delete(state, req)),
        _ => None,
    }
}
