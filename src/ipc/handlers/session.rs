use super::{current_session, optional_str};
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::handlers::cache::persist_session;
use crate::ipc::types::{AppState, Request};
use crate::model::ResultsPayload;
use crate::session::{payload_hash, Session};
use serde_json::json;

fn handle_session_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("payload").filter(|v| v.is_object()) else {
        return err(&req.id, "bad_params", "params.payload must be an object", None);
    };
    let result_hash = match optional_str(req, "resultHash") {
        Ok(v) => v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) => return e,
    };
    let filename = match optional_str(req, "filename") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let persist = match req.params.get("persist") {
        None => false,
        Some(v) if v.is_null() => false,
        Some(v) => match v.as_bool() {
            Some(b) => b,
            None => return err(&req.id, "bad_params", "params.persist must be a boolean", None),
        },
    };
    if persist && state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }

    let payload: ResultsPayload = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                format!("params.payload is not a result set: {e}"),
                None,
            )
        }
    };
    let key = result_hash.unwrap_or_else(|| payload_hash(raw));

    let session = match Session::build(payload, key, filename) {
        Ok(v) => v,
        Err(e) => return engine_err(&req.id, &e),
    };

    let mut persisted = false;
    if persist {
        if let Some(conn) = state.db.as_ref() {
            if let Err(e) = persist_session(conn, &session) {
                return err(&req.id, "db_insert_failed", format!("{e:?}"), None);
            }
            persisted = true;
        }
    }

    let session = state.install_session(session);
    let mut result = session.summary_json();
    result["persisted"] = json!(persisted);
    result["skipped"] = json!(session.skipped_json());
    result["statistics"] = json!(session.statistics);
    ok(&req.id, result)
}

fn handle_session_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    match current_session(state, req) {
        Ok(session) => ok(&req.id, session.summary_json()),
        Err(e) => e,
    }
}

fn handle_session_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let closed = state.close_session();
    ok(&req.id, json!({ "closedSessionKey": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.load" => Some(handle_session_load(state, req)),
        "session.info" => Some(handle_session_info(state, req)),
        "session.close" => Some(handle_session_close(state, req)),
        _ => None,
    }
}
