mod test_support;

use serde_json::json;
use test_support::{error_code, fixture_payload, request, request_ok, spawn_sidecar};

#[test]
fn malformed_row_is_skipped_and_reported() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let payload = fixture_payload();

    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "load",
        "session.load",
        json!({ "payload": payload, "filename": "grade_card_dec2025.pdf" }),
    );
    assert_eq!(loaded.get("studentCount").and_then(|v| v.as_u64()), Some(5));
    assert_eq!(loaded.get("collegeCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(loaded.get("skippedCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(loaded.get("persisted").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(loaded.get("staleStatistics").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        loaded.get("filename").and_then(|v| v.as_str()),
        Some("grade_card_dec2025.pdf")
    );

    let skipped = loaded
        .get("skipped")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("skipped array");
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].get("index").and_then(|v| v.as_u64()), Some(5));
    assert!(skipped[0].get("seatNo").map(|v| v.is_null()).unwrap_or(false));

    // Content hash is stable for identical payloads.
    let key = loaded
        .get("sessionKey")
        .and_then(|v| v.as_str())
        .expect("sessionKey")
        .to_string();
    assert_eq!(key.len(), 64);
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "load-again",
        "session.load",
        json!({ "payload": fixture_payload() }),
    );
    assert_eq!(again.get("sessionKey").and_then(|v| v.as_str()), Some(key.as_str()));

    let info = request_ok(&mut stdin, &mut reader, "info", "session.info", json!({}));
    assert_eq!(info.get("sessionKey").and_then(|v| v.as_str()), Some(key.as_str()));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn caller_hash_becomes_session_key() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "load",
        "session.load",
        json!({ "payload": fixture_payload(), "resultHash": "  f00dfeed  " }),
    );
    assert_eq!(loaded.get("sessionKey").and_then(|v| v.as_str()), Some("f00dfeed"));

    let health = request_ok(&mut stdin, &mut reader, "h", "health", json!({}));
    assert_eq!(health.get("sessionKey").and_then(|v| v.as_str()), Some("f00dfeed"));

    let closed = request_ok(&mut stdin, &mut reader, "close", "session.close", json!({}));
    assert_eq!(
        closed.get("closedSessionKey").and_then(|v| v.as_str()),
        Some("f00dfeed")
    );
    let after = request(&mut stdin, &mut reader, "after", "analytics.statistics", json!({}));
    assert_eq!(error_code(&after), Some("no_session"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn empty_and_invalid_payloads_are_rejected() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let empty = request(
        &mut stdin,
        &mut reader,
        "empty",
        "session.load",
        json!({ "payload": { "students": [] } }),
    );
    assert_eq!(error_code(&empty), Some("empty_input"));

    let all_bad = request(
        &mut stdin,
        &mut reader,
        "all-bad",
        "session.load",
        json!({ "payload": { "students": [{ "name": "NO SEAT" }] } }),
    );
    assert_eq!(error_code(&all_bad), Some("empty_input"));

    let not_object = request(
        &mut stdin,
        &mut reader,
        "not-object",
        "session.load",
        json!({ "payload": [1, 2, 3] }),
    );
    assert_eq!(error_code(&not_object), Some("bad_params"));

    let bad_persist = request(
        &mut stdin,
        &mut reader,
        "bad-persist",
        "session.load",
        json!({ "payload": fixture_payload(), "persist": "yes" }),
    );
    assert_eq!(error_code(&bad_persist), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn stale_supplied_statistics_are_flagged() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let mut payload = fixture_payload();
    payload["statistics"]["passed_students"] = json!(5);

    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "load",
        "session.load",
        json!({ "payload": payload }),
    );
    assert_eq!(loaded.get("staleStatistics").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        loaded
            .pointer("/statistics/passed_students")
            .and_then(|v| v.as_u64()),
        Some(4)
    );

    drop(stdin);
    let _ = child.wait();
}
