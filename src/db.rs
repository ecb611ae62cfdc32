use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

pub const DB_FILE: &str = "resultd.sqlite3";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResultSummary {
    pub hash: String,
    pub filename: Option<String>,
    pub created_at: String,
    pub student_count: i64,
    pub college_count: i64,
    pub exam_info: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct CachedResult {
    pub hash: String,
    pub filename: Option<String>,
    pub payload: serde_json::Value,
}

pub struct CacheEntry<'a> {
    pub hash: &'a str,
    pub filename: Option<&'a str>,
    pub student_count: usize,
    pub college_count: usize,
    pub exam_info: Option<&'a serde_json::Value>,
    pub payload: &'a serde_json::Value,
    pub statistics: &'a serde_json::Value,
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS results(
            hash TEXT PRIMARY KEY,
            filename TEXT,
            created_at TEXT NOT NULL,
            student_count INTEGER NOT NULL,
            college_count INTEGER NOT NULL,
            exam_info_json TEXT,
            payload_json TEXT NOT NULL,
            statistics_json TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_results_created ON results(created_at)",
        [],
    )?;

    Ok(conn)
}

/// Inserts or replaces the cached result for `entry.hash`.
pub fn cache_put(conn: &Connection, entry: &CacheEntry<'_>) -> anyhow::Result<()> {
    let exam_info = entry.exam_info.map(|v| v.to_string());
    conn.execute(
        "INSERT INTO results(hash, filename, created_at, student_count, college_count,
                             exam_info_json, payload_json, statistics_json)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(hash) DO UPDATE SET
            filename = COALESCE(excluded.filename, results.filename),
            created_at = excluded.created_at,
            student_count = excluded.student_count,
            college_count = excluded.college_count,
            exam_info_json = excluded.exam_info_json,
            payload_json = excluded.payload_json,
            statistics_json = excluded.statistics_json",
        (
            entry.hash,
            entry.filename,
            chrono::Utc::now().to_rfc3339(),
            entry.student_count as i64,
            entry.college_count as i64,
            exam_info,
            entry.payload.to_string(),
            entry.statistics.to_string(),
        ),
    )?;
    Ok(())
}

pub fn cache_list(conn: &Connection) -> anyhow::Result<Vec<CachedResultSummary>> {
    let mut stmt = conn.prepare(
        "SELECT hash, filename, created_at, student_count, college_count, exam_info_json
         FROM results
         ORDER BY created_at DESC, hash",
    )?;
    let rows = stmt
        .query_map([], |r| {
            let exam_info: Option<String> = r.get(5)?;
            Ok(CachedResultSummary {
                hash: r.get(0)?,
                filename: r.get(1)?,
                created_at: r.get(2)?,
                student_count: r.get(3)?,
                college_count: r.get(4)?,
                exam_info: exam_info.and_then(|s| serde_json::from_str(&s).ok()),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn cache_get(conn: &Connection, hash: &str) -> anyhow::Result<Option<CachedResult>> {
    let row: Option<(String, Option<String>, String)> = conn
        .query_row(
            "SELECT hash, filename, payload_json FROM results WHERE hash = ?",
            [hash],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let Some((hash, filename, payload_json)) = row else {
        return Ok(None);
    };
    let payload = serde_json::from_str(&payload_json)
        .with_context(|| format!("cached payload for {} is not valid JSON", hash))?;
    Ok(Some(CachedResult {
        hash,
        filename,
        payload,
    }))
}

pub fn cache_delete(conn: &Connection, hash: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM results WHERE hash = ?", [hash])?;
    Ok(n > 0)
}
