use crate::calc::{self, EngineError, Statistics};
use crate::model::{CourseMetadata, ResultsPayload, StudentRecord};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{info, warn};

/// One loaded result set: validated records plus the statistics computed
/// from exactly those records. Never mutated after `build`.
#[derive(Debug, Clone)]
pub struct Session {
    pub key: String,
    pub filename: Option<String>,
    pub loaded_at: String,
    pub records: Vec<StudentRecord>,
    pub course_metadata: CourseMetadata,
    pub exam_info: Option<serde_json::Value>,
    pub statistics: Statistics,
    pub skipped: Vec<EngineError>,
    pub stale_statistics: bool,
}

/// Storage form of a session, as written to the result cache.
#[derive(Debug, Serialize)]
pub struct StoredResults<'a> {
    pub students: &'a [StudentRecord],
    pub course_metadata: &'a CourseMetadata,
    pub statistics: &'a Statistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_info: Option<&'a serde_json::Value>,
}

/// Hex SHA-256 of the payload's JSON text. Object keys serialize in sorted
/// order, so equal payloads hash equally regardless of source key order.
pub fn payload_hash(raw: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(raw).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

fn malformed(index: usize, seat_no: Option<&str>, reason: impl Into<String>) -> EngineError {
    EngineError::MalformedRecord {
        index,
        seat_no: seat_no.map(|s| s.to_string()),
        reason: reason.into(),
    }
}

/// Decodes student rows one by one. Rows missing `seat_no` or `total_marks`,
/// rows that fail to decode, and repeated seat numbers are skipped and
/// reported; the remaining rows keep their input order.
pub fn validate_records(rows: Vec<serde_json::Value>) -> (Vec<StudentRecord>, Vec<EngineError>) {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, row) in rows.into_iter().enumerate() {
        let Some(obj) = row.as_object() else {
            skipped.push(malformed(index, None, "record is not an object"));
            continue;
        };
        let seat_no = obj
            .get("seat_no")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let Some(seat_no) = seat_no else {
            skipped.push(malformed(index, None, "missing seat_no"));
            continue;
        };
        let total_ok = obj
            .get("total_marks")
            .and_then(|v| v.as_f64())
            .map(|v| v.is_finite())
            .unwrap_or(false);
        if !total_ok {
            skipped.push(malformed(
                index,
                Some(&seat_no),
                "missing or non-numeric total_marks",
            ));
            continue;
        }
        if seen.contains(&seat_no) {
            skipped.push(malformed(index, Some(&seat_no), "duplicate seat_no"));
            continue;
        }

        match serde_json::from_value::<StudentRecord>(row) {
            Ok(mut rec) => {
                rec.seat_no = seat_no.clone();
                seen.insert(seat_no);
                records.push(rec);
            }
            Err(e) => skipped.push(malformed(index, Some(&seat_no), e.to_string())),
        }
    }

    for e in &skipped {
        warn!(error = %e, "skipping student record");
    }
    (records, skipped)
}

/// True when a supplied statistics block disagrees with the live counts.
fn statistics_disagree(supplied: &serde_json::Value, computed: &Statistics) -> bool {
    // Counts may arrive as `5` or `5.0`.
    let agrees = |k: &str, live: usize| {
        supplied
            .get(k)
            .and_then(|v| v.as_f64())
            .map(|v| v == live as f64)
            .unwrap_or(false)
    };
    !(agrees("total_students", computed.total_students)
        && agrees("passed_students", computed.passed_students))
}

impl Session {
    /// Validates the payload and computes its statistics. The supplied
    /// `statistics` block is only checked for staleness; the session always
    /// serves statistics computed from its own records.
    pub fn build(
        payload: ResultsPayload,
        key: String,
        filename: Option<String>,
    ) -> Result<Session, EngineError> {
        let (records, skipped) = validate_records(payload.students);
        let statistics =
            calc::compute_statistics(&records, Some(&payload.course_metadata))?;

        let stale_statistics = payload
            .statistics
            .as_ref()
            .map(|s| statistics_disagree(s, &statistics))
            .unwrap_or(false);
        if stale_statistics {
            warn!(session = %key, "supplied statistics are stale; using recomputed values");
        }

        info!(
            session = %key,
            students = records.len(),
            skipped = skipped.len(),
            "session built"
        );

        Ok(Session {
            key,
            filename,
            loaded_at: chrono::Utc::now().to_rfc3339(),
            records,
            course_metadata: payload.course_metadata,
            exam_info: payload.exam_info,
            statistics,
            skipped,
            stale_statistics,
        })
    }

    pub fn stored(&self) -> StoredResults<'_> {
        StoredResults {
            students: &self.records,
            course_metadata: &self.course_metadata,
            statistics: &self.statistics,
            exam_info: self.exam_info.as_ref(),
        }
    }

    pub fn college_count(&self) -> usize {
        crate::college::distinct_college_codes(&self.records)
    }

    pub fn summary_json(&self) -> serde_json::Value {
        json!({
            "sessionKey": self.key,
            "filename": self.filename,
            "loadedAt": self.loaded_at,
            "studentCount": self.records.len(),
            "collegeCount": self.college_count(),
            "skippedCount": self.skipped.len(),
            "staleStatistics": self.stale_statistics,
        })
    }

    pub fn skipped_json(&self) -> Vec<serde_json::Value> {
        self.skipped
            .iter()
            .map(|e| {
                let mut v = e.details().unwrap_or_else(|| json!({}));
                v["message"] = json!(e.to_string());
                v
            })
            .collect()
    }
}
