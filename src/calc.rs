use crate::college::{self, CollegeStats};
use crate::model::{CourseMetadata, StudentRecord, GRADE_LADDER};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const CGPA_BUCKETS: usize = 10;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("no student records to aggregate")]
    EmptyInput,

    #[error("student with seat number {seat_no} not found")]
    NotFound { seat_no: String },

    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord {
        index: usize,
        seat_no: Option<String>,
        reason: String,
    },
}

impl EngineError {
    /// Stable error code used in IPC responses.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::EmptyInput => "empty_input",
            EngineError::NotFound { .. } => "not_found",
            EngineError::MalformedRecord { .. } => "malformed_record",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            EngineError::EmptyInput => None,
            EngineError::NotFound { seat_no } => Some(json!({ "seatNo": seat_no })),
            EngineError::MalformedRecord {
                index,
                seat_no,
                reason,
            } => Some(json!({ "index": index, "seatNo": seat_no, "reason": reason })),
        }
    }
}

/// VB6-style 1-decimal rounding: `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

/// Whole-percent share of `part` in `whole`; 0 when `whole` is 0.
pub fn whole_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let pct = ((100.0 * part as f64) / (whole as f64) + 0.5).floor();
    pct.clamp(0.0, 100.0) as u32
}

pub fn compute_median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[(n / 2) - 1] + sorted[n / 2]) / 2.0
    }
}

/// Competition rank of `value` within `pool`: 1 + count strictly greater.
pub fn competition_rank<I>(pool: I, value: f64) -> usize
where
    I: IntoIterator<Item = f64>,
{
    1 + pool.into_iter().filter(|v| *v > value).count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectTopper {
    pub seat_no: String,
    pub name: String,
    pub marks: f64,
    pub subject_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_students: usize,
    pub passed_students: usize,
    pub failed_students: usize,
    pub pass_percentage: u32,
    pub median_cgpa: f64,
    pub subject_toppers: BTreeMap<String, SubjectTopper>,
    pub grade_distribution: Vec<GradeCount>,
    pub cgpa_histogram: [usize; CGPA_BUCKETS],
    /// `None` when the input spans a single college and the breakdown is skipped.
    pub college_statistics: Option<BTreeMap<String, CollegeStats>>,
}

/// Cohort statistics over validated records. `course_metadata`, when given,
/// supplies the subject labels of the college breakdown.
pub fn compute_statistics(
    records: &[StudentRecord],
    course_metadata: Option<&CourseMetadata>,
) -> Result<Statistics, EngineError> {
    if records.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let total_students = records.len();
    let passed_students = records.iter().filter(|r| r.result.is_pass()).count();

    let cgpas = records
        .iter()
        .filter_map(|r| r.usable_cgpa())
        .collect::<Vec<_>>();

    let college_statistics = if college::distinct_college_codes(records) > 1 {
        Some(college::compute_college_statistics(records, course_metadata))
    } else {
        None
    };

    Ok(Statistics {
        total_students,
        passed_students,
        failed_students: total_students - passed_students,
        pass_percentage: whole_percent(passed_students, total_students),
        median_cgpa: round_off_2_decimals(compute_median(&cgpas)),
        subject_toppers: compute_subject_toppers(records),
        grade_distribution: compute_grade_distribution(records),
        cgpa_histogram: compute_cgpa_histogram(records),
        college_statistics,
    })
}

/// Highest attempted total per subject index. Strict `>` keeps the earliest
/// record on ties.
pub fn compute_subject_toppers(records: &[StudentRecord]) -> BTreeMap<String, SubjectTopper> {
    let width = records.iter().map(|r| r.subjects.len()).max().unwrap_or(0);
    let mut out: BTreeMap<String, SubjectTopper> = BTreeMap::new();

    for idx in 0..width {
        let Some(code) = records
            .iter()
            .find_map(|r| r.subjects.get(idx).map(|s| s.code.clone()))
        else {
            continue;
        };

        let mut best: Option<(&StudentRecord, f64)> = None;
        for rec in records {
            let Some(marks) = rec.attempt_at(idx).marks() else {
                continue;
            };
            if best.map(|(_, b)| marks > b).unwrap_or(true) {
                best = Some((rec, marks));
            }
        }

        if let Some((rec, marks)) = best {
            out.entry(code).or_insert_with(|| SubjectTopper {
                seat_no: rec.seat_no.clone(),
                name: rec.name.clone(),
                marks,
                subject_index: idx,
            });
        }
    }

    out
}

pub fn compute_grade_distribution(records: &[StudentRecord]) -> Vec<GradeCount> {
    let mut counts = [0_usize; GRADE_LADDER.len()];
    for rec in records {
        for subj in &rec.subjects {
            if let Some(i) = subj.grade.as_ref().and_then(|g| g.ladder_index()) {
                counts[i] += 1;
            }
        }
    }
    GRADE_LADDER
        .iter()
        .zip(counts)
        .map(|(grade, count)| GradeCount {
            grade: grade.to_string(),
            count,
        })
        .collect()
}

/// Buckets `[i, i+1)` for i in 0..10; a CGPA of 10 lands in bucket 9.
pub fn compute_cgpa_histogram(records: &[StudentRecord]) -> [usize; CGPA_BUCKETS] {
    let mut bins = [0_usize; CGPA_BUCKETS];
    for cgpa in records.iter().filter_map(|r| r.usable_cgpa()) {
        let idx = (cgpa.floor() as usize).min(CGPA_BUCKETS - 1);
        bins[idx] += 1;
    }
    bins
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Attempt, Grade, ResultStatus, SubjectResult};

    pub(crate) fn subject(code: &str, total: Option<f64>) -> SubjectResult {
        SubjectResult {
            code: code.to_string(),
            name: format!("Subject {code}"),
            credits: None,
            term_work: None,
            oral: None,
            external: None,
            internal: None,
            total: total.map(Attempt::Attempted).unwrap_or_default(),
            grade: None,
            grade_points: None,
            passed: None,
        }
    }

    pub(crate) fn student(seat: &str, total_marks: f64, subjects: Vec<SubjectResult>) -> StudentRecord {
        StudentRecord {
            seat_no: seat.to_string(),
            name: format!("Student {seat}"),
            gender: String::new(),
            status: "Regular".to_string(),
            ern: None,
            college: "001: Alpha Institute".to_string(),
            subjects,
            total_marks,
            max_marks: None,
            cgpa: None,
            result: ResultStatus::Pass,
        }
    }

    #[test]
    fn round_off_matches_vb6() {
        assert_eq!(round_off_1_decimal(0.0), 0.0);
        assert_eq!(round_off_1_decimal(33.3333), 33.3);
        assert_eq!(round_off_1_decimal(66.6666), 66.7);
        assert_eq!(round_off_2_decimals(66.6666), 66.67);
    }

    #[test]
    fn empty_input_is_an_error_not_zeroes() {
        assert_eq!(compute_statistics(&[], None), Err(EngineError::EmptyInput));
    }

    #[test]
    fn pass_counts_partition_the_cohort() {
        let mut recs = vec![
            student("1", 400.0, vec![]),
            student("2", 300.0, vec![]),
            student("3", 200.0, vec![]),
        ];
        recs[1].result = ResultStatus::Other("FAILS".to_string());
        recs[2].result = ResultStatus::Other("ABSENT".to_string());

        let stats = compute_statistics(&recs, None).expect("stats");
        assert_eq!(stats.total_students, 3);
        assert_eq!(stats.passed_students, 1);
        assert_eq!(stats.passed_students + stats.failed_students, stats.total_students);
        assert_eq!(stats.pass_percentage, 33);
    }

    #[test]
    fn median_cgpa_even_odd_and_empty() {
        let with_cgpa = |vals: &[Option<f64>]| {
            vals.iter()
                .enumerate()
                .map(|(i, c)| {
                    let mut s = student(&i.to_string(), 100.0, vec![]);
                    s.cgpa = *c;
                    s
                })
                .collect::<Vec<_>>()
        };
        let even = compute_statistics(&with_cgpa(&[Some(8.0), Some(7.0)]), None).expect("stats");
        assert_eq!(even.median_cgpa, 7.5);
        let odd = compute_statistics(&with_cgpa(&[Some(9.0), Some(6.0), Some(7.0), Some(0.0)]), None)
            .expect("stats");
        assert_eq!(odd.median_cgpa, 7.0);
        let none = compute_statistics(&with_cgpa(&[Some(0.0), None]), None).expect("stats");
        assert_eq!(none.median_cgpa, 0.0);
        let uneven = compute_statistics(&with_cgpa(&[Some(6.0), Some(7.333)]), None).expect("stats");
        assert_eq!(uneven.median_cgpa, 6.67);
    }

    #[test]
    fn toppers_break_ties_by_input_order_and_skip_non_attempts() {
        let recs = vec![
            student("A", 150.0, vec![subject("101", Some(75.0)), subject("102", None)]),
            student("B", 160.0, vec![subject("101", Some(80.0)), subject("102", Some(40.0))]),
            student("C", 170.0, vec![subject("101", Some(80.0)), subject("102", Some(40.0))]),
        ];
        let toppers = compute_subject_toppers(&recs);
        assert_eq!(toppers["101"].seat_no, "B");
        assert_eq!(toppers["101"].marks, 80.0);
        assert_eq!(toppers["102"].seat_no, "B");
    }

    #[test]
    fn subject_nobody_attempted_has_no_topper() {
        let recs = vec![
            student("A", 10.0, vec![subject("101", Some(10.0)), subject("102", None)]),
            student("B", 0.0, vec![subject("101", None)]),
        ];
        let toppers = compute_subject_toppers(&recs);
        assert!(toppers.contains_key("101"));
        assert!(!toppers.contains_key("102"));
    }

    #[test]
    fn grade_distribution_counts_ladder_grades_only() {
        let mut s1 = subject("101", Some(90.0));
        s1.grade = Some(Grade::O);
        let mut s2 = subject("102", Some(30.0));
        s2.grade = Some(Grade::F);
        let mut s3 = subject("103", Some(50.0));
        s3.grade = Some(Grade::Unrecognized("AB".to_string()));
        let mut s4 = subject("101", Some(88.0));
        s4.grade = Some(Grade::O);
        let recs = vec![
            student("A", 170.0, vec![s1, s2, s3]),
            student("B", 88.0, vec![s4, subject("102", None)]),
        ];
        let dist = compute_grade_distribution(&recs);
        assert_eq!(dist.len(), 8);
        assert_eq!(dist[0].grade, "O");
        assert_eq!(dist[0].count, 2);
        assert_eq!(dist[7].grade, "F");
        assert_eq!(dist[7].count, 1);
        assert_eq!(dist.iter().map(|g| g.count).sum::<usize>(), 3);
    }

    #[test]
    fn cgpa_histogram_clamps_ten_and_drops_non_positive() {
        let recs = [Some(10.0), Some(9.2), Some(0.5), Some(0.0), Some(-1.0), None]
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut s = student(&i.to_string(), 1.0, vec![]);
                s.cgpa = *c;
                s
            })
            .collect::<Vec<_>>();
        let bins = compute_cgpa_histogram(&recs);
        assert_eq!(bins[9], 2);
        assert_eq!(bins[0], 1);
        assert_eq!(bins.iter().sum::<usize>(), 3);
    }

    #[test]
    fn single_college_skips_breakdown_explicitly() {
        let recs = vec![student("A", 1.0, vec![]), student("B", 2.0, vec![])];
        let stats = compute_statistics(&recs, None).expect("stats");
        assert!(stats.college_statistics.is_none());

        let mut other = student("C", 3.0, vec![]);
        other.college = "002: Beta College".to_string();
        let mut recs = recs;
        recs.push(other);
        let stats = compute_statistics(&recs, None).expect("stats");
        assert_eq!(stats.college_statistics.map(|m| m.len()), Some(2));
    }

    #[test]
    fn competition_rank_counts_strictly_greater() {
        let pool = [500.0, 500.0, 300.0];
        assert_eq!(competition_rank(pool, 500.0), 1);
        assert_eq!(competition_rank(pool, 300.0), 3);
    }
}
