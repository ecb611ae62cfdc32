use crate::calc::{competition_rank, round_off_1_decimal, EngineError};
use crate::model::{Grade, StudentRecord};
use serde::Serialize;

/// One attempted subject of the target student, next to its peer pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectComparison {
    pub index: usize,
    pub code: String,
    pub name: String,
    pub term_work: Option<f64>,
    pub oral: Option<f64>,
    pub external: Option<f64>,
    pub internal: Option<f64>,
    pub marks: f64,
    pub grade: Option<Grade>,
    pub passed: Option<bool>,
    pub failing: bool,
    pub class_avg: f64,
    pub class_max: f64,
    pub class_min: f64,
    pub rank: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAnalysis {
    pub student: StudentRecord,
    pub rank: usize,
    pub total_students: usize,
    pub percentile: f64,
    pub failed_subjects: usize,
    pub subject_comparison: Vec<SubjectComparison>,
}

pub fn find_student<'a>(
    seat_no: &str,
    records: &'a [StudentRecord],
) -> Result<&'a StudentRecord, EngineError> {
    records
        .iter()
        .find(|r| r.seat_no == seat_no)
        .ok_or_else(|| EngineError::NotFound {
            seat_no: seat_no.to_string(),
        })
}

/// Overall rank, percentile and per-subject peer comparison for one seat.
///
/// Ranks use competition ranking (ties share a rank, the next rank skips).
/// The percentile is the share of the cohort with a strictly lower total.
pub fn analyze_student(seat_no: &str, records: &[StudentRecord]) -> Result<StudentAnalysis, EngineError> {
    let target = find_student(seat_no, records)?;
    let total_students = records.len();
    let own = target.total_marks;

    let rank = competition_rank(records.iter().map(|r| r.total_marks), own);
    let below = records.iter().filter(|r| r.total_marks < own).count();
    let percentile = round_off_1_decimal(100.0 * below as f64 / total_students as f64);

    let subject_comparison = target
        .subjects
        .iter()
        .enumerate()
        .filter_map(|(idx, subj)| {
            let marks = subj.total.marks()?;
            let pool = records
                .iter()
                .filter_map(|r| r.attempt_at(idx).marks())
                .collect::<Vec<_>>();
            // The target itself is in the pool, so it is never empty here.
            let sum: f64 = pool.iter().sum();
            let class_max = pool.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let class_min = pool.iter().copied().fold(f64::INFINITY, f64::min);
            Some(SubjectComparison {
                index: idx,
                code: subj.code.clone(),
                name: subj.name.clone(),
                term_work: subj.term_work,
                oral: subj.oral,
                external: subj.external,
                internal: subj.internal,
                marks,
                grade: subj.grade.clone(),
                passed: subj.passed,
                failing: subj.is_failing(),
                class_avg: round_off_1_decimal(sum / pool.len() as f64),
                class_max,
                class_min,
                rank: competition_rank(pool.iter().copied(), marks),
                total_students: pool.len(),
            })
        })
        .collect::<Vec<_>>();

    Ok(StudentAnalysis {
        student: target.clone(),
        rank,
        total_students,
        percentile,
        failed_subjects: target.subjects.iter().filter(|s| s.is_failing()).count(),
        subject_comparison,
    })
}
