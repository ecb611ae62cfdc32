use crate::calc::{round_off_2_decimals, whole_percent};
use crate::model::{split_college, CourseMetadata, StudentRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeSubjectStats {
    pub name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollegeStats {
    pub college_code: String,
    pub college_name: String,
    pub total_students: usize,
    pub passed_students: usize,
    pub failed_students: usize,
    pub pass_percentage: u32,
    pub subject_stats: BTreeMap<String, CollegeSubjectStats>,
}

#[derive(Debug, Default)]
struct SubjectTally {
    name: String,
    total: usize,
    passed: usize,
}

/// Number of distinct college codes (text before the first colon).
pub fn distinct_college_codes(records: &[StudentRecord]) -> usize {
    records
        .iter()
        .map(|r| r.college_code())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Per-college breakdown keyed by the exact `college` string.
///
/// Only attempted subjects count towards a college's subject pass rate; a
/// missing `passed` flag counts as passed. Subjects nobody in the college
/// attempted are left out rather than reported as 0/0.
pub fn compute_college_statistics(
    records: &[StudentRecord],
    course_metadata: Option<&CourseMetadata>,
) -> BTreeMap<String, CollegeStats> {
    let mut partitions: BTreeMap<&str, Vec<&StudentRecord>> = BTreeMap::new();
    for rec in records {
        partitions.entry(rec.college.as_str()).or_default().push(rec);
    }

    partitions
        .into_iter()
        .map(|(college, members)| {
            let stats = college_stats(college, &members, course_metadata);
            (college.to_string(), stats)
        })
        .collect()
}

fn college_stats(
    college: &str,
    members: &[&StudentRecord],
    course_metadata: Option<&CourseMetadata>,
) -> CollegeStats {
    let total_students = members.len();
    let passed_students = members.iter().filter(|r| r.result.is_pass()).count();

    let mut tallies: BTreeMap<String, SubjectTally> = BTreeMap::new();
    for rec in members {
        for subj in rec.subjects.iter().filter(|s| s.total.is_attempted()) {
            let tally = tallies.entry(subj.code.clone()).or_insert_with(|| {
                let label = course_metadata
                    .and_then(|m| m.get(&subj.code))
                    .map(|c| c.name.trim())
                    .filter(|n| !n.is_empty())
                    .unwrap_or(subj.name.as_str());
                SubjectTally {
                    name: label.to_string(),
                    ..SubjectTally::default()
                }
            });
            tally.total += 1;
            if !subj.is_failing() {
                tally.passed += 1;
            }
        }
    }

    let subject_stats = tallies
        .into_iter()
        .map(|(code, t)| {
            let pct = round_off_2_decimals(100.0 * t.passed as f64 / t.total as f64);
            (
                code,
                CollegeSubjectStats {
                    name: t.name,
                    total: t.total,
                    passed: t.passed,
                    failed: t.total - t.passed,
                    pass_percentage: pct,
                },
            )
        })
        .collect();

    let (code, name) = split_college(college);
    CollegeStats {
        college_code: code.to_string(),
        college_name: name.to_string(),
        total_students,
        passed_students,
        failed_students: total_students - passed_students,
        pass_percentage: whole_percent(passed_students, total_students),
        subject_stats,
    }
}
