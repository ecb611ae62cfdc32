use crate::model::StudentRecord;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFilter {
    #[default]
    All,
    Pass,
    Fail,
}

impl ResultFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(ResultFilter::All),
            "pass" => Some(ResultFilter::Pass),
            "fail" => Some(ResultFilter::Fail),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultFilter::All => "all",
            ResultFilter::Pass => "pass",
            ResultFilter::Fail => "fail",
        }
    }

    fn matches(self, rec: &StudentRecord) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::Pass => rec.result.is_pass(),
            ResultFilter::Fail => !rec.result.is_pass(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRow<'a> {
    /// Competition rank within the whole, unfiltered list.
    pub rank: usize,
    #[serde(flatten)]
    pub record: &'a StudentRecord,
}

fn matches_text(rec: &StudentRecord, filter_text: &str, filter_lower: &str) -> bool {
    filter_text.is_empty()
        || rec.seat_no.contains(filter_text)
        || rec.name.to_lowercase().contains(filter_lower)
}

/// Listing order: `total_marks` descending, input order on ties. Ranks are
/// assigned before filtering so a row keeps its global rank.
pub fn build_view<'a>(
    records: &'a [StudentRecord],
    filter_text: &str,
    result_filter: ResultFilter,
) -> Vec<ViewRow<'a>> {
    let mut sorted = records.iter().collect::<Vec<_>>();
    // `sort_by` is stable.
    sorted.sort_by(|a, b| {
        b.total_marks
            .partial_cmp(&a.total_marks)
            .unwrap_or(Ordering::Equal)
    });

    let mut ranked: Vec<ViewRow<'a>> = Vec::with_capacity(sorted.len());
    for (i, rec) in sorted.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if prev.record.total_marks == rec.total_marks => prev.rank,
            _ => i + 1,
        };
        ranked.push(ViewRow { rank, record: rec });
    }

    let filter_lower = filter_text.to_lowercase();
    ranked
        .into_iter()
        .filter(|row| {
            matches_text(row.record, filter_text, &filter_lower) && result_filter.matches(row.record)
        })
        .collect()
}

/// Pages are 1-based. A page whose offset overflows `usize` is past the end.
pub fn paginate_values<T: Clone>(items: &[T], page: usize, page_size: usize) -> Vec<T> {
    let Some(start) = page.saturating_sub(1).checked_mul(page_size) else {
        return Vec::new();
    };
    if start >= items.len() {
        return Vec::new();
    }
    let end = std::cmp::min(start.saturating_add(page_size), items.len());
    items[start..end].to_vec()
}
