use super::{current_session, required_str};
use crate::college;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::ranking;
use crate::view::{self, ResultFilter};
use serde_json::json;

#[derive(Debug, Clone)]
struct ViewQuery {
    filter_text: String,
    result_filter: ResultFilter,
    page: usize,
    page_size: usize,
}

fn parse_page(v: Option<&serde_json::Value>) -> Result<usize, String> {
    let Some(value) = v.filter(|v| !v.is_null()) else {
        return Ok(1);
    };
    let Some(page) = value.as_u64() else {
        return Err("params.page must be a positive integer".to_string());
    };
    if page == 0 {
        return Err("params.page must be >= 1".to_string());
    }
    usize::try_from(page).map_err(|_| "params.page is out of range".to_string())
}

fn parse_page_size(
    v: Option<&serde_json::Value>,
    default: usize,
    max: usize,
) -> Result<usize, String> {
    let Some(value) = v.filter(|v| !v.is_null()) else {
        return Ok(default);
    };
    let Some(size) = value.as_u64() else {
        return Err("params.pageSize must be a positive integer".to_string());
    };
    if size == 0 || size as usize > max {
        return Err(format!("params.pageSize must be in range 1..={}", max));
    }
    Ok(size as usize)
}

fn parse_view_query(state: &AppState, req: &Request) -> Result<ViewQuery, serde_json::Value> {
    let filter_text = match req.params.get("filterText") {
        None => String::new(),
        Some(v) if v.is_null() => String::new(),
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    "params.filterText must be string or null",
                    None,
                ))
            }
        },
    };

    let raw_filter = req
        .params
        .get("resultFilter")
        .and_then(|v| v.as_str())
        .unwrap_or("all");
    let Some(result_filter) = ResultFilter::parse(raw_filter) else {
        return Err(err(
            &req.id,
            "bad_params",
            "resultFilter must be one of: all, pass, fail",
            Some(json!({ "resultFilter": raw_filter })),
        ));
    };

    let page = parse_page(req.params.get("page")).map_err(|m| err(&req.id, "bad_params", m, None))?;
    let page_size = parse_page_size(
        req.params.get("pageSize"),
        state.config.default_page_size,
        state.config.max_page_size,
    )
    .map_err(|m| err(&req.id, "bad_params", m, None))?;

    Ok(ViewQuery {
        filter_text,
        result_filter,
        page,
        page_size,
    })
}

fn handle_analytics_statistics(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match current_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!({
            "sessionKey": session.key,
            "statistics": session.statistics,
            "courseMetadata": session.course_metadata,
            "examInfo": session.exam_info
        }),
    )
}

fn handle_analytics_colleges(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match current_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let force = req
        .params
        .get("force")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let college_count = session.college_count();

    // Single-college result sets carry no breakdown unless explicitly forced.
    let breakdown = if force {
        Some(college::compute_college_statistics(
            &session.records,
            Some(&session.course_metadata),
        ))
    } else {
        session.statistics.college_statistics.clone()
    };

    ok(
        &req.id,
        json!({
            "sessionKey": session.key,
            "collegeCount": college_count,
            "breakdownSkipped": breakdown.is_none(),
            "collegeStatistics": breakdown
        }),
    )
}

fn handle_analytics_toppers(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match current_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let toppers = session
        .statistics
        .subject_toppers
        .iter()
        .map(|(code, t)| {
            let subject_name = session
                .course_metadata
                .get(code)
                .map(|c| c.name.clone())
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| code.clone());
            json!({
                "code": code,
                "subjectName": subject_name,
                "subjectIndex": t.subject_index,
                "seatNo": t.seat_no,
                "name": t.name,
                "marks": t.marks
            })
        })
        .collect::<Vec<_>>();
    ok(&req.id, json!({ "toppers": toppers }))
}

fn handle_analytics_student_analyze(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match current_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let seat_no = match required_str(req, "seatNo") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ranking::analyze_student(&seat_no, &session.records) {
        Ok(analysis) => ok(&req.id, json!(analysis)),
        Err(e) => engine_err(&req.id, &e),
    }
}

fn handle_analytics_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match current_session(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = match parse_view_query(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let rows = view::build_view(&session.records, &query.filter_text, query.result_filter);
    let page_rows = view::paginate_values(&rows, query.page, query.page_size);
    ok(
        &req.id,
        json!({
            "filterText": query.filter_text,
            "resultFilter": query.result_filter.as_str(),
            "totalRows": rows.len(),
            "page": query.page,
            "pageSize": query.page_size,
            "rows": page_rows
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.statistics" => Some(handle_analytics_statistics(state, req)),
        "analytics.colleges" => Some(handle_analytics_colleges(state, req)),
        "analytics.toppers" => Some(handle_analytics_toppers(state, req)),
        "analytics.student.analyze" => Some(handle_analytics_student_analyze(state, req)),
        "analytics.view" => Some(handle_analytics_view(state, req)),
        _ => None,
    }
}
