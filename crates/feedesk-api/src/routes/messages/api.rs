//! Bulk reminder endpoints - HTMX partial responses
//!
//! A bulk send covers the ticked roster rows, or the filtered roster when
//! nothing is ticked. The panel polls its own status every second. Each poll opens the links
//! dispatched since the previous one and carries the new cursor forward.

use axum::extract::{Query, State};
use axum::response::Html;
use axum::Form;
use feedesk_core::{
    plan_bulk, student_rows, BookSnapshot, MessageTemplate, Student, StudentFilter,
};
use feedesk_utils::escape_html;
use serde::Deserialize;
use std::time::Duration;

use crate::bulk::BulkStatus;
use crate::routes::StudentQuery;
use crate::{alert_error, alert_success, AppState};

fn skipped_list(status: &BulkStatus) -> String {
    if status.skipped.is_empty() {
        return String::new();
    }
    let items: String = status
        .skipped
        .iter()
        .map(|s| {
            format!(
                "<li>{}: {}</li>",
                escape_html(&s.name),
                escape_html(&s.reason.replace('\n', " "))
            )
        })
        .collect();
    format!(
        "<details class='mt-2 text-sm text-yellow-700'><summary>{} skipped</summary><ul class='list-disc pl-5'>{}</ul></details>",
        status.skipped.len(),
        items
    )
}

fn render_panel(status: &BulkStatus, cursor: usize) -> String {
    let opens: String = status
        .new_links
        .iter()
        .filter_map(|link| serde_json::to_string(&link.url).ok())
        .map(|url| format!("window.open({}, '_blank');", url))
        .collect();
    let script = if opens.is_empty() {
        String::new()
    } else {
        format!("<script>{}</script>", opens)
    };

    match status.finished {
        Some(report) => {
            let summary = if report.cancelled {
                alert_error(
                    "Bulk reminder cancelled",
                    &format!(
                        "Sent {} of {}; {} not sent",
                        report.dispatched, report.total, report.remaining
                    ),
                )
            } else {
                alert_success(
                    "Bulk reminder finished",
                    &format!("Sent {} of {}", report.dispatched, report.total),
                )
            };
            format!(
                "<div id='bulk-progress'>{}{}{}</div>",
                summary,
                skipped_list(status),
                script
            )
        }
        None => format!(
            r#"<div id='bulk-progress' hx-get='/messages/bulk/status?job={}&since={}' hx-trigger='every 1s' hx-swap='outerHTML'
                class='bg-green-50 border border-green-200 rounded-lg p-4'>
                <div class='flex items-center justify-between'>
                    <span class='font-medium text-green-800'>Sending reminders: {} / {}</span>
                    <button hx-post='/messages/bulk/cancel' hx-swap='none' class='px-3 py-1 bg-red-600 text-white rounded text-sm hover:bg-red-700'>Cancel</button>
                </div>
                <p class='text-xs text-green-700 mt-1'>Allow pop-ups for this page; each reminder opens in a new window.</p>
                {}{}
            </div>"#,
            status.job_id,
            cursor,
            status.dispatched,
            status.total,
            skipped_list(status),
            script
        ),
    }
}

/// Bulk form: the roster filters plus the ticked `sel` rows
#[derive(Debug, Default)]
pub struct BulkRequest {
    pub query: StudentQuery,
    pub selected: Vec<String>,
}

impl BulkRequest {
    /// Build from raw form pairs, keeping every repeated `sel` value
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut request = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "sel" if !value.is_empty() => {
                    if !request.selected.contains(&value) {
                        request.selected.push(value);
                    }
                }
                "q" => request.query.q = value,
                "class" => request.query.class = value,
                "status" => request.query.status = value,
                "sort" => request.query.sort = value,
                "dir" => request.query.dir = value,
                _ => {}
            }
        }
        request
    }

    /// Ticked students in roster order, or the filtered roster when none are ticked
    pub fn students<'a>(&self, snapshot: &'a BookSnapshot) -> Vec<&'a Student> {
        if self.selected.is_empty() {
            return student_rows(snapshot, &self.query.filter(), self.query.sort());
        }
        student_rows(snapshot, &StudentFilter::default(), self.query.sort())
            .into_iter()
            .filter(|s| self.selected.contains(&s.id))
            .collect()
    }
}

/// HTMX: Start a bulk reminder for the ticked students or the filtered roster
pub async fn htmx_bulk_start(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Html<String> {
    let request = BulkRequest::from_pairs(pairs);
    let snapshot = state.book.snapshot();
    let students = request.students(&snapshot);
    let template = MessageTemplate::from_config(&state.config);
    let plan = plan_bulk(&students, &template, &state.config.messaging.country_code);

    if plan.links.is_empty() {
        let reason = if students.is_empty() && !request.selected.is_empty() {
            "The ticked students are no longer on the roster".to_string()
        } else if students.is_empty() {
            "No students match the current filters".to_string()
        } else {
            format!("None of the {} students has a valid phone number", students.len())
        };
        return Html(alert_error("Nothing to send", &reason));
    }

    let delay = Duration::from_millis(state.config.messaging.bulk_delay_ms);
    let job = state.bulk.start(plan, delay).await;
    match state.bulk.status(job, 0).await {
        Some(status) => Html(render_panel(&status, status.new_links.len())),
        None => Html(alert_error("Failed", "Bulk job did not start")),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusQuery {
    pub job: u64,
    pub since: usize,
}

/// HTMX: Poll a bulk job
pub async fn htmx_bulk_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Html<String> {
    match state.bulk.status(query.job, query.since).await {
        Some(status) => {
            let cursor = query.since + status.new_links.len();
            Html(render_panel(&status, cursor))
        }
        None => Html(format!(
            "<div id='bulk-progress'>{}</div>",
            alert_error("Bulk reminder stopped", "A newer bulk reminder replaced this one")
        )),
    }
}

/// HTMX: Cancel the running bulk job
pub async fn htmx_bulk_cancel(State(state): State<AppState>) -> Html<String> {
    if state.bulk.cancel().await {
        Html(alert_success("Cancelling", "No further reminders will open"))
    } else {
        Html(alert_error("Nothing to cancel", "No bulk reminder is running"))
    }
}
