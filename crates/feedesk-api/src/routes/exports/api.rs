//! CSV downloads served as attachments

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Local;
use feedesk_core::export::{pending_csv, pending_file_name, roster_csv, roster_file_name};
use feedesk_core::student_rows;

use crate::routes::StudentQuery;
use crate::{ApiError, AppState};

fn attachment(file_name: String, body: String) -> Response {
    log::info!("Exporting {}", file_name);
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

/// Roster CSV; honours the same filter and sort parameters as the list
pub async fn export_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Result<Response, ApiError> {
    let snapshot = state.book.snapshot();
    let rows = student_rows(&snapshot, &query.filter(), query.sort());
    let csv = roster_csv(&rows)?;
    Ok(attachment(roster_file_name(Local::now().date_naive()), csv))
}

/// Pending dues CSV, largest balance first
pub async fn export_pending(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.book.snapshot();
    let csv = pending_csv(&snapshot.students)?;
    Ok(attachment(pending_file_name(Local::now().date_naive()), csv))
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::testing::{body_text, state};
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_roster_download() {
        let (state, _) = state().await;
        let response = create_router(state)
            .oneshot(Request::get("/export/students.csv").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"students_export_"));

        let csv = body_text(response).await;
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Roll,Name,Class,Father,Phone,Total,Received,Balance")
        );
        assert!(csv.contains("\"Ravi, Jr\""));
    }

    #[tokio::test]
    async fn test_pending_download() {
        let (state, _) = state().await;
        let response = create_router(state)
            .oneshot(Request::get("/export/pending.csv").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let csv = body_text(response).await;
        assert_eq!(csv, "Roll,Name,Class,Phone,Balance\n1,Asha,6A,9876543210,1000\n");
    }
}
