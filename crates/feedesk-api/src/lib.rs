//! HTTP server with HTMX support
//!
//! Routes are organized into modules:
//! - routes::students: roster, student forms, profile, fee collection, receipt, reminders
//! - routes::ledgers: day book, expenses, staff advances
//! - routes::reports: van summary, class-wise report, pending dues
//! - routes::exports: CSV downloads
//! - routes::messages: bulk reminder jobs
//! - routes::settings: configuration display

pub mod bulk;
pub mod error;
pub mod routes;

use axum::{
    extract::State,
    http::HeaderMap,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use feedesk_config::Config;
use feedesk_core::{dashboard_kpis, pending_dues, BookOperations, BookSummary, FeeBook, RefreshStats};
use feedesk_utils::{escape_html, format_amount};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use bulk::BulkJobs;
pub use error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub book: Arc<FeeBook>,
    pub config: Config,
    pub bulk: Arc<BulkJobs>,
}

impl AppState {
    pub fn new(config: Config, book: Arc<FeeBook>) -> Self {
        Self {
            book,
            config,
            bulk: Arc::new(BulkJobs::new()),
        }
    }

    /// Amount with the configured currency symbol
    pub fn money(&self, amount: Decimal) -> String {
        format_amount(&self.config.school.currency_symbol, amount)
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::exports::{export_pending, export_students};
    use routes::ledgers::{
        htmx_expense_store, htmx_staff_advance, page_daybook, page_expenses, page_staff,
    };
    use routes::messages::{htmx_bulk_cancel, htmx_bulk_start, htmx_bulk_status};
    use routes::reports::{page_reports, page_van};
    use routes::settings::{api_settings, page_settings};
    use routes::students::{
        api_students, htmx_fee_form, htmx_fee_store, htmx_student_create_form,
        htmx_student_delete, htmx_student_edit_form, htmx_student_reminder, htmx_student_store,
        htmx_student_update, htmx_students_list, page_receipt, page_student_profile,
        page_students,
    };

    Router::new()
        // API endpoints
        .route("/api/health", get(health_check))
        .route("/api/summary", get(api_summary))
        .route("/api/students", get(api_students))
        .route("/api/settings", get(api_settings))
        .route("/api/refresh", post(api_refresh))
        // HTMX page routes
        .route("/", get(index_page))
        .route("/dashboard", get(page_dashboard))
        .route("/students", get(page_students).post(htmx_student_store))
        .route("/students/list", get(htmx_students_list))
        .route("/students/new", get(htmx_student_create_form))
        .route("/students/:id", get(page_student_profile).post(htmx_student_update))
        .route("/students/:id/edit", get(htmx_student_edit_form))
        .route("/students/:id/delete", post(htmx_student_delete))
        .route("/students/:id/fee", get(htmx_fee_form).post(htmx_fee_store))
        .route("/students/:id/receipt", get(page_receipt))
        .route("/students/:id/reminder", post(htmx_student_reminder))
        .route("/van", get(page_van))
        .route("/daybook", get(page_daybook))
        .route("/expenses", get(page_expenses).post(htmx_expense_store))
        .route("/staff", get(page_staff))
        .route("/staff/:id/advance", post(htmx_staff_advance))
        .route("/reports", get(page_reports))
        .route("/export/students.csv", get(export_students))
        .route("/export/pending.csv", get(export_pending))
        .route("/messages/bulk", post(htmx_bulk_start))
        .route("/messages/bulk/status", get(htmx_bulk_status))
        .route("/messages/bulk/cancel", post(htmx_bulk_cancel))
        .route("/settings", get(page_settings))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Get book summary (JSON API)
async fn api_summary(State(state): State<AppState>) -> Json<BookSummary> {
    Json(state.book.summary())
}

/// Re-fetch every sheet
async fn api_refresh(State(state): State<AppState>) -> Json<RefreshStats> {
    Json(state.book.refresh_all().await)
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Fee Desk</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        .htmx-indicator {{ opacity: 0; transition: opacity 0.3s; }}
        .htmx-request .htmx-indicator {{ opacity: 1; }}
        .htmx-request.htmx-indicator {{ opacity: 1; }}
    </style>
</head>
<body class="bg-gray-50 text-gray-900">
    {}
    <div id="modal-root"></div>
</body>
</html>"#,
        escape_html(title),
        content
    )
}

/// Navigation sidebar
pub fn nav_sidebar(current_path: &str) -> String {
    let links = [
        ("/", "Dashboard", "📊"),
        ("/students", "Students", "🎓"),
        ("/van", "Van", "🚐"),
        ("/daybook", "Day Book", "📒"),
        ("/expenses", "Expenses", "💸"),
        ("/staff", "Staff", "👥"),
        ("/reports", "Reports", "📈"),
        ("/settings", "Settings", "⚙️"),
    ];

    let mut nav = String::from("<div class='bg-white border-r h-screen flex flex-col'><div class='p-4 border-b'><h1 class='text-xl font-bold text-indigo-600'>Fee Desk</h1></div><ul class='flex-1 py-2 space-y-1 px-2'>");

    for (path, label, icon) in &links {
        let is_active = if *path == "/" {
            current_path == "/" || current_path == "/dashboard"
        } else {
            current_path.starts_with(path)
        };
        let active_class = if is_active {
            "bg-indigo-50 text-indigo-600"
        } else {
            "text-gray-600 hover:bg-gray-50"
        };
        nav.push_str(&format!(
            r#"<li><a href='{}' class='flex items-center gap-2 px-3 py-2 rounded-lg {}'>{}<span>{}</span></a></li>"#,
            path, active_class, icon, label
        ));
    }
    nav.push_str("</ul></div>");
    nav
}

/// Check if request is from HTMX (partial page update)
pub fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("hx-request").is_some()
}

/// Wrap content for full page or HTMX partial
pub fn page_response(headers: &HeaderMap, title: &str, current_path: &str, inner_content: &str) -> String {
    if is_htmx_request(headers) {
        format!(
            r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
            inner_content
        )
    } else {
        base_html(
            title,
            &format!(
                r#"<div class='flex flex-col h-screen'>
    <div class='flex flex-1 overflow-hidden'>
        <aside class='w-64 flex-shrink-0'>{}</aside>
        <main class='flex-1 overflow-auto bg-gray-50 p-6'>{}</main>
    </div>
</div>"#,
                nav_sidebar(current_path),
                inner_content
            ),
        )
    }
}

/// Overlay dialog; clicking the backdrop or the close button removes it
pub fn modal(title: &str, body: &str) -> String {
    format!(
        r#"<div class='modal fixed inset-0 bg-black bg-opacity-50 z-50 flex items-center justify-center' onclick='if(event.target === this) this.remove()'>
    <div class='bg-white rounded-xl shadow-2xl w-full max-w-2xl max-h-[90vh] overflow-y-auto'>
        <div class='flex items-center justify-between px-6 py-4 border-b'>
            <h2 class='text-xl font-bold'>{}</h2>
            <button onclick='this.closest(".modal").remove()' class='text-gray-500 hover:text-gray-700 p-2'>✕</button>
        </div>
        <div class='p-6'>{}</div>
    </div>
</div>"#,
        escape_html(title),
        body
    )
}

/// Green confirmation fragment
pub fn alert_success(title: &str, message: &str) -> String {
    format!(
        r#"<div class='bg-green-50 border border-green-200 rounded-lg p-4'><div class='flex items-center gap-2'><span class='text-green-600'>✓</span><span class='font-medium text-green-800'>{}</span></div><p class='text-sm text-green-600 mt-1'>{}</p></div>"#,
        escape_html(title),
        escape_html(message)
    )
}

/// Red failure fragment
pub fn alert_error(title: &str, message: &str) -> String {
    format!(
        r#"<div class='bg-red-50 border border-red-200 rounded-lg p-4'><div class='flex items-center gap-2'><span class='text-red-600'>✗</span><span class='font-medium text-red-800'>{}</span></div><p class='text-sm text-red-600 mt-1 whitespace-pre-line'>{}</p></div>"#,
        escape_html(title),
        escape_html(message)
    )
}

/// KPI card
pub fn stat_card(color: &str, label: &str, value: &str) -> String {
    format!(
        "<div class='bg-{c}-50 p-4 rounded-lg border border-{c}-200'><p class='text-sm text-{c}-600'>{}</p><p class='text-2xl font-bold text-{c}-700'>{}</p></div>",
        escape_html(label),
        escape_html(value),
        c = color
    )
}

/// Balance cell colour: red while money is owed
pub fn balance_class(balance: Decimal) -> &'static str {
    if balance > Decimal::ZERO {
        "text-red-600"
    } else {
        "text-green-600"
    }
}

/// Index page with dashboard
async fn index_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let snapshot = state.book.snapshot();
    let kpis = dashboard_kpis(&snapshot, Local::now().date_naive());

    let top_dues: Vec<String> = pending_dues(&snapshot.students)
        .into_iter()
        .take(5)
        .map(|s| {
            format!(
                "<div class='flex justify-between py-2 border-b'><a href='/students/{}' class='hover:text-indigo-600'>{} <span class='text-gray-400 text-sm'>({})</span></a><span class='font-medium text-red-600'>{}</span></div>",
                urlencoding::encode(&s.id),
                escape_html(&s.name()),
                escape_html(&s.class()),
                state.money(s.balance())
            )
        })
        .collect();

    let issues = if snapshot.issues.is_empty() {
        String::new()
    } else {
        let items: Vec<String> = snapshot
            .issues
            .iter()
            .map(|issue| {
                format!(
                    "<li>{} (row {}): {} is <code>{}</code>, counted as 0</li>",
                    escape_html(&issue.label),
                    escape_html(&issue.record_id),
                    issue.field,
                    escape_html(&issue.raw)
                )
            })
            .collect();
        format!(
            "<div class='bg-yellow-50 border border-yellow-200 rounded-lg p-4 mb-6'><p class='font-medium text-yellow-800 mb-2'>Data issues in the sheet</p><ul class='text-sm text-yellow-700 list-disc pl-5'>{}</ul></div>",
            items.join("")
        )
    };

    let refreshed = snapshot
        .refreshed_at
        .map(|t| t.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    let inner_content = format!(
        r#"<div class='flex items-center justify-between mb-6'>
            <h2 class='text-2xl font-bold'>{}</h2>
            <div class='flex items-center gap-3'>
                <span class='text-sm text-gray-500'>Last refresh: {}</span>
                <button hx-post='/api/refresh' hx-swap='none' hx-on::after-request='window.location.reload()'
                    class='px-4 py-2 bg-gray-100 text-gray-700 rounded-lg hover:bg-gray-200'>Refresh</button>
            </div>
        </div>
        {}
        <div class='grid grid-cols-1 md:grid-cols-2 lg:grid-cols-4 gap-4 mb-6'>
            {}{}{}{}
        </div>
        <div class='grid grid-cols-1 lg:grid-cols-2 gap-6'>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Largest dues</h3>
                <div class='space-y-1'>{}</div>
            </div>
            <div class='bg-white rounded-xl shadow-sm p-6'>
                <h3 class='text-lg font-semibold mb-4'>Overview</h3>
                <div class='grid grid-cols-2 gap-4'>
                    <div class='text-center p-4 bg-gray-50 rounded-lg'><p class='text-sm text-gray-600'>Total billed</p><p class='text-xl font-bold'>{}</p></div>
                    <div class='text-center p-4 bg-gray-50 rounded-lg'><p class='text-sm text-gray-600'>Fully paid</p><p class='text-xl font-bold text-green-600'>{}</p></div>
                    <div class='text-center p-4 bg-gray-50 rounded-lg'><p class='text-sm text-gray-600'>With dues</p><p class='text-xl font-bold text-red-600'>{}</p></div>
                    <div class='text-center p-4 bg-gray-50 rounded-lg'><p class='text-sm text-gray-600'>Receipts issued</p><p class='text-xl font-bold text-indigo-600'>{}</p></div>
                </div>
            </div>
        </div>"#,
        escape_html(&state.config.school.name),
        refreshed,
        issues,
        stat_card("indigo", "Students", &kpis.student_count.to_string()),
        stat_card("green", "Collected", &state.money(kpis.collected)),
        stat_card("red", "Pending", &state.money(kpis.pending)),
        stat_card("blue", "Collected today", &state.money(kpis.collected_today)),
        if top_dues.is_empty() {
            "<p class='text-gray-500'>No pending dues</p>".to_string()
        } else {
            top_dues.join("")
        },
        state.money(kpis.total_billed),
        kpis.paid_count,
        kpis.pending_count,
        snapshot.receipt_counter
    );

    Html(page_response(&headers, "Dashboard", "/", &inner_content))
}

/// Dashboard page (alias for index)
async fn page_dashboard(state: State<AppState>, headers: HeaderMap) -> Html<String> {
    index_page(state, headers).await
}

/// Start the HTTP server
///
/// Binds to the configured address and serves until the process stops.
pub async fn start_server(config: Config, book: Arc<FeeBook>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, book);
    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting feedesk server on http://{}", addr);
    log::info!("Available routes:");
    log::info!("  - / (Dashboard)");
    log::info!("  - /students (Roster, fees, reminders)");
    log::info!("  - /daybook, /expenses, /staff (Ledgers)");
    log::info!("  - /reports, /van (Reports)");
    log::info!("  - /api/* (JSON API endpoints)");

    axum::serve(listener, router).await
}


#[cfg(test)]
mod tests {
    use super::testing::{body_text, state};
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state().await;
        let response = create_router(state)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_summary_json() {
        let (state, _) = state().await;
        let response = create_router(state)
            .oneshot(Request::get("/api/summary").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let summary: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(summary["total_students"], 2);
        assert_eq!(summary["total_staff"], 1);
    }

    #[tokio::test]
    async fn test_dashboard_full_page_and_partial() {
        let (state, _) = state().await;
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("K D Memorial School"));
        assert!(html.contains("₹1,000"));

        let response = router
            .oneshot(
                Request::get("/")
                    .header("hx-request", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(!html.contains("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_refresh_endpoint() {
        let (state, _) = state().await;
        let response = create_router(state)
            .oneshot(Request::post("/api/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let stats: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(stats["students"], 2);
    }

    #[test]
    fn test_alerts_escape_messages() {
        let html = alert_error("Failed", "<script>x</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(alert_success("Saved", "ok").contains("bg-green-50"));
    }
}
