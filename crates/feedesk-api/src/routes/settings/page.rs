//! Settings page rendering - Full page endpoints

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use feedesk_utils::escape_html;

use super::api::masked_endpoint;
use crate::{page_response, AppState};

fn item(label: &str, value: &str) -> String {
    format!(
        "<div><p class='text-sm text-gray-500'>{}</p><p class='font-medium'>{}</p></div>",
        label,
        escape_html(value)
    )
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "Enabled"
    } else {
        "Disabled"
    }
}

pub async fn page_settings(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let config = &state.config;
    let sheets = &config.gateway.sheets;
    let endpoint = if config.gateway.endpoint.is_empty() {
        "(in-memory demo data)".to_string()
    } else {
        masked_endpoint(&config.gateway.endpoint)
    };

    let inner_content = format!(
        r#"<div class='mb-6'><h2 class='text-2xl font-bold'>Settings</h2><p class='text-sm text-gray-500'>Edit the configuration file and restart to change these.</p></div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>School</h3>
            <div class='grid grid-cols-2 gap-4'>{}{}{}</div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Spreadsheet API</h3>
            <div class='grid grid-cols-2 gap-4'>{}{}{}{}{}{}</div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Reminders</h3>
            <div class='grid grid-cols-2 gap-4'>{}{}{}{}</div>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <h3 class='text-lg font-semibold mb-4'>Server</h3>
            <div class='grid grid-cols-2 gap-4'>{}{}{}{}</div>
        </div>"#,
        item("Name", &config.school.name),
        item("Address", &config.school.address),
        item("Currency", &config.school.currency_symbol),
        item("Endpoint", &endpoint),
        item("Timeout", &format!("{} s", config.gateway.timeout_secs)),
        item("Students sheet", &sheets.students),
        item("Transactions sheet", &sheets.transactions),
        item("Expenses sheet", &sheets.expenses),
        item("Staff sheet", &sheets.staff),
        item("Country code", &format!("+{}", config.messaging.country_code)),
        item("Bulk delay", &format!("{} ms", config.messaging.bulk_delay_ms)),
        item(
            "Template",
            config
                .messaging
                .reminder_template
                .as_deref()
                .unwrap_or("Standard reminder"),
        ),
        item("Record reminder date", on_off(config.messaging.record_reminders)),
        item("Host", &config.server.host),
        item("Port", &config.server.port.to_string()),
        item("Seed default staff", on_off(config.features.seed_default_staff)),
        item("Log level", &config.logging.level),
    );

    Html(page_response(&headers, "Settings", "/settings", &inner_content))
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::testing::{body_text, state};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_settings_page_and_json() {
        let (state, _) = state().await;
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(Request::get("/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("K D Memorial School"));
        assert!(html.contains("+91"));
        assert!(html.contains("(in-memory demo data)"));

        let response = router
            .oneshot(Request::get("/api/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["gateway"]["sheets"]["students"], "Sheet1");
    }
}
