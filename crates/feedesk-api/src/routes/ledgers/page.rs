//! Ledger page rendering - Full page endpoints

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use chrono::{Local, NaiveDate};
use feedesk_core::time::display_date;
use feedesk_core::{expenses_by_date_desc, DayBook, Field};
use feedesk_utils::escape_html;
use serde::Deserialize;

use crate::{page_response, stat_card, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DayBookQuery {
    pub date: String,
}

/// Day book for `?date=YYYY-MM-DD`, today when absent or unreadable
pub async fn page_daybook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DayBookQuery>,
) -> Html<String> {
    let date = NaiveDate::parse_from_str(query.date.trim(), "%Y-%m-%d")
        .unwrap_or_else(|_| Local::now().date_naive());
    let snapshot = state.book.snapshot();
    let book = DayBook::for_date(&snapshot, date);

    let mut rows = String::new();
    for r in &book.receipts {
        rows.push_str(&format!(
            "<tr class='border-b'><td class='px-3 py-2'>{}</td><td class='px-3 py-2'>{} (Roll {})</td><td class='px-3 py-2'>{}</td><td class='px-3 py-2 text-right font-bold text-green-600'>+{}</td></tr>",
            r.time,
            escape_html(&r.name),
            escape_html(&r.roll),
            escape_html(&r.mode),
            state.money(r.amount)
        ));
    }
    for p in &book.payments {
        rows.push_str(&format!(
            "<tr class='border-b'><td class='px-3 py-2'>-</td><td class='px-3 py-2'>EXP: {} - {}</td><td class='px-3 py-2'>Cash</td><td class='px-3 py-2 text-right font-bold text-red-600'>-{}</td></tr>",
            escape_html(&p.category),
            escape_html(&p.description),
            state.money(p.amount)
        ));
    }
    if rows.is_empty() {
        rows = "<tr><td colspan='4' class='px-3 py-6 text-center text-gray-500'>No entries for this day</td></tr>".to_string();
    }

    let inner_content = format!(
        r#"<div class='flex items-center justify-between mb-6'>
            <h2 class='text-2xl font-bold'>Day Book · {}</h2>
            <form method='get' action='/daybook'>
                <input type='date' name='date' value='{}' onchange='this.form.submit()' class='px-3 py-2 border rounded-lg'>
            </form>
        </div>
        <div class='grid grid-cols-1 md:grid-cols-3 gap-4 mb-6'>{}{}{}</div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <table class='w-full text-left'>
                <thead class='text-sm text-gray-500 border-b'><tr><th class='px-3 py-2'>Time</th><th class='px-3 py-2'>Details</th><th class='px-3 py-2'>Mode</th><th class='px-3 py-2 text-right'>Amount</th></tr></thead>
                <tbody>{}</tbody>
            </table>
        </div>"#,
        display_date(date),
        date.format("%Y-%m-%d"),
        stat_card("green", "Money in", &state.money(book.total_in)),
        stat_card("red", "Money out", &state.money(book.total_out)),
        stat_card("indigo", "Net", &state.money(book.net())),
        rows
    );

    Html(page_response(&headers, "Day Book", "/daybook", &inner_content))
}

/// Expense table, newest first
pub fn render_expense_list(state: &AppState) -> String {
    let snapshot = state.book.snapshot();
    let expenses = expenses_by_date_desc(&snapshot.expenses);
    if expenses.is_empty() {
        return "<p class='text-gray-500 text-center py-6'>No expenses recorded</p>".to_string();
    }

    let rows: String = expenses
        .iter()
        .map(|e| {
            let date = e
                .timestamp()
                .map(|dt| display_date(dt.date()))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "<tr class='border-b'><td class='px-3 py-2'>{}</td><td class='px-3 py-2'>{}</td><td class='px-3 py-2'>{}</td><td class='px-3 py-2 text-right text-red-600'>{}</td></tr>",
                date,
                escape_html(&e.text(Field::Category)),
                escape_html(&e.text(Field::Description)),
                state.money(e.amount())
            )
        })
        .collect();

    format!(
        "<table class='w-full text-left'><thead class='text-sm text-gray-500 border-b'><tr><th class='px-3 py-2'>Date</th><th class='px-3 py-2'>Category</th><th class='px-3 py-2'>Description</th><th class='px-3 py-2 text-right'>Amount</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

/// Expenses page - entry form and history
pub async fn page_expenses(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let inner_content = format!(
        r#"<h2 class='text-2xl font-bold mb-6'>Expenses</h2>
        <div class='grid grid-cols-1 lg:grid-cols-3 gap-6'>
            <form hx-post='/expenses' hx-target='#expense-result' class='bg-white rounded-xl shadow-sm p-6 space-y-3'>
                <h3 class='text-lg font-semibold'>New expense</h3>
                <input type='text' name='category' list='expense-categories' placeholder='Category' required class='w-full px-3 py-2 border rounded-lg'>
                <datalist id='expense-categories'>
                    <option value='Salary'><option value='Electricity'><option value='Stationery'>
                    <option value='Maintenance'><option value='Transport'><option value='Misc'>
                </datalist>
                <input type='number' name='amount' step='any' min='0' placeholder='Amount' required class='w-full px-3 py-2 border rounded-lg'>
                <input type='text' name='description' placeholder='Description' class='w-full px-3 py-2 border rounded-lg'>
                <button type='submit' class='w-full px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Save expense</button>
                <div id='expense-result'></div>
            </form>
            <div class='lg:col-span-2 bg-white rounded-xl shadow-sm p-6'>
                <div id='expense-list'>{}</div>
            </div>
        </div>"#,
        render_expense_list(&state)
    );

    Html(page_response(&headers, "Expenses", "/expenses", &inner_content))
}

/// Staff table with an advance form per row
pub fn render_staff_table(state: &AppState) -> String {
    let snapshot = state.book.snapshot();
    if snapshot.staff.is_empty() {
        return "<p class='text-gray-500 text-center py-6'>No staff on record</p>".to_string();
    }

    let rows: String = snapshot
        .staff
        .iter()
        .map(|s| {
            format!(
                r#"<tr class='border-b'>
                    <td class='px-3 py-2 font-semibold'>{}</td>
                    <td class='px-3 py-2'>{}</td>
                    <td class='px-3 py-2 text-right'>{}</td>
                    <td class='px-3 py-2 text-right text-red-600'>{}</td>
                    <td class='px-3 py-2'>
                        <form hx-post='/staff/{}/advance' hx-target='#staff-result' class='flex gap-2 justify-end'>
                            <input type='number' name='amount' step='any' min='0' placeholder='Amount' required class='w-28 px-2 py-1 border rounded'>
                            <button type='submit' class='px-3 py-1 bg-indigo-600 text-white rounded text-sm hover:bg-indigo-700'>Give advance</button>
                        </form>
                    </td>
                </tr>"#,
                escape_html(&s.name()),
                escape_html(&s.role()),
                state.money(s.salary()),
                state.money(s.advance()),
                urlencoding::encode(&s.id)
            )
        })
        .collect();

    format!(
        "<table class='w-full text-left'><thead class='text-sm text-gray-500 border-b'><tr><th class='px-3 py-2'>Name</th><th class='px-3 py-2'>Role</th><th class='px-3 py-2 text-right'>Salary</th><th class='px-3 py-2 text-right'>Advance</th><th></th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

/// Staff page
pub async fn page_staff(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let inner_content = format!(
        r#"<h2 class='text-2xl font-bold mb-6'>Staff</h2>
        <div id='staff-result' class='mb-4'></div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <div id='staff-table'>{}</div>
        </div>"#,
        render_staff_table(&state)
    );

    Html(page_response(&headers, "Staff", "/staff", &inner_content))
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::testing::{body_text, row, state};
    use axum::body::Body;
    use axum::http::Request;
    use feedesk_gateway::{SheetChange, SheetGateway};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_daybook_for_date() {
        let (state, gateway) = state().await;
        gateway
            .submit_change(SheetChange::create(
                "Transactions",
                row(json!({"Date": "2026-03-02T09:05:00", "Roll": 1, "Name": "Asha", "Amount": 500, "Mode": "Cash"})),
            ))
            .await;
        gateway
            .submit_change(SheetChange::create(
                "Expenses",
                row(json!({"Date": "2026-03-02T11:00:00", "Category": "Electricity", "Amount": 120, "Description": "March bill"})),
            ))
            .await;
        state.book.refresh_all().await;

        let response = create_router(state)
            .oneshot(Request::get("/daybook?date=2026-03-02").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Day Book · 02/03/2026"));
        assert!(html.contains("9:05"));
        assert!(html.contains("Asha (Roll 1)"));
        assert!(html.contains("EXP: Electricity - March bill"));
        assert!(html.contains("₹380"));
    }

    #[tokio::test]
    async fn test_daybook_empty_day() {
        let (state, _) = state().await;
        let response = create_router(state)
            .oneshot(Request::get("/daybook?date=2020-01-01").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_text(response).await.contains("No entries for this day"));
    }

    #[tokio::test]
    async fn test_staff_page_lists_members() {
        let (state, _) = state().await;
        let response = create_router(state)
            .oneshot(Request::get("/staff").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Meena"));
        assert!(html.contains("₹15,000"));
        assert!(html.contains("/staff/1/advance"));
    }
}
