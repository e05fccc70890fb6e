//! Reports page rendering - Full page endpoints

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use feedesk_core::{class_report, pending_dues, van_summary, Field};
use feedesk_utils::escape_html;

use crate::{balance_class, page_response, stat_card, AppState};

/// Van riders with route, pickup and dues
pub async fn page_van(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let snapshot = state.book.snapshot();
    let van = van_summary(&snapshot.students);

    let rows = if van.students.is_empty() {
        "<tr><td colspan='6' class='px-3 py-6 text-center text-gray-500'>No students use the van</td></tr>".to_string()
    } else {
        van.students
            .iter()
            .map(|s| {
                format!(
                    "<tr class='border-b'><td class='px-3 py-2'>{}</td><td class='px-3 py-2 font-medium'>{}</td><td class='px-3 py-2'>{}</td><td class='px-3 py-2'>{}</td><td class='px-3 py-2 text-right'>{}</td><td class='px-3 py-2 text-right {}'>{}</td></tr>",
                    escape_html(&s.class()),
                    escape_html(&s.name()),
                    escape_html(&s.text(Field::Route)),
                    escape_html(&s.text(Field::Pickup)),
                    state.money(s.van_fee()),
                    balance_class(s.balance()),
                    state.money(s.balance())
                )
            })
            .collect()
    };

    let inner_content = format!(
        r#"<h2 class='text-2xl font-bold mb-6'>Van</h2>
        <div class='grid grid-cols-1 md:grid-cols-3 gap-4 mb-6'>{}{}{}</div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <table class='w-full text-left'>
                <thead class='text-sm text-gray-500 border-b'><tr><th class='px-3 py-2'>Class</th><th class='px-3 py-2'>Name</th><th class='px-3 py-2'>Route</th><th class='px-3 py-2'>Pickup</th><th class='px-3 py-2 text-right'>Van fee</th><th class='px-3 py-2 text-right'>Balance</th></tr></thead>
                <tbody>{}</tbody>
            </table>
        </div>"#,
        stat_card("indigo", "Van students", &van.count().to_string()),
        stat_card("green", "Van revenue", &state.money(van.revenue)),
        stat_card("red", "Pending from riders", &state.money(van.pending)),
        rows
    );

    Html(page_response(&headers, "Van", "/van", &inner_content))
}

/// Class-wise totals and the pending dues list
pub async fn page_reports(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let snapshot = state.book.snapshot();

    let class_rows: String = class_report(&snapshot.students)
        .iter()
        .map(|r| {
            format!(
                "<tr class='border-b'><td class='px-3 py-2 font-medium'>{}</td><td class='px-3 py-2 text-right'>{}</td><td class='px-3 py-2 text-right'>{}</td><td class='px-3 py-2 text-right text-green-600'>{}</td><td class='px-3 py-2 text-right {}'>{}</td></tr>",
                escape_html(&r.class),
                r.count,
                state.money(r.total),
                state.money(r.received),
                balance_class(r.balance),
                state.money(r.balance)
            )
        })
        .collect();

    let dues = pending_dues(&snapshot.students);
    let dues_rows: String = if dues.is_empty() {
        "<tr><td colspan='4' class='px-3 py-6 text-center text-gray-500'>No pending dues</td></tr>".to_string()
    } else {
        dues.iter()
            .map(|s| {
                format!(
                    "<tr class='border-b'><td class='px-3 py-2'>{}</td><td class='px-3 py-2'><a href='/students/{}' class='hover:text-indigo-600'>{}</a></td><td class='px-3 py-2'>{}</td><td class='px-3 py-2 text-right text-red-600 font-medium'>{}</td></tr>",
                    escape_html(&s.roll()),
                    urlencoding::encode(&s.id),
                    escape_html(&s.name()),
                    escape_html(&s.class()),
                    state.money(s.balance())
                )
            })
            .collect()
    };

    let inner_content = format!(
        r#"<div class='flex items-center justify-between mb-6'>
            <h2 class='text-2xl font-bold'>Reports</h2>
            <a href='/export/pending.csv' class='px-4 py-2 bg-gray-100 text-gray-700 rounded-lg hover:bg-gray-200'>Download pending CSV</a>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6 mb-6'>
            <h3 class='text-lg font-semibold mb-4'>Class-wise collection</h3>
            <table class='w-full text-left'>
                <thead class='text-sm text-gray-500 border-b'><tr><th class='px-3 py-2'>Class</th><th class='px-3 py-2 text-right'>Students</th><th class='px-3 py-2 text-right'>Total</th><th class='px-3 py-2 text-right'>Received</th><th class='px-3 py-2 text-right'>Balance</th></tr></thead>
                <tbody>{}</tbody>
            </table>
        </div>
        <div class='bg-white rounded-xl shadow-sm p-6'>
            <h3 class='text-lg font-semibold mb-4'>Pending dues ({})</h3>
            <table class='w-full text-left'>
                <thead class='text-sm text-gray-500 border-b'><tr><th class='px-3 py-2'>Roll</th><th class='px-3 py-2'>Name</th><th class='px-3 py-2'>Class</th><th class='px-3 py-2 text-right'>Balance</th></tr></thead>
                <tbody>{}</tbody>
            </table>
        </div>"#,
        class_rows,
        dues.len(),
        dues_rows
    );

    Html(page_response(&headers, "Reports", "/reports", &inner_content))
}
