//! Student page rendering - full page endpoints

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Html;
use chrono::Local;
use feedesk_core::time::display_date;
use feedesk_core::workflows::receipt_no_of;
use feedesk_core::{class_chips, student_profile, Field};
use feedesk_utils::escape_html;

use crate::{balance_class, modal, page_response, ApiError, AppState};

/// Roster page - filters, class chips and the list container
pub async fn page_students(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let snapshot = state.book.snapshot();

    let mut chips = String::from(
        "<button type='button' data-class='' onclick='pickClass(this)' class='chip px-3 py-1 rounded-full border bg-indigo-600 text-white'>All</button>",
    );
    for class in class_chips(&snapshot.students) {
        chips.push_str(&format!(
            "<button type='button' data-class='{0}' onclick='pickClass(this)' class='chip px-3 py-1 rounded-full border hover:bg-gray-100'>{0}</button>",
            escape_html(&class)
        ));
    }

    let inner_content = format!(
        r#"<div class='flex items-center justify-between mb-4'>
            <h2 class='text-2xl font-bold'>Students</h2>
            <div class='flex gap-2'>
                <a href='/export/students.csv' class='px-4 py-2 bg-gray-100 text-gray-700 rounded-lg hover:bg-gray-200'>Export CSV</a>
                <a href='/export/pending.csv' class='px-4 py-2 bg-gray-100 text-gray-700 rounded-lg hover:bg-gray-200'>Pending CSV</a>
                <button hx-post='/messages/bulk' hx-include='#student-filters, .row-select' hx-target='#bulk-panel'
                    hx-confirm='Send WhatsApp reminders to the ticked students, or to the whole list when none are ticked?'
                    class='px-4 py-2 bg-green-600 text-white rounded-lg hover:bg-green-700'>Bulk reminder</button>
                <button hx-get='/students/new' hx-target='#modal-root'
                    class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Add student</button>
            </div>
        </div>
        <form id='student-filters' hx-get='/students/list' hx-target='#students-content'
            hx-trigger='input changed delay:300ms, change' class='flex flex-wrap items-center gap-2 mb-3'>
            <input type='text' name='q' placeholder='Search name, roll, class or phone...' class='px-4 py-2 border rounded-lg w-72'>
            <select name='status' class='px-4 py-2 border rounded-lg'>
                <option value='all'>All</option>
                <option value='paid'>Paid</option>
                <option value='pending'>Pending</option>
            </select>
            <input type='hidden' name='class' id='class-input' value=''>
            <span id='sort-state'><input type='hidden' name='sort' value=''><input type='hidden' name='dir' value=''></span>
        </form>
        <div class='flex flex-wrap gap-2 mb-4'>{}</div>
        <div id='bulk-panel' class='mb-4'></div>
        <div id='roster-notice' class='mb-4'></div>
        <div id='students-content' hx-get='/students/list' hx-include='#student-filters' hx-trigger='load, students-changed from:body' class='bg-white rounded-xl shadow-sm p-6'>
            <p class='text-gray-500 text-center'>Loading...</p>
        </div>
        <script>
        function pickClass(chip) {{
            document.querySelectorAll('.chip').forEach(c => c.classList.remove('bg-indigo-600', 'text-white'));
            chip.classList.add('bg-indigo-600', 'text-white');
            document.getElementById('class-input').value = chip.dataset.class;
            htmx.trigger('#student-filters', 'change');
        }}
        </script>"#,
        chips
    );

    Html(page_response(&headers, "Students", "/students", &inner_content))
}

/// Render the profile card of one student
pub fn render_profile(state: &AppState, id: &str) -> Option<String> {
    let snapshot = state.book.snapshot();
    let profile = student_profile(&snapshot, id, 5)?;
    let student = profile.student;
    let fees = &profile.fees;
    let id = urlencoding::encode(&student.id);

    let recent = if profile.recent.is_empty() {
        "<p class='text-gray-500 text-sm'>No payments recorded</p>".to_string()
    } else {
        profile
            .recent
            .iter()
            .map(|t| {
                let when = t
                    .timestamp()
                    .map(|dt| display_date(dt.date()))
                    .unwrap_or_else(|| "-".to_string());
                format!(
                    "<div class='flex justify-between py-1 border-b text-sm'><span>{} <span class='text-gray-400'>{}</span></span><span class='font-medium text-green-600'>+{}</span></div>",
                    when,
                    escape_html(&t.text(Field::Mode)),
                    state.money(t.amount())
                )
            })
            .collect::<Vec<_>>()
            .join("")
    };

    let or_dash = |value: String| if value.is_empty() { "-".to_string() } else { value };

    Some(format!(
        r#"<div class='flex items-center gap-4 mb-6'>
            <div class='w-14 h-14 rounded-full bg-indigo-100 text-indigo-700 flex items-center justify-center text-2xl font-bold'>{}</div>
            <div>
                <p class='text-xl font-bold'>{}</p>
                <p class='text-gray-500'>Class {} · Roll {}</p>
            </div>
        </div>
        <div class='grid grid-cols-2 gap-4 mb-6 text-sm'>
            <div><p class='text-gray-500'>Father</p><p class='font-medium'>{}</p></div>
            <div><p class='text-gray-500'>Phone</p><p class='font-medium'>{}</p></div>
            <div><p class='text-gray-500'>Van route</p><p class='font-medium'>{}</p></div>
            <div><p class='text-gray-500'>Last reminder</p><p class='font-medium'>{}</p></div>
        </div>
        <div class='grid grid-cols-3 gap-3 mb-6'>
            <div class='bg-gray-50 p-3 rounded-lg text-center'><p class='text-xs text-gray-500'>Total</p><p class='text-lg font-bold'>{}</p></div>
            <div class='bg-gray-50 p-3 rounded-lg text-center'><p class='text-xs text-gray-500'>Paid</p><p class='text-lg font-bold text-green-600'>{}</p></div>
            <div class='bg-gray-50 p-3 rounded-lg text-center'><p class='text-xs text-gray-500'>Balance</p><p class='text-lg font-bold {}'>{}</p></div>
        </div>
        <div class='text-sm mb-6'>
            <div class='flex justify-between py-1'><span>Tuition</span><span>{}</span></div>
            <div class='flex justify-between py-1'><span>Van</span><span>{}</span></div>
            <div class='flex justify-between py-1'><span>Other</span><span>{}</span></div>
            <div class='flex justify-between py-1'><span>Previous balance</span><span>{}</span></div>
        </div>
        <h3 class='font-semibold mb-2'>Recent payments</h3>
        <div class='mb-6'>{}</div>
        <div class='flex flex-wrap gap-2'>
            <button hx-get='/students/{id}/fee' hx-target='#profile-action' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Collect fee</button>
            <button hx-post='/students/{id}/reminder' hx-target='#profile-action' class='px-4 py-2 bg-green-600 text-white rounded-lg hover:bg-green-700'>WhatsApp reminder</button>
            <a href='/students/{id}/receipt' target='_blank' class='px-4 py-2 bg-gray-100 rounded-lg hover:bg-gray-200'>Print receipt</a>
            <button hx-get='/students/{id}/edit' hx-target='#modal-root' class='px-4 py-2 border rounded-lg hover:bg-gray-50'>Edit</button>
        </div>
        <div id='profile-action' class='mt-4'></div>"#,
        profile.initial(),
        escape_html(&student.name()),
        escape_html(&student.class()),
        escape_html(&student.roll()),
        escape_html(&or_dash(student.text(Field::Father))),
        escape_html(&or_dash(student.phone())),
        escape_html(&or_dash(student.text(Field::Route))),
        escape_html(&profile.last_reminder),
        state.money(student.total()),
        state.money(student.received()),
        balance_class(student.balance()),
        state.money(student.balance()),
        state.money(fees.tuition),
        state.money(fees.van),
        state.money(fees.other),
        state.money(fees.prev_balance),
        recent,
        id = id,
    ))
}

/// Student profile - modal for HTMX requests, full page otherwise
pub async fn page_student_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let body = render_profile(&state, &id).ok_or_else(|| ApiError::NotFound {
        resource: format!("student {}", id),
    })?;

    if crate::is_htmx_request(&headers) {
        Ok(Html(modal("Student profile", &body)))
    } else {
        let inner = format!(
            "<div class='mb-4'><a href='/students' class='text-indigo-600'>← Students</a></div><div class='bg-white rounded-xl shadow-sm p-6 max-w-2xl'>{}</div>",
            body
        );
        Ok(Html(page_response(&headers, "Student profile", "/students", &inner)))
    }
}

/// Printable fee receipt; opens the print dialog on load
pub async fn page_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let snapshot = state.book.snapshot();
    let student = snapshot.student(&id).ok_or_else(|| ApiError::NotFound {
        resource: format!("student {}", id),
    })?;
    let fees = student.fees();
    let school = &state.config.school;

    let receipt_no = receipt_no_of(student)
        .map(|n| format!("<div>Receipt No: {}</div>", n))
        .unwrap_or_default();
    let address = if school.address.is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", escape_html(&school.address))
    };

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Fee Receipt - {name}</title>
    <style>
        body {{ font-family: 'Courier New', monospace; padding: 20px; max-width: 600px; margin: 0 auto; border: 2px solid #000; }}
        .header {{ text-align: center; border-bottom: 2px dashed #000; padding-bottom: 15px; margin-bottom: 20px; }}
        .header h2 {{ margin: 0; text-transform: uppercase; }}
        .info {{ display: flex; justify-content: space-between; margin-bottom: 20px; }}
        table {{ width: 100%; border-collapse: collapse; margin-bottom: 20px; }}
        th, td {{ padding: 8px; text-align: left; }}
        th {{ border-top: 1px solid #000; border-bottom: 1px solid #000; }}
        .text-right {{ text-align: right; }}
        .total-row {{ border-top: 2px solid #000; font-size: 1.2em; }}
        .signatures {{ margin-top: 50px; display: flex; justify-content: space-between; }}
        .sig-line {{ text-align: center; }}
        @media print {{ body {{ border: none; }} }}
    </style>
</head>
<body>
    <div class="header">
        <h2>{school}</h2>
        {address}
        <p><strong>FEE RECEIPT</strong></p>
    </div>
    <div class="info">
        <div>
            <div>Name: <strong>{name}</strong></div>
            <div>Father: {father}</div>
            <div>Class: {class}</div>
        </div>
        <div style="text-align:right;">
            <div>Date: {date}</div>
            <div>Roll No: {roll}</div>
            {receipt_no}
        </div>
    </div>
    <table>
        <tr><th>Description</th><th class="text-right">Amount</th></tr>
        <tr><td>Tuition Fee</td><td class="text-right">{tuition}</td></tr>
        <tr><td>Van Fee</td><td class="text-right">{van}</td></tr>
        <tr><td>Other / Exam</td><td class="text-right">{other}</td></tr>
        <tr><td>Previous Balance</td><td class="text-right">{prev}</td></tr>
        <tr><td><strong>Total Dues</strong></td><td class="text-right"><strong>{total}</strong></td></tr>
        <tr><td>Paid Amount</td><td class="text-right">{paid}</td></tr>
        <tr class="total-row"><td><strong>BALANCE</strong></td><td class="text-right"><strong>{balance}</strong></td></tr>
    </table>
    <div class="signatures">
        <div class="sig-line"><p>___________________</p><p>Signature</p></div>
        <div class="sig-line"><p>___________________</p><p>Office Stamp</p></div>
    </div>
    <script>window.print();</script>
</body>
</html>"#,
        name = escape_html(&student.name()),
        school = escape_html(&school.name),
        address = address,
        father = escape_html(&student.text(Field::Father)),
        class = escape_html(&student.class()),
        date = display_date(Local::now().date_naive()),
        roll = escape_html(&student.roll()),
        receipt_no = receipt_no,
        tuition = state.money(fees.tuition),
        van = state.money(fees.van),
        other = state.money(fees.other),
        prev = state.money(fees.prev_balance),
        total = state.money(student.total()),
        paid = state.money(student.received()),
        balance = state.money(student.balance()),
    )))
}
