//! Student API endpoints - JSON API, HTMX fragments and form posts
//!
//! Endpoints:
//! - api_students: Filtered roster (JSON)
//! - htmx_students_list: Sortable roster table (HTML fragment)
//! - htmx_student_create_form / htmx_student_edit_form: Student forms (modal)
//! - htmx_student_store / htmx_student_update / htmx_student_delete: Student writes (HTMX)
//! - htmx_fee_form / htmx_fee_store: Fee collection (HTMX)
//! - htmx_student_reminder: WhatsApp reminder link (HTMX)

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use feedesk_core::{
    reminder_link, roster_totals, student_rows, FeePayment, MessageTemplate, SortField, SortState,
    Student, StudentForm,
};
use feedesk_utils::escape_html;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::routes::{failure_alert, StudentQuery};
use crate::{alert_error, alert_success, balance_class, modal, AppState};

/// Event the roster listens for to reload itself
const STUDENTS_CHANGED: &str = "students-changed";

/// One roster line of the JSON API
#[derive(Debug, Serialize)]
pub struct StudentRow {
    pub id: String,
    pub roll: String,
    pub name: String,
    pub class: String,
    pub phone: String,
    pub total: Decimal,
    pub received: Decimal,
    pub balance: Decimal,
}

impl From<&Student> for StudentRow {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id.clone(),
            roll: s.roll(),
            name: s.name(),
            class: s.class(),
            phone: s.phone(),
            total: s.total(),
            received: s.received(),
            balance: s.balance(),
        }
    }
}

/// Get the filtered, sorted roster (JSON API)
pub async fn api_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Json<Vec<StudentRow>> {
    let snapshot = state.book.snapshot();
    let rows = student_rows(&snapshot, &query.filter(), query.sort());
    Json(rows.into_iter().map(StudentRow::from).collect())
}

fn sort_header(label: &str, field: SortField, current: SortState) -> String {
    let next = current.toggle(field);
    let arrow = match current.field {
        Some(f) if f == field && current.ascending => " ▲",
        Some(f) if f == field => " ▼",
        _ => "",
    };
    format!(
        r#"<th class='px-3 py-2 cursor-pointer select-none hover:text-indigo-600' hx-get='/students/list' hx-include='#student-filters' hx-target='#students-content' hx-vals='{{"sort":"{}","dir":"{}"}}'>{}{}</th>"#,
        field.as_str(),
        if next.ascending { "asc" } else { "desc" },
        label,
        arrow
    )
}

/// HTMX: Roster table - Partial page update
///
/// Also swaps the hidden sort inputs out of band so later filter changes
/// keep the chosen order.
pub async fn htmx_students_list(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Html<String> {
    let snapshot = state.book.snapshot();
    let sort = query.sort();
    let rows = student_rows(&snapshot, &query.filter(), sort);
    let totals = roster_totals(&rows);

    let sort_state = format!(
        "<span id='sort-state' hx-swap-oob='true'><input type='hidden' name='sort' value='{}'><input type='hidden' name='dir' value='{}'></span>",
        sort.field.map(SortField::as_str).unwrap_or(""),
        if sort.ascending { "asc" } else { "desc" }
    );

    if rows.is_empty() {
        return Html(format!(
            "<p class='text-gray-500 text-center py-8'>No students match the current filters</p>{}",
            sort_state
        ));
    }

    let headers: String = [
        ("Roll", SortField::Roll),
        ("Name", SortField::Name),
        ("Class", SortField::Class),
        ("Total", SortField::Total),
        ("Paid", SortField::Received),
        ("Balance", SortField::Balance),
    ]
    .into_iter()
    .map(|(label, field)| sort_header(label, field, sort))
    .collect();

    let body: String = rows
        .iter()
        .map(|s| {
            let id = urlencoding::encode(&s.id);
            format!(
                r#"<tr class='border-b hover:bg-gray-50'>
                    <td class='px-3 py-2'><input type='checkbox' name='sel' value='{sel}' class='row-select'></td>
                    <td class='px-3 py-2'>{}</td>
                    <td class='px-3 py-2'><a hx-get='/students/{id}' hx-target='#modal-root' class='cursor-pointer font-medium hover:text-indigo-600'>{}</a><p class='text-xs text-gray-400'>{}</p></td>
                    <td class='px-3 py-2'>{}</td>
                    <td class='px-3 py-2 text-right'>{}</td>
                    <td class='px-3 py-2 text-right text-green-600'>{}</td>
                    <td class='px-3 py-2 text-right font-medium {}'>{}</td>
                    <td class='px-3 py-2 text-right whitespace-nowrap'>
                        <button hx-get='/students/{id}/edit' hx-target='#modal-root' class='text-indigo-600 hover:underline text-sm'>Edit</button>
                        <button hx-post='/students/{id}/delete' hx-vals='{{"confirm":"yes"}}' hx-target='#roster-notice'
                            hx-confirm='Delete {} permanently?' class='text-red-600 hover:underline text-sm ml-2'>Delete</button>
                    </td>
                </tr>"#,
                escape_html(&s.roll()),
                escape_html(&s.name()),
                escape_html(&s.phone()),
                escape_html(&s.class()),
                state.money(s.total()),
                state.money(s.received()),
                balance_class(s.balance()),
                state.money(s.balance()),
                escape_html(&s.name()),
                id = id,
                sel = escape_html(&s.id),
            )
        })
        .collect();

    Html(format!(
        r#"<p class='text-sm text-gray-500 mb-2'>{} students · Total {} · Paid {} · Balance {}</p>
        <div class='overflow-x-auto'>
            <table class='w-full text-left'>
                <thead class='text-sm text-gray-500 border-b'><tr><th class='px-3 py-2'><input type='checkbox' title='Select all' onclick="document.querySelectorAll('.row-select').forEach(c => c.checked = this.checked)"></th>{}<th></th></tr></thead>
                <tbody>{}</tbody>
            </table>
        </div>{}"#,
        rows.len(),
        state.money(totals.total),
        state.money(totals.received),
        state.money(totals.balance),
        headers,
        body,
        sort_state
    ))
}

fn student_form_html(action: &str, form: &StudentForm, submit: &str) -> String {
    let fields: [(&str, &str, &str, &str); 15] = [
        ("roll", "Roll No", form.roll.as_str(), "text"),
        ("class", "Class", form.class.as_str(), "text"),
        ("name", "Name", form.name.as_str(), "text"),
        ("father", "Father", form.father.as_str(), "text"),
        ("phone", "Phone", form.phone.as_str(), "tel"),
        ("email", "Email", form.email.as_str(), "email"),
        ("address", "Address", form.address.as_str(), "text"),
        ("dob", "Date of birth", form.dob.as_str(), "text"),
        ("route", "Van route", form.route.as_str(), "text"),
        ("pickup", "Pickup point", form.pickup.as_str(), "text"),
        ("tuition", "Tuition fee", form.tuition.as_str(), "number"),
        ("van", "Van fee", form.van.as_str(), "number"),
        ("other", "Other / exam fee", form.other.as_str(), "number"),
        ("prev_bal", "Previous balance", form.prev_bal.as_str(), "number"),
        ("received", "Received", form.received.as_str(), "number"),
    ];

    let inputs: String = fields
        .iter()
        .map(|(name, label, value, kind)| {
            let required = if *name == "name" { " required" } else { "" };
            let step = if *kind == "number" { " step='any'" } else { "" };
            format!(
                "<label class='block'><span class='text-sm text-gray-600'>{}</span><input type='{}' name='{}' value='{}'{}{} class='mt-1 w-full px-3 py-2 border rounded-lg'></label>",
                label,
                kind,
                name,
                escape_html(value),
                step,
                required
            )
        })
        .collect();

    format!(
        r#"<form hx-post='{}' hx-target='#student-form-result' class='space-y-4'>
            <div class='grid grid-cols-2 gap-4'>{}</div>
            <p class='text-xs text-gray-500'>Total and balance are computed from the fee fields.</p>
            <div id='student-form-result'></div>
            <div class='flex justify-end gap-2'>
                <button type='button' onclick='this.closest(".modal").remove()' class='px-4 py-2 border rounded-lg'>Close</button>
                <button type='submit' class='px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>{}</button>
            </div>
        </form>"#,
        action, inputs, submit
    )
}

/// HTMX: New student form (modal)
pub async fn htmx_student_create_form() -> Html<String> {
    Html(modal(
        "Add student",
        &student_form_html("/students", &StudentForm::default(), "Save"),
    ))
}

/// HTMX: Edit student form (modal)
pub async fn htmx_student_edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Html<String> {
    let snapshot = state.book.snapshot();
    match snapshot.student(&id) {
        Some(student) => Html(modal(
            "Edit student",
            &student_form_html(
                &format!("/students/{}", urlencoding::encode(&id)),
                &StudentForm::from_student(student),
                "Update",
            ),
        )),
        None => Html(alert_error("Not found", &format!("Student {} not found", id))),
    }
}

/// Alert plus an `HX-Trigger` so the roster reloads
fn changed(alert: String) -> Response {
    ([("hx-trigger", STUDENTS_CHANGED)], Html(alert)).into_response()
}

/// HTMX: Store new student
pub async fn htmx_student_store(
    State(state): State<AppState>,
    Form(form): Form<StudentForm>,
) -> Response {
    match state.book.save_student(None, &form).await {
        Ok(()) => changed(alert_success(
            "Student saved",
            &format!("{} was added", form.name.trim()),
        )),
        Err(e) => Html(failure_alert(&e)).into_response(),
    }
}

/// HTMX: Update student
pub async fn htmx_student_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<StudentForm>,
) -> Response {
    match state.book.save_student(Some(&id), &form).await {
        Ok(()) => changed(alert_success(
            "Student updated",
            &format!("{} was updated", form.name.trim()),
        )),
        Err(e) => Html(failure_alert(&e)).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteForm {
    pub confirm: String,
}

/// HTMX: Delete student; only a `confirm=yes` post deletes
pub async fn htmx_student_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let confirmed = form.confirm.eq_ignore_ascii_case("yes");
    match state.book.delete_student(&id, confirmed).await {
        Ok(()) => changed(alert_success("Student deleted", &format!("Student {} was removed", id))),
        Err(e) => Html(failure_alert(&e)).into_response(),
    }
}

/// HTMX: Fee collection form
pub async fn htmx_fee_form(State(state): State<AppState>, Path(id): Path<String>) -> Html<String> {
    let snapshot = state.book.snapshot();
    let Some(student) = snapshot.student(&id) else {
        return Html(alert_error("Not found", &format!("Student {} not found", id)));
    };

    Html(format!(
        r#"<form hx-post='/students/{}/fee' hx-target='#fee-result' class='bg-gray-50 rounded-lg p-4 space-y-3'>
            <p class='text-sm'>Balance due: <span class='font-bold {}'>{}</span></p>
            <input type='number' name='amount' step='any' min='0' placeholder='Amount' required class='w-full px-3 py-2 border rounded-lg'>
            <select name='mode' class='w-full px-3 py-2 border rounded-lg'>
                <option>Cash</option>
                <option>UPI</option>
                <option>Cheque</option>
                <option>Bank Transfer</option>
            </select>
            <input type='text' name='remarks' placeholder='Remarks' class='w-full px-3 py-2 border rounded-lg'>
            <button type='submit' class='w-full px-4 py-2 bg-indigo-600 text-white rounded-lg hover:bg-indigo-700'>Collect</button>
            <div id='fee-result'></div>
        </form>"#,
        urlencoding::encode(&student.id),
        balance_class(student.balance()),
        state.money(student.balance())
    ))
}

/// HTMX: Collect a fee payment
pub async fn htmx_fee_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(payment): Form<FeePayment>,
) -> Response {
    match state.book.collect_fee(&id, &payment).await {
        Ok(receipt) => {
            let alert = alert_success(
                &format!("Receipt #{}", receipt.receipt_no),
                &format!(
                    "Received {} from {}. Balance now {}",
                    state.money(receipt.amount),
                    receipt.student_name,
                    state.money(receipt.balance)
                ),
            );
            changed(format!(
                "{}<a href='/students/{}/receipt' target='_blank' class='inline-block mt-2 text-indigo-600 hover:underline'>Print receipt</a>",
                alert,
                urlencoding::encode(&receipt.student_id)
            ))
        }
        Err(e) => Html(failure_alert(&e)).into_response(),
    }
}

/// HTMX: Open a WhatsApp reminder for one student
///
/// The link opens in a new window; the reminder date is stamped on the row
/// when that is enabled.
pub async fn htmx_student_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Html<String> {
    let snapshot = state.book.snapshot();
    let Some(student) = snapshot.student(&id) else {
        return Html(alert_error("Not found", &format!("Student {} not found", id)));
    };

    let template = MessageTemplate::from_config(&state.config);
    let link = match reminder_link(student, &template, &state.config.messaging.country_code) {
        Ok(link) => link,
        Err(e) => {
            log::warn!("Reminder for {} not sent: {}", student.name(), e);
            return Html(alert_error("Cannot send reminder", &e.to_string()));
        }
    };

    let recorded = state.book.record_reminder(&id).await;
    let note = if recorded {
        "WhatsApp opened; reminder date recorded"
    } else {
        "WhatsApp opened"
    };
    let url = serde_json::to_string(&link.url).unwrap_or_else(|_| "\"\"".to_string());

    Html(format!(
        "{}<script>window.open({}, '_blank');</script>",
        alert_success(&format!("Reminder for {}", link.name), note),
        url
    ))
}
