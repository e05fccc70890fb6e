//! Ledger form posts - HTMX partial responses
//!
//! Successful posts return the alert plus an out-of-band copy of the list
//! they changed.

use axum::extract::{Path, State};
use axum::response::Html;
use axum::Form;
use feedesk_core::workflows::parse_lenient;
use feedesk_core::ExpenseForm;
use serde::Deserialize;

use super::page::{render_expense_list, render_staff_table};
use crate::routes::failure_alert;
use crate::{alert_success, AppState};

/// HTMX: Store new expense
pub async fn htmx_expense_store(
    State(state): State<AppState>,
    Form(form): Form<ExpenseForm>,
) -> Html<String> {
    match state.book.submit_expense(&form).await {
        Ok(()) => Html(format!(
            "{}<div id='expense-list' hx-swap-oob='true'>{}</div>",
            alert_success(
                "Expense saved",
                &format!(
                    "{} under {}",
                    state.money(parse_lenient(&form.amount)),
                    form.category.trim()
                )
            ),
            render_expense_list(&state)
        )),
        Err(e) => Html(failure_alert(&e)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdvanceForm {
    pub amount: String,
}

/// HTMX: Give a staff member an advance
pub async fn htmx_staff_advance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<AdvanceForm>,
) -> Html<String> {
    match state.book.give_staff_advance(&id, &form.amount).await {
        Ok(total) => Html(format!(
            "{}<div id='staff-table' hx-swap-oob='true'>{}</div>",
            alert_success(
                "Advance Recorded",
                &format!("Outstanding advance is now {}", state.money(total))
            ),
            render_staff_table(&state)
        )),
        Err(e) => Html(failure_alert(&e)),
    }
}
