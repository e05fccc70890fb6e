//! Write workflows: each validates locally, posts through the gateway and
//! refreshes the book from the server afterwards.
//!
//! Two-step workflows (fee collection, staff advance) are not atomic. When the
//! second write fails the first one stays on the server and the caller gets
//! [`WorkflowError::PartiallyApplied`].

use chrono::Local;
use feedesk_gateway::{Record, SheetChange};
use feedesk_utils::format_amount;
use log::{info, warn};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::book::FeeBook;
use crate::columns::{amount_value, parse_decimal, Field};
use crate::error::WorkflowError;
use crate::models::{FeeBreakdown, Student};
use crate::time::sheet_timestamp;

/// Amount typed into a form; blank or non-numeric is 0
pub fn parse_lenient(input: &str) -> Decimal {
    parse_decimal(input).unwrap_or(Decimal::ZERO)
}

/// Amount that must be a number above zero
pub fn parse_positive_amount(input: &str) -> Result<Decimal, WorkflowError> {
    match parse_decimal(input) {
        Some(amount) if amount > Decimal::ZERO => Ok(amount),
        _ => Err(WorkflowError::InvalidAmount {
            input: input.trim().to_string(),
        }),
    }
}

fn required(value: &str, field: &str) -> Result<String, WorkflowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WorkflowError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Builds a payload under the keys the target sheet already uses
struct PayloadBuilder<'a> {
    template: Option<&'a Record>,
    payload: Record,
}

impl<'a> PayloadBuilder<'a> {
    fn new(template: Option<&'a Record>) -> Self {
        Self {
            template,
            payload: Record::new(),
        }
    }

    fn text(mut self, field: Field, value: impl Into<String>) -> Self {
        self.payload.insert(
            field.write_key(self.template).to_string(),
            Value::String(value.into()),
        );
        self
    }

    /// Like [`Self::text`], but a blank value is dropped unless the row already has the column
    fn optional_text(self, field: Field, value: &str) -> Self {
        let on_row = self
            .template
            .is_some_and(|record| field.candidates().iter().any(|key| record.contains_key(*key)));
        if value.is_empty() && !on_row {
            return self;
        }
        self.text(field, value)
    }

    fn amount(mut self, field: Field, value: Decimal) -> Self {
        self.payload
            .insert(field.write_key(self.template).to_string(), amount_value(value));
        self
    }

    fn build(self) -> Record {
        self.payload
    }
}

/// Student add/edit form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentForm {
    pub roll: String,
    pub class: String,
    pub name: String,
    pub father: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub dob: String,
    pub route: String,
    pub pickup: String,
    pub tuition: String,
    pub van: String,
    pub other: String,
    pub prev_bal: String,
    pub received: String,
}

impl StudentForm {
    /// Form prefilled from an existing student
    pub fn from_student(student: &Student) -> Self {
        let amount = |field| student.amount(field).normalize().to_string();
        Self {
            roll: student.roll(),
            class: student.class(),
            name: student.name(),
            father: student.text(Field::Father),
            phone: student.phone(),
            email: student.text(Field::Email),
            address: student.text(Field::Address),
            dob: student.text(Field::Dob),
            route: student.text(Field::Route),
            pickup: student.text(Field::Pickup),
            tuition: amount(Field::Tuition),
            van: amount(Field::Van),
            other: amount(Field::Other),
            prev_bal: amount(Field::PrevBal),
            received: amount(Field::Received),
        }
    }

    pub fn fees(&self) -> FeeBreakdown {
        FeeBreakdown {
            prev_balance: parse_lenient(&self.prev_bal),
            tuition: parse_lenient(&self.tuition),
            van: parse_lenient(&self.van),
            other: parse_lenient(&self.other),
            received: parse_lenient(&self.received),
        }
    }

    /// Row payload with Total and Balance computed from the fee fields
    pub fn payload(&self, template: Option<&Record>) -> Record {
        let fees = self.fees();
        PayloadBuilder::new(template)
            .text(Field::Roll, self.roll.trim())
            .text(Field::Class, self.class.trim())
            .text(Field::Name, self.name.trim())
            .text(Field::Phone, self.phone.trim())
            .optional_text(Field::Father, self.father.trim())
            .optional_text(Field::Email, self.email.trim())
            .optional_text(Field::Address, self.address.trim())
            .optional_text(Field::Dob, self.dob.trim())
            .optional_text(Field::Route, self.route.trim())
            .optional_text(Field::Pickup, self.pickup.trim())
            .amount(Field::Tuition, fees.tuition)
            .amount(Field::Van, fees.van)
            .amount(Field::Other, fees.other)
            .amount(Field::PrevBal, fees.prev_balance)
            .amount(Field::Received, fees.received)
            .amount(Field::Total, fees.total())
            .amount(Field::Balance, fees.balance())
            .build()
    }
}

/// Fee collection form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePayment {
    pub amount: String,
    pub mode: String,
    pub remarks: String,
}

/// Result of a completed fee collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeReceipt {
    pub receipt_no: u64,
    pub student_id: String,
    pub student_name: String,
    pub amount: Decimal,
    pub received: Decimal,
    pub balance: Decimal,
}

/// New expense form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseForm {
    pub category: String,
    pub amount: String,
    pub description: String,
}

fn now_timestamp() -> String {
    sheet_timestamp(Local::now().naive_local())
}

impl FeeBook {
    fn money(&self, amount: Decimal) -> String {
        format_amount(&self.config().school.currency_symbol, amount)
    }

    async fn submit(&self, change: SheetChange) -> Result<(), WorkflowError> {
        let outcome = self.gateway().submit_change(change).await;
        if outcome.success {
            Ok(())
        } else {
            Err(WorkflowError::Rejected {
                message: outcome.error_text(),
            })
        }
    }

    fn student_or_not_found(&self, id: &str) -> Result<Student, WorkflowError> {
        self.snapshot()
            .student(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound {
                kind: "Student",
                id: id.to_string(),
            })
    }

    /// Create a student (`id` is `None`) or update one
    pub async fn save_student(
        &self,
        id: Option<&str>,
        form: &StudentForm,
    ) -> Result<(), WorkflowError> {
        required(&form.name, "Name")?;
        let sheet = self.config().gateway.sheets.students.clone();

        let change = match id {
            Some(id) => {
                let existing = self.student_or_not_found(id)?;
                SheetChange::update(&sheet, id, form.payload(Some(&existing.record)))
            }
            None => {
                let snapshot = self.snapshot();
                let template = snapshot.students.first().map(|s| &s.record);
                SheetChange::create(&sheet, form.payload(template))
            }
        };

        self.submit(change).await?;
        info!("Saved student {}", form.name.trim());
        self.refresh().await;
        Ok(())
    }

    /// Delete a student; `confirmed` must be set by the operator
    pub async fn delete_student(&self, id: &str, confirmed: bool) -> Result<(), WorkflowError> {
        if !confirmed {
            return Err(WorkflowError::ConfirmationRequired);
        }
        let sheet = self.config().gateway.sheets.students.clone();
        self.submit(SheetChange::delete(&sheet, id)).await?;
        info!("Deleted student {}", id);
        self.refresh().await;
        Ok(())
    }

    /// Append a fee transaction, then credit it to the student
    pub async fn collect_fee(
        &self,
        id: &str,
        payment: &FeePayment,
    ) -> Result<FeeReceipt, WorkflowError> {
        let amount = parse_positive_amount(&payment.amount)?;
        let student = self.student_or_not_found(id)?;
        let snapshot = self.snapshot();
        let receipt_no = snapshot.next_receipt_no();
        let sheets = &self.config().gateway.sheets;

        let transaction = PayloadBuilder::new(snapshot.transactions.first().map(|t| &t.record))
            .text(Field::Roll, student.roll())
            .text(Field::Name, student.name())
            .text(Field::Class, student.class())
            .amount(Field::Amount, amount)
            .text(Field::Mode, payment.mode.trim())
            .text(Field::Remarks, payment.remarks.trim())
            .text(Field::Date, now_timestamp())
            .amount(Field::ReceiptNo, Decimal::from(receipt_no))
            .build();
        self.submit(SheetChange::create(&sheets.transactions, transaction))
            .await?;

        let received = student.received() + amount;
        let balance = student.total() - received;
        let update = PayloadBuilder::new(Some(&student.record))
            .amount(Field::Received, received)
            .amount(Field::Balance, balance)
            .amount(Field::ReceiptNo, Decimal::from(receipt_no))
            .build();
        let credited = self
            .submit(SheetChange::update(&sheets.students, id, update))
            .await;

        self.refresh().await;

        if let Err(e) = credited {
            warn!(
                "Receipt #{} recorded but student {} was not updated: {}",
                receipt_no, id, e
            );
            return Err(WorkflowError::PartiallyApplied {
                completed: format!(
                    "Payment of {} was recorded as receipt #{}",
                    self.money(amount),
                    receipt_no
                ),
                failed: e.to_string(),
            });
        }

        info!(
            "Collected {} from {} (receipt #{})",
            amount,
            student.name(),
            receipt_no
        );
        Ok(FeeReceipt {
            receipt_no,
            student_id: student.id.clone(),
            student_name: student.name(),
            amount,
            received,
            balance,
        })
    }

    /// Raise a staff member's advance and log it as an expense
    pub async fn give_staff_advance(&self, id: &str, amount: &str) -> Result<Decimal, WorkflowError> {
        let amount = parse_positive_amount(amount)?;
        let snapshot = self.snapshot();
        let member = snapshot
            .staff_member(id)
            .ok_or_else(|| WorkflowError::NotFound {
                kind: "Staff",
                id: id.to_string(),
            })?;
        let sheets = &self.config().gateway.sheets;

        let advance = member.advance() + amount;
        let update = PayloadBuilder::new(Some(&member.record))
            .amount(Field::Advance, advance)
            .build();
        self.submit(SheetChange::update(&sheets.staff, id, update))
            .await?;

        let expense = PayloadBuilder::new(snapshot.expenses.first().map(|e| &e.record))
            .text(Field::Date, now_timestamp())
            .text(Field::Category, "Staff Advance")
            .amount(Field::Amount, amount)
            .text(Field::Description, format!("Advance to {}", member.name()))
            .build();
        let logged = self
            .submit(SheetChange::create(&sheets.expenses, expense))
            .await;

        self.refresh_ledgers().await;

        if let Err(e) = logged {
            return Err(WorkflowError::PartiallyApplied {
                completed: format!(
                    "Advance of {} was recorded for {}",
                    self.money(amount),
                    member.name()
                ),
                failed: e.to_string(),
            });
        }
        info!("Advance of {} given to {}", amount, member.name());
        Ok(advance)
    }

    /// Record an expense dated now
    pub async fn submit_expense(&self, form: &ExpenseForm) -> Result<(), WorkflowError> {
        let amount = parse_positive_amount(&form.amount)?;
        let category = required(&form.category, "Category")?;
        let snapshot = self.snapshot();

        let expense = PayloadBuilder::new(snapshot.expenses.first().map(|e| &e.record))
            .text(Field::Date, now_timestamp())
            .text(Field::Category, category)
            .amount(Field::Amount, amount)
            .text(Field::Description, form.description.trim())
            .build();
        self.submit(SheetChange::create(
            &self.config().gateway.sheets.expenses,
            expense,
        ))
        .await?;
        self.refresh_ledgers().await;
        Ok(())
    }

    /// Stamp today's date as the student's last reminder
    ///
    /// Best-effort: returns whether the date was written, never an error.
    pub async fn record_reminder(&self, id: &str) -> bool {
        if !self.config().messaging.record_reminders {
            return false;
        }
        let Some(student) = self.snapshot().student(id).cloned() else {
            return false;
        };
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let update = PayloadBuilder::new(Some(&student.record))
            .text(Field::LastReminder, today)
            .build();
        let sheet = self.config().gateway.sheets.students.clone();
        match self.submit(SheetChange::update(&sheet, id, update)).await {
            Ok(()) => {
                self.refresh().await;
                true
            }
            Err(e) => {
                warn!("Could not record reminder for {}: {}", student.name(), e);
                false
            }
        }
    }
}

/// Receipt number as stored on a row, if any
pub fn receipt_no_of(student: &Student) -> Option<u64> {
    student
        .amount(Field::ReceiptNo)
        .to_u64()
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{book_with, row};
    use feedesk_gateway::{ChangeAction, SheetGateway};
    use serde_json::json;
    use std::str::FromStr;

    fn form(name: &str) -> StudentForm {
        StudentForm {
            roll: "5".into(),
            class: "6A".into(),
            name: name.into(),
            phone: "9876543210".into(),
            tuition: "1000".into(),
            van: "200".into(),
            other: "100".into(),
            prev_bal: "".into(),
            received: "300".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(parse_lenient(""), Decimal::ZERO);
        assert_eq!(parse_lenient("abc"), Decimal::ZERO);
        assert_eq!(parse_lenient(" 12.5 "), Decimal::from_str("12.5").unwrap());
        assert!(parse_positive_amount("0").is_err());
        assert!(parse_positive_amount("-5").is_err());
        assert!(parse_positive_amount("").is_err());
        assert_eq!(parse_positive_amount("500").unwrap(), Decimal::from(500));
    }

    #[test]
    fn test_payload_computes_totals() {
        let payload = form("Asha").payload(None);
        assert_eq!(payload["Total Fee"], json!(1300));
        assert_eq!(payload["Balance"], json!(1000));
        assert_eq!(payload["Previous Balance"], json!(0));
        assert_eq!(payload["Student Name"], json!("Asha"));
    }

    #[test]
    fn test_payload_keeps_legacy_keys() {
        let legacy = row(json!({"Name": "Asha", "Rec": 0, "Bal": 0, "Total": 0}));
        let payload = form("Asha").payload(Some(&legacy));
        assert_eq!(payload["Rec"], json!(300));
        assert_eq!(payload["Bal"], json!(1000));
        assert_eq!(payload["Total"], json!(1300));
        assert!(payload.get("Fee Received").is_none());
    }

    #[test]
    fn test_blank_optional_fields_add_no_columns() {
        let existing = row(json!({"Name": "Asha", "Father": "Rajesh", "E-mail": "a@b.in", "Rec": 0}));
        let mut edit = form("Asha");
        edit.father = "Rajesh Verma".into();
        let payload = edit.payload(Some(&existing));

        assert_eq!(payload["Father"], json!("Rajesh Verma"));
        assert_eq!(payload["E-mail"], json!(""));
        for header in ["Email", "Address", "DOB", "Date of Birth", "Van Route", "Pickup Point"] {
            assert!(payload.get(header).is_none(), "{} should not be written", header);
        }
        assert_eq!(payload["Phone"], json!("9876543210"));
    }

    #[tokio::test]
    async fn test_update_does_not_grow_the_sheet() {
        let (book, gateway) = book_with(
            vec![row(json!({"Roll": 1, "Class": "6A", "Name": "Asha", "Phone": "9876543210",
                "Tuition": 1000, "Van": 200, "Other": 100, "PrevBal": 0,
                "Total": 1300, "Rec": 0, "Bal": 1300}))],
            vec![],
        );
        book.refresh().await;
        let before: Vec<String> = gateway.rows("Sheet1").await[0].keys().cloned().collect();

        book.save_student(Some("1"), &form("Asha")).await.unwrap();
        let after = gateway.rows("Sheet1").await;
        let added: Vec<&String> = after[0].keys().filter(|k| !before.contains(k)).collect();
        assert!(added.is_empty(), "new columns: {:?}", added);
        assert_eq!(after[0]["Bal"], json!(1000));
    }

    #[tokio::test]
    async fn test_create_student_then_invariant_holds() {
        let (book, _) = book_with(vec![], vec![]);
        book.save_student(None, &form("Asha")).await.unwrap();
        let snapshot = book.snapshot();
        let s = &snapshot.students[0];
        assert_eq!(s.total(), Decimal::from(1300));
        assert_eq!(s.balance(), Decimal::from(1000));
        assert_eq!(s.fees().total(), s.total());
        assert_eq!(s.fees().balance(), s.balance());
    }

    #[tokio::test]
    async fn test_update_preserves_receipt_number() {
        let (book, gateway) = book_with(
            vec![row(json!({"Name": "Asha", "ReceiptNo": 7, "Rec": 0}))],
            vec![],
        );
        book.refresh().await;
        book.save_student(Some("1"), &form("Asha K")).await.unwrap();
        let rows = gateway.rows("Sheet1").await;
        assert_eq!(rows[0]["ReceiptNo"], json!(7));
        assert_eq!(rows[0]["Name"], json!("Asha K"));
        assert_eq!(rows[0]["Rec"], json!(300));
    }

    #[tokio::test]
    async fn test_save_rejected_reports_message() {
        let (book, gateway) = book_with(vec![], vec![]);
        gateway.reject(ChangeAction::Create, "Sheet1", "Sheet is locked").await;
        let err = book.save_student(None, &form("Asha")).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: Sheet is locked");
        assert!(book.snapshot().students.is_empty());
    }

    #[tokio::test]
    async fn test_save_requires_name() {
        let (book, gateway) = book_with(vec![], vec![]);
        let err = book.save_student(None, &form(" ")).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::MissingField);
        assert!(gateway.changes().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (book, gateway) = book_with(vec![row(json!({"Name": "Asha"}))], vec![]);
        book.refresh().await;
        assert_eq!(
            book.delete_student("1", false).await,
            Err(WorkflowError::ConfirmationRequired)
        );
        assert!(gateway.changes().await.is_empty());
        book.delete_student("1", true).await.unwrap();
        assert!(book.snapshot().students.is_empty());
    }

    #[tokio::test]
    async fn test_collect_fee() {
        let (book, gateway) = book_with(
            vec![row(json!({"Roll": 5, "Name": "Asha", "Class": "6A", "Total": 1300, "Rec": 300, "Bal": 1000}))],
            vec![row(json!({"Name": "Ravi", "Roll": 1, "Amount": 100, "ReceiptNo": 41}))],
        );
        book.refresh().await;
        let receipt = book
            .collect_fee(
                "1",
                &FeePayment {
                    amount: "400".into(),
                    mode: "Cash".into(),
                    remarks: "".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.receipt_no, 42);
        assert_eq!(receipt.received, Decimal::from(700));
        assert_eq!(receipt.balance, Decimal::from(600));

        let txns = gateway.rows("Transactions").await;
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[1]["Name"], json!("Asha"));
        assert_eq!(txns[1]["Amount"], json!(400));
        assert_eq!(txns[1]["ReceiptNo"], json!(42));

        let student = &book.snapshot().students[0];
        assert_eq!(student.received(), Decimal::from(700));
        assert_eq!(student.balance(), Decimal::from(600));
        assert_eq!(book.snapshot().receipt_counter, 42);
    }

    #[tokio::test]
    async fn test_collect_fee_validates_before_network() {
        let (book, gateway) = book_with(vec![row(json!({"Name": "Asha"}))], vec![]);
        book.refresh().await;
        let err = book
            .collect_fee("1", &FeePayment { amount: "0".into(), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::InvalidAmount { input: "0".into() });
        let err = book
            .collect_fee("9", &FeePayment { amount: "10".into(), ..Default::default() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::NotFound);
        assert!(gateway.changes().await.is_empty());
    }

    #[tokio::test]
    async fn test_collect_fee_partial_failure() {
        let (book, gateway) = book_with(
            vec![row(json!({"Name": "Asha", "Total": 1000, "Rec": 0, "Bal": 1000}))],
            vec![],
        );
        book.refresh().await;
        gateway.reject(ChangeAction::Update, "Sheet1", "Row locked").await;
        let err = book
            .collect_fee("1", &FeePayment { amount: "250".into(), ..Default::default() })
            .await
            .unwrap_err();
        match err {
            WorkflowError::PartiallyApplied { completed, failed } => {
                assert!(completed.contains("receipt #1"));
                assert_eq!(failed, "Error: Row locked");
            }
            other => panic!("unexpected {:?}", other),
        }
        // transaction stays, refresh still ran
        assert_eq!(book.snapshot().transactions.len(), 1);
        assert_eq!(book.snapshot().students[0].received(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_staff_advance() {
        let (book, gateway) = book_with(vec![], vec![]);
        gateway
            .submit_change(SheetChange::create(
                "Staff",
                row(json!({"Name": "Meena", "Role": "Faculty", "Salary": 15000, "Advance": 500})),
            ))
            .await;
        book.refresh_ledgers().await;

        let advance = book.give_staff_advance("1", "1000").await.unwrap();
        assert_eq!(advance, Decimal::from(1500));
        let snapshot = book.snapshot();
        assert_eq!(snapshot.staff[0].advance(), Decimal::from(1500));
        assert_eq!(snapshot.expenses.len(), 1);
        assert_eq!(snapshot.expenses[0].text(Field::Category), "Staff Advance");
        assert_eq!(snapshot.expenses[0].text(Field::Description), "Advance to Meena");
    }

    #[tokio::test]
    async fn test_staff_advance_partial_failure() {
        let (book, gateway) = book_with(vec![], vec![]);
        gateway
            .submit_change(SheetChange::create("Staff", row(json!({"Name": "Meena", "Advance": 0}))))
            .await;
        book.refresh_ledgers().await;
        gateway.reject(ChangeAction::Create, "Expenses", "Quota").await;
        let err = book.give_staff_advance("1", "300").await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::PartiallyApplied);
        assert_eq!(book.snapshot().staff[0].advance(), Decimal::from(300));
    }

    #[tokio::test]
    async fn test_submit_expense_shows_in_day_book() {
        let (book, _) = book_with(vec![], vec![]);
        book.submit_expense(&ExpenseForm {
            category: "Stationery".into(),
            amount: "120".into(),
            description: "Chalk".into(),
        })
        .await
        .unwrap();
        let snapshot = book.snapshot();
        let day = crate::views::DayBook::for_date(&snapshot, Local::now().date_naive());
        assert_eq!(day.total_out, Decimal::from(120));
    }

    #[tokio::test]
    async fn test_record_reminder_is_best_effort() {
        let (book, gateway) = book_with(vec![row(json!({"Name": "Asha", "Reminder": ""}))], vec![]);
        book.refresh().await;
        assert!(book.record_reminder("1").await);
        let rows = gateway.rows("Sheet1").await;
        assert!(rows[0]["Reminder"].as_str().is_some_and(|d| !d.is_empty()));
        assert!(book.snapshot().students[0].last_reminder().is_some());

        gateway.reject(ChangeAction::Update, "Sheet1", "Locked").await;
        assert!(!book.record_reminder("1").await);
    }
}
