//! The fee book: the single in-memory copy of the remote sheets
//!
//! Every refresh builds a brand new [`BookSnapshot`] from freshly fetched rows
//! and swaps it in at once. Readers hold an `Arc` to the snapshot they
//! started with, so a page never renders half of one refresh and half of
//! another.

use chrono::{DateTime, Utc};
use feedesk_config::Config;
use feedesk_gateway::{GatewayRef, Record, SheetChange};
use log::{info, warn};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, RwLock};

use crate::columns::{inspect_number, resolve_number, Field, NumberLookup};
use crate::models::{assign_ids, Expense, FeeTransaction, StaffMember, Student};

/// An amount column holding something that is not a number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataIssue {
    pub sheet: String,
    pub record_id: String,
    pub label: String,
    pub field: Field,
    pub raw: String,
}

/// Immutable result of one refresh
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookSnapshot {
    pub students: Vec<Student>,
    pub transactions: Vec<FeeTransaction>,
    pub expenses: Vec<Expense>,
    pub staff: Vec<StaffMember>,
    /// Highest receipt number seen so far
    pub receipt_counter: u64,
    pub issues: Vec<DataIssue>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

fn receipt_number(record: &Record) -> u64 {
    resolve_number(record, Field::ReceiptNo)
        .floor()
        .to_u64()
        .unwrap_or(0)
}

impl BookSnapshot {
    /// Assemble a snapshot and derive the receipt counter and data issues
    pub fn build(
        students: Vec<Student>,
        transactions: Vec<FeeTransaction>,
        expenses: Vec<Expense>,
        staff: Vec<StaffMember>,
        students_sheet: &str,
    ) -> Self {
        let receipt_counter = students
            .iter()
            .map(|s| receipt_number(&s.record))
            .chain(transactions.iter().map(|t| receipt_number(&t.record)))
            .max()
            .unwrap_or(0);

        let issues = students
            .iter()
            .flat_map(|s| {
                Field::STUDENT_AMOUNTS
                    .iter()
                    .filter_map(move |field| match inspect_number(&s.record, *field) {
                        NumberLookup::Invalid(raw) => Some(DataIssue {
                            sheet: students_sheet.to_string(),
                            record_id: s.id.clone(),
                            label: s.name(),
                            field: *field,
                            raw,
                        }),
                        _ => None,
                    })
            })
            .collect();

        Self {
            students,
            transactions,
            expenses,
            staff,
            receipt_counter,
            issues,
            refreshed_at: Some(Utc::now()),
        }
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn staff_member(&self, id: &str) -> Option<&StaffMember> {
        self.staff.iter().find(|s| s.id == id)
    }

    /// Number for the next receipt
    pub fn next_receipt_no(&self) -> u64 {
        self.receipt_counter + 1
    }
}

/// Row counts after a refresh
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RefreshStats {
    pub students: usize,
    pub transactions: usize,
    pub expenses: usize,
    pub staff: usize,
    pub issues: usize,
}

/// Application-wide store of sheet data
pub struct FeeBook {
    config: Config,
    gateway: GatewayRef,
    snapshot: RwLock<Arc<BookSnapshot>>,
}

impl FeeBook {
    /// Create an empty book; call [`FeeBook::refresh_all`] to load it
    pub fn new(config: Config, gateway: GatewayRef) -> Self {
        Self {
            config,
            gateway,
            snapshot: RwLock::new(Arc::new(BookSnapshot::default())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn gateway(&self) -> &GatewayRef {
        &self.gateway
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<BookSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn replace(&self, next: BookSnapshot) -> RefreshStats {
        let stats = RefreshStats {
            students: next.students.len(),
            transactions: next.transactions.len(),
            expenses: next.expenses.len(),
            staff: next.staff.len(),
            issues: next.issues.len(),
        };
        for issue in &next.issues {
            warn!(
                "Sheet {} row {} ({}): {} is not a number: {:?}; counted as 0",
                issue.sheet, issue.record_id, issue.label, issue.field, issue.raw
            );
        }
        *self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(next);
        stats
    }

    /// Re-fetch students, then transactions, and replace the snapshot
    pub async fn refresh(&self) -> RefreshStats {
        let sheets = &self.config.gateway.sheets;
        let student_rows = self.gateway.fetch_sheet(&sheets.students).await;
        let transaction_rows = self.gateway.fetch_sheet(&sheets.transactions).await;

        let current = self.snapshot();
        let next = BookSnapshot::build(
            assign_ids(student_rows)
                .into_iter()
                .map(|(id, row)| Student::new(id, row))
                .collect(),
            assign_ids(transaction_rows)
                .into_iter()
                .map(|(id, row)| FeeTransaction::new(id, row))
                .collect(),
            current.expenses.clone(),
            current.staff.clone(),
            &sheets.students,
        );
        let stats = self.replace(next);
        info!(
            "Refreshed {} students and {} transactions (receipt counter {})",
            stats.students,
            stats.transactions,
            self.snapshot().receipt_counter
        );
        stats
    }

    /// Re-fetch expenses, then staff, and replace the snapshot
    pub async fn refresh_ledgers(&self) -> RefreshStats {
        let sheets = &self.config.gateway.sheets;
        let expense_rows = self.gateway.fetch_sheet(&sheets.expenses).await;
        let mut staff_rows = self.gateway.fetch_sheet(&sheets.staff).await;

        if staff_rows.is_empty() && self.config.features.seed_default_staff {
            staff_rows = self.seed_default_staff().await;
        }

        let current = self.snapshot();
        let next = BookSnapshot::build(
            current.students.clone(),
            current.transactions.clone(),
            assign_ids(expense_rows)
                .into_iter()
                .map(|(id, row)| Expense::new(id, row))
                .collect(),
            assign_ids(staff_rows)
                .into_iter()
                .map(|(id, row)| StaffMember::new(id, row))
                .collect(),
            &sheets.students,
        );
        let stats = self.replace(next);
        info!(
            "Refreshed {} expenses and {} staff",
            stats.expenses, stats.staff
        );
        stats
    }

    /// Refresh every sheet
    pub async fn refresh_all(&self) -> RefreshStats {
        self.refresh().await;
        self.refresh_ledgers().await
    }

    async fn seed_default_staff(&self) -> Vec<Record> {
        let sheet = &self.config.gateway.sheets.staff;
        let mut payload = Record::new();
        payload.insert(Field::Name.key().to_string(), json!("Teacher A"));
        payload.insert(Field::Role.key().to_string(), json!("Faculty"));
        payload.insert(Field::Salary.key().to_string(), json!(15000));
        payload.insert(Field::Advance.key().to_string(), json!(0));

        let outcome = self
            .gateway
            .submit_change(SheetChange::create(sheet, payload))
            .await;
        if !outcome.success {
            warn!("Could not seed default staff: {}", outcome.error_text());
            return Vec::new();
        }
        info!("Staff sheet was empty; created a default staff row");
        self.gateway.fetch_sheet(sheet).await
    }
}

/// Trait for book-level summaries
pub trait BookOperations {
    /// Get book summary
    fn summary(&self) -> BookSummary;
}

/// Book summary
#[derive(Debug, Serialize, Deserialize)]
pub struct BookSummary {
    pub total_students: usize,
    pub total_transactions: usize,
    pub total_expenses: usize,
    pub total_staff: usize,
    pub receipt_counter: u64,
    pub data_issues: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl BookOperations for FeeBook {
    fn summary(&self) -> BookSummary {
        let snapshot = self.snapshot();
        BookSummary {
            total_students: snapshot.students.len(),
            total_transactions: snapshot.transactions.len(),
            total_expenses: snapshot.expenses.len(),
            total_staff: snapshot.staff.len(),
            receipt_counter: snapshot.receipt_counter,
            data_issues: snapshot.issues.len(),
            refreshed_at: snapshot.refreshed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use crate::testing::{book_with, row};
    use feedesk_gateway::SheetGateway;

    #[tokio::test]
    async fn test_refresh_backfills_ids_and_counter() {
        let (book, gateway) = book_with(
            vec![
                row(json!({"Name": "Asha", "Receipt No": 12})),
                row(json!({"Name": "Ravi", "id": "77"})),
            ],
            vec![row(json!({"Name": "Asha", "ReceiptNo": "15"}))],
        );
        let stats = book.refresh().await;
        assert_eq!(stats.students, 2);
        assert_eq!(stats.transactions, 1);

        let snapshot = book.snapshot();
        let ids: Vec<&str> = snapshot.students.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "77"]);
        assert_eq!(snapshot.receipt_counter, 15);
        assert_eq!(snapshot.next_receipt_no(), 16);

        assert_eq!(gateway.fetches().await, vec!["Sheet1", "Transactions"]);
    }

    #[tokio::test]
    async fn test_empty_sheets_give_zero_counter() {
        let (book, _) = book_with(vec![], vec![]);
        book.refresh().await;
        assert_eq!(book.snapshot().receipt_counter, 0);
        assert!(book.snapshot().refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let (book, gateway) = book_with(vec![row(json!({"Name": "Asha"}))], vec![]);
        book.refresh().await;
        let before = book.snapshot();

        gateway
            .submit_change(SheetChange::delete("Sheet1", "1"))
            .await;
        book.refresh().await;

        assert_eq!(before.students.len(), 1);
        assert!(book.snapshot().students.is_empty());
    }

    #[tokio::test]
    async fn test_data_issues_are_collected() {
        let (book, _) = book_with(
            vec![row(json!({"Name": "Asha", "Van": "two hundred", "Total": 100}))],
            vec![],
        );
        let stats = book.refresh().await;
        assert_eq!(stats.issues, 1);
        let snapshot = book.snapshot();
        assert_eq!(snapshot.issues[0].field, Field::Van);
        assert_eq!(snapshot.issues[0].raw, "two hundred");
        assert_eq!(snapshot.students[0].van_fee(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_ledger_refresh_keeps_students() {
        let (book, gateway) = book_with(vec![row(json!({"Name": "Asha"}))], vec![]);
        book.refresh().await;
        gateway
            .submit_change(SheetChange::create("Expenses", row(json!({"Amount": 50}))))
            .await;
        let stats = book.refresh_ledgers().await;
        assert_eq!(stats.students, 1);
        assert_eq!(stats.expenses, 1);
        assert_eq!(stats.staff, 0);
    }

    #[tokio::test]
    async fn test_seed_default_staff_when_enabled() {
        let (mut config, gateway) = crate::testing::config_and_gateway(vec![], vec![]);
        config.features.seed_default_staff = true;
        let book = FeeBook::new(config, gateway.clone());
        let stats = book.refresh_ledgers().await;
        assert_eq!(stats.staff, 1);
        assert_eq!(book.snapshot().staff[0].name(), "Teacher A");
        assert_eq!(book.snapshot().staff[0].salary(), Decimal::from(15000));
    }

    #[tokio::test]
    async fn test_summary() {
        let (book, _) = book_with(vec![row(json!({"Name": "Asha"}))], vec![]);
        book.refresh_all().await;
        let summary = book.summary();
        assert_eq!(summary.total_students, 1);
        assert_eq!(summary.total_staff, 0);
    }
}
