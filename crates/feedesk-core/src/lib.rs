//! Core fee-book processing and business logic

pub mod book;
pub mod columns;
pub mod error;
pub mod export;
pub mod messaging;
pub mod models;
pub mod time;
pub mod views;
pub mod workflows;

#[cfg(test)]
mod testing;

pub use book::{BookOperations, BookSnapshot, BookSummary, DataIssue, FeeBook, RefreshStats};
pub use columns::{resolve_number, resolve_text, Field, NumberLookup};
pub use error::{CoreError, ErrorCode, MessagingError, WorkflowError};
pub use messaging::{
    normalize_phone, plan_bulk, reminder_link, whatsapp_link, BulkPlan, CancelHandle,
    DispatchQueue, DispatchReport, LinkSink, MessageTemplate, ReminderLink,
};
pub use models::{Expense, FeeBreakdown, FeeTransaction, StaffMember, Student};
pub use views::{
    class_chips, class_report, dashboard_kpis, expenses_by_date_desc, pending_dues,
    roster_totals, student_profile, student_rows, van_summary, BalanceStatus, DashboardKpis,
    DayBook, RosterTotals, SortField, SortState, StudentFilter, StudentProfile,
};
pub use workflows::{ExpenseForm, FeePayment, FeeReceipt, StudentForm};
