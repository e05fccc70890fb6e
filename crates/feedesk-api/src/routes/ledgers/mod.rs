//! Ledger routes - day book, expenses and staff advances

pub mod api;
pub mod page;

pub use api::{htmx_expense_store, htmx_staff_advance};
pub use page::{page_daybook, page_expenses, page_staff};
