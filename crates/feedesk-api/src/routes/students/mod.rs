//! Student routes - roster, forms, profile, fee collection, receipt, reminders
//!
//! Structure:
//! - api.rs: JSON API, HTMX fragments and form posts
//! - page.rs: full page rendering

pub mod api;
pub mod page;

pub use api::{
    api_students, htmx_fee_form, htmx_fee_store, htmx_student_create_form, htmx_student_delete,
    htmx_student_edit_form, htmx_student_reminder, htmx_student_store, htmx_student_update,
    htmx_students_list,
};
pub use page::{page_receipt, page_student_profile, page_students};
