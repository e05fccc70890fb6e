//! Bulk reminder routes - start, poll and cancel a paced send

pub mod api;

pub use api::{htmx_bulk_cancel, htmx_bulk_start, htmx_bulk_status};
