//! Report routes - van summary, class-wise totals and pending dues

pub mod page;

pub use page::{page_reports, page_van};
