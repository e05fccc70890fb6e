//! CSV download routes

pub mod api;

pub use api::{export_pending, export_students};
