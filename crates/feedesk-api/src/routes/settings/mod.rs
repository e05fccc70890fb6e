//! Settings routes - read-only view of the loaded configuration

pub mod api;
pub mod page;

pub use api::api_settings;
pub use page::page_settings;
