//! Route modules for the server
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration and exports
//! - api.rs: JSON API, HTMX fragment and form endpoints
//! - page.rs: full page rendering

pub mod exports;
pub mod ledgers;
pub mod messages;
pub mod reports;
pub mod settings;
pub mod students;

use feedesk_core::{BalanceStatus, SortField, SortState, StudentFilter, WorkflowError};
use serde::Deserialize;

use crate::alert_error;

/// Red alert for a failed form post
///
/// Fragment endpoints answer 200 so HTMX swaps the alert into the form's target.
pub fn failure_alert(error: &WorkflowError) -> String {
    log::warn!("Workflow failed: {}", error);
    match error {
        WorkflowError::PartiallyApplied { .. } => alert_error("Partially saved", &error.to_string()),
        _ => alert_error("Failed", &error.to_string()),
    }
}

/// Roster filter and sort as sent by the filter form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentQuery {
    pub q: String,
    pub class: String,
    pub status: String,
    pub sort: String,
    pub dir: String,
}

impl StudentQuery {
    pub fn filter(&self) -> StudentFilter {
        StudentFilter {
            search: self.q.clone(),
            class: Some(self.class.clone()).filter(|c| !c.trim().is_empty()),
            status: self.status.parse().unwrap_or(BalanceStatus::All),
        }
    }

    pub fn sort(&self) -> SortState {
        match self.sort.parse::<SortField>() {
            Ok(field) => SortState::by(field, self.dir != "desc"),
            Err(_) => SortState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query = StudentQuery::default();
        assert_eq!(query.filter(), StudentFilter::default());
        assert_eq!(query.sort(), SortState::default());
    }

    #[test]
    fn test_query_parsing() {
        let query = StudentQuery {
            q: "asha".into(),
            class: "6A".into(),
            status: "pending".into(),
            sort: "balance".into(),
            dir: "desc".into(),
        };
        let filter = query.filter();
        assert_eq!(filter.class.as_deref(), Some("6A"));
        assert_eq!(filter.status, BalanceStatus::Pending);
        assert_eq!(query.sort(), SortState::by(SortField::Balance, false));
    }
}
