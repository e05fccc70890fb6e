//! Remote spreadsheet API gateway
//!
//! Two fail-soft operations against one endpoint: read a whole sheet and
//! submit a create/update/delete. Callers never see an `Err`; failures are
//! logged here and degraded to an empty sheet or `success: false`.

use async_trait::async_trait;
use std::sync::Arc;

pub mod envelope;
pub mod error;
pub mod http;
pub mod memory;

pub use envelope::{record_id, ChangeAction, ChangeOutcome, Envelope, Record, SheetChange};
pub use error::GatewayError;
pub use http::HttpGateway;
pub use memory::MemoryGateway;

/// Gateway reference type
pub type GatewayRef = Arc<dyn SheetGateway>;

/// Trait for spreadsheet gateways
#[async_trait]
pub trait SheetGateway: Send + Sync {
    /// Fetch every row of a sheet; empty on any failure
    async fn fetch_sheet(&self, sheet: &str) -> Vec<Record>;

    /// Submit one write; `success: false` with a message on any failure
    async fn submit_change(&self, change: SheetChange) -> ChangeOutcome;
}
