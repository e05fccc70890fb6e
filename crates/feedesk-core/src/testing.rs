//! Shared fixtures for unit tests

use feedesk_config::Config;
use feedesk_gateway::{MemoryGateway, Record};
use serde_json::Value;
use std::sync::Arc;

use crate::book::FeeBook;

pub fn row(value: Value) -> Record {
    serde_json::from_value(value).expect("fixture rows are objects")
}

pub fn config_and_gateway(
    students: Vec<Record>,
    transactions: Vec<Record>,
) -> (Config, Arc<MemoryGateway>) {
    let config = Config::default();
    let gateway = MemoryGateway::new()
        .with_sheet(&config.gateway.sheets.students, students)
        .with_sheet(&config.gateway.sheets.transactions, transactions);
    (config, Arc::new(gateway))
}

/// A book over an in-memory gateway, not yet refreshed
pub fn book_with(
    students: Vec<Record>,
    transactions: Vec<Record>,
) -> (FeeBook, Arc<MemoryGateway>) {
    let (config, gateway) = config_and_gateway(students, transactions);
    (FeeBook::new(config, gateway.clone()), gateway)
}
