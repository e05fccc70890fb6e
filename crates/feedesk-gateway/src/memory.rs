//! In-process gateway backed by a map of sheets
//!
//! Used by tests and by demo mode. Rows without an `id` column are addressed
//! by their 1-based position, the same way the store back-fills ids.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::{record_id, ChangeAction, ChangeOutcome, Record, SheetChange, SheetGateway};

#[derive(Default)]
pub struct MemoryGateway {
    sheets: Mutex<HashMap<String, Vec<Record>>>,
    changes: Mutex<Vec<SheetChange>>,
    fetches: Mutex<Vec<String>>,
    rejections: Mutex<HashMap<(ChangeAction, String), String>>,
}

fn row_id(index: usize, row: &Record) -> String {
    record_id(row).unwrap_or_else(|| (index + 1).to_string())
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sheet with rows
    pub fn with_sheet(mut self, sheet: &str, rows: Vec<Record>) -> Self {
        self.sheets.get_mut().insert(sheet.to_string(), rows);
        self
    }

    /// Make every `action` on `sheet` fail with `message`
    pub async fn reject(&self, action: ChangeAction, sheet: &str, message: &str) {
        self.rejections
            .lock()
            .await
            .insert((action, sheet.to_string()), message.to_string());
    }

    /// Current rows of a sheet
    pub async fn rows(&self, sheet: &str) -> Vec<Record> {
        self.sheets.lock().await.get(sheet).cloned().unwrap_or_default()
    }

    /// Every write received so far, in order
    pub async fn changes(&self) -> Vec<SheetChange> {
        self.changes.lock().await.clone()
    }

    /// Every sheet read so far, in order
    pub async fn fetches(&self) -> Vec<String> {
        self.fetches.lock().await.clone()
    }

    fn next_id(rows: &[Record]) -> String {
        let max = rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| row_id(i, row).parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }

    fn apply(rows: &mut Vec<Record>, change: SheetChange) -> ChangeOutcome {
        match change.action {
            ChangeAction::Create => {
                let mut row = change.payload;
                if record_id(&row).is_none() {
                    row.insert("id".to_string(), Value::String(Self::next_id(rows)));
                }
                rows.push(row);
                ChangeOutcome::ok()
            }
            ChangeAction::Update | ChangeAction::Delete => {
                let Some(id) = change.id else {
                    return ChangeOutcome::failed("Missing id");
                };
                let Some(index) = rows
                    .iter()
                    .enumerate()
                    .position(|(i, row)| row_id(i, row) == id)
                else {
                    return ChangeOutcome::failed(format!("Record not found: {}", id));
                };
                if change.action == ChangeAction::Delete {
                    rows.remove(index);
                } else {
                    rows[index].extend(change.payload);
                }
                ChangeOutcome::ok()
            }
        }
    }
}

#[async_trait]
impl SheetGateway for MemoryGateway {
    async fn fetch_sheet(&self, sheet: &str) -> Vec<Record> {
        self.fetches.lock().await.push(sheet.to_string());
        self.rows(sheet).await
    }

    async fn submit_change(&self, change: SheetChange) -> ChangeOutcome {
        self.changes.lock().await.push(change.clone());

        if let Some(message) = self
            .rejections
            .lock()
            .await
            .get(&(change.action, change.sheet.clone()))
        {
            return ChangeOutcome::failed(message.clone());
        }

        let mut sheets = self.sheets.lock().await;
        let rows = sheets.entry(change.sheet.clone()).or_default();
        Self::apply(rows, change)
    }
}
