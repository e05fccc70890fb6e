//! Sample sheets for `--demo`

use feedesk_config::Config;
use feedesk_gateway::{MemoryGateway, Record};
use serde_json::{json, Value};

fn rows(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// In-memory gateway holding a small school
///
/// One student uses the legacy `Rec`/`Bal` headers and one has an unusable
/// phone, so both code paths show up on the screens.
pub fn gateway(config: &Config) -> MemoryGateway {
    let sheets = &config.gateway.sheets;
    MemoryGateway::new()
        .with_sheet(
            &sheets.students,
            rows(vec![
                json!({"Roll": 1, "Class": "6A", "Name": "Asha Verma", "Father": "Rajesh Verma",
                    "Phone": "9876543210", "Route": "North", "Pickup": "Main Gate",
                    "Tuition": 1000, "Van": 200, "Other": 100, "PrevBal": 0,
                    "Total": 1300, "Received": 300, "Balance": 1000, "ReceiptNo": 1}),
                json!({"Roll": 2, "Class": "6A", "Name": "Kabir Singh", "Father": "Harpreet Singh",
                    "Phone": "+91 98765 43211",
                    "Tuition": 1000, "Van": 0, "Other": 100, "PrevBal": 250,
                    "Total": 1350, "Received": 1350, "Balance": 0}),
                json!({"Roll": 3, "Class": "6B", "Name": "Meera Iyer", "Father": "S Iyer",
                    "Phone": "98765", "Route": "South", "Pickup": "Temple Road",
                    "Tuition": 900, "Van": 250, "Other": 0, "PrevBal": 0,
                    "Total": 1150, "Rec": 500, "Bal": 650}),
                json!({"Roll": 10, "Class": "7A", "Name": "Dev Patel", "Father": "N Patel",
                    "Phone": "9123456780",
                    "Tuition": 1200, "Van": 0, "Other": 150, "PrevBal": 0,
                    "Total": 1350, "Received": 0, "Balance": 1350}),
            ]),
        )
        .with_sheet(
            &sheets.transactions,
            rows(vec![
                json!({"Date": "2026-10-01T10:15:00", "Roll": 1, "Name": "Asha Verma", "Class": "6A",
                    "Amount": 300, "Mode": "Cash", "Remarks": "", "ReceiptNo": 1}),
                json!({"Date": "2026-10-02T12:40:00", "Roll": 2, "Name": "Kabir Singh", "Class": "6A",
                    "Amount": 1350, "Mode": "UPI", "Remarks": "Full term", "ReceiptNo": 2}),
            ]),
        )
        .with_sheet(
            &sheets.expenses,
            rows(vec![json!({"Date": "2026-10-02T16:00:00", "Category": "Electricity",
                "Amount": 1800, "Description": "September bill"})]),
        )
        .with_sheet(
            &sheets.staff,
            rows(vec![
                json!({"Name": "Anita Rao", "Role": "Faculty", "Salary": 15000, "Advance": 0}),
                json!({"Name": "Suresh", "Role": "Driver", "Salary": 9000, "Advance": 1000}),
            ]),
        )
}
