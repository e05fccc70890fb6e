//! Column resolution across sheet header versions
//!
//! The sheets have been edited by hand for years: the same logical field
//! shows up as `Rec`, `Fee Received` or a header with a line break in it.
//! Every read goes through [`resolve_text`] / [`resolve_number`], which try
//! the logical key, then the current header, then the legacy headers.

use feedesk_gateway::Record;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Logical fields of the four sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Roll,
    Class,
    Name,
    Father,
    Phone,
    Email,
    Address,
    Dob,
    Route,
    Pickup,
    Tuition,
    Van,
    Other,
    PrevBal,
    Total,
    Received,
    Balance,
    ReceiptNo,
    LastReminder,
    Amount,
    Mode,
    Remarks,
    Date,
    Category,
    Description,
    Role,
    Salary,
    Advance,
}

impl Field {
    /// Student amount fields checked for data quality on refresh
    pub const STUDENT_AMOUNTS: [Field; 7] = [
        Field::Tuition,
        Field::Van,
        Field::Other,
        Field::PrevBal,
        Field::Total,
        Field::Received,
        Field::Balance,
    ];

    /// Logical key
    pub fn key(self) -> &'static str {
        match self {
            Field::Roll => "Roll",
            Field::Class => "Class",
            Field::Name => "Name",
            Field::Father => "Father",
            Field::Phone => "Phone",
            Field::Email => "Email",
            Field::Address => "Address",
            Field::Dob => "DOB",
            Field::Route => "Route",
            Field::Pickup => "Pickup",
            Field::Tuition => "Tuition",
            Field::Van => "Van",
            Field::Other => "Other",
            Field::PrevBal => "PrevBal",
            Field::Total => "Total",
            Field::Received => "Received",
            Field::Balance => "Balance",
            Field::ReceiptNo => "ReceiptNo",
            Field::LastReminder => "LastReminder",
            Field::Amount => "Amount",
            Field::Mode => "Mode",
            Field::Remarks => "Remarks",
            Field::Date => "Date",
            Field::Category => "Category",
            Field::Description => "Description",
            Field::Role => "Role",
            Field::Salary => "Salary",
            Field::Advance => "Advance",
        }
    }

    /// Header used by the current sheet layout; new rows are written with it
    pub fn header(self) -> &'static str {
        match self {
            Field::Roll => "Roll No",
            Field::Name => "Student Name",
            Field::Father => "Father Name",
            Field::Dob => "Date of Birth",
            Field::Route => "Van Route",
            Field::Pickup => "Pickup Point",
            Field::Tuition => "Tuition Fee",
            Field::Van => "Van Fee",
            Field::Other => "Other Fee",
            Field::PrevBal => "Previous Balance",
            Field::Total => "Total Fee",
            Field::Received => "Fee Received",
            Field::ReceiptNo => "Receipt No",
            Field::LastReminder => "Last Reminder",
            Field::Mode => "Payment Mode",
            other => other.key(),
        }
    }

    /// Headers used by older layouts
    pub fn legacy(self) -> &'static [&'static str] {
        match self {
            Field::Roll => &["RollNo", "Roll\nNo"],
            Field::Class => &["ClassVal"],
            Field::Name => &["Student\nName"],
            Field::Father => &["Father's Name", "Father\nName"],
            Field::Phone => &["Mobile", "Phone\nNo"],
            Field::Email => &["E-mail"],
            Field::Dob => &["D.O.B"],
            Field::Route => &["Route\nName"],
            Field::Pickup => &["Pickup\nPoint"],
            Field::Tuition => &["Tuition\nFee"],
            Field::Van => &["Van\nFee"],
            Field::Other => &["Other / Exam", "Other\nFee"],
            Field::PrevBal => &["Prev Bal", "Previous\nBalance"],
            Field::Total => &["Total\nFee"],
            Field::Received => &["Rec", "Fee\nReceived"],
            Field::Balance => &["Bal"],
            Field::ReceiptNo => &["Receipt\nNo"],
            Field::LastReminder => &["Reminder", "Last\nReminder"],
            Field::Date => &["Timestamp"],
            _ => &[],
        }
    }

    /// Ordered lookup keys: logical key, current header, legacy headers
    pub fn candidates(self) -> Vec<&'static str> {
        let mut keys = vec![self.key()];
        for key in std::iter::once(self.header()).chain(self.legacy().iter().copied()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Key to write this field under: the one the row already uses, else the current header
    pub fn write_key(self, existing: Option<&Record>) -> &'static str {
        existing
            .and_then(|record| {
                self.candidates()
                    .into_iter()
                    .find(|key| record.contains_key(*key))
            })
            .unwrap_or_else(|| self.header())
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Outcome of reading a numeric field
#[derive(Debug, Clone, PartialEq)]
pub enum NumberLookup {
    /// No candidate column holds a value
    Missing,
    /// A value is present but is not a number
    Invalid(String),
    Value(Decimal),
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// First non-blank value among the field's candidate columns
fn lookup<'a>(record: &'a Record, field: Field) -> Option<&'a Value> {
    field
        .candidates()
        .into_iter()
        .filter_map(|key| record.get(key))
        .find(|value| !is_blank(value))
}

/// Read a field as text; `""` when absent
pub fn resolve_text(record: &Record, field: Field) -> String {
    match lookup(record, field) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Parse a decimal from sheet text
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    parse_decimal(&n.to_string()).or_else(|| n.as_f64().and_then(|f| Decimal::try_from(f).ok()))
}

/// Read a field as a number, reporting why it may be unusable
pub fn inspect_number(record: &Record, field: Field) -> NumberLookup {
    match lookup(record, field) {
        None => NumberLookup::Missing,
        Some(Value::Number(n)) => match number_to_decimal(n) {
            Some(d) => NumberLookup::Value(d),
            None => NumberLookup::Invalid(n.to_string()),
        },
        Some(Value::String(s)) => match parse_decimal(s) {
            Some(d) => NumberLookup::Value(d),
            None => NumberLookup::Invalid(s.clone()),
        },
        Some(other) => NumberLookup::Invalid(other.to_string()),
    }
}

/// Read a field as a number; `0` when absent or not numeric
pub fn resolve_number(record: &Record, field: Field) -> Decimal {
    match inspect_number(record, field) {
        NumberLookup::Value(d) => d,
        NumberLookup::Missing | NumberLookup::Invalid(_) => Decimal::ZERO,
    }
}

/// JSON value for an amount written back to a sheet
pub fn amount_value(amount: Decimal) -> Value {
    let amount = amount.normalize();
    if amount.fract().is_zero() {
        if let Some(i) = amount.to_i64() {
            return Value::from(i);
        }
    }
    amount
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(amount.to_string()))
}
