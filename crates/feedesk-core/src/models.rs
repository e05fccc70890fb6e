//! Typed views over sheet rows
//!
//! Each model keeps the raw row and reads it through the column resolver, so
//! a row written under any header version renders the same way.

use chrono::{NaiveDate, NaiveDateTime};
use feedesk_gateway::{record_id, Record};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::columns::{resolve_number, resolve_text, Field};
use crate::time::{parse_sheet_date, parse_sheet_datetime};

/// Pair every row with an id: its own `id` column or its 1-based position
pub fn assign_ids(rows: Vec<Record>) -> Vec<(String, Record)> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| (record_id(&row).unwrap_or_else(|| (i + 1).to_string()), row))
        .collect()
}

/// Fee components of one student
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub prev_balance: Decimal,
    pub tuition: Decimal,
    pub van: Decimal,
    pub other: Decimal,
    pub received: Decimal,
}

impl FeeBreakdown {
    /// `PrevBal + Tuition + Van + Other`
    pub fn total(&self) -> Decimal {
        self.prev_balance + self.tuition + self.van + self.other
    }

    /// `Total - Received`
    pub fn balance(&self) -> Decimal {
        self.total() - self.received
    }
}

/// Student row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: String,
    pub record: Record,
}

impl Student {
    pub fn new(id: String, record: Record) -> Self {
        Self { id, record }
    }

    pub fn text(&self, field: Field) -> String {
        resolve_text(&self.record, field)
    }

    pub fn amount(&self, field: Field) -> Decimal {
        resolve_number(&self.record, field)
    }

    pub fn name(&self) -> String {
        self.text(Field::Name)
    }

    pub fn roll(&self) -> String {
        self.text(Field::Roll)
    }

    pub fn class(&self) -> String {
        self.text(Field::Class)
    }

    pub fn phone(&self) -> String {
        self.text(Field::Phone)
    }

    /// Stored total, as the sheet has it
    pub fn total(&self) -> Decimal {
        self.amount(Field::Total)
    }

    pub fn received(&self) -> Decimal {
        self.amount(Field::Received)
    }

    /// Stored balance, as the sheet has it
    pub fn balance(&self) -> Decimal {
        self.amount(Field::Balance)
    }

    pub fn van_fee(&self) -> Decimal {
        self.amount(Field::Van)
    }

    pub fn fees(&self) -> FeeBreakdown {
        FeeBreakdown {
            prev_balance: self.amount(Field::PrevBal),
            tuition: self.amount(Field::Tuition),
            van: self.amount(Field::Van),
            other: self.amount(Field::Other),
            received: self.amount(Field::Received),
        }
    }

    pub fn last_reminder(&self) -> Option<NaiveDate> {
        parse_sheet_date(&self.text(Field::LastReminder))
    }

    pub fn is_pending(&self) -> bool {
        self.balance() > Decimal::ZERO
    }
}

/// Fee payment row of the transactions sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeTransaction {
    pub id: String,
    pub record: Record,
}

impl FeeTransaction {
    pub fn new(id: String, record: Record) -> Self {
        Self { id, record }
    }

    pub fn text(&self, field: Field) -> String {
        resolve_text(&self.record, field)
    }

    pub fn amount(&self) -> Decimal {
        resolve_number(&self.record, Field::Amount)
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_sheet_datetime(&self.text(Field::Date))
    }

    /// Whether this payment belongs to `student` (same roll and name)
    pub fn is_for(&self, student: &Student) -> bool {
        self.text(Field::Roll) == student.roll()
            && self.text(Field::Name).to_lowercase() == student.name().to_lowercase()
    }
}

/// Expense row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: String,
    pub record: Record,
}

impl Expense {
    pub fn new(id: String, record: Record) -> Self {
        Self { id, record }
    }

    pub fn text(&self, field: Field) -> String {
        resolve_text(&self.record, field)
    }

    pub fn amount(&self) -> Decimal {
        resolve_number(&self.record, Field::Amount)
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        parse_sheet_datetime(&self.text(Field::Date))
    }
}

/// Staff row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffMember {
    pub id: String,
    pub record: Record,
}

impl StaffMember {
    pub fn new(id: String, record: Record) -> Self {
        Self { id, record }
    }

    pub fn name(&self) -> String {
        resolve_text(&self.record, Field::Name)
    }

    pub fn role(&self) -> String {
        resolve_text(&self.record, Field::Role)
    }

    pub fn salary(&self) -> Decimal {
        resolve_number(&self.record, Field::Salary)
    }

    pub fn advance(&self) -> Decimal {
        resolve_number(&self.record, Field::Advance)
    }
}
