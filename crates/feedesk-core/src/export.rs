//! CSV downloads of the roster

use chrono::NaiveDate;
use csv::Writer;
use rust_decimal::Decimal;

use crate::columns::Field;
use crate::error::CoreError;
use crate::models::Student;
use crate::views::pending_dues;

const ROSTER_HEADER: [&str; 8] = [
    "Roll", "Name", "Class", "Father", "Phone", "Total", "Received", "Balance",
];

const PENDING_HEADER: [&str; 5] = ["Roll", "Name", "Class", "Phone", "Balance"];

fn amount(value: Decimal) -> String {
    value.normalize().to_string()
}

fn write_csv<const N: usize>(
    header: [&str; N],
    rows: impl Iterator<Item = [String; N]>,
) -> Result<String, CoreError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

/// Every student, in the given order
pub fn roster_csv(students: &[&Student]) -> Result<String, CoreError> {
    write_csv(
        ROSTER_HEADER,
        students.iter().map(|s| {
            [
                s.roll(),
                s.name(),
                s.class(),
                s.text(Field::Father),
                s.phone(),
                amount(s.total()),
                amount(s.received()),
                amount(s.balance()),
            ]
        }),
    )
}

/// Students with a balance, largest first
pub fn pending_csv(students: &[Student]) -> Result<String, CoreError> {
    write_csv(
        PENDING_HEADER,
        pending_dues(students).into_iter().map(|s| {
            [
                s.roll(),
                s.name(),
                s.class(),
                s.phone(),
                amount(s.balance()),
            ]
        }),
    )
}

pub fn roster_file_name(date: NaiveDate) -> String {
    format!("students_export_{}.csv", date.format("%Y-%m-%d"))
}

pub fn pending_file_name(date: NaiveDate) -> String {
    format!("pending_dues_{}.csv", date.format("%Y-%m-%d"))
}
