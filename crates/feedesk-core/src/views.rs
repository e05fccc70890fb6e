//! Derived data for the screens
//!
//! Everything here is a pure function of a snapshot (and the operator's
//! sort/filter choices); the HTML layer formats the results.

use chrono::{NaiveDate, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::book::BookSnapshot;
use crate::columns::{parse_decimal, Field};
use crate::models::{Expense, FeeBreakdown, FeeTransaction, Student};
use crate::time::display_date;

// ==================== Sorting ====================

/// Sortable student columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Roll,
    Name,
    Class,
    Total,
    Received,
    Balance,
    Van,
}

impl SortField {
    pub const ALL: [SortField; 7] = [
        SortField::Roll,
        SortField::Name,
        SortField::Class,
        SortField::Total,
        SortField::Received,
        SortField::Balance,
        SortField::Van,
    ];

    pub fn field(self) -> Field {
        match self {
            SortField::Roll => Field::Roll,
            SortField::Name => Field::Name,
            SortField::Class => Field::Class,
            SortField::Total => Field::Total,
            SortField::Received => Field::Received,
            SortField::Balance => Field::Balance,
            SortField::Van => Field::Van,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Roll => "roll",
            SortField::Name => "name",
            SortField::Class => "class",
            SortField::Total => "total",
            SortField::Received => "received",
            SortField::Balance => "balance",
            SortField::Van => "van",
        }
    }

    fn is_amount(self) -> bool {
        matches!(
            self,
            SortField::Total | SortField::Received | SortField::Balance | SortField::Van
        )
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sort field: {}", s))
    }
}

/// Current sort column and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub field: Option<SortField>,
    pub ascending: bool,
}

impl SortState {
    pub fn by(field: SortField, ascending: bool) -> Self {
        Self {
            field: Some(field),
            ascending,
        }
    }

    /// Same column flips direction, a new column starts ascending
    pub fn toggle(self, field: SortField) -> Self {
        if self.field == Some(field) {
            Self::by(field, !self.ascending)
        } else {
            Self::by(field, true)
        }
    }
}

/// Roll numbers sort numerically; non-numeric rolls come after, by text
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum RollKey {
    Number(Decimal),
    Text(String),
}

fn roll_key(student: &Student) -> RollKey {
    let roll = student.roll();
    match parse_decimal(&roll) {
        Some(n) => RollKey::Number(n),
        None => RollKey::Text(roll.to_lowercase()),
    }
}

/// Ascending comparison of two students on one column
pub fn compare_students(a: &Student, b: &Student, field: SortField) -> Ordering {
    if field == SortField::Roll {
        return roll_key(a).cmp(&roll_key(b));
    }
    let f = field.field();
    if field.is_amount() {
        a.amount(f).cmp(&b.amount(f))
    } else {
        a.text(f).to_lowercase().cmp(&b.text(f).to_lowercase())
    }
}

/// Stable sort in place; no column leaves sheet order untouched
pub fn sort_students(students: &mut [&Student], sort: SortState) {
    let Some(field) = sort.field else {
        return;
    };
    students.sort_by(|a, b| {
        let ord = compare_students(a, b, field);
        if sort.ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}

// ==================== Filtering ====================

/// Payment status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceStatus {
    #[default]
    All,
    Paid,
    Pending,
}

impl BalanceStatus {
    pub fn matches(self, student: &Student) -> bool {
        match self {
            BalanceStatus::All => true,
            BalanceStatus::Paid => !student.is_pending(),
            BalanceStatus::Pending => student.is_pending(),
        }
    }
}

impl FromStr for BalanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(BalanceStatus::All),
            "paid" => Ok(BalanceStatus::Paid),
            "pending" => Ok(BalanceStatus::Pending),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Search text, class chip and status, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub status: BalanceStatus,
}

impl StudentFilter {
    fn matches_search(&self, student: &Student) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [student.name(), student.roll(), student.class(), student.phone()]
            .iter()
            .any(|value| value.to_lowercase().contains(&needle))
    }

    fn matches_class(&self, student: &Student) -> bool {
        match self.class.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(class) if class.eq_ignore_ascii_case("all") => true,
            Some(class) => student.class() == class,
        }
    }

    pub fn matches(&self, student: &Student) -> bool {
        self.matches_search(student) && self.matches_class(student) && self.status.matches(student)
    }
}

/// Filtered and sorted student rows
pub fn student_rows<'a>(
    snapshot: &'a BookSnapshot,
    filter: &StudentFilter,
    sort: SortState,
) -> Vec<&'a Student> {
    let mut rows: Vec<&Student> = snapshot
        .students
        .iter()
        .filter(|s| filter.matches(s))
        .collect();
    sort_students(&mut rows, sort);
    rows
}

/// Distinct non-empty classes, ascending
pub fn class_chips(students: &[Student]) -> Vec<String> {
    let mut classes: Vec<String> = students
        .iter()
        .map(Student::class)
        .filter(|c| !c.is_empty())
        .collect();
    classes.sort();
    classes.dedup();
    classes
}

// ==================== Aggregation ====================

/// Headline numbers of the dashboard
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardKpis {
    pub student_count: usize,
    pub total_billed: Decimal,
    pub collected: Decimal,
    pub pending: Decimal,
    pub paid_count: usize,
    pub pending_count: usize,
    pub collected_today: Decimal,
}

/// Fee sums over a set of students
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RosterTotals {
    pub total: Decimal,
    pub received: Decimal,
    pub balance: Decimal,
}

pub fn roster_totals(students: &[&Student]) -> RosterTotals {
    students.iter().fold(RosterTotals::default(), |acc, s| RosterTotals {
        total: acc.total + s.total(),
        received: acc.received + s.received(),
        balance: acc.balance + s.balance(),
    })
}

pub fn dashboard_kpis(snapshot: &BookSnapshot, today: NaiveDate) -> DashboardKpis {
    let students: Vec<&Student> = snapshot.students.iter().collect();
    let totals = roster_totals(&students);
    let pending_count = students.iter().filter(|s| s.is_pending()).count();
    DashboardKpis {
        student_count: students.len(),
        total_billed: totals.total,
        collected: totals.received,
        pending: totals.balance,
        paid_count: students.len() - pending_count,
        pending_count,
        collected_today: snapshot
            .transactions
            .iter()
            .filter(|t| t.timestamp().map(|dt| dt.date()) == Some(today))
            .map(FeeTransaction::amount)
            .sum(),
    }
}

/// Students using the school van
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VanSummary<'a> {
    pub students: Vec<&'a Student>,
    pub revenue: Decimal,
    pub pending: Decimal,
}

impl VanSummary<'_> {
    pub fn count(&self) -> usize {
        self.students.len()
    }
}

pub fn van_summary(students: &[Student]) -> VanSummary<'_> {
    let riders: Vec<&Student> = students
        .iter()
        .filter(|s| s.van_fee() > Decimal::ZERO)
        .collect();
    VanSummary {
        revenue: riders.iter().map(|s| s.van_fee()).sum(),
        pending: riders.iter().map(|s| s.balance()).sum(),
        students: riders,
    }
}

/// One line of the class-wise report
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ClassReportRow {
    pub class: String,
    pub count: usize,
    pub total: Decimal,
    pub received: Decimal,
    pub balance: Decimal,
}

/// Per-class totals, by class name; students without a class are grouped under `-`
pub fn class_report(students: &[Student]) -> Vec<ClassReportRow> {
    let mut rows: BTreeMap<String, ClassReportRow> = BTreeMap::new();
    for student in students {
        let class = match student.class() {
            c if c.is_empty() => "-".to_string(),
            c => c,
        };
        let row = rows.entry(class.clone()).or_insert_with(|| ClassReportRow {
            class,
            ..Default::default()
        });
        row.count += 1;
        row.total += student.total();
        row.received += student.received();
        row.balance += student.balance();
    }
    rows.into_values().collect()
}

// ==================== Day book & ledgers ====================

/// Money received on the day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBookReceipt {
    pub time: String,
    pub name: String,
    pub roll: String,
    pub mode: String,
    pub amount: Decimal,
}

/// Money paid out on the day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBookPayment {
    pub category: String,
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBook {
    pub date: NaiveDate,
    pub receipts: Vec<DayBookReceipt>,
    pub payments: Vec<DayBookPayment>,
    pub total_in: Decimal,
    pub total_out: Decimal,
}

impl DayBook {
    /// Transactions and expenses dated `date`, in sheet order
    pub fn for_date(snapshot: &BookSnapshot, date: NaiveDate) -> Self {
        let receipts: Vec<DayBookReceipt> = snapshot
            .transactions
            .iter()
            .filter_map(|t| {
                let at = t.timestamp().filter(|dt| dt.date() == date)?;
                Some(DayBookReceipt {
                    time: format!("{}:{:02}", at.hour(), at.minute()),
                    name: t.text(Field::Name),
                    roll: t.text(Field::Roll),
                    mode: t.text(Field::Mode),
                    amount: t.amount(),
                })
            })
            .collect();

        let payments: Vec<DayBookPayment> = snapshot
            .expenses
            .iter()
            .filter(|e| e.timestamp().map(|dt| dt.date()) == Some(date))
            .map(|e| DayBookPayment {
                category: e.text(Field::Category),
                description: e.text(Field::Description),
                amount: e.amount(),
            })
            .collect();

        Self {
            date,
            total_in: receipts.iter().map(|r| r.amount).sum(),
            total_out: payments.iter().map(|p| p.amount).sum(),
            receipts,
            payments,
        }
    }

    pub fn net(&self) -> Decimal {
        self.total_in - self.total_out
    }
}

/// Expenses, newest first; undated rows last
pub fn expenses_by_date_desc(expenses: &[Expense]) -> Vec<&Expense> {
    let mut rows: Vec<&Expense> = expenses.iter().collect();
    rows.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    rows
}

/// Students owing money, largest balance first
pub fn pending_dues(students: &[Student]) -> Vec<&Student> {
    let mut rows: Vec<&Student> = students.iter().filter(|s| s.is_pending()).collect();
    rows.sort_by(|a, b| b.balance().cmp(&a.balance()));
    rows
}

// ==================== Profile ====================

/// Everything the profile card shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProfile<'a> {
    pub student: &'a Student,
    pub fees: FeeBreakdown,
    /// Display date, or `Never`
    pub last_reminder: String,
    pub recent: Vec<&'a FeeTransaction>,
}

impl StudentProfile<'_> {
    /// First letter of the name for the avatar
    pub fn initial(&self) -> char {
        self.student
            .name()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('S')
    }
}

/// Profile of student `id` with up to `recent_limit` payments, newest first
pub fn student_profile<'a>(
    snapshot: &'a BookSnapshot,
    id: &str,
    recent_limit: usize,
) -> Option<StudentProfile<'a>> {
    let student = snapshot.student(id)?;
    let mut recent: Vec<&FeeTransaction> = snapshot
        .transactions
        .iter()
        .filter(|t| t.is_for(student))
        .collect();
    recent.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    recent.truncate(recent_limit);

    Some(StudentProfile {
        student,
        fees: student.fees(),
        last_reminder: student
            .last_reminder()
            .map(display_date)
            .unwrap_or_else(|| "Never".to_string()),
        recent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assign_ids;
    use crate::testing::row;
    use serde_json::{json, Value};

    fn snapshot(students: Vec<Value>) -> BookSnapshot {
        BookSnapshot {
            students: assign_ids(students.into_iter().map(row).collect())
                .into_iter()
                .map(|(id, r)| Student::new(id, r))
                .collect(),
            ..Default::default()
        }
    }

    fn sample() -> BookSnapshot {
        snapshot(vec![
            json!({"Roll": 10, "Name": "bina", "Class": "6A", "Total": 1000, "Received": 1000, "Balance": 0, "Phone": "98765"}),
            json!({"Roll": 2, "Name": "Asha", "Class": "6A", "Total": 1300, "Rec": 300, "Bal": 1000}),
            json!({"Roll": "9", "Name": "Chetan", "Class": "6B", "Total": 900, "Received": 400, "Balance": 500, "Van": 200}),
        ])
    }

    fn names(rows: &[&Student]) -> Vec<String> {
        rows.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_toggle() {
        let state = SortState::default().toggle(SortField::Name);
        assert_eq!(state, SortState::by(SortField::Name, true));
        let state = state.toggle(SortField::Name);
        assert_eq!(state, SortState::by(SortField::Name, false));
        let state = state.toggle(SortField::Balance);
        assert_eq!(state, SortState::by(SortField::Balance, true));
    }

    #[test]
    fn test_sort_case_insensitive_and_numeric_roll() {
        let snap = sample();
        let filter = StudentFilter::default();

        let rows = student_rows(&snap, &filter, SortState::by(SortField::Name, true));
        assert_eq!(names(&rows), vec!["Asha", "bina", "Chetan"]);

        let rows = student_rows(&snap, &filter, SortState::by(SortField::Roll, true));
        assert_eq!(names(&rows), vec!["Asha", "Chetan", "bina"]);

        let rows = student_rows(&snap, &filter, SortState::by(SortField::Balance, false));
        assert_eq!(names(&rows), vec!["Asha", "Chetan", "bina"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let snap = sample();
        let sort = SortState::by(SortField::Class, true);
        let mut once: Vec<&Student> = snap.students.iter().collect();
        sort_students(&mut once, sort);
        let mut twice = once.clone();
        sort_students(&mut twice, sort);
        assert_eq!(names(&once), names(&twice));
        // stable: both 6A rows keep sheet order
        assert_eq!(names(&once), vec!["bina", "Asha", "Chetan"]);
    }

    #[test]
    fn test_filter_is_intersection() {
        let snap = sample();
        let combined = StudentFilter {
            search: "a".to_string(),
            class: Some("6A".to_string()),
            status: BalanceStatus::Pending,
        };
        let expected: Vec<String> = snap
            .students
            .iter()
            .filter(|s| StudentFilter { search: "a".to_string(), ..Default::default() }.matches(s))
            .filter(|s| StudentFilter { class: Some("6A".to_string()), ..Default::default() }.matches(s))
            .filter(|s| BalanceStatus::Pending.matches(s))
            .map(|s| s.name())
            .collect();
        let rows = student_rows(&snap, &combined, SortState::default());
        assert_eq!(names(&rows), expected);
        assert_eq!(names(&rows), vec!["Asha"]);
    }

    #[test]
    fn test_search_matches_phone_and_roll() {
        let snap = sample();
        let by_phone = StudentFilter { search: "9876".to_string(), ..Default::default() };
        assert_eq!(names(&student_rows(&snap, &by_phone, SortState::default())), vec!["bina"]);
        let by_roll = StudentFilter { search: "9".to_string(), ..Default::default() };
        assert_eq!(
            names(&student_rows(&snap, &by_roll, SortState::default())),
            vec!["bina", "Chetan"]
        );
    }

    #[test]
    fn test_class_chips_and_filter() {
        let snap = sample();
        assert_eq!(class_chips(&snap.students), vec!["6A", "6B"]);
        let filter = StudentFilter { class: Some("6A".to_string()), ..Default::default() };
        assert_eq!(student_rows(&snap, &filter, SortState::default()).len(), 2);
        let all = StudentFilter { class: Some("all".to_string()), ..Default::default() };
        assert_eq!(student_rows(&snap, &all, SortState::default()).len(), 3);
    }

    #[test]
    fn test_kpis_and_balance_identity() {
        let snap = sample();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let kpis = dashboard_kpis(&snap, today);
        assert_eq!(kpis.student_count, 3);
        assert_eq!(kpis.total_billed, Decimal::from(3200));
        assert_eq!(kpis.collected, Decimal::from(1700));
        assert_eq!(kpis.pending, Decimal::from(1500));
        assert_eq!(kpis.pending, kpis.total_billed - kpis.collected);
        assert_eq!(kpis.paid_count, 1);
        assert_eq!(kpis.pending_count, 2);
    }

    #[test]
    fn test_filtered_totals_keep_balance_identity() {
        let snap = snapshot(vec![
            json!({"Name": "Asha", "Class": "6A", "Total": 1300, "Rec": 300, "Bal": 1000}),
            json!({"Name": "Dev", "Class": "6A", "Total": 900, "Received": 250, "Balance": 650}),
            json!({"Name": "Gita", "Class": "6A", "Total": 800, "Received": 800, "Balance": 0}),
            json!({"Name": "Chetan", "Class": "6B", "Total": 900, "Received": 400, "Balance": 500}),
        ]);
        let filter = StudentFilter {
            class: Some("6A".to_string()),
            status: BalanceStatus::Pending,
            ..Default::default()
        };
        let rows = student_rows(&snap, &filter, SortState::default());
        assert_eq!(names(&rows), vec!["Asha", "Dev"]);

        let totals = roster_totals(&rows);
        assert_eq!(totals.total, Decimal::from(2200));
        assert_eq!(totals.received, Decimal::from(550));
        assert_eq!(totals.balance, Decimal::from(1650));
        assert_eq!(totals.balance, totals.total - totals.received);

        let everyone = roster_totals(&snap.students.iter().collect::<Vec<_>>());
        let kpis = dashboard_kpis(&snap, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(kpis.total_billed, everyone.total);
        assert_eq!(kpis.pending, everyone.balance);
        assert_eq!(kpis.pending, kpis.total_billed - kpis.collected);
    }

    #[test]
    fn test_non_numeric_counts_as_zero() {
        let snap = snapshot(vec![
            json!({"Name": "A", "Van": "abc", "Balance": 100}),
            json!({"Name": "B", "Van": 300, "Balance": "x"}),
        ]);
        let van = van_summary(&snap.students);
        assert_eq!(van.count(), 1);
        assert_eq!(van.revenue, Decimal::from(300));
        assert_eq!(van.pending, Decimal::ZERO);
    }

    #[test]
    fn test_class_report() {
        let snap = sample();
        let report = class_report(&snap.students);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].class, "6A");
        assert_eq!(report[0].count, 2);
        assert_eq!(report[0].balance, Decimal::from(1000));
        assert_eq!(report[1].received, Decimal::from(400));
    }

    #[test]
    fn test_day_book() {
        let mut snap = sample();
        snap.transactions = vec![
            FeeTransaction::new("1".into(), row(json!({"Name": "Asha", "Roll": 2, "Mode": "Cash", "Amount": 300, "Date": "2026-10-16T09:05:00"}))),
            FeeTransaction::new("2".into(), row(json!({"Name": "Asha", "Roll": 2, "Amount": 999, "Date": "2026-10-15T09:05:00"}))),
        ];
        snap.expenses = vec![
            Expense::new("1".into(), row(json!({"Category": "Stationery", "Description": "Chalk", "Amount": 50, "Date": "2026-10-16"}))),
        ];
        let book = DayBook::for_date(&snap, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(book.receipts.len(), 1);
        assert_eq!(book.receipts[0].time, "9:05");
        assert_eq!(book.total_in, Decimal::from(300));
        assert_eq!(book.total_out, Decimal::from(50));
        assert_eq!(book.net(), Decimal::from(250));
    }

    #[test]
    fn test_expenses_newest_first() {
        let expenses = vec![
            Expense::new("1".into(), row(json!({"Date": "2026-10-01", "Amount": 1}))),
            Expense::new("2".into(), row(json!({"Amount": 2}))),
            Expense::new("3".into(), row(json!({"Date": "2026-10-09", "Amount": 3}))),
        ];
        let ids: Vec<&str> = expenses_by_date_desc(&expenses).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn test_pending_dues_largest_first() {
        let snap = sample();
        assert_eq!(names(&pending_dues(&snap.students)), vec!["Asha", "Chetan"]);
    }

    #[test]
    fn test_profile() {
        let mut snap = sample();
        snap.transactions = vec![FeeTransaction::new(
            "1".into(),
            row(json!({"Name": "ASHA", "Roll": "2", "Amount": 300})),
        )];
        let profile = student_profile(&snap, "2", 5).unwrap();
        assert_eq!(profile.last_reminder, "Never");
        assert_eq!(profile.recent.len(), 1);
        assert_eq!(profile.initial(), 'A');
        assert!(student_profile(&snap, "99", 5).is_none());
    }
}
