//! WhatsApp reminder links and paced bulk dispatch

use async_trait::async_trait;
use feedesk_config::Config;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::MessagingError;
use crate::models::Student;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(name|balance|class)\}").expect("Invalid placeholder regex"));

/// Digits-only international number
///
/// Fewer than 10 digits is rejected; exactly 10 gets `country_code` in front;
/// longer numbers are assumed to carry their own country code.
pub fn normalize_phone(raw: &str, country_code: &str) -> Result<String, MessagingError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        n if n < 10 => Err(MessagingError::InvalidPhone {
            raw: raw.to_string(),
        }),
        10 => Ok(format!("{}{}", country_code, digits)),
        _ => Ok(digits),
    }
}

/// Click-to-chat link carrying a prefilled message
pub fn whatsapp_link(phone: &str, message: &str) -> String {
    format!("https://wa.me/{}?text={}", phone, urlencoding::encode(message))
}

/// Reminder message text
#[derive(Debug, Clone, PartialEq)]
pub enum MessageTemplate {
    /// Standard dues reminder signed with the school name
    Reminder { school: String, currency: String },
    /// Operator text with `{name}`, `{balance}` and `{class}` placeholders
    Custom(String),
}

impl MessageTemplate {
    /// Configured template, or the standard reminder
    pub fn from_config(config: &Config) -> Self {
        match config.messaging.reminder_template.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => MessageTemplate::Custom(text.to_string()),
            _ => Self::reminder(config),
        }
    }

    pub fn reminder(config: &Config) -> Self {
        MessageTemplate::Reminder {
            school: config.school.name.clone(),
            currency: config.school.currency_symbol.clone(),
        }
    }

    pub fn render(&self, student: &Student) -> String {
        let name = student.name();
        let class = student.class();
        let balance = student.balance().normalize().to_string();
        match self {
            MessageTemplate::Reminder { school, currency } => format!(
                "Dear Parent,\n\nThis is a reminder from *{}*.\nStudent: *{}* (Class {})\nPending Balance: *{}{}*\n\nPlease pay the dues at the earliest.",
                school, name, class, currency, balance
            ),
            MessageTemplate::Custom(text) => PLACEHOLDER
                .replace_all(text, |caps: &Captures| match &caps[1] {
                    "name" => name.clone(),
                    "class" => class.clone(),
                    _ => balance.clone(),
                })
                .into_owned(),
        }
    }
}

/// A ready-to-open reminder for one student
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderLink {
    pub student_id: String,
    pub name: String,
    pub url: String,
}

pub fn reminder_link(
    student: &Student,
    template: &MessageTemplate,
    country_code: &str,
) -> Result<ReminderLink, MessagingError> {
    let phone = normalize_phone(&student.phone(), country_code)?;
    Ok(ReminderLink {
        student_id: student.id.clone(),
        name: student.name(),
        url: whatsapp_link(&phone, &template.render(student)),
    })
}

/// Student left out of a bulk send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStudent {
    pub student_id: String,
    pub name: String,
    pub reason: String,
}

/// Links to send, plus the students that could not get one
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkPlan {
    pub links: Vec<ReminderLink>,
    pub skipped: Vec<SkippedStudent>,
}

pub fn plan_bulk(students: &[&Student], template: &MessageTemplate, country_code: &str) -> BulkPlan {
    let mut plan = BulkPlan::default();
    for student in students {
        match reminder_link(student, template, country_code) {
            Ok(link) => plan.links.push(link),
            Err(e) => plan.skipped.push(SkippedStudent {
                student_id: student.id.clone(),
                name: student.name(),
                reason: e.to_string(),
            }),
        }
    }
    plan
}

// ==================== Dispatch ====================

/// Destination of dispatched links (a browser outbox, a test recorder)
#[async_trait]
pub trait LinkSink: Send + Sync {
    async fn dispatch(&self, link: &ReminderLink);
}

/// Stops a running [`DispatchQueue`] before its next link
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Outcome of a bulk run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatchReport {
    pub total: usize,
    pub dispatched: usize,
    pub remaining: usize,
    pub cancelled: bool,
}

/// Sequential link queue with a fixed pause between dispatches
pub struct DispatchQueue {
    links: Vec<ReminderLink>,
    delay: Duration,
    cancel: CancelHandle,
    cancel_rx: watch::Receiver<bool>,
}

impl DispatchQueue {
    pub fn new(links: Vec<ReminderLink>, delay: Duration) -> Self {
        let (tx, cancel_rx) = watch::channel(false);
        Self {
            links,
            delay,
            cancel: CancelHandle { tx: Arc::new(tx) },
            cancel_rx,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Dispatch every link in order, waiting `delay` between two dispatches
    pub async fn run(mut self, sink: &dyn LinkSink) -> DispatchReport {
        let total = self.links.len();
        let mut dispatched = 0;

        for link in &self.links {
            if dispatched > 0 {
                // Wake early on cancel; the sender lives in `self`, so `changed` never errors here
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = self.cancel_rx.changed() => {}
                }
            }
            if *self.cancel_rx.borrow() {
                break;
            }
            debug!("Dispatching reminder for {}", link.name);
            sink.dispatch(link).await;
            dispatched += 1;
        }

        let report = DispatchReport {
            total,
            dispatched,
            remaining: total - dispatched,
            cancelled: dispatched < total,
        };
        info!(
            "Bulk reminders: {} of {} dispatched{}",
            report.dispatched,
            report.total,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::row;
    use serde_json::json;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    fn student(value: serde_json::Value) -> Student {
        Student::new("1".to_string(), row(value))
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, Instant)>>,
        cancel_after: Option<(usize, CancelHandle)>,
    }

    #[async_trait]
    impl LinkSink for Recorder {
        async fn dispatch(&self, link: &ReminderLink) {
            let mut sent = self.sent.lock().await;
            sent.push((link.name.clone(), Instant::now()));
            if let Some((n, handle)) = &self.cancel_after {
                if sent.len() == *n {
                    handle.cancel();
                }
            }
        }
    }

    fn links(n: usize) -> Vec<ReminderLink> {
        (1..=n)
            .map(|i| ReminderLink {
                student_id: i.to_string(),
                name: format!("S{}", i),
                url: format!("https://wa.me/91999999999{}", i),
            })
            .collect()
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("9876543210", "91").unwrap(), "919876543210");
        assert_eq!(normalize_phone("98765-43210", "91").unwrap(), "919876543210");
        assert_eq!(normalize_phone("+91 98765 43210", "91").unwrap(), "919876543210");
        let err = normalize_phone("12345", "91").unwrap_err();
        assert_eq!(
            err,
            MessagingError::InvalidPhone {
                raw: "12345".to_string()
            }
        );
        assert!(err.to_string().contains("Invalid Phone Number: '12345'"));
    }

    #[test]
    fn test_reminder_text_and_link() {
        let config = Config::default();
        let s = student(json!({"Name": "Asha", "Class": "6A", "Phone": "9876543210", "Bal": 1000}));
        let template = MessageTemplate::from_config(&config);
        let text = template.render(&s);
        assert!(text.starts_with("Dear Parent,\n\nThis is a reminder from *K D Memorial School*."));
        assert!(text.contains("Student: *Asha* (Class 6A)"));
        assert!(text.contains("Pending Balance: *₹1000*"));

        let link = reminder_link(&s, &template, "91").unwrap();
        assert!(link.url.starts_with("https://wa.me/919876543210?text=Dear%20Parent%2C"));
    }

    #[test]
    fn test_custom_template() {
        let s = student(json!({"Name": "Asha", "Class": "6A", "Balance": "250.50"}));
        let template = MessageTemplate::Custom("{name} of {class} owes {balance}. {unknown}".to_string());
        assert_eq!(template.render(&s), "Asha of 6A owes 250.5. {unknown}");
    }

    #[test]
    fn test_plan_bulk_skips_invalid_phones() {
        let good = Student::new("1".into(), row(json!({"Name": "A", "Phone": "9876543210"})));
        let bad = Student::new("2".into(), row(json!({"Name": "B", "Phone": "123"})));
        let template = MessageTemplate::Custom("hi".to_string());
        let plan = plan_bulk(&[&good, &bad], &template, "91");
        assert_eq!(plan.links.len(), 1);
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].student_id, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_honours_delay() {
        let queue = DispatchQueue::new(links(3), Duration::from_millis(3000));
        let sink = Recorder::default();
        let started = Instant::now();
        let report = queue.run(&sink).await;

        assert_eq!(
            report,
            DispatchReport {
                total: 3,
                dispatched: 3,
                remaining: 0,
                cancelled: false
            }
        );
        let sent = sink.sent.lock().await;
        assert_eq!(sent[0].1 - started, Duration::ZERO);
        assert!(sent[1].1 - sent[0].1 >= Duration::from_millis(3000));
        assert!(sent[2].1 - sent[1].1 >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_stops_on_cancel() {
        let queue = DispatchQueue::new(links(4), Duration::from_millis(3000));
        let sink = Recorder {
            cancel_after: Some((2, queue.cancel_handle())),
            ..Default::default()
        };
        let report = queue.run(&sink).await;
        assert_eq!(report.dispatched, 2);
        assert_eq!(report.remaining, 2);
        assert!(report.cancelled);
        assert_eq!(sink.sent.lock().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start() {
        let queue = DispatchQueue::new(links(2), Duration::from_millis(10));
        let handle = queue.cancel_handle();
        handle.cancel();
        assert!(handle.is_cancelled());
        let sink = Recorder::default();
        let report = queue.run(&sink).await;
        assert_eq!(report.dispatched, 0);
        assert!(sink.sent.lock().await.is_empty());
    }
}
