//! Background bulk-reminder jobs
//!
//! A job runs a [`DispatchQueue`] on a tokio task. Its sink is an outbox the
//! browser polls: every poll returns the links dispatched since the last one,
//! and the page opens each in a new window.

use async_trait::async_trait;
use feedesk_core::{BulkPlan, CancelHandle, DispatchQueue, DispatchReport, LinkSink, ReminderLink};
use feedesk_core::messaging::SkippedStudent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Links dispatched so far, in order
#[derive(Default)]
pub struct Outbox {
    links: Mutex<Vec<ReminderLink>>,
}

impl Outbox {
    pub async fn since(&self, cursor: usize) -> Vec<ReminderLink> {
        self.links.lock().await.iter().skip(cursor).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.links.lock().await.len()
    }
}

#[async_trait]
impl LinkSink for Outbox {
    async fn dispatch(&self, link: &ReminderLink) {
        self.links.lock().await.push(link.clone());
    }
}

struct BulkJob {
    id: u64,
    total: usize,
    skipped: Vec<SkippedStudent>,
    outbox: Arc<Outbox>,
    cancel: CancelHandle,
    report: Arc<Mutex<Option<DispatchReport>>>,
}

/// Progress of a job as seen by one poll
#[derive(Debug, Clone, PartialEq)]
pub struct BulkStatus {
    pub job_id: u64,
    pub total: usize,
    pub dispatched: usize,
    pub new_links: Vec<ReminderLink>,
    pub skipped: Vec<SkippedStudent>,
    pub finished: Option<DispatchReport>,
}

/// The single active bulk job; starting another cancels it
#[derive(Default)]
pub struct BulkJobs {
    current: Mutex<Option<BulkJob>>,
    next_id: AtomicU64,
}

impl BulkJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dispatching `plan`, returning the job id
    pub async fn start(&self, plan: BulkPlan, delay: Duration) -> u64 {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            log::info!("Cancelling bulk job {} for a new one", previous.id);
            previous.cancel.cancel();
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let queue = DispatchQueue::new(plan.links, delay);
        let outbox = Arc::new(Outbox::default());
        let report = Arc::new(Mutex::new(None));
        let job = BulkJob {
            id,
            total: queue.len(),
            skipped: plan.skipped,
            outbox: outbox.clone(),
            cancel: queue.cancel_handle(),
            report: report.clone(),
        };
        log::info!(
            "Bulk job {} started: {} links, {} skipped",
            id,
            job.total,
            job.skipped.len()
        );

        tokio::spawn(async move {
            let finished = queue.run(outbox.as_ref()).await;
            *report.lock().await = Some(finished);
        });

        *current = Some(job);
        id
    }

    /// Progress of job `id`, with links dispatched after `cursor`
    pub async fn status(&self, id: u64, cursor: usize) -> Option<BulkStatus> {
        let current = self.current.lock().await;
        let job = current.as_ref().filter(|job| job.id == id)?;
        // Report first: once it is set, every link is already in the outbox
        let finished = *job.report.lock().await;
        let dispatched = job.outbox.len().await;
        let new_links = job.outbox.since(cursor).await;
        let status = BulkStatus {
            job_id: job.id,
            total: job.total,
            dispatched,
            new_links,
            skipped: job.skipped.clone(),
            finished,
        };
        Some(status)
    }

    /// Cancel the active job; false when there is none
    pub async fn cancel(&self) -> bool {
        match self.current.lock().await.as_ref() {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }
}
