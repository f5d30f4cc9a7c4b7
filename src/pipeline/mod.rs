//! Link-resolution-and-delivery pipeline
//!
//! For each share link in an inbound message, strictly in sequence:
//!
//! ```text
//! Pending → Resolving → (ResolveFailed)
//!                     → Downloading → (DownloadFailed)
//!                                   → Delivering → (DeliveryFailed)
//!                                                → (Delivered)
//! ```
//!
//! A failed link never aborts the batch. Every failure is turned into a
//! status line for the user and a report for the operator.

mod batch;
mod report;
mod status;

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub use batch::{BatchSummary, LinkReport};
pub use report::{ChannelReporter, FailureReport, FailureSink};
pub use status::{ProgressSink, StatusMessage};

use crate::fetcher::{DownloadResult, FetchError, Fetcher, Progress};
use crate::humanize::format_size;
use crate::links::{LinkExtractor, share_id};
use crate::observability::Metrics;
use crate::resolver::{FileDescriptor, LinkResolver, ResolveError};
use crate::store::{ActivityLog, HistoryEntry, LinkOutcome, UserProfile, UserStore};
use crate::telegram::{ChatApi, deliver_file};

pub const NO_LINKS_TEXT: &str = "❌ No TeraBox links found\n\n\
    Send me TeraBox links to download files.\n\
    Use /help for more information.";

/// Download progress is pushed to the status message in steps of this size
const PROGRESS_STEP_PERCENT: f64 = 10.0;

/// Position of a link within its batch, shown as `2/5`
#[derive(Debug, Clone, Copy)]
struct Step {
    index: usize,
    total: usize,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.total)
    }
}

#[derive(bon::Builder)]
pub struct Pipeline {
    extractor: LinkExtractor,
    resolver: Arc<dyn LinkResolver>,
    fetcher: Arc<dyn Fetcher>,
    chat: Arc<dyn ChatApi>,
    store: Arc<dyn UserStore>,
    /// Largest file accepted for download, in bytes
    size_limit: u64,
    /// Channel receiving an attributed copy of every delivered file
    archive_channel: Option<i64>,
    reporter: Option<Arc<dyn FailureSink>>,
    #[builder(default)]
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Process every link found in `text` on behalf of `user`, delivering
    /// files into `chat_id` and narrating progress through `status`
    #[instrument(skip_all, fields(user_id = user.user_id, batch_id = tracing::field::Empty))]
    pub async fn process(
        &self,
        text: Option<&str>,
        user: &UserProfile,
        chat_id: i64,
        status: &dyn ProgressSink,
    ) -> BatchSummary {
        let batch_id = Uuid::now_v7();
        tracing::Span::current().record("batch_id", tracing::field::display(batch_id));

        if let Err(e) = self.store.ensure_user(user) {
            warn!(error = %e, "failed to update user record");
        }

        let links = self.extractor.extract(text);
        if links.is_empty() {
            debug!("no share links in message");
            status.update(NO_LINKS_TEXT).await;
            return BatchSummary::empty(batch_id);
        }

        let total = links.len();
        info!(total, "processing batch");
        status.update(&format!("🔄 Processing {total} link(s)...")).await;

        let mut summary = BatchSummary::empty(batch_id);
        for (idx, link) in links.iter().enumerate() {
            let step = Step {
                index: idx + 1,
                total,
            };
            let report = self.process_link(step, link, user, chat_id, status).await;
            self.log_activity(user.user_id, &report);
            summary.links.push(report);
        }

        self.metrics.batch_processed();
        status.update(&summary.summary_line()).await;
        info!(succeeded = summary.succeeded(), total, "batch complete");
        summary
    }

    async fn process_link(
        &self,
        step: Step,
        link: &str,
        user: &UserProfile,
        chat_id: i64,
        status: &dyn ProgressSink,
    ) -> LinkReport {
        status.update(&format!("🔍 Step {step}: Resolving...\n{link}")).await;

        let descriptor = match self.resolver.resolve(link).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.metrics.resolve_failed();
                warn!(link, error = %e, "resolve failed");
                let reason = if matches!(e, ResolveError::MissingDownloadUrl) {
                    "No download URL"
                } else {
                    "Failed to resolve"
                };
                self.notify(link, user, e.category(), e.to_string(), None).await;
                status.update(&format!("❌ Link {step}: {reason}")).await;
                return failed(link, LinkOutcome::ResolveFailed, None, e.to_string());
            }
        };
        self.metrics.link_resolved();

        let name = descriptor.file_name.clone();
        info!(link, file_name = %name, size = %descriptor.displayed_size, "link resolved");
        status.update(&format!("⬇️ Link {step}: Downloading {name}...")).await;

        let target = target_name(link, &descriptor.file_name);
        let download = match self.download(step, &descriptor, &target, status).await {
            Ok(download) => download,
            Err(e) => {
                self.metrics.download_failed();
                warn!(link, file_name = %name, error = %e, "download failed");
                self.notify(link, user, e.category(), e.to_string(), Some(&name)).await;
                status.update(&format!("❌ Link {step}: Download failed")).await;
                return failed(link, LinkOutcome::DownloadFailed, Some(name), e.to_string());
            }
        };

        status.update(&format!("📤 Link {step}: Uploading {name}...")).await;
        let caption = caption_for(&descriptor);

        if let Err(e) = deliver_file(self.chat.as_ref(), chat_id, &download.path, &caption, true).await {
            self.metrics.delivery_failed();
            warn!(link, file_name = %name, error = %e, "delivery failed");
            self.notify(link, user, "Delivery Failed", e.to_string(), Some(&name)).await;
            self.fetcher.release(&download).await;
            status.update(&format!("❌ Link {step}: Upload failed")).await;
            return failed(link, LinkOutcome::DeliveryFailed, Some(name), e.to_string());
        }

        self.archive(&download, &caption, user).await;

        let entry = HistoryEntry::from_descriptor(&descriptor, Utc::now());
        if let Err(e) = self.store.record_delivery(user.user_id, entry) {
            warn!(error = %e, "failed to record delivery");
        }

        self.fetcher.release(&download).await;
        self.metrics.delivered();
        status.update(&format!("✅ Link {step}: {name} sent!")).await;

        LinkReport {
            link: link.to_string(),
            outcome: LinkOutcome::Delivered,
            file_name: Some(name),
            error: None,
        }
    }

    /// Fetch while forwarding coarse progress to the status message
    async fn download(
        &self,
        step: Step,
        descriptor: &FileDescriptor,
        target: &str,
        status: &dyn ProgressSink,
    ) -> Result<DownloadResult, FetchError> {
        let (tx, mut rx) = watch::channel(None::<Progress>);
        let on_progress = move |progress: Progress| {
            tx.send_if_modified(|current| {
                let bucket = |p: &Progress| (p.percent / PROGRESS_STEP_PERCENT) as u32;
                if current.as_ref().map(bucket) == Some(bucket(&progress)) {
                    return false;
                }
                *current = Some(progress);
                true
            });
        };

        let fetch = async move {
            let result = self
                .fetcher
                .fetch(
                    &descriptor.download_url,
                    target,
                    self.size_limit,
                    Some(&on_progress),
                )
                .await;
            // Closing the channel ends the update loop below
            drop(on_progress);
            result
        };

        let updates = async {
            while rx.changed().await.is_ok() {
                let latest = *rx.borrow_and_update();
                if let Some(p) = latest {
                    status
                        .update(&format!(
                            "⬇️ Link {step}: Downloading {}... {:.0}% ({} of {})",
                            descriptor.file_name,
                            p.percent,
                            format_size(p.bytes),
                            format_size(p.total)
                        ))
                        .await;
                }
            }
        };

        let (result, ()) = tokio::join!(fetch, updates);
        result
    }

    async fn archive(&self, download: &DownloadResult, caption: &str, user: &UserProfile) {
        let Some(channel) = self.archive_channel else {
            return;
        };

        let caption = format!("{caption}\n👤 User: {}", user.display_name());
        match deliver_file(self.chat.as_ref(), channel, &download.path, &caption, false).await {
            Ok(_) => debug!(channel, "archived copy"),
            Err(e) => {
                self.metrics.archive_failed();
                warn!(channel, error = %e, "archive delivery failed");
            }
        }
    }

    async fn notify(
        &self,
        link: &str,
        user: &UserProfile,
        category: &str,
        detail: String,
        file_name: Option<&str>,
    ) {
        if let Some(reporter) = &self.reporter {
            reporter
                .report(&FailureReport {
                    link: link.to_string(),
                    user_name: user.display_name(),
                    category: category.to_string(),
                    detail,
                    file_name: file_name.map(str::to_string),
                })
                .await;
        }
    }

    fn log_activity(&self, user_id: i64, report: &LinkReport) {
        let entry = ActivityLog {
            user_id,
            link: report.link.clone(),
            outcome: report.outcome,
            file_name: report.file_name.clone(),
            detail: report.error.clone(),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.append_log(&entry) {
            warn!(error = %e, "failed to append activity log");
        }
    }
}

/// On-disk name for a link's file, so two shares with the same file name
/// never land on the same path
fn target_name(link: &str, file_name: &str) -> String {
    match share_id(link) {
        Some(id) => format!("{id}_{file_name}"),
        None => format!("{}_{file_name}", Uuid::now_v7().simple()),
    }
}

fn caption_for(descriptor: &FileDescriptor) -> String {
    format!(
        "📥 {}\n💾 Size: {}",
        descriptor.file_name, descriptor.displayed_size
    )
}

fn failed(link: &str, outcome: LinkOutcome, file_name: Option<String>, error: String) -> LinkReport {
    LinkReport {
        link: link.to_string(),
        outcome,
        file_name,
        error: Some(error),
    }
}
