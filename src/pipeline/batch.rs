use uuid::Uuid;

use crate::store::LinkOutcome;

/// Result of processing one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub link: String,
    pub outcome: LinkOutcome,
    pub file_name: Option<String>,
    pub error: Option<String>,
}

/// Result of processing every link of one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Time-ordered id used for log correlation only
    pub batch_id: Uuid,
    pub links: Vec<LinkReport>,
}

impl BatchSummary {
    pub fn empty(batch_id: Uuid) -> Self {
        Self {
            batch_id,
            links: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.links.len()
    }

    pub fn succeeded(&self) -> usize {
        self.links.iter().filter(|l| l.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn summary_line(&self) -> String {
        format!("✅ Complete: {}/{} successful", self.succeeded(), self.total())
    }
}
