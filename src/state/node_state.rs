/// Node kind and status definitions for the crawl graph
///
/// Statuses only ever move forward; `NodeStatus::can_transition_to` is the
/// single rule the graph enforces on every update.
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a discovered URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// An HTML page that may be crawled for further links
    Page,

    /// A result PDF that is downloaded, never parsed
    Pdf,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the current state of a node in the crawl graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    // ===== Active States =====
    /// Discovered but not yet scheduled
    Pending,

    /// Waiting in the frontier (pages) or for download (PDFs)
    Queued,

    // ===== Terminal States =====
    /// Page was dequeued and fetched (successfully or not)
    Visited,

    /// PDF is present on disk
    Downloaded,

    /// Fetch or storage failed
    Failed,
}

impl NodeStatus {
    /// Position in the forward-only lifecycle
    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Queued => 1,
            Self::Visited => 2,
            Self::Downloaded | Self::Failed => 3,
        }
    }

    /// Returns true if moving from `self` to `next` is a forward transition
    ///
    /// A visited page may still be marked `Failed` when its fetch does not
    /// succeed; nothing ever moves back to `Pending` or `Queued`.
    pub fn can_transition_to(&self, next: NodeStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Visited => "visited",
            Self::Downloaded => "downloaded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
