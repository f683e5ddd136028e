use serde::{Deserialize, Serialize};
use std::fmt;

/// Run-level state of the crawl engine
///
/// `Stopped -> Running <-> Paused -> Stopped`; `Stopped` is both the initial
/// and the terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Stopped,
    Running,
    Paused,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
