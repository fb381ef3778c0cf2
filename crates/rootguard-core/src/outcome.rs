use std::fmt;

use serde::Serialize;

/// Result of a single probe.
///
/// There is no "unknown" state: `ToolMissing` is benign and counts as
/// negative, while `TimedOut` and `Faulted` count as positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Detected { detail: String },
    Clear,
    ToolMissing { tool: String },
    TimedOut { detail: String },
    Faulted { detail: String },
}

impl ProbeOutcome {
    pub fn detected(detail: impl Into<String>) -> Self {
        Self::Detected {
            detail: detail.into(),
        }
    }

    pub fn faulted(detail: impl fmt::Display) -> Self {
        Self::Faulted {
            detail: detail.to_string(),
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Self::Detected { .. } | Self::TimedOut { .. } | Self::Faulted { .. } => true,
            Self::Clear | Self::ToolMissing { .. } => false,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Detected { .. } => "detected",
            Self::Clear => "clear",
            Self::ToolMissing { .. } => "tool_missing",
            Self::TimedOut { .. } => "timed_out",
            Self::Faulted { .. } => "faulted",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detected { detail } => write!(f, "detected: {}", detail),
            Self::Clear => write!(f, "clear"),
            Self::ToolMissing { tool } => write!(f, "tool '{}' not installed", tool),
            Self::TimedOut { detail } => write!(f, "timed out: {}", detail),
            Self::Faulted { detail } => write!(f, "probe fault: {}", detail),
        }
    }
}
