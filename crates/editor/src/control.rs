//! Export button state and export results.

use serde::Serialize;

use blurfade_common::error::BlurfadeError;
use blurfade_export_dispatch::DispatchOutcome;

const PROCESSING_FAILED: &str = "Sorry, there was an error processing your video.";

pub const LABEL_LOADING: &str = "Encoder loading...";
pub const LABEL_ERROR: &str = "Encoder Error";
pub const LABEL_SHARE: &str = "Share";

/// State of the export control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportControl {
    pub enabled: bool,
    pub label: &'static str,
}

/// User-facing message for a failed export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    /// Generic notice for any video processing failure.
    pub fn processing_failed() -> Self {
        Self {
            message: PROCESSING_FAILED.to_string(),
        }
    }

    pub fn from_error(error: &BlurfadeError) -> Self {
        Self {
            message: format!("Export failed: {error}"),
        }
    }
}

/// Result of [`EditorSession::export`](crate::EditorSession::export).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The control was disabled; nothing ran.
    Rejected,
    Delivered(DispatchOutcome),
    Failed(Notice),
}
