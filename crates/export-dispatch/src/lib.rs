//! Blur & Fade Export Dispatcher
//!
//! Delivers a finished file to the user. The platform share sheet is tried
//! first; a cancelled share is final, any other share failure falls back to
//! a download through a temporary object URL.

pub mod dispatcher;
pub mod download;
pub mod share;

pub use dispatcher::{DispatchOutcome, ExportDispatcher, ExportFile};
pub use download::{DirectoryDownloadSink, DownloadSink};
pub use share::{NoShare, ShareError, ShareTarget};
