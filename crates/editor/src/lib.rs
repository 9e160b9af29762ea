//! Blur & Fade Editor
//!
//! One editing session: a single selected media file, the two effect
//! intensities, a live still preview, and export gated on encoder and job
//! state.

pub mod control;
pub mod platform;
pub mod session;

pub use control::{ExportControl, ExportOutcome, Notice};
pub use platform::{Platform, SelectedFile};
pub use session::EditorSession;
