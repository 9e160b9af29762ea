//! Error types shared across Blur & Fade crates.

/// Top-level error type for Blur & Fade operations.
#[derive(Debug, thiserror::Error)]
pub enum BlurfadeError {
    #[error("Capability unavailable: {capability}")]
    CapabilityUnavailable { capability: String },

    #[error("Encoder load failed: {message}")]
    Load { message: String },

    #[error("Transcode error: {message}")]
    Transcode { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("A transcode job is already in flight")]
    JobInFlight,

    #[error("Encoder is not ready")]
    EncoderNotReady,

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using BlurfadeError.
pub type BlurfadeResult<T> = Result<T, BlurfadeError>;

impl BlurfadeError {
    pub fn capability_unavailable(capability: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
        }
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load {
            message: msg.into(),
        }
    }

    pub fn transcode(msg: impl Into<String>) -> Self {
        Self::Transcode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
