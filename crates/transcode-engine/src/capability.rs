//! Process-wide capability registry.
//!
//! Both effect pipelines depend on capabilities that may arrive late: the
//! blur provider for stills and the transcoder for video. The registry holds
//! one slot for each. Callers that need the transcoder await its readiness
//! instead of polling a global.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use blurfade_common::error::{BlurfadeError, BlurfadeResult};
use blurfade_still_render::BlurProvider;

use crate::transcoder::Transcoder;

const TRANSCODER: &str = "transcoder";

/// Slots for the blur provider and the transcoder.
pub struct CapabilityRegistry {
    transcoder: watch::Sender<Option<Arc<dyn Transcoder>>>,
    blur: RwLock<Option<Arc<dyn BlurProvider>>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        let (transcoder, _) = watch::channel(None);
        Self {
            transcoder,
            blur: RwLock::new(None),
        }
    }

    /// Install the transcoder and wake every waiter.
    pub fn provide_transcoder(&self, transcoder: Arc<dyn Transcoder>) {
        tracing::debug!(backend = transcoder.name(), "Transcoder capability provided");
        self.transcoder.send_replace(Some(transcoder));
    }

    /// The transcoder, if one has been provided.
    pub fn transcoder(&self) -> Option<Arc<dyn Transcoder>> {
        self.transcoder.borrow().clone()
    }

    pub fn provide_blur(&self, provider: Arc<dyn BlurProvider>) {
        tracing::debug!(provider = provider.name(), "Blur capability provided");
        *self.blur.write().unwrap_or_else(|p| p.into_inner()) = Some(provider);
    }

    /// The blur provider, if one has been provided.
    pub fn blur(&self) -> Option<Arc<dyn BlurProvider>> {
        self.blur.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Wait until a transcoder is available.
    ///
    /// Resolves as soon as [`provide_transcoder`](Self::provide_transcoder)
    /// is called. The slot is also re-checked every `poll_interval`.
    /// Returns [`BlurfadeError::Cancelled`] when `cancel` fires and
    /// [`BlurfadeError::CapabilityUnavailable`] when `timeout` elapses.
    pub async fn wait_for_transcoder(
        &self,
        cancel: &CancellationToken,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> BlurfadeResult<Arc<dyn Transcoder>> {
        let wait = self.wait_for_transcoder_inner(cancel, poll_interval);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "Transcoder never became available");
                BlurfadeError::capability_unavailable(TRANSCODER)
            })?,
            None => wait.await,
        }
    }

    async fn wait_for_transcoder_inner(
        &self,
        cancel: &CancellationToken,
        poll_interval: Duration,
    ) -> BlurfadeResult<Arc<dyn Transcoder>> {
        let mut rx = self.transcoder.subscribe();
        let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(transcoder) = current {
                return Ok(transcoder);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(BlurfadeError::Cancelled),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(BlurfadeError::capability_unavailable(TRANSCODER));
                    }
                }
                _ = ticker.tick() => {}
            }
        }
    }
}
