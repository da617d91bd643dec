//! Platform speech renderer
//!
//! Drives one request through its lifecycle:
//!
//! ```text
//! Idle -> Requested -> Playing -> { Finished | Cancelled } -> Released
//! ```
//!
//! Every path ends in `Released`, which detaches the finish listener and
//! drops the request and the engine exactly once.

use super::engine::{FinishSignal, SpeechBackend, SynthesisEngine};
use super::options::SpeechOptions;
use super::request::SpeechRequest;
use crate::{Result, SpeakError};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Default interval for polling engines without completion callbacks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// The engine played the whole utterance
    Finished,
    /// The cancellation signal fired first
    Cancelled,
}

/// Lifecycle of one render call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Requested,
    Playing,
    Finished,
    Cancelled,
    Released,
}

/// Exclusive owner of one engine and the one request it plays
pub struct RenderCall {
    engine: Option<Box<dyn SynthesisEngine>>,
    request: Option<SpeechRequest>,
    signal: Option<FinishSignal>,
    state: RenderState,
}

impl RenderCall {
    pub fn new(engine: Box<dyn SynthesisEngine>) -> Self {
        Self {
            engine: Some(engine),
            request: None,
            signal: None,
            state: RenderState::Idle,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn engine(&self) -> Option<&dyn SynthesisEngine> {
        self.engine.as_deref()
    }

    /// Attach the request this call will play
    pub fn prepare(&mut self, request: SpeechRequest) -> Result<()> {
        if self.state != RenderState::Idle {
            return Err(self.rejected("prepare"));
        }
        self.request = Some(request);
        self.state = RenderState::Requested;
        Ok(())
    }

    /// Start playback; the receiver resolves when the engine reports the end
    pub fn play(&mut self) -> Result<oneshot::Receiver<()>> {
        if self.state != RenderState::Requested {
            return Err(self.rejected("play"));
        }
        let (Some(engine), Some(request)) = (self.engine.as_mut(), self.request.as_ref()) else {
            return Err(SpeakError::Platform(
                "Render call has no engine or request".to_string(),
            ));
        };

        let (signal, finished) = FinishSignal::channel();
        engine.play(request, signal.clone())?;
        self.signal = Some(signal);
        self.state = RenderState::Playing;
        Ok(finished)
    }

    /// Whether the engine is still speaking; false once released
    pub fn is_speaking(&self) -> bool {
        match &self.engine {
            Some(engine) => engine.is_speaking().unwrap_or_else(|e| {
                warn!("Failed to query speaking state: {}", e);
                false
            }),
            None => false,
        }
    }

    /// Record natural completion
    pub fn finish(&mut self) {
        if self.state == RenderState::Playing {
            self.state = RenderState::Finished;
        }
    }

    /// Stop the engine at the nearest word boundary
    ///
    /// A no-op unless playing.
    pub fn cancel(&mut self) -> Result<()> {
        if self.state != RenderState::Playing {
            debug!("Cancel ignored in state {:?}", self.state);
            return Ok(());
        }
        self.state = RenderState::Cancelled;
        match self.engine.as_mut() {
            Some(engine) => engine.stop(),
            None => Ok(()),
        }
    }

    /// Detach the listener and drop the request and engine
    ///
    /// A call abandoned mid-playback stops its engine first. Idempotent:
    /// releasing twice does nothing the second time.
    pub fn release(&mut self) -> Result<()> {
        if self.state == RenderState::Released {
            return Ok(());
        }
        let was_playing = self.state == RenderState::Playing;
        self.state = RenderState::Released;

        if was_playing {
            debug!("Releasing a call that is still playing");
            if let Some(engine) = self.engine.as_mut() {
                if let Err(e) = engine.stop() {
                    warn!("Failed to stop abandoned playback: {}", e);
                }
            }
        }

        let mut result = Ok(());
        if let Some(signal) = self.signal.take() {
            signal.disarm();
            if let Some(engine) = self.engine.as_mut() {
                result = engine.detach();
            }
            self.engine = None;
            if cfg!(debug_assertions) && signal.holders() > 1 {
                warn!(
                    "Finish listener still retained by {} holders after release",
                    signal.holders() - 1
                );
            }
        }
        self.engine = None;
        self.request = None;
        debug!("Render call released");
        result
    }

    fn rejected(&self, op: &str) -> SpeakError {
        SpeakError::Platform(format!("Cannot {} a render call in state {:?}", op, self.state))
    }
}

impl Drop for RenderCall {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release render call: {}", e);
        }
    }
}

/// Renders requests on a fresh engine per call
pub struct Renderer {
    backend: Arc<dyn SpeechBackend>,
    poll_interval: Duration,
    fallback_language: Option<String>,
}

impl Renderer {
    pub fn new(backend: Arc<dyn SpeechBackend>) -> Self {
        Self {
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fallback_language: crate::platform::system_language(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        // tokio intervals must be non-zero
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Language used when the caller's locale is absent or not installed
    pub fn with_fallback_language(mut self, language: Option<String>) -> Self {
        self.fallback_language = language;
        self
    }

    pub fn backend(&self) -> &Arc<dyn SpeechBackend> {
        &self.backend
    }

    /// Play `text` and wait for it to finish or for `cancel` to fire
    ///
    /// Cancellation stops the engine and resolves as
    /// [`SpeakOutcome::Cancelled`]. Setup failures are returned; failures
    /// while releasing after playback are only logged.
    pub async fn render(
        &self,
        text: &str,
        options: &SpeechOptions,
        cancel: &CancellationToken,
    ) -> Result<SpeakOutcome> {
        if cancel.is_cancelled() {
            debug!("Render skipped, already cancelled");
            return Ok(SpeakOutcome::Cancelled);
        }

        let mut call = RenderCall::new(self.backend.create_engine()?);

        let voices = match call.engine().map(|e| e.voices()) {
            Some(Ok(voices)) => voices,
            Some(Err(e)) => {
                warn!("Voice lookup failed, using engine default: {}", e);
                Vec::new()
            }
            None => Vec::new(),
        };
        let request =
            SpeechRequest::build(text, options, &voices, self.fallback_language.as_deref());
        call.prepare(request)?;

        let finished = call.play()?;
        let outcome = tokio::select! {
            _ = wait_finished(finished, &call, self.poll_interval) => SpeakOutcome::Finished,
            _ = cancel.cancelled() => SpeakOutcome::Cancelled,
        };

        match outcome {
            SpeakOutcome::Finished => call.finish(),
            SpeakOutcome::Cancelled => {
                if let Err(e) = call.cancel() {
                    warn!("Failed to stop engine on cancel: {}", e);
                }
            }
        }

        if let Err(e) = call.release() {
            warn!("Failed to release render call: {}", e);
        }
        debug!("Render outcome: {:?}", outcome);
        Ok(outcome)
    }
}

/// Resolve when the engine reports the end of its utterance
///
/// Engines without callbacks are polled for their speaking state instead.
async fn wait_finished(finished: oneshot::Receiver<()>, call: &RenderCall, interval: Duration) {
    let reports = call.engine().map_or(false, |e| e.reports_completion());
    if reports {
        if finished.await.is_err() {
            warn!("Finish listener dropped without firing");
        }
        return;
    }

    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately; give the platform a chance to start
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if !call.is_speaking() {
            return;
        }
    }
}
