//! Simulated speech backend
//!
//! Plays nothing. Each word of a request takes a fixed amount of time and a
//! stop request takes effect at the next word boundary, which makes playback
//! timing deterministic for headless runs and tests. The shared
//! [`SimulatedStats`] record what every engine did.

use crate::speech::engine::{FinishSignal, SpeechBackend, SynthesisEngine};
use crate::speech::options::Locale;
use crate::speech::request::SpeechRequest;
use crate::{Result, SpeakError};
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Counters shared by a simulated backend and all of its engines
#[derive(Debug, Default)]
pub struct SimulatedStats {
    created: AtomicUsize,
    released: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    finished: AtomicUsize,
    stopped: AtomicUsize,
    stop_requests: AtomicUsize,
    utterances: Mutex<Vec<String>>,
}

impl SimulatedStats {
    /// Engines created
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Engines dropped
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Engines that started playback and are not yet released
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously active engines seen
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Finish listeners that actually fired
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    /// Playbacks cut short at a word boundary
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Calls to `stop()` on any engine, whether or not playback was running
    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }

    /// Texts in the order playback started
    pub fn utterances(&self) -> Vec<String> {
        lock(&self.utterances).clone()
    }
}

/// Backend producing silent, word-timed engines
pub struct SimulatedBackend {
    word_time: Duration,
    callbacks: bool,
    voices: Vec<Locale>,
    stats: Arc<SimulatedStats>,
}

impl SimulatedBackend {
    pub fn new(word_time: Duration) -> Self {
        Self {
            word_time,
            callbacks: true,
            voices: default_voices(),
            stats: Arc::new(SimulatedStats::default()),
        }
    }

    /// Make engines behave like platforms without utterance callbacks
    pub fn without_callbacks(mut self) -> Self {
        self.callbacks = false;
        self
    }

    pub fn stats(&self) -> Arc<SimulatedStats> {
        Arc::clone(&self.stats)
    }
}

fn default_voices() -> Vec<Locale> {
    vec![
        Locale::new("en", Some("US".into()), "Simulated English", "simulated.en-US"),
        Locale::new("fr", Some("FR".into()), "Simulated French", "simulated.fr-FR"),
        Locale::new("de", Some("DE".into()), "Simulated German", "simulated.de-DE"),
    ]
}

impl SpeechBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn create_engine(&self) -> Result<Box<dyn SynthesisEngine>> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimulatedEngine {
            word_time: self.word_time,
            callbacks: self.callbacks,
            voices: self.voices.clone(),
            stats: Arc::clone(&self.stats),
            listener: Arc::new(Mutex::new(None)),
            stop_requested: Arc::new(AtomicBool::new(false)),
            speaking: Arc::new(AtomicBool::new(false)),
            task: None,
            played: false,
        }))
    }

    fn voices(&self) -> Result<Vec<Locale>> {
        Ok(self.voices.clone())
    }
}

/// One simulated engine; plays a single utterance
pub struct SimulatedEngine {
    word_time: Duration,
    callbacks: bool,
    voices: Vec<Locale>,
    stats: Arc<SimulatedStats>,
    listener: Arc<Mutex<Option<FinishSignal>>>,
    stop_requested: Arc<AtomicBool>,
    speaking: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    played: bool,
}

impl SynthesisEngine for SimulatedEngine {
    fn voices(&self) -> Result<Vec<Locale>> {
        Ok(self.voices.clone())
    }

    fn reports_completion(&self) -> bool {
        self.callbacks
    }

    fn play(&mut self, request: &SpeechRequest, signal: FinishSignal) -> Result<()> {
        if self.played {
            return Err(SpeakError::Platform(
                "Simulated engine already played its utterance".to_string(),
            ));
        }
        let handle = Handle::try_current()
            .map_err(|e| SpeakError::Platform(format!("No async runtime for playback: {}", e)))?;

        self.played = true;
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);
        lock(&self.stats.utterances).push(request.text().to_string());

        if self.callbacks {
            *lock(&self.listener) = Some(signal);
        }
        self.speaking.store(true, Ordering::SeqCst);

        let words = request.text().split_whitespace().count();
        let word_time = self.word_time;
        let pre_delay = request.params().pre_delay;
        let post_delay = request.params().post_delay;
        let listener = Arc::clone(&self.listener);
        let stop_requested = Arc::clone(&self.stop_requested);
        let speaking = Arc::clone(&self.speaking);
        let stats = Arc::clone(&self.stats);

        debug!("Simulating {} words at {:?} per word", words, word_time);
        self.task = Some(handle.spawn(async move {
            tokio::time::sleep(pre_delay).await;
            for spoken in 1..=words {
                tokio::time::sleep(word_time).await;
                if stop_requested.load(Ordering::SeqCst) {
                    debug!("Simulated playback stopped after word {}", spoken);
                    stats.stopped.fetch_add(1, Ordering::SeqCst);
                    speaking.store(false, Ordering::SeqCst);
                    return;
                }
            }
            tokio::time::sleep(post_delay).await;
            speaking.store(false, Ordering::SeqCst);

            let signal = lock(&listener).take();
            if let Some(signal) = signal {
                if signal.fire() {
                    stats.finished.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));

        Ok(())
    }

    fn is_speaking(&self) -> Result<bool> {
        Ok(self.speaking.load(Ordering::SeqCst))
    }

    fn stop(&mut self) -> Result<()> {
        self.stats.stop_requests.fetch_add(1, Ordering::SeqCst);
        self.stop_requested.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&mut self) -> Result<()> {
        lock(&self.listener).take();
        Ok(())
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        lock(&self.listener).take();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if self.played {
            self.stats.active.fetch_sub(1, Ordering::SeqCst);
        }
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::options::SpeechOptions;

    fn request(text: &str) -> SpeechRequest {
        SpeechRequest::build(text, &SpeechOptions::default(), &[], None)
    }

    #[tokio::test]
    async fn test_plays_to_completion() {
        let backend = SimulatedBackend::new(Duration::from_millis(5));
        let stats = backend.stats();
        let mut engine = backend.create_engine().unwrap();
        let (signal, rx) = FinishSignal::channel();

        engine.play(&request("one two three"), signal).unwrap();
        assert!(engine.is_speaking().unwrap());
        rx.await.unwrap();

        assert!(!engine.is_speaking().unwrap());
        assert_eq!(stats.finished(), 1);
        assert_eq!(stats.active(), 1);
        drop(engine);
        assert_eq!(stats.active(), 0);
        assert_eq!(stats.released(), 1);
    }

    #[tokio::test]
    async fn test_stop_at_word_boundary() {
        let backend = SimulatedBackend::new(Duration::from_millis(20));
        let stats = backend.stats();
        let mut engine = backend.create_engine().unwrap();
        let (signal, mut rx) = FinishSignal::channel();

        engine.play(&request("a b c d e f g h"), signal).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.stop().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(stats.stopped(), 1);
        assert_eq!(stats.stop_requests(), 1);
        assert_eq!(stats.finished(), 0);
        assert!(!engine.is_speaking().unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_detached_listener_never_fires() {
        let backend = SimulatedBackend::new(Duration::from_millis(5));
        let stats = backend.stats();
        let mut engine = backend.create_engine().unwrap();
        let (signal, mut rx) = FinishSignal::channel();

        engine.play(&request("hello"), signal).unwrap();
        engine.detach().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(stats.finished(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_single_use() {
        let backend = SimulatedBackend::new(Duration::from_millis(1));
        let mut engine = backend.create_engine().unwrap();
        let (first, _rx1) = FinishSignal::channel();
        let (second, _rx2) = FinishSignal::channel();

        engine.play(&request("hi"), first).unwrap();
        let err = engine.play(&request("again"), second).unwrap_err();
        assert!(err.is_platform());
    }

    #[test]
    fn test_play_requires_runtime() {
        let backend = SimulatedBackend::new(Duration::from_millis(1));
        let mut engine = backend.create_engine().unwrap();
        let (signal, _rx) = FinishSignal::channel();

        assert!(engine.play(&request("hi"), signal).unwrap_err().is_platform());
    }
}
