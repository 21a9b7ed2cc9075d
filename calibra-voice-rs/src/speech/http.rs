//! HTTP speech sink.
//!
//! Speaks through an engine exposing:
//! - `GET /status` → `{"speaking": bool, "model_loaded": bool}`
//! - `POST /speak` → `{"text", "summarize", "event_type", "start_reminder"}`
//! - `POST /cancel`
//! - `POST /set-voice` → `{"voice"}`, answered with `{"status": "ok"}` when accepted
//!
//! The engine interrupts its current speech on every `/speak`, so a single
//! worker task posts one utterance, waits until `/status` reports idle, then
//! posts the next. Cancelling bumps a generation counter; anything queued
//! under an older generation is dropped by the worker.
//!
//! After a successful probe the sink asks for the first configured voice the
//! engine accepts, so Portuguese text is not read with an English voice.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{SpeechError, SpeechSink};
use crate::config::SpeechConfig;

#[derive(Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
    summarize: bool,
    event_type: &'a str,
    start_reminder: bool,
}

#[derive(Serialize)]
struct SetVoiceRequest<'a> {
    voice: &'a str,
}

#[derive(Deserialize)]
struct SetVoiceResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    speaking: bool,
    model_loaded: Option<bool>,
}

enum Command {
    Speak { text: String, generation: u64 },
    Cancel,
    Flush(oneshot::Sender<()>),
}

struct Worker {
    client: Client,
    endpoint: String,
    event_type: String,
    poll_interval: Duration,
    utterance_timeout: Duration,
    generation: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

pub struct HttpSpeechSink {
    tx: mpsc::UnboundedSender<Command>,
    client: Client,
    endpoint: String,
    generation: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
    voices: Vec<String>,
    voice: Mutex<Option<String>>,
}

impl HttpSpeechSink {
    /// Start the delivery worker. Must be called inside a tokio runtime.
    pub fn spawn(config: &SpeechConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_else(|_| Client::new());

        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let generation = Arc::new(AtomicU64::new(0));
        let available = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            client: client.clone(),
            endpoint: endpoint.clone(),
            event_type: config.event_type.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(10)),
            utterance_timeout: Duration::from_secs(config.utterance_timeout_secs),
            generation: generation.clone(),
            available: available.clone(),
        };
        tokio::spawn(worker.run(rx));

        info!("Speech sink targeting {endpoint}");

        Self {
            tx,
            client,
            endpoint,
            generation,
            available,
            voices: config.voices.clone(),
            voice: Mutex::new(None),
        }
    }

    /// Check `/status` and remember whether the engine can speak. The first
    /// successful probe also selects a voice.
    pub async fn probe(&self) -> bool {
        let up = match self.client.get(format!("{}/status", self.endpoint)).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<StatusResponse>().await {
                Ok(status) => status.model_loaded != Some(false),
                Err(e) => {
                    warn!("Speech engine status parse error: {e}");
                    false
                }
            },
            Ok(resp) => {
                warn!("Speech engine status returned {}", resp.status());
                false
            }
            Err(e) => {
                debug!("Speech engine unreachable: {e}");
                false
            }
        };
        self.available.store(up, Ordering::Relaxed);

        if !up {
            // A restarted engine comes back with its default voice.
            self.set_selected_voice(None);
        } else if self.voice().is_none() {
            self.select_voice().await;
        }
        up
    }

    /// Voice accepted by the engine, if any.
    pub fn voice(&self) -> Option<String> {
        self.voice
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Offer the configured voices in order until the engine accepts one.
    pub async fn select_voice(&self) -> Option<String> {
        for candidate in &self.voices {
            match self.request_voice(candidate).await {
                Ok(true) => {
                    info!("Speech voice set to {candidate}");
                    self.set_selected_voice(Some(candidate.clone()));
                    return Some(candidate.clone());
                }
                Ok(false) => debug!("Speech engine rejected voice {candidate}"),
                Err(e) => {
                    warn!("Voice selection failed: {e}");
                    return None;
                }
            }
        }
        if !self.voices.is_empty() {
            warn!("No preferred voice available, keeping the engine default");
        }
        None
    }

    async fn request_voice(&self, voice: &str) -> Result<bool, SpeechError> {
        let resp = self
            .client
            .post(format!("{}/set-voice", self.endpoint))
            .json(&SetVoiceRequest { voice })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SpeechError::Status(resp.status()));
        }
        let body: SetVoiceResponse = resp.json().await?;
        if let Some(error) = body.error {
            debug!("Speech engine: {error}");
        }
        Ok(body.status == "ok")
    }

    fn set_selected_voice(&self, voice: Option<String>) {
        *self.voice.lock().unwrap_or_else(PoisonError::into_inner) = voice;
    }

    /// Wait until every command queued so far has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl SpeechSink for HttpSpeechSink {
    fn enqueue(&self, text: &str) -> Result<(), SpeechError> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.tx
            .send(Command::Speak {
                text: text.to_string(),
                generation,
            })
            .map_err(|_| SpeechError::Closed)
    }

    fn cancel_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Command::Cancel).is_err() {
            warn!("Speech queue closed, cannot cancel");
        }
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Speak { text, generation } => {
                    if generation != self.generation.load(Ordering::SeqCst) {
                        debug!("Dropping cancelled utterance");
                        continue;
                    }
                    match self.speak(&text).await {
                        Ok(()) => {
                            self.available.store(true, Ordering::Relaxed);
                            self.wait_until_idle(generation).await;
                        }
                        Err(e) => {
                            if matches!(&e, SpeechError::Request(err) if err.is_connect()) {
                                self.available.store(false, Ordering::Relaxed);
                            }
                            warn!("Failed to deliver utterance: {e}");
                        }
                    }
                }
                Command::Cancel => {
                    if let Err(e) = self.client.post(format!("{}/cancel", self.endpoint)).send().await {
                        warn!("Speech cancel request failed: {e}");
                    }
                }
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Speech worker stopped");
    }

    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let resp = self
            .client
            .post(format!("{}/speak", self.endpoint))
            .json(&SpeakRequest {
                text,
                summarize: false,
                event_type: &self.event_type,
                start_reminder: false,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SpeechError::Status(resp.status()));
        }
        debug!("Delivered utterance ({} chars)", text.len());
        Ok(())
    }

    /// Poll `/status` until the engine stops speaking, a cancel arrives, or
    /// the per-utterance timeout elapses.
    async fn wait_until_idle(&self, generation: u64) {
        let started = Instant::now();
        loop {
            tokio::time::sleep(self.poll_interval).await;

            if generation != self.generation.load(Ordering::SeqCst) {
                return;
            }
            if started.elapsed() >= self.utterance_timeout {
                warn!("Utterance still playing after {:?}, moving on", self.utterance_timeout);
                return;
            }

            let speaking = match self.client.get(format!("{}/status", self.endpoint)).send().await {
                Ok(resp) => resp
                    .json::<StatusResponse>()
                    .await
                    .map(|s| s.speaking)
                    .unwrap_or(false),
                Err(e) => {
                    debug!("Status poll failed: {e}");
                    false
                }
            };
            if !speaking {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::extract::State;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    /// Engine that keeps "speaking" for `speak_for` after every `/speak`.
    #[derive(Clone, Default)]
    struct FakeEngine {
        speak_for: Duration,
        known_voices: Vec<&'static str>,
        spoken: Arc<Mutex<Vec<String>>>,
        // `/speak` calls that cut off an utterance still playing
        interrupted: Arc<Mutex<u32>>,
        cancels: Arc<Mutex<u32>>,
        voice_requests: Arc<Mutex<Vec<String>>>,
        busy_until: Arc<Mutex<Option<Instant>>>,
    }

    impl FakeEngine {
        fn speaking(&self) -> bool {
            self.busy_until
                .lock()
                .unwrap()
                .is_some_and(|until| Instant::now() < until)
        }

        fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }
    }

    async fn fake_status(State(engine): State<FakeEngine>) -> Json<Value> {
        Json(json!({"speaking": engine.speaking(), "model_loaded": true}))
    }

    async fn fake_speak(State(engine): State<FakeEngine>, Json(body): Json<Value>) -> Json<Value> {
        if engine.speaking() {
            *engine.interrupted.lock().unwrap() += 1;
        }
        engine
            .spoken
            .lock()
            .unwrap()
            .push(body["text"].as_str().unwrap_or_default().to_string());
        *engine.busy_until.lock().unwrap() = Some(Instant::now() + engine.speak_for);
        Json(json!({"status": "speaking"}))
    }

    async fn fake_cancel(State(engine): State<FakeEngine>) -> Json<Value> {
        *engine.cancels.lock().unwrap() += 1;
        *engine.busy_until.lock().unwrap() = None;
        Json(json!({"status": "cancelled"}))
    }

    async fn fake_set_voice(State(engine): State<FakeEngine>, Json(body): Json<Value>) -> Json<Value> {
        let voice = body["voice"].as_str().unwrap_or_default().to_string();
        engine.voice_requests.lock().unwrap().push(voice.clone());
        if engine.known_voices.contains(&voice.as_str()) {
            Json(json!({"status": "ok", "voice": voice}))
        } else {
            Json(json!({"status": "error", "error": format!("Unknown voice: {voice}")}))
        }
    }

    async fn serve_engine(engine: FakeEngine) -> String {
        let app = Router::new()
            .route("/status", get(fake_status))
            .route("/speak", post(fake_speak))
            .route("/cancel", post(fake_cancel))
            .route("/set-voice", post(fake_set_voice))
            .with_state(engine);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn start_fake_engine() -> (FakeEngine, String) {
        let engine = FakeEngine::default();
        let endpoint = serve_engine(engine.clone()).await;
        (engine, endpoint)
    }

    async fn start_busy_engine(speak_for: Duration) -> (FakeEngine, String) {
        let engine = FakeEngine {
            speak_for,
            ..FakeEngine::default()
        };
        let endpoint = serve_engine(engine.clone()).await;
        (engine, endpoint)
    }

    fn config_for(endpoint: &str) -> SpeechConfig {
        SpeechConfig {
            endpoint: endpoint.to_string(),
            poll_interval_ms: 10,
            utterance_timeout_secs: 2,
            ..SpeechConfig::default()
        }
    }

    #[tokio::test]
    async fn utterances_reach_the_engine_in_order() {
        let (engine, endpoint) = start_fake_engine().await;
        let sink = HttpSpeechSink::spawn(&config_for(&endpoint));

        assert!(sink.probe().await);
        for text in ["um", "dois", "três"] {
            sink.enqueue(text).unwrap();
        }
        sink.flush().await;

        assert_eq!(engine.spoken(), vec!["um", "dois", "três"]);
    }

    #[tokio::test]
    async fn each_utterance_plays_to_the_end_before_the_next() {
        let (engine, endpoint) = start_busy_engine(Duration::from_millis(150)).await;
        let sink = HttpSpeechSink::spawn(&config_for(&endpoint));

        let started = Instant::now();
        for text in ["um", "dois", "três"] {
            sink.enqueue(text).unwrap();
        }
        sink.flush().await;

        assert_eq!(engine.spoken(), vec!["um", "dois", "três"]);
        assert_eq!(*engine.interrupted.lock().unwrap(), 0);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test]
    async fn cancel_while_speaking_drops_the_rest_of_the_queue() {
        let (engine, endpoint) = start_busy_engine(Duration::from_millis(400)).await;
        let sink = HttpSpeechSink::spawn(&config_for(&endpoint));

        for text in ["um", "dois", "três"] {
            sink.enqueue(text).unwrap();
        }
        let deadline = Instant::now() + Duration::from_secs(2);
        while engine.spoken().is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(engine.speaking());

        sink.cancel_all();
        sink.enqueue("novo").unwrap();
        sink.flush().await;

        assert_eq!(engine.spoken(), vec!["um", "novo"]);
        assert_eq!(*engine.cancels.lock().unwrap(), 1);
        assert_eq!(*engine.interrupted.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn stuck_engine_is_abandoned_after_the_utterance_timeout() {
        let (engine, endpoint) = start_busy_engine(Duration::from_secs(60)).await;
        let sink = HttpSpeechSink::spawn(&SpeechConfig {
            utterance_timeout_secs: 1,
            ..config_for(&endpoint)
        });

        let started = Instant::now();
        sink.enqueue("primeiro").unwrap();
        sink.enqueue("segundo").unwrap();
        sink.flush().await;

        assert_eq!(engine.spoken(), vec!["primeiro", "segundo"]);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn cancel_drops_queued_utterances() {
        let (engine, endpoint) = start_fake_engine().await;
        let sink = HttpSpeechSink::spawn(&config_for(&endpoint));

        sink.enqueue("antigo 1").unwrap();
        sink.enqueue("antigo 2").unwrap();
        sink.cancel_all();
        sink.enqueue("novo").unwrap();
        sink.flush().await;

        assert_eq!(engine.spoken(), vec!["novo"]);
        assert_eq!(*engine.cancels.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn first_voice_the_engine_knows_is_selected_once() {
        let engine = FakeEngine {
            known_voices: vec!["pf_dora", "pm_alex"],
            ..FakeEngine::default()
        };
        let endpoint = serve_engine(engine.clone()).await;
        let sink = HttpSpeechSink::spawn(&SpeechConfig {
            voices: vec!["pt_luciana".into(), "pf_dora".into(), "pm_alex".into()],
            ..config_for(&endpoint)
        });

        assert!(sink.probe().await);
        assert_eq!(sink.voice().as_deref(), Some("pf_dora"));
        assert_eq!(*engine.voice_requests.lock().unwrap(), vec!["pt_luciana", "pf_dora"]);

        assert!(sink.probe().await);
        assert_eq!(engine.voice_requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_voices_keep_the_engine_default() {
        let (engine, endpoint) = start_fake_engine().await;
        let sink = HttpSpeechSink::spawn(&config_for(&endpoint));

        assert!(sink.probe().await);
        assert_eq!(sink.voice(), None);
        assert_eq!(engine.voice_requests.lock().unwrap().len(), 3);

        sink.enqueue("olá").unwrap();
        sink.flush().await;
        assert_eq!(engine.spoken(), vec!["olá"]);
    }

    #[tokio::test]
    async fn unreachable_engine_is_reported_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = HttpSpeechSink::spawn(&config_for(&format!("http://{addr}")));
        assert!(!sink.probe().await);
        assert!(!sink.is_available());
        assert_eq!(sink.voice(), None);

        sink.enqueue("ninguém ouve").unwrap();
        sink.flush().await;
        assert!(!sink.is_available());
    }
}
