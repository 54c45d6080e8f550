//! Per-user session state and the generate action.
//!
//! `Idle → FetchingSource (uncached URL only) → Generating → Idle`, with any
//! failure returning straight to `Idle`. The phase is published on a watch
//! channel so observers never need the session itself.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use uuid::Uuid;

use codecontext_core::{TurnError, TurnEvent, TurnEventKind, TurnPhase};
use codecontext_logging::TurnEventLogger;
use codecontext_source::{SourceCache, SourceFetcher};

use crate::api_key::{ApiKeyState, ApiKeyView};
use crate::engine::ConversationEngine;
use crate::transcript::Transcript;

/// What a successful generate action produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub transcript: String,
    /// True when the source went over the network this turn.
    pub fetched: bool,
}

/// Serializable view of the session for front-ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub github_url: String,
    pub user_prompt: String,
    pub phase: TurnPhase,
    pub in_flight: bool,
    pub transcript: String,
    pub latest_reply: Option<String>,
    pub turns: u64,
    pub cached_sources: usize,
    pub api_key: ApiKeyView,
}

/// Publishes a phase and drops back to `Idle` however the turn ends.
struct PhaseGuard {
    tx: Arc<watch::Sender<TurnPhase>>,
}

impl PhaseGuard {
    fn enter(tx: Arc<watch::Sender<TurnPhase>>, phase: TurnPhase) -> Self {
        tx.send_replace(phase);
        Self { tx }
    }

    fn advance(&self, phase: TurnPhase) {
        self.tx.send_replace(phase);
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        self.tx.send_replace(TurnPhase::Idle);
    }
}

pub struct Session {
    id: Uuid,
    fetcher: SourceFetcher,
    engine: ConversationEngine,
    api_key: ApiKeyState,
    github_url: String,
    user_prompt: String,
    cache: SourceCache,
    transcript: Transcript,
    latest_reply: Option<String>,
    turns: u64,
    phase_tx: Arc<watch::Sender<TurnPhase>>,
}

impl Session {
    pub fn new(fetcher: SourceFetcher, engine: ConversationEngine, api_key: ApiKeyState) -> Self {
        let (phase_tx, _) = watch::channel(TurnPhase::Idle);
        Self {
            id: Uuid::new_v4(),
            fetcher,
            engine,
            api_key,
            github_url: String::new(),
            user_prompt: String::new(),
            cache: SourceCache::new(),
            transcript: Transcript::new(),
            latest_reply: None,
            turns: 0,
            phase_tx: Arc::new(phase_tx),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn set_github_url(&mut self, url: impl Into<String>) {
        self.github_url = url.into();
    }

    pub fn set_user_prompt(&mut self, prompt: impl Into<String>) {
        self.user_prompt = prompt.into();
    }

    pub fn github_url(&self) -> &str {
        &self.github_url
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn api_key(&self) -> &ApiKeyState {
        &self.api_key
    }

    pub fn api_key_mut(&mut self) -> &mut ApiKeyState {
        &mut self.api_key
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn latest_reply(&self) -> Option<&str> {
        self.latest_reply.as_deref()
    }

    /// Cached source for the current URL, if it has been fetched.
    pub fn source_text(&self) -> Option<&str> {
        codecontext_source::normalize_source_url(&self.github_url)
            .ok()
            .and_then(|key| self.cache.get(&key))
    }

    pub fn phase(&self) -> TurnPhase {
        *self.phase_tx.borrow()
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.phase().is_in_flight()
    }

    /// Watch phase changes without holding the session.
    pub fn subscribe_phase(&self) -> watch::Receiver<TurnPhase> {
        self.phase_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let phase = self.phase();
        SessionSnapshot {
            id: self.id,
            github_url: self.github_url.clone(),
            user_prompt: self.user_prompt.clone(),
            phase,
            in_flight: phase.is_in_flight(),
            transcript: self.transcript.as_str().to_string(),
            latest_reply: self.latest_reply.clone(),
            turns: self.turns,
            cached_sources: self.cache.len(),
            api_key: self.api_key.view(),
        }
    }

    /// Run one fetch-then-generate turn for the current URL and prompt.
    ///
    /// On error the transcript, latest reply, and source cache are exactly as
    /// before the call.
    pub async fn generate(&mut self) -> Result<TurnOutcome, TurnError> {
        self.turns += 1;
        let turn = self.turns;

        let first_phase = if SourceFetcher::is_cached(&self.github_url, &self.cache) {
            TurnPhase::Generating
        } else {
            TurnPhase::FetchingSource
        };
        let guard = PhaseGuard::enter(Arc::clone(&self.phase_tx), first_phase);

        self.emit(
            turn,
            TurnEventKind::TurnStarted,
            json!({
                "url": self.github_url,
                "prompt_chars": self.user_prompt.chars().count(),
                "model": self.engine.model(),
            }),
        );

        let result = self.run_turn(turn, &guard).await;

        if let Err(e) = &result {
            self.emit(
                turn,
                TurnEventKind::TurnFailed,
                json!({
                    "category": e.category(),
                    "detail": e.to_string(),
                }),
            );
        }

        drop(guard);
        result
    }

    async fn run_turn(&mut self, turn: u64, guard: &PhaseGuard) -> Result<TurnOutcome, TurnError> {
        let source = self.fetcher.fetch(&self.github_url, &mut self.cache).await?;

        let kind = if source.from_cache {
            TurnEventKind::SourceReused
        } else {
            TurnEventKind::SourceFetched
        };
        self.emit(turn, kind, json!({ "url": source.url, "bytes": source.text.len() }));

        guard.advance(TurnPhase::Generating);

        let reply = self
            .engine
            .turn(
                &source.text,
                &self.transcript,
                &self.user_prompt,
                self.api_key.effective(),
            )
            .await?;

        self.emit(
            turn,
            TurnEventKind::ReplyGenerated,
            json!({
                "provider": reply.provider,
                "latency_ms": reply.latency_ms,
                "reply_chars": reply.reply.chars().count(),
            }),
        );

        self.transcript = reply.transcript;
        self.latest_reply = Some(reply.reply.clone());

        Ok(TurnOutcome {
            reply: reply.reply,
            transcript: self.transcript.as_str().to_string(),
            fetched: !source.from_cache,
        })
    }

    fn emit(&self, turn: u64, kind: TurnEventKind, payload: serde_json::Value) {
        TurnEventLogger::log_event(&TurnEvent::new(self.id, turn, kind, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use async_trait::async_trait;
    use codecontext_core::{
        FetchError, GenerationError, LlmProvider, LlmRequest, LlmResponse, SourceRelay,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const URL: &str = "https://raw.githubusercontent.com/x/y/main/a.py";

    /// Relay double: counts calls, optionally fails, records the phase it saw.
    #[derive(Default)]
    struct CountingRelay {
        calls: AtomicUsize,
        fail_status: Option<u16>,
        phase_rx: Mutex<Option<watch::Receiver<TurnPhase>>>,
        seen: Mutex<Vec<TurnPhase>>,
    }

    #[async_trait]
    impl SourceRelay for CountingRelay {
        async fn fetch_raw(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(rx) = self.phase_rx.lock().unwrap().as_ref() {
                self.seen.lock().unwrap().push(*rx.borrow());
            }
            match self.fail_status {
                Some(status) => Err(FetchError::from_status(url, status, "")),
                None => Ok(format!("print('{url}')")),
            }
        }
    }

    /// Provider double that records the phase during generation.
    struct RecordingProvider {
        inner: MockProvider,
        phase_rx: Mutex<Option<watch::Receiver<TurnPhase>>>,
        seen: Mutex<Vec<TurnPhase>>,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, req: &LlmRequest) -> Result<LlmResponse, GenerationError> {
            if let Some(rx) = self.phase_rx.lock().unwrap().as_ref() {
                self.seen.lock().unwrap().push(*rx.borrow());
            }
            self.inner.complete(req).await
        }
    }

    fn session_with(relay: Arc<CountingRelay>, provider: Arc<dyn LlmProvider>, key: Option<&str>) -> Session {
        let fetcher = SourceFetcher::new(relay);
        let engine = ConversationEngine::new(provider, "gemini-pro");
        let mut session = Session::new(fetcher, engine, ApiKeyState::new(key.map(String::from)));
        session.set_github_url(URL);
        session
    }

    #[tokio::test]
    async fn two_turn_scenario() {
        let relay = Arc::new(CountingRelay::default());
        let mock = Arc::new(MockProvider::new("mock").with_response("reply1").with_response("reply2"));
        let mut session = session_with(relay.clone(), mock.clone(), Some("key"));

        session.set_user_prompt("explain this file");
        let first = session.generate().await.unwrap();
        assert!(first.fetched);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.calls(), 1);
        assert_eq!(session.transcript().as_str(), "\nreply1");

        session.set_user_prompt("now optimize it");
        let second = session.generate().await.unwrap();
        assert!(!second.fetched);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
        assert_eq!(mock.calls(), 2);
        assert_eq!(session.transcript().as_str(), "\nreply1\nreply2");
        assert_eq!(second.transcript, "\nreply1\nreply2");
        assert_eq!(session.latest_reply(), Some("reply2"));

        // The second prompt carries the cached source and the first reply.
        let prompts = mock.prompts();
        assert!(prompts[1].contains(&format!("print('{URL}')")));
        assert!(prompts[1].contains("Previous conversation: \nreply1."));
    }

    #[tokio::test]
    async fn rate_limited_fetch_skips_generation() {
        let relay = Arc::new(CountingRelay {
            fail_status: Some(403),
            ..Default::default()
        });
        let mock = Arc::new(MockProvider::new("mock"));
        let mut session = session_with(relay.clone(), mock.clone(), Some("key"));
        session.set_user_prompt("explain");

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, TurnError::Fetch(FetchError::RateLimited { .. })));
        assert!(err.user_message().contains("rate limit"));
        assert_eq!(mock.calls(), 0);
        assert_eq!(session.source_text(), None);
        assert!(!session.is_request_in_flight());
    }

    #[tokio::test]
    async fn not_found_leaves_source_empty() {
        let relay = Arc::new(CountingRelay {
            fail_status: Some(404),
            ..Default::default()
        });
        let mut session = session_with(relay, Arc::new(MockProvider::new("mock")), Some("key"));

        let err = session.generate().await.unwrap_err();
        assert!(matches!(err, TurnError::Fetch(FetchError::NotFound { .. })));
        assert_eq!(session.source_text(), None);
        assert_eq!(session.snapshot().cached_sources, 0);
    }

    #[tokio::test]
    async fn failed_generation_keeps_previous_state() {
        let relay = Arc::new(CountingRelay::default());
        let mock = Arc::new(
            MockProvider::new("mock")
                .with_response("good")
                .with_error(GenerationError::NetworkFailure { message: "offline".into() }),
        );
        let mut session = session_with(relay.clone(), mock, Some("key"));

        session.generate().await.unwrap();
        let err = session.generate().await.unwrap_err();

        assert!(matches!(err, TurnError::Generation(GenerationError::NetworkFailure { .. })));
        assert_eq!(session.transcript().as_str(), "\ngood");
        assert_eq!(session.latest_reply(), Some("good"));
        assert!(session.source_text().is_some());
        assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_key_fails_after_fetch_and_keeps_source() {
        let relay = Arc::new(CountingRelay::default());
        let mock = Arc::new(MockProvider::new("mock"));
        let mut session = session_with(relay, mock.clone(), None);

        let err = session.generate().await.unwrap_err();
        assert_eq!(err.category(), "invalid_credential");
        assert_eq!(mock.calls(), 0);
        assert!(session.source_text().is_some());

        session.api_key_mut().set_input("user-key");
        session.generate().await.unwrap();
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn url_change_triggers_new_fetch() {
        let relay = Arc::new(CountingRelay::default());
        let mut session = session_with(relay.clone(), Arc::new(MockProvider::new("mock")), Some("key"));

        session.generate().await.unwrap();
        session.set_github_url("https://raw.githubusercontent.com/x/y/main/b.py");
        let outcome = session.generate().await.unwrap();

        assert!(outcome.fetched);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn in_flight_spans_fetch_and_generation() {
        let relay = Arc::new(CountingRelay::default());
        let provider = Arc::new(RecordingProvider {
            inner: MockProvider::new("mock"),
            phase_rx: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        });
        let mut session = session_with(relay.clone(), provider.clone(), Some("key"));
        *relay.phase_rx.lock().unwrap() = Some(session.subscribe_phase());
        *provider.phase_rx.lock().unwrap() = Some(session.subscribe_phase());

        assert!(!session.is_request_in_flight());
        session.generate().await.unwrap();
        assert!(!session.is_request_in_flight());
        session.generate().await.unwrap();
        assert_eq!(session.phase(), TurnPhase::Idle);

        assert_eq!(*relay.seen.lock().unwrap(), vec![TurnPhase::FetchingSource]);
        assert_eq!(
            *provider.seen.lock().unwrap(),
            vec![TurnPhase::Generating, TurnPhase::Generating]
        );
    }

    #[tokio::test]
    async fn in_flight_cleared_after_generation_error() {
        let relay = Arc::new(CountingRelay::default());
        let provider = Arc::new(RecordingProvider {
            inner: MockProvider::new("mock")
                .with_error(GenerationError::Unknown { message: "declined".into() }),
            phase_rx: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        });
        let mut session = session_with(relay, provider.clone(), Some("key"));
        *provider.phase_rx.lock().unwrap() = Some(session.subscribe_phase());

        assert!(session.generate().await.is_err());
        assert_eq!(*provider.seen.lock().unwrap(), vec![TurnPhase::Generating]);
        assert!(!session.is_request_in_flight());
    }
}
