//! Request coordination: one outstanding completion call at a time

use std::sync::Arc;

use codegen_ai::{BoxedClient, ErrorKind, Message, Role};
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    events::SessionEvent,
    handle::SessionHandle,
    prompt::{Prompt, ValidationError},
    transcript::TranscriptStore,
};

/// Callback invoked once after every settled request
pub type RefreshHook = Arc<dyn Fn() + Send + Sync>;

/// What happened to a call to [`RequestCoordinator::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Both messages were appended
    Completed(Message),
    /// The prompt was invalid; nothing was sent
    Rejected(ValidationError),
    /// Another request was outstanding; nothing was sent
    Busy,
    /// The call failed; the transcript is unchanged
    Failed { kind: ErrorKind, message: String },
    /// The call was aborted; the transcript is unchanged
    Cancelled,
}

/// Serializes prompts into completion calls and applies their results
pub struct RequestCoordinator {
    client: BoxedClient,
    transcript: TranscriptStore,
    handle: SessionHandle,
    event_tx: broadcast::Sender<SessionEvent>,
    refresh: Option<RefreshHook>,
}

impl RequestCoordinator {
    /// Create a coordinator with an empty transcript
    pub fn new(client: BoxedClient) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            client,
            transcript: TranscriptStore::new(),
            handle: SessionHandle::new(),
            event_tx,
            refresh: None,
        }
    }

    /// Set the hook notified after each settled request
    pub fn with_refresh(mut self, refresh: impl Fn() + Send + Sync + 'static) -> Self {
        self.refresh = Some(Arc::new(refresh));
        self
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for aborting from outside
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub fn is_pending(&self) -> bool {
        self.handle.is_pending()
    }

    /// Abort the outstanding request
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Validate `prompt_text`, send it with the full history and apply the reply.
    ///
    /// Never returns an error: failures are logged, broadcast as
    /// [`SessionEvent::RequestFailed`] and leave the transcript untouched.
    pub async fn submit(&self, prompt_text: &str) -> SubmitOutcome {
        let prompt = match Prompt::parse(prompt_text) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::debug!("rejected prompt: {}", e);
                return SubmitOutcome::Rejected(e);
            }
        };

        let Some(cancel) = self.handle.try_begin() else {
            tracing::debug!("ignoring submit while a request is pending");
            return SubmitOutcome::Busy;
        };
        let guard = InflightGuard {
            handle: self.handle.clone(),
            event_tx: self.event_tx.clone(),
        };
        let _ = self
            .event_tx
            .send(SessionEvent::PendingChanged { pending: true });

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("submit", %request_id, client = %self.client.name());
        let outcome = self.run(prompt, cancel).instrument(span).await;

        // pending must be cleared before the refresh hook runs
        drop(guard);
        if let Some(ref refresh) = self.refresh {
            refresh();
        }
        outcome
    }

    async fn run(
        &self,
        prompt: Prompt,
        cancel: tokio_util::sync::CancellationToken,
    ) -> SubmitOutcome {
        let user_message = Message::user(prompt.into_string());
        let mut history = self.transcript.all();
        history.push(user_message.clone());

        tracing::debug!(messages = history.len(), "issuing completion request");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.client.complete(&history) => Some(result),
        };

        let result = match result {
            Some(result) => result,
            None => {
                tracing::info!("completion request cancelled");
                let _ = self.event_tx.send(SessionEvent::RequestCancelled);
                return SubmitOutcome::Cancelled;
            }
        };

        let reply = result.and_then(|reply| match reply.role() {
            Role::Assistant => Ok(reply),
            Role::User => Err(codegen_ai::Error::malformed(
                "expected assistant role, got user",
            )),
        });

        match reply {
            Ok(reply) => {
                let appended = vec![user_message, reply.clone()];
                self.transcript.append(appended.clone());
                tracing::debug!(transcript = self.transcript.len(), "reply appended");
                let _ = self
                    .event_tx
                    .send(SessionEvent::MessagesAppended { messages: appended });
                SubmitOutcome::Completed(reply)
            }
            Err(e) => {
                let kind = e.kind();
                tracing::error!(kind = %kind, error = %e, "completion request failed");
                let message = e.to_string();
                let _ = self.event_tx.send(SessionEvent::RequestFailed {
                    kind,
                    message: message.clone(),
                });
                SubmitOutcome::Failed { kind, message }
            }
        }
    }
}

/// Returns the session to idle even if the submit future is dropped mid-flight.
struct InflightGuard {
    handle: SessionHandle,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.handle.finish();
        let _ = self
            .event_tx
            .send(SessionEvent::PendingChanged { pending: false });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codegen_ai::CompletionClient;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Canned behaviour for one call
    enum Scripted {
        Reply(Message),
        Transport,
        Server(u16),
        Malformed,
    }

    impl Scripted {
        fn into_result(self) -> codegen_ai::Result<Message> {
            match self {
                Scripted::Reply(m) => Ok(m),
                Scripted::Transport => {
                    // reqwest defers URL errors to build(), which gives us a real reqwest::Error
                    let err = reqwest::Client::new()
                        .get("not a url")
                        .build()
                        .unwrap_err();
                    Err(codegen_ai::Error::Transport(err))
                }
                Scripted::Server(status) => Err(codegen_ai::Error::server(status, "boom")),
                Scripted::Malformed => Err(codegen_ai::Error::malformed("missing role")),
            }
        }
    }

    /// A mock client that plays back scripted results.
    struct MockClient {
        script: Mutex<VecDeque<Scripted>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<Message>>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockClient {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(vec![]),
                gate: None,
            })
        }

        /// Each call blocks until the gate is notified
        fn gated(script: Vec<Scripted>, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(vec![]),
                gate: Some(gate),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for MockClient {
        async fn complete(&self, messages: &[Message]) -> codegen_ai::Result<Message> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push(messages.to_vec());
            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }
            let next = self
                .script
                .lock()
                .pop_front()
                .unwrap_or(Scripted::Reply(Message::assistant("done")));
            next.into_result()
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = vec![];
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn counting_refresh() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_success_appends_user_then_assistant() {
        let client = MockClient::new(vec![Scripted::Reply(Message::assistant("hi there"))]);
        let coordinator = RequestCoordinator::new(client.clone());

        let outcome = coordinator.submit("hello").await;

        assert_eq!(outcome, SubmitOutcome::Completed(Message::assistant("hi there")));
        assert_eq!(
            coordinator.transcript().all(),
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
        assert!(!coordinator.is_pending());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_transcript_empty() {
        let client = MockClient::new(vec![Scripted::Transport]);
        let coordinator = RequestCoordinator::new(client.clone());
        let mut rx = coordinator.subscribe();

        let outcome = coordinator.submit("hello").await;

        assert!(matches!(
            outcome,
            SubmitOutcome::Failed {
                kind: ErrorKind::Transport,
                ..
            }
        ));
        assert!(coordinator.transcript().is_empty());
        assert!(!coordinator.is_pending());

        let failures = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::RequestFailed { .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[tokio::test]
    async fn test_every_failure_kind_rolls_back() {
        let client = MockClient::new(vec![
            Scripted::Reply(Message::assistant("hi there")),
            Scripted::Transport,
            Scripted::Server(500),
            Scripted::Malformed,
            Scripted::Reply(Message::user("not an assistant")),
        ]);
        let coordinator = RequestCoordinator::new(client.clone());
        coordinator.submit("hello").await;
        let before = coordinator.transcript().all();

        let kinds: Vec<ErrorKind> = {
            let mut kinds = vec![];
            for _ in 0..4 {
                match coordinator.submit("again").await {
                    SubmitOutcome::Failed { kind, .. } => kinds.push(kind),
                    other => panic!("expected failure, got {:?}", other),
                }
                assert_eq!(coordinator.transcript().all(), before);
                assert!(!coordinator.is_pending());
            }
            kinds
        };

        assert_eq!(
            kinds,
            [
                ErrorKind::Transport,
                ErrorKind::Server,
                ErrorKind::MalformedResponse,
                ErrorKind::MalformedResponse,
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_while_pending_is_ignored() {
        let gate = Arc::new(Notify::new());
        let client = MockClient::gated(
            vec![
                Scripted::Reply(Message::assistant("hi there")),
                Scripted::Reply(Message::assistant("second")),
            ],
            gate.clone(),
        );
        let coordinator = RequestCoordinator::new(client.clone());

        let first = coordinator.submit("hello");
        let second = async {
            assert!(coordinator.is_pending());
            let outcome = coordinator.submit("again").await;
            // nothing changed while the first call is outstanding
            assert!(coordinator.transcript().is_empty());
            assert_eq!(client.calls(), 1);
            gate.notify_one();
            outcome
        };

        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, SubmitOutcome::Completed(Message::assistant("hi there")));
        assert_eq!(second, SubmitOutcome::Busy);
        assert_eq!(client.calls(), 1);
        assert_eq!(coordinator.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_busy_after_existing_transcript() {
        let gate = Arc::new(Notify::new());
        let client = MockClient::gated(
            vec![
                Scripted::Reply(Message::assistant("hi there")),
                Scripted::Reply(Message::assistant("later")),
            ],
            gate.clone(),
        );
        let coordinator = RequestCoordinator::new(client.clone());

        gate.notify_one();
        coordinator.submit("hello").await;
        assert_eq!(coordinator.transcript().len(), 2);

        let first = coordinator.submit("next");
        let second = async {
            let outcome = coordinator.submit("again").await;
            assert_eq!(coordinator.transcript().len(), 2);
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(second, SubmitOutcome::Busy);
        assert_eq!(first, SubmitOutcome::Completed(Message::assistant("later")));
        assert_eq!(client.calls(), 2);
        assert_eq!(coordinator.transcript().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_prompt_never_calls_client() {
        let client = MockClient::new(vec![]);
        let (refreshes, refresh) = counting_refresh();
        let coordinator = RequestCoordinator::new(client.clone()).with_refresh(refresh);
        let mut rx = coordinator.subscribe();

        assert_eq!(
            coordinator.submit("").await,
            SubmitOutcome::Rejected(ValidationError::Empty)
        );
        assert_eq!(
            coordinator.submit("   ").await,
            SubmitOutcome::Rejected(ValidationError::Empty)
        );

        assert_eq!(client.calls(), 0);
        assert!(coordinator.transcript().is_empty());
        assert!(!coordinator.is_pending());
        assert!(drain(&mut rx).is_empty());
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_is_trimmed() {
        let client = MockClient::new(vec![]);
        let coordinator = RequestCoordinator::new(client.clone());

        coordinator.submit("  hello \n").await;
        assert_eq!(coordinator.transcript().all()[0], Message::user("hello"));
    }

    #[tokio::test]
    async fn test_full_history_is_sent() {
        let client = MockClient::new(vec![
            Scripted::Reply(Message::assistant("hi there")),
            Scripted::Server(503),
            Scripted::Reply(Message::assistant("sure")),
        ]);
        let coordinator = RequestCoordinator::new(client.clone());

        coordinator.submit("hello").await;
        coordinator.submit("lost").await;
        coordinator.submit("again").await;

        let seen = client.seen.lock();
        assert_eq!(seen[0], vec![Message::user("hello")]);
        assert_eq!(
            seen[1],
            vec![
                Message::user("hello"),
                Message::assistant("hi there"),
                Message::user("lost"),
            ]
        );
        // the failed prompt is not part of later history
        assert_eq!(
            seen[2],
            vec![
                Message::user("hello"),
                Message::assistant("hi there"),
                Message::user("again"),
            ]
        );
    }

    #[tokio::test]
    async fn test_events_on_success() {
        let client = MockClient::new(vec![Scripted::Reply(Message::assistant("hi there"))]);
        let coordinator = RequestCoordinator::new(client);
        let mut rx = coordinator.subscribe();

        coordinator.submit("hello").await;

        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::PendingChanged { pending: true },
                SessionEvent::MessagesAppended {
                    messages: vec![Message::user("hello"), Message::assistant("hi there")],
                },
                SessionEvent::PendingChanged { pending: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_events_on_failure() {
        let client = MockClient::new(vec![Scripted::Server(500)]);
        let coordinator = RequestCoordinator::new(client);
        let mut rx = coordinator.subscribe();

        coordinator.submit("hello").await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SessionEvent::PendingChanged { pending: true });
        assert!(matches!(
            events[1],
            SessionEvent::RequestFailed {
                kind: ErrorKind::Server,
                ..
            }
        ));
        assert_eq!(events[2], SessionEvent::PendingChanged { pending: false });
    }

    #[tokio::test]
    async fn test_refresh_once_per_settled_request() {
        let client = MockClient::new(vec![
            Scripted::Reply(Message::assistant("hi there")),
            Scripted::Transport,
        ]);
        let (refreshes, refresh) = counting_refresh();
        let coordinator = RequestCoordinator::new(client).with_refresh(refresh);

        coordinator.submit("hello").await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        coordinator.submit("again").await;
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_sees_idle_state() {
        let client = MockClient::new(vec![]);
        let coordinator = RequestCoordinator::new(client);
        let observed = Arc::new(Mutex::new(None));

        let handle = coordinator.handle();
        let slot = observed.clone();
        let coordinator = coordinator.with_refresh(move || {
            *slot.lock() = Some(handle.is_pending());
        });

        coordinator.submit("hello").await;
        assert_eq!(*observed.lock(), Some(false));
    }

    #[tokio::test]
    async fn test_abort_returns_to_idle() {
        let gate = Arc::new(Notify::new());
        let client = MockClient::gated(
            vec![
                Scripted::Reply(Message::assistant("too late")),
                Scripted::Reply(Message::assistant("hi there")),
            ],
            gate.clone(),
        );
        let (refreshes, refresh) = counting_refresh();
        let coordinator = RequestCoordinator::new(client.clone()).with_refresh(refresh);
        let mut rx = coordinator.subscribe();
        let handle = coordinator.handle();

        let (outcome, ()) = tokio::join!(coordinator.submit("hello"), async {
            assert!(handle.is_pending());
            handle.abort();
        });

        assert_eq!(outcome, SubmitOutcome::Cancelled);
        assert!(coordinator.transcript().is_empty());
        assert!(!coordinator.is_pending());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
        assert!(drain(&mut rx).contains(&SessionEvent::RequestCancelled));

        // the session is usable again; the aborted reply was never consumed
        gate.notify_one();
        let outcome = coordinator.submit("hello").await;
        assert_eq!(outcome, SubmitOutcome::Completed(Message::assistant("too late")));
        assert_eq!(coordinator.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_abort_while_idle_is_noop() {
        let client = MockClient::new(vec![]);
        let coordinator = RequestCoordinator::new(client);
        coordinator.abort();

        let outcome = coordinator.submit("hello").await;
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_dropped_submit_releases_pending() {
        let gate = Arc::new(Notify::new());
        let client = MockClient::gated(vec![], gate);
        let coordinator = RequestCoordinator::new(client);

        {
            let submit = coordinator.submit("hello");
            tokio::pin!(submit);
            let polled = tokio::time::timeout(std::time::Duration::from_millis(20), &mut submit).await;
            assert!(polled.is_err());
            assert!(coordinator.is_pending());
        }

        assert!(!coordinator.is_pending());
        assert!(coordinator.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_state_snapshot_and_placeholder() {
        let gate = Arc::new(Notify::new());
        let client = MockClient::gated(vec![], gate.clone());
        let coordinator = RequestCoordinator::new(client);

        assert!(coordinator.transcript().snapshot(coordinator.is_pending()).shows_placeholder());

        let (_, ()) = tokio::join!(coordinator.submit("hello"), async {
            let state = coordinator.transcript().snapshot(coordinator.is_pending());
            assert!(state.pending);
            assert!(!state.shows_placeholder());
            gate.notify_one();
        });

        let state = coordinator.transcript().snapshot(coordinator.is_pending());
        assert!(!state.pending);
        assert_eq!(state.messages.len(), 2);
        assert!(!state.shows_placeholder());
    }
}
