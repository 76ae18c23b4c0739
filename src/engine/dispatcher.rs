//! Single-consumer event loop.
//!
//! Every engine mutation is serialized through one tokio task, so the state
//! needs no locking. Events, focus switches, user messages and usage clears
//! share one bounded channel: each is applied against the state left by
//! everything sent before it. Only teardown bypasses the queue.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::state::{EngineState, Snapshot};
use super::update::update;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::EngineEvent;
use crate::model::{Message, SessionId};

/// Loads a session's persisted transcript when it gains focus.
pub trait HistoryLoader: Send + Sync {
    fn load_history(&self, session_id: &SessionId) -> Result<Vec<Message>, EngineError>;
}

/// Process lifecycle of the backend CLI. Implemented outside the engine.
pub trait SessionBackend: Send + Sync {
    fn create_session(&self, session_id: &SessionId) -> Result<(), EngineError>;
    fn send_message(&self, session_id: &SessionId, text: &str) -> Result<(), EngineError>;
    fn kill_session(&self, session_id: &SessionId) -> Result<(), EngineError>;
}

/// Items on the ordered channel. A barrier resolves once everything queued
/// before it has been applied.
#[derive(Debug)]
enum Inbound {
    Event(EngineEvent),
    Focus {
        session_id: Option<SessionId>,
        history: Vec<Message>,
        ack: oneshot::Sender<()>,
    },
    UserMessage {
        session_id: SessionId,
        text: String,
    },
    ClearUsage(SessionId),
    Barrier(oneshot::Sender<()>),
}

/// Producer handle for the event feed. Every sink obtained from one
/// dispatcher feeds the same single listener.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Inbound>,
}

impl EventSink {
    pub async fn send(&self, event: EngineEvent) -> Result<(), EngineError> {
        self.tx
            .send(Inbound::Event(event))
            .await
            .map_err(|_| EngineError::Closed)
    }

    /// For producers on plain threads (file watchers).
    pub fn blocking_send(&self, event: EngineEvent) -> Result<(), EngineError> {
        self.tx
            .blocking_send(Inbound::Event(event))
            .map_err(|_| EngineError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct Dispatcher {
    inbound: mpsc::Sender<Inbound>,
    teardown: oneshot::Sender<oneshot::Sender<EngineState>>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    task: JoinHandle<()>,
}

impl Dispatcher {
    /// Spawn the consumer task on the current tokio runtime.
    pub fn start(state: EngineState, config: &EngineConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (teardown_tx, teardown_rx) = oneshot::channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(state.snapshot()));

        let task = tokio::spawn(run(state, inbound_rx, teardown_rx, snapshot_tx));
        tracing::info!(capacity = config.channel_capacity, "dispatcher started");

        Self {
            inbound: inbound_tx,
            teardown: teardown_tx,
            snapshots: snapshot_rx,
            task,
        }
    }

    /// Sink bound to this dispatcher's one listener. Calling this repeatedly
    /// never registers a second listener.
    pub fn subscribe(&self) -> EventSink {
        EventSink {
            tx: self.inbound.clone(),
        }
    }

    pub fn snapshots(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// Wait until everything sent before this call has been applied.
    pub async fn flush(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Inbound::Barrier(tx)).await?;
        rx.await.map_err(|_| EngineError::Closed)
    }

    /// Focus `session_id` (or nothing), seeding its transcript with
    /// `history`. Events already queued are routed under the previous focus.
    /// Resolves once the switch is applied.
    pub async fn focus(
        &self,
        session_id: Option<SessionId>,
        history: Vec<Message>,
    ) -> Result<(), EngineError> {
        let (ack, done) = oneshot::channel();
        self.enqueue(Inbound::Focus {
            session_id,
            history,
            ack,
        })
        .await?;
        done.await.map_err(|_| EngineError::Closed)
    }

    /// Focus a session with history fetched from `loader`.
    pub async fn focus_from(
        &self,
        session_id: SessionId,
        loader: &dyn HistoryLoader,
    ) -> Result<(), EngineError> {
        let history = loader.load_history(&session_id)?;
        self.focus(Some(session_id), history).await
    }

    /// Forward user input to the backend and record it in the focused
    /// transcript once the backend accepted it, after anything already queued.
    pub async fn send_user_message(
        &self,
        backend: &dyn SessionBackend,
        session_id: SessionId,
        text: String,
    ) -> Result<(), EngineError> {
        backend.send_message(&session_id, &text)?;
        self.enqueue(Inbound::UserMessage { session_id, text }).await
    }

    /// Explicit session clear: zero the session's token counters.
    pub async fn clear_usage(&self, session_id: SessionId) -> Result<(), EngineError> {
        self.enqueue(Inbound::ClearUsage(session_id)).await
    }

    /// Tear the subscription down. Queued items are dropped, in-flight
    /// buffers discarded, and the state handed back so a new dispatcher can
    /// be started with the registry intact.
    pub async fn shutdown(self) -> Result<EngineState, EngineError> {
        let (done, state_rx) = oneshot::channel();
        self.teardown
            .send(done)
            .map_err(|_| EngineError::Closed)?;
        let state = state_rx.await.map_err(|_| EngineError::Closed)?;
        self.task
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?;
        Ok(state)
    }

    async fn enqueue(&self, item: Inbound) -> Result<(), EngineError> {
        self.inbound.send(item).await.map_err(|_| EngineError::Closed)
    }
}

async fn run(
    mut state: EngineState,
    mut inbound: mpsc::Receiver<Inbound>,
    mut teardown: oneshot::Receiver<oneshot::Sender<EngineState>>,
    snapshots: watch::Sender<Arc<Snapshot>>,
) {
    loop {
        tokio::select! {
            biased;

            done = &mut teardown => {
                inbound.close();
                state.teardown();
                publish(&snapshots, &state);
                match done {
                    Ok(done) => {
                        tracing::info!("dispatcher torn down");
                        let _ = done.send(state);
                    }
                    Err(_) => tracing::debug!("dispatcher handle dropped"),
                }
                return;
            }

            item = inbound.recv() => match item {
                Some(Inbound::Event(event)) => {
                    update(&mut state, event);
                    publish(&snapshots, &state);
                }
                Some(Inbound::Focus { session_id, history, ack }) => {
                    tracing::info!(session = ?session_id, history = history.len(), "focus changed");
                    state.focus(session_id, history);
                    publish(&snapshots, &state);
                    let _ = ack.send(());
                }
                Some(Inbound::UserMessage { session_id, text }) => {
                    if state.push_user_message(&session_id, &text, Utc::now()) {
                        publish(&snapshots, &state);
                    }
                }
                Some(Inbound::ClearUsage(session_id)) => {
                    if state.clear_usage(&session_id) {
                        publish(&snapshots, &state);
                    }
                }
                Some(Inbound::Barrier(done)) => {
                    let _ = done.send(());
                }
                None => return,
            },
        }
    }
}

fn publish(snapshots: &watch::Sender<Arc<Snapshot>>, state: &EngineState) {
    snapshots.send_replace(Arc::new(state.snapshot()));
}
