//! SyncCoordinator - the per-device sync actor
//!
//! All store access happens inside [`SyncCoordinator::run`], which drains
//! three sources in one `tokio::select!` loop:
//!
//! ```text
//! CoordinatorHandle ──→ inbox (mpsc) ──┐
//! TransportSink ──→ transport_rx ──────┼──→ SyncCoordinator ──→ outbox task ──→ TransportAdapter
//! settle timer (primary only) ─────────┘            │
//!                                                   └──→ broadcast<SyncEvent>
//! ```
//!
//! Transport callbacks only ever enqueue; the coordinator owns the store.
//! Outbound deliveries are handed to the outbox task so the loop never
//! waits on the peer.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use scorelink_core::config::SyncConfig;
use scorelink_core::domain::{Command, Interval, Notification, PreferenceSet, Role, Team};
use scorelink_core::ports::{
    IPeerTransport, IPreferenceStore, IRecordStore, IStoreTransaction, TransportEvent,
    TransportSink,
};
use scorelink_core::wire::{to_payload, DecodeError, SyncPayload, WireMap, WireMessage};
use scorelink_reconcile::ReconciliationEngine;
use scorelink_transport::TransportAdapter;

use crate::events::{ChangeOrigin, SyncEvent};
use crate::mutation::{self, LocalMutation};
use crate::outbox::{run_outbox, Outbound};
use crate::SyncError;

/// Everything a UI needs to draw the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub teams: Vec<Team>,
    pub intervals: Vec<Interval>,
    pub preferences: PreferenceSet,
}

type Reply<T> = oneshot::Sender<Result<T, SyncError>>;

enum Request {
    Mutate {
        mutation: LocalMutation,
        reply: Reply<()>,
    },
    SendCommand {
        command: Command,
        reply: Reply<()>,
    },
    SendPreferences {
        preferences: PreferenceSet,
        reply: Reply<()>,
    },
    NotifyDataChanged {
        reply: Reply<()>,
    },
    PushNow {
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<BoardSnapshot>,
    },
}

// ============================================================================
// CoordinatorHandle
// ============================================================================

/// Cloneable front-end to a running [`SyncCoordinator`]
///
/// Every method enqueues a request and waits for the coordinator to
/// process it. Calls fail with [`SyncError::CoordinatorStopped`] once the
/// coordinator has shut down.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    role: Role,
    tx: mpsc::Sender<Request>,
    events: broadcast::Sender<SyncEvent>,
    sink: TransportSink,
}

impl CoordinatorHandle {
    pub fn role(&self) -> Role {
        self.role
    }

    /// Applies a local edit, then replicates the new state to the peer
    pub async fn mutate(&self, mutation: LocalMutation) -> Result<(), SyncError> {
        self.request(|reply| Request::Mutate { mutation, reply }).await
    }

    /// Runs `command` locally, then asks the peer to run it too
    pub async fn send_command(&self, command: Command) -> Result<(), SyncError> {
        self.request(|reply| Request::SendCommand { command, reply }).await
    }

    /// Stores `preferences` locally and sends them to the peer
    pub async fn send_preferences(&self, preferences: PreferenceSet) -> Result<(), SyncError> {
        self.request(|reply| Request::SendPreferences { preferences, reply })
            .await
    }

    /// Tells the peer that shared data changed outside the scoreboard
    pub async fn notify_data_changed(&self) -> Result<(), SyncError> {
        self.request(|reply| Request::NotifyDataChanged { reply }).await
    }

    /// Pushes the full current state regardless of role
    pub async fn push_now(&self) -> Result<(), SyncError> {
        self.request(|reply| Request::PushNow { reply }).await
    }

    /// Reads the committed board
    pub async fn snapshot(&self) -> Result<BoardSnapshot, SyncError> {
        self.request(|reply| Request::Snapshot { reply }).await
    }

    /// Subscribes to coordinator events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Sink the transport should push inbound events to
    pub fn transport_sink(&self) -> TransportSink {
        self.sink.clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| SyncError::CoordinatorStopped)?;
        rx.await.map_err(|_| SyncError::CoordinatorStopped)?
    }
}

// ============================================================================
// SyncCoordinator
// ============================================================================

/// Per-device sync actor
pub struct SyncCoordinator {
    inbox: mpsc::Receiver<Request>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    adapter: TransportAdapter,
    outbox_rx: mpsc::UnboundedReceiver<Outbound>,
    state: CoordinatorState,
}

/// Everything the request and event handlers touch
struct CoordinatorState {
    role: Role,
    store: Arc<dyn IRecordStore>,
    prefs: Arc<dyn IPreferenceStore>,
    engine: ReconciliationEngine,
    events: broadcast::Sender<SyncEvent>,
    outbox: mpsc::UnboundedSender<Outbound>,
    settle_delay: Duration,
    settle: Option<Pin<Box<Sleep>>>,
    activated: bool,
}

impl SyncCoordinator {
    /// Creates a coordinator and its handle
    ///
    /// The coordinator does nothing until [`run`](Self::run) is awaited.
    /// Attach the transport to [`CoordinatorHandle::transport_sink`] before
    /// activating its session.
    pub fn new(
        role: Role,
        store: Arc<dyn IRecordStore>,
        transport: Arc<dyn IPeerTransport>,
        prefs: Arc<dyn IPreferenceStore>,
        config: &SyncConfig,
    ) -> (SyncCoordinator, CoordinatorHandle) {
        let (tx, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let (sink, transport_rx) = TransportSink::channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (outbox, outbox_rx) = mpsc::unbounded_channel();

        let coordinator = SyncCoordinator {
            inbox,
            transport_rx,
            adapter: TransportAdapter::new(transport),
            outbox_rx,
            state: CoordinatorState {
                role,
                store,
                prefs,
                engine: ReconciliationEngine::new(),
                events: events.clone(),
                outbox,
                settle_delay: config.settle_delay(),
                settle: None,
                activated: false,
            },
        };
        let handle = CoordinatorHandle {
            role,
            tx,
            events,
            sink,
        };
        (coordinator, handle)
    }

    /// Processes requests and transport events until `shutdown` fires or
    /// every handle is dropped
    ///
    /// Deliveries already queued are flushed before this returns.
    pub async fn run(self, shutdown: CancellationToken) {
        let SyncCoordinator {
            mut inbox,
            mut transport_rx,
            adapter,
            outbox_rx,
            mut state,
        } = self;

        let outbox: JoinHandle<()> =
            tokio::spawn(run_outbox(adapter, outbox_rx, state.events.clone()));
        info!(role = %state.role, "Sync coordinator started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping sync coordinator");
                    break;
                }

                request = inbox.recv() => match request {
                    Some(request) => state.handle_request(request).await,
                    None => {
                        debug!("All coordinator handles dropped");
                        break;
                    }
                },

                Some(event) = transport_rx.recv() => {
                    state.handle_transport_event(event).await;
                }

                _ = settle_elapsed(&mut state.settle) => {
                    state.settle = None;
                    info!("Settle delay elapsed, pushing initial state");
                    if let Err(e) = state.push_snapshot().await {
                        error!(error = %e, "Initial push failed");
                    }
                }
            }
        }

        // Closing the queue lets the outbox finish what is already queued.
        drop(state);
        if let Err(e) = outbox.await {
            error!(error = %e, "Outbox task failed");
        }
        info!("Sync coordinator stopped");
    }
}

async fn settle_elapsed(settle: &mut Option<Pin<Box<Sleep>>>) {
    match settle {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

impl CoordinatorState {
    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn enqueue(&self, item: Outbound) {
        if self.outbox.send(item).is_err() {
            warn!("Outbox closed, dropping delivery");
        }
    }

    // ------------------------------------------------------------------------
    // Requests from the handle
    // ------------------------------------------------------------------------

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::Mutate { mutation, reply } => {
                let result = self.apply_mutation(mutation).await;
                let _ = reply.send(result);
            }
            Request::SendCommand { command, reply } => {
                let result = self.issue_command(command).await;
                let _ = reply.send(result);
            }
            Request::SendPreferences { preferences, reply } => {
                let result = self.send_preferences(preferences).await;
                let _ = reply.send(result);
            }
            Request::NotifyDataChanged { reply } => {
                self.enqueue(Outbound::Message(WireMessage::Notification(
                    Notification::DataChanged,
                )));
                let _ = reply.send(Ok(()));
            }
            Request::PushNow { reply } => {
                let _ = reply.send(self.push_snapshot().await);
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(self.board().await);
            }
        }
    }

    async fn apply_mutation(&mut self, mutation: LocalMutation) -> Result<(), SyncError> {
        let kind = mutation.kind();
        let current = self.prefs.snapshot();
        let mut tx = self.begin("mutation").await?;

        let effect = match mutation::apply_mutation(tx.as_mut(), &current, mutation).await {
            Ok(effect) => effect,
            Err(e) => {
                warn!(mutation = kind, error = %e, "Local mutation rejected");
                return Err(e);
            }
        };
        if effect.is_empty() {
            debug!(mutation = kind, "Local mutation changed nothing");
            return Ok(());
        }

        let mut preferences = current;
        if let Some(changed) = &effect.preferences {
            preferences.merge_from(changed);
        }
        let payload = read_payload(tx.as_mut(), Some(preferences.clone())).await?;
        if let Err(e) = tx.commit().await {
            error!(mutation = kind, error = %e, "Store commit failed, mutation abandoned");
            return Err(e.into());
        }

        if let Some(changed) = &effect.preferences {
            self.prefs.apply(changed);
            self.emit(SyncEvent::PreferencesChanged {
                origin: ChangeOrigin::Local,
                preferences,
            });
        }
        if effect.teams_changed {
            self.emit(SyncEvent::TeamsChanged {
                origin: ChangeOrigin::Local,
            });
        }
        if effect.intervals_changed {
            self.emit(SyncEvent::IntervalsChanged {
                origin: ChangeOrigin::Local,
            });
        }

        info!(mutation = kind, "Local mutation committed");
        self.enqueue(Outbound::Message(WireMessage::Sync(payload)));
        Ok(())
    }

    async fn issue_command(&mut self, command: Command) -> Result<(), SyncError> {
        let mut tx = self.begin("command").await?;
        let changed = run_command(tx.as_mut(), command).await?;
        let payload = read_payload(tx.as_mut(), Some(self.prefs.snapshot())).await?;
        if changed {
            if let Err(e) = tx.commit().await {
                error!(%command, error = %e, "Store commit failed, command abandoned");
                return Err(e.into());
            }
            self.emit_board_changed(ChangeOrigin::Local);
        }

        info!(%command, "Sending command to peer");
        self.enqueue(Outbound::WithFallback {
            kind: "command",
            live: WireMessage::Command(command).encode(),
            durable: WireMessage::Sync(payload).encode(),
        });
        Ok(())
    }

    async fn send_preferences(&mut self, preferences: PreferenceSet) -> Result<(), SyncError> {
        self.prefs.apply(&preferences);
        let current = self.prefs.snapshot();
        self.emit(SyncEvent::PreferencesChanged {
            origin: ChangeOrigin::Local,
            preferences: current.clone(),
        });

        let mut tx = self.begin("preferences").await?;
        let full = read_payload(tx.as_mut(), Some(current)).await?;
        drop(tx);

        debug!(keys = preferences.len(), "Sending preferences to peer");
        self.enqueue(Outbound::WithFallback {
            kind: "preferences",
            live: WireMessage::Preferences(preferences).encode(),
            durable: WireMessage::Sync(full).encode(),
        });
        Ok(())
    }

    /// Queues the full current state, preferences attached
    async fn push_snapshot(&mut self) -> Result<(), SyncError> {
        let mut tx = self.begin("push").await?;
        let payload = read_payload(tx.as_mut(), Some(self.prefs.snapshot())).await?;
        drop(tx);

        debug!(
            teams = payload.teams.len(),
            intervals = payload.intervals.len(),
            "Pushing snapshot"
        );
        self.enqueue(Outbound::Message(WireMessage::Sync(payload)));
        Ok(())
    }

    async fn board(&self) -> Result<BoardSnapshot, SyncError> {
        let mut tx = self.begin("snapshot").await?;
        Ok(BoardSnapshot {
            teams: tx.fetch_teams().await?,
            intervals: tx.fetch_intervals().await?,
            preferences: self.prefs.snapshot(),
        })
    }

    async fn begin(
        &self,
        operation: &'static str,
    ) -> Result<Box<dyn IStoreTransaction>, SyncError> {
        match self.store.begin().await {
            Ok(tx) => Ok(tx),
            Err(e) => {
                error!(operation, error = %e, "Could not open store transaction");
                Err(e.into())
            }
        }
    }

    fn emit_board_changed(&self, origin: ChangeOrigin) {
        self.emit(SyncEvent::TeamsChanged { origin });
        self.emit(SyncEvent::IntervalsChanged { origin });
    }

    // ------------------------------------------------------------------------
    // Events from the transport
    // ------------------------------------------------------------------------

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::SessionActivated => self.on_activated(),
            TransportEvent::MessageReceived(map) => self.on_incoming(map, "live").await,
            TransportEvent::ContextReceived(map) => self.on_incoming(map, "durable").await,
            TransportEvent::ReachabilityChanged(reachable) => {
                info!(reachable, "Peer reachability changed");
            }
        }
    }

    fn on_activated(&mut self) {
        if self.activated {
            debug!("Duplicate session activation ignored");
            return;
        }
        self.activated = true;
        info!(role = %self.role, "Transport session activated");
        self.emit(SyncEvent::SessionActivated { role: self.role });

        match self.role {
            Role::Primary => {
                debug!(delay_ms = self.settle_delay.as_millis() as u64, "Scheduling initial push");
                self.settle = Some(Box::pin(sleep(self.settle_delay)));
            }
            Role::Dependent => {
                debug!("Dependent role, waiting for the peer to push");
            }
        }
    }

    async fn on_incoming(&mut self, map: WireMap, tier: &'static str) {
        let message = match WireMessage::decode(&map) {
            Ok(message) => message,
            Err(e) => {
                match &e {
                    DecodeError::UnrecognizedMessage(_) => {
                        debug!(tier, error = %e, "Ignoring unrecognized message")
                    }
                    _ => warn!(tier, error = %e, "Ignoring malformed message"),
                }
                self.emit(SyncEvent::MessageIgnored {
                    reason: e.to_string(),
                });
                return;
            }
        };

        debug!(tier, kind = message.kind(), "Message received");
        match message {
            WireMessage::Sync(payload) => self.on_sync(payload).await,
            WireMessage::Preferences(preferences) => self.on_preferences(&preferences),
            WireMessage::Command(command) => self.on_command(command).await,
            WireMessage::Notification(Notification::DataChanged) => {
                info!("Peer reported a data change");
                self.emit(SyncEvent::DataChanged);
            }
        }
    }

    /// Preferences attached to a snapshot are applied only once its
    /// records have been committed.
    async fn on_sync(&mut self, payload: SyncPayload) {
        if let Err(e) = self.reconcile(&payload).await {
            error!(error = %e, "Reconciliation failed, keeping local state and preferences");
            return;
        }
        if let Some(preferences) = &payload.preferences {
            self.on_preferences(preferences);
        }
    }

    async fn reconcile(&mut self, payload: &SyncPayload) -> Result<(), SyncError> {
        let tx = self.begin("reconcile").await?;
        let outcome = self
            .engine
            .apply(tx, payload)
            .await
            .map_err(anyhow::Error::from)?;

        if outcome.teams_changed() {
            self.emit(SyncEvent::TeamsChanged {
                origin: ChangeOrigin::Peer,
            });
        }
        if outcome.intervals_changed() {
            self.emit(SyncEvent::IntervalsChanged {
                origin: ChangeOrigin::Peer,
            });
        }
        Ok(())
    }

    fn on_preferences(&mut self, incoming: &PreferenceSet) {
        if incoming.is_empty() {
            return;
        }
        let before = self.prefs.snapshot();
        self.prefs.apply(incoming);
        let after = self.prefs.snapshot();
        if after != before {
            info!(keys = incoming.len(), "Applied preferences from peer");
            self.emit(SyncEvent::PreferencesChanged {
                origin: ChangeOrigin::Peer,
                preferences: after,
            });
        }
    }

    /// Runs a peer command. The resulting state is not sent back.
    async fn on_command(&mut self, command: Command) {
        info!(%command, "Command received from peer");
        match self.apply_peer_command(command).await {
            Ok(changed) => {
                if changed {
                    self.emit_board_changed(ChangeOrigin::Peer);
                }
                self.emit(SyncEvent::CommandReceived(command));
            }
            Err(e) => error!(%command, error = %e, "Command failed, keeping local state"),
        }
    }

    async fn apply_peer_command(&mut self, command: Command) -> Result<bool, SyncError> {
        let mut tx = self.begin("peer command").await?;
        let changed = run_command(tx.as_mut(), command).await?;
        if changed {
            tx.commit().await?;
        }
        Ok(changed)
    }
}

async fn run_command(tx: &mut dyn IStoreTransaction, command: Command) -> Result<bool, SyncError> {
    match command {
        Command::ResetScores => mutation::reset_scores(tx).await,
        Command::ReinitializeApp => {
            mutation::reinitialize(tx).await?;
            Ok(true)
        }
    }
}

async fn read_payload(
    tx: &mut dyn IStoreTransaction,
    preferences: Option<PreferenceSet>,
) -> Result<SyncPayload, SyncError> {
    let teams = tx.fetch_teams().await?;
    let intervals = tx.fetch_intervals().await?;
    Ok(to_payload(&teams, &intervals, preferences))
}
