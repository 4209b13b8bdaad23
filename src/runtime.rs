//! Consumer-side runtime
//!
//! [`BridgeRuntime`] owns the consumer half of the bridge: the queue handle,
//! the batch scheduler, the dispatcher, the rebuild debouncer and the active
//! display refresh. It runs on one dedicated thread and talks to the host UI
//! through crossbeam channels:
//!
//! - [`RuntimeCommand`] - sent by the UI through a [`RuntimeBridge`]
//! - [`RuntimeMessage`] - sent back by the runtime
//!
//! Every loop iteration drains pending commands, runs whatever timers are due
//! and then blocks on the command channel until the next deadline, so a
//! command wakes the loop immediately.

use crate::config::AppConfig;
use crate::dispatch::{
    AircraftProfile, BatchScheduler, Debouncer, DisplayRefresh, EventQueue, RefreshOutcome,
    UpdateDispatcher,
};
use crate::error::{Result, SimVoxError};
use crate::registry::VariableRegistry;
use crate::sim::{NullRequester, UpdateSink, VariableRequester};
use crate::types::{ConnectionStatus, HealthSnapshot, TickReport};
use crate::ui::ProgrammaticUpdateFlag;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Periodic health report interval while connected
pub const HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Longest the loop sleeps when no timer is pending
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Message sent from the UI to the runtime
pub enum RuntimeCommand {
    /// Simulator connected: start dispatching
    Connect,
    /// Simulator gone: stop and discard queued updates
    Disconnect,
    /// Replace registry and profile for a new aircraft
    SwitchAircraft {
        registry: Arc<dyn VariableRegistry>,
        profile: Box<dyn AircraftProfile>,
    },
    /// User moved to another panel
    SelectionChanged { panel: String, label: String },
    /// Refresh every display variable of a panel
    RefreshDisplay { panel: String },
    /// Speak the next value of `key` once
    AnnounceStateOf { key: String },
    /// Enable or disable continuous announcements
    SetMonitoring(bool),
    /// Send a health snapshot now
    RequestHealth,
    /// Stop the runtime
    Shutdown,
}

impl std::fmt::Debug for RuntimeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeCommand::Connect => write!(f, "Connect"),
            RuntimeCommand::Disconnect => write!(f, "Disconnect"),
            RuntimeCommand::SwitchAircraft { profile, .. } => f
                .debug_struct("SwitchAircraft")
                .field("profile", &profile.name())
                .finish_non_exhaustive(),
            RuntimeCommand::SelectionChanged { panel, label } => f
                .debug_struct("SelectionChanged")
                .field("panel", panel)
                .field("label", label)
                .finish(),
            RuntimeCommand::RefreshDisplay { panel } => {
                f.debug_struct("RefreshDisplay").field("panel", panel).finish()
            }
            RuntimeCommand::AnnounceStateOf { key } => {
                f.debug_struct("AnnounceStateOf").field("key", key).finish()
            }
            RuntimeCommand::SetMonitoring(enabled) => {
                f.debug_tuple("SetMonitoring").field(enabled).finish()
            }
            RuntimeCommand::RequestHealth => write!(f, "RequestHealth"),
            RuntimeCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Message sent from the runtime to the UI
#[derive(Debug, Clone)]
pub enum RuntimeMessage {
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// A display refresh ended; variables that never answered show the
    /// placeholder
    DisplayText {
        panel: String,
        text: String,
        complete: bool,
    },
    /// The debounced panel rebuild ran
    PanelRebuilt(String),
    /// Health report
    Health(HealthSnapshot),
    /// Runtime is shutting down
    Shutdown,
}

/// UI-side handle for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeBridge {
    command_tx: Sender<RuntimeCommand>,
    message_rx: Receiver<RuntimeMessage>,
}

impl RuntimeBridge {
    /// Send a command without blocking
    pub fn try_send(&self, cmd: RuntimeCommand) -> Result<()> {
        self.command_tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(cmd) => {
                SimVoxError::Channel(format!("Runtime inbox full, dropped {:?}", cmd))
            }
            TrySendError::Disconnected(_) => {
                SimVoxError::Channel("Runtime is not running".to_string())
            }
        })
    }

    /// Send a command; false if the runtime is gone or its inbox is full
    pub fn send_command(&self, cmd: RuntimeCommand) -> bool {
        match self.try_send(cmd) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    }

    pub fn connect(&self) {
        self.send_command(RuntimeCommand::Connect);
    }

    pub fn disconnect(&self) {
        self.send_command(RuntimeCommand::Disconnect);
    }

    pub fn switch_aircraft(
        &self,
        registry: Arc<dyn VariableRegistry>,
        profile: Box<dyn AircraftProfile>,
    ) {
        self.send_command(RuntimeCommand::SwitchAircraft { registry, profile });
    }

    /// Report a panel selection. The label updates right away, the rebuild is debounced.
    pub fn select_panel(&self, panel: impl Into<String>, label: impl Into<String>) {
        self.send_command(RuntimeCommand::SelectionChanged {
            panel: panel.into(),
            label: label.into(),
        });
    }

    pub fn refresh_display(&self, panel: impl Into<String>) {
        self.send_command(RuntimeCommand::RefreshDisplay {
            panel: panel.into(),
        });
    }

    pub fn announce_state_of(&self, key: impl Into<String>) {
        self.send_command(RuntimeCommand::AnnounceStateOf { key: key.into() });
    }

    pub fn set_monitoring(&self, enabled: bool) {
        self.send_command(RuntimeCommand::SetMonitoring(enabled));
    }

    pub fn request_health(&self) {
        self.send_command(RuntimeCommand::RequestHealth);
    }

    pub fn shutdown(&self) {
        self.send_command(RuntimeCommand::Shutdown);
    }

    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<RuntimeMessage> {
        self.message_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a message
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RuntimeMessage> {
        self.message_rx.recv_timeout(timeout).ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<RuntimeMessage> {
        self.message_rx.try_iter().collect()
    }
}

/// The consumer runtime
pub struct BridgeRuntime {
    config: AppConfig,
    queue: Arc<EventQueue>,
    scheduler: BatchScheduler,
    dispatcher: UpdateDispatcher,
    requester: Box<dyn VariableRequester>,
    rebuild: Debouncer<String>,
    refresh: Option<DisplayRefresh>,
    connection: ConnectionStatus,
    next_health: Option<Instant>,
    command_rx: Receiver<RuntimeCommand>,
    message_tx: Sender<RuntimeMessage>,
    dropped_messages: u64,
    running: Arc<AtomicBool>,
}

impl BridgeRuntime {
    /// Create a runtime around `dispatcher` and the bridge that drives it.
    ///
    /// The queue starts closed; producers are accepted after `Connect`.
    pub fn new(config: AppConfig, dispatcher: UpdateDispatcher) -> (Self, RuntimeBridge) {
        let (cmd_tx, cmd_rx) = bounded(256);
        let (msg_tx, msg_rx) = bounded(1024);

        let queue = Arc::new(EventQueue::new(&config.queue));
        queue.close();

        let runtime = Self {
            scheduler: BatchScheduler::new(&config.scheduler),
            rebuild: Debouncer::new(config.navigation.debounce()),
            config,
            queue,
            dispatcher,
            requester: Box::new(NullRequester),
            refresh: None,
            connection: ConnectionStatus::Disconnected,
            next_health: None,
            command_rx: cmd_rx,
            message_tx: msg_tx,
            dropped_messages: 0,
            running: Arc::new(AtomicBool::new(true)),
        };

        let bridge = RuntimeBridge {
            command_tx: cmd_tx,
            message_rx: msg_rx,
        };

        (runtime, bridge)
    }

    /// Use `requester` to ask the simulator for values
    pub fn with_requester(mut self, requester: Box<dyn VariableRequester>) -> Self {
        self.requester = requester;
        self
    }

    /// Producer handle for the simulator callback
    pub fn sink(&self) -> UpdateSink {
        UpdateSink::new(self.queue.clone())
    }

    /// Flag shared with control edit handlers
    pub fn programmatic_flag(&self) -> ProgrammaticUpdateFlag {
        self.dispatcher.programmatic_flag()
    }

    /// Get a handle to stop the runtime
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn dispatcher(&self) -> &UpdateDispatcher {
        &self.dispatcher
    }

    /// Run the loop until shutdown
    pub fn run(mut self) {
        tracing::info!("Bridge runtime started");

        while self.is_running() {
            self.step(Instant::now());
            if !self.is_running() {
                break;
            }

            let timeout = self
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT);

            match self.command_rx.recv_timeout(timeout) {
                Ok(cmd) => self.handle_command(cmd, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                }
            }
        }

        if self.connection == ConnectionStatus::Connected {
            self.disconnect();
        }
        let _ = self.message_tx.send(RuntimeMessage::Shutdown);
        tracing::info!("Bridge runtime stopped");
    }

    /// One loop iteration at `now`: drain commands, then run due timers.
    ///
    /// Returns the tick report if the batch scheduler ran.
    pub fn step(&mut self, now: Instant) -> Option<TickReport> {
        self.process_commands(now);

        let report = self
            .scheduler
            .poll(now, &self.queue, &mut self.dispatcher);

        if let Some(panel) = self.rebuild.poll(now) {
            self.rebuild_panel(panel);
        }

        if let Some(outcome) = self.refresh.as_mut().and_then(|r| r.poll(now)) {
            self.refresh = None;
            if !outcome.complete {
                tracing::debug!(
                    "Display refresh for '{}' timed out waiting on {:?}",
                    outcome.panel,
                    outcome.missing
                );
            }
            self.publish_refresh(outcome);
        }

        if self.next_health.is_some_and(|due| now >= due) {
            self.next_health = Some(now + HEALTH_INTERVAL);
            self.send_health();
        }

        report
    }

    /// Earliest pending timer
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.scheduler.next_deadline(),
            self.rebuild.deadline(),
            self.refresh.as_ref().map(DisplayRefresh::deadline),
            self.next_health,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn process_commands(&mut self, now: Instant) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd, now),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: RuntimeCommand, now: Instant) {
        tracing::trace!("Runtime command: {:?}", cmd);
        match cmd {
            RuntimeCommand::Connect => self.connect(now),
            RuntimeCommand::Disconnect => self.disconnect(),
            RuntimeCommand::SwitchAircraft { registry, profile } => {
                self.switch_aircraft(registry, profile, now)
            }
            RuntimeCommand::SelectionChanged { panel, label } => {
                self.dispatcher.ui_mut().set_selection_label(&label);
                if let Some(skipped) = self.rebuild.trigger(panel, now) {
                    tracing::trace!("Rebuild of '{}' superseded", skipped);
                }
            }
            RuntimeCommand::RefreshDisplay { panel } => self.begin_refresh(&panel, now),
            RuntimeCommand::AnnounceStateOf { key } => {
                self.dispatcher.pending_announcements().insert(key.clone());
                self.requester.request_variable(&key);
            }
            RuntimeCommand::SetMonitoring(enabled) => {
                tracing::info!(
                    "Continuous announcements {}",
                    if enabled { "enabled" } else { "disabled" }
                );
                self.dispatcher.set_monitoring(enabled);
            }
            RuntimeCommand::RequestHealth => self.send_health(),
            RuntimeCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn connect(&mut self, now: Instant) {
        if self.connection == ConnectionStatus::Connected {
            tracing::debug!("Connect ignored, already connected");
            return;
        }
        self.queue.open();
        self.scheduler.start(now);
        self.dispatcher.begin_session(now);
        self.next_health = Some(now + HEALTH_INTERVAL);
        self.update_connection_status(ConnectionStatus::Connected);
        self.requester.request_all();
        tracing::info!("Simulator connected");
    }

    fn disconnect(&mut self) {
        if self.connection == ConnectionStatus::Disconnected {
            return;
        }
        let discarded = self.scheduler.stop(&self.queue);
        self.rebuild.cancel();
        self.abandon_refresh();
        self.dispatcher.end_session();
        self.next_health = None;
        self.update_connection_status(ConnectionStatus::Disconnected);
        tracing::info!("Simulator disconnected ({} queued updates discarded)", discarded);
    }

    fn switch_aircraft(
        &mut self,
        registry: Arc<dyn VariableRegistry>,
        profile: Box<dyn AircraftProfile>,
        now: Instant,
    ) {
        let stale = self.queue.clear();
        if stale > 0 {
            tracing::debug!("Discarded {} updates for the previous aircraft", stale);
        }
        self.rebuild.cancel();
        self.abandon_refresh();
        self.dispatcher.set_aircraft(registry, profile, now);
        if self.connection == ConnectionStatus::Connected {
            self.requester.request_all();
        }
    }

    fn begin_refresh(&mut self, panel: &str, now: Instant) {
        self.abandon_refresh();
        let refresh = self.dispatcher.begin_display_refresh(
            panel,
            now,
            self.config.display.refresh_timeout(),
        );
        let keys = self.dispatcher.registry().display_variables(panel).to_vec();
        self.requester.request_panel(panel, &keys);
        self.refresh = Some(refresh);
    }

    /// Publish the refresh in flight, if any, with placeholders for the
    /// variables that have not answered.
    fn abandon_refresh(&mut self) {
        if let Some(refresh) = self.refresh.take() {
            let outcome = refresh.abandon();
            tracing::debug!(
                "Abandoning display refresh for '{}' ({} unanswered)",
                outcome.panel,
                outcome.missing.len()
            );
            self.publish_refresh(outcome);
        }
    }

    fn publish_refresh(&mut self, outcome: RefreshOutcome) {
        let text = self.dispatcher.publish_display();
        self.try_send_message(RuntimeMessage::DisplayText {
            panel: outcome.panel,
            text,
            complete: outcome.complete,
        });
    }

    fn rebuild_panel(&mut self, panel: String) {
        tracing::debug!("Rebuilding panel '{}'", panel);
        let keys = self.dispatcher.registry().display_variables(&panel).to_vec();
        self.dispatcher.ui_mut().rebuild_panel(&panel);
        self.requester.request_panel(&panel, &keys);
        self.try_send_message(RuntimeMessage::PanelRebuilt(panel));
    }

    /// Current health snapshot
    pub fn health(&self) -> HealthSnapshot {
        let queue = self.queue.stats();
        HealthSnapshot {
            underrun: self.scheduler.is_underrun() || queue.is_underrun(),
            queue,
            last_tick: self.scheduler.last_report(),
            connection: self.connection,
            captured_at: chrono::Utc::now(),
        }
    }

    fn send_health(&mut self) {
        let snapshot = self.health();
        tracing::debug!(
            "Health: {} queued, {} dropped, {} batches",
            snapshot.queue.queued_count,
            snapshot.queue.dropped_count,
            snapshot.queue.processed_batches
        );
        self.try_send_message(RuntimeMessage::Health(snapshot));
    }

    fn update_connection_status(&mut self, status: ConnectionStatus) {
        self.connection = status;
        self.try_send_message(RuntimeMessage::ConnectionStatus(status));
    }

    fn try_send_message(&mut self, msg: RuntimeMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.dropped_messages += 1;
            if self.dropped_messages % 100 == 1 {
                tracing::warn!(
                    "UI is not draining runtime messages ({} dropped)",
                    self.dropped_messages
                );
            }
        }
    }
}

impl std::fmt::Debug for BridgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRuntime")
            .field("connection", &self.connection)
            .field("queue", &self.queue.stats())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
