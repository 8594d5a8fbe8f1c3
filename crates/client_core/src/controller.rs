//! ListSyncController: owns the session snapshot and the busy flags.
//!
//! Commands suspend only inside gateway calls. Across command kinds there is no
//! ordering: a reload issued by `add_item` can land after, and overwrite, the
//! in-place patch applied by a concurrent `complete_item` (last write wins).
//! `remove_local` never reaches the backend, so the next reload brings the
//! removed entry back. A removal while a complete is in flight moves the
//! pending target along with its row, so the acknowledgment patches the entry
//! that was asked for, or nothing if that entry is gone.
//!
//! `last_error` belongs to the command that recorded it. Only a later success
//! of that same command, or [`ListSyncController::clear_error`], clears it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::domain::{ItemId, TodoRecord};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::{
    error::{Operation, SyncError},
    gateway::{validate_name, Ack, RemoteListGateway},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    AddPending,
    CompletePending(ItemId),
    Errored,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    pub snapshot: Vec<Item>,
    pub loading: bool,
    pub add_in_flight: bool,
    pub complete_in_flight: Option<ItemId>,
    pub last_error: Option<SyncError>,
    pub last_synced_at: Option<DateTime<Utc>>,
    last_error_op: Option<Operation>,
    /// Backend index of the in-flight complete; `complete_in_flight` is where
    /// that row sits in the snapshot now.
    complete_requested: Option<ItemId>,
    load_depth: usize,
}

impl SyncState {
    fn initial() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Collapses the flags into one phase. An in-flight command outranks a
    /// recorded error, so the error only shows once everything has settled.
    pub fn phase(&self) -> SyncPhase {
        if self.loading {
            SyncPhase::Loading
        } else if self.add_in_flight {
            SyncPhase::AddPending
        } else if let Some(id) = self.complete_in_flight {
            SyncPhase::CompletePending(id)
        } else if self.last_error.is_some() {
            SyncPhase::Errored
        } else if self.last_synced_at.is_some() {
            SyncPhase::Ready
        } else {
            SyncPhase::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.loading
            || self.add_in_flight
            || self.complete_in_flight.is_some()
            || self.complete_requested.is_some()
    }

    /// The command that recorded `last_error`.
    pub fn last_error_op(&self) -> Option<Operation> {
        self.last_error_op
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.snapshot.get(id.0)
    }

    fn replace_snapshot(&mut self, records: Vec<TodoRecord>) {
        self.snapshot = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| Item {
                id: ItemId(index),
                name: record.name,
                completed: record.completed,
            })
            .collect();
        self.last_synced_at = Some(Utc::now());
        // a full reload lines positions up with backend indices again
        self.complete_in_flight = self.complete_requested;
    }

    fn record_error(&mut self, op: Operation, error: SyncError) {
        self.last_error = Some(error);
        self.last_error_op = Some(op);
    }

    fn clear_error_from(&mut self, op: Operation) {
        if self.last_error_op == Some(op) {
            self.last_error = None;
            self.last_error_op = None;
        }
    }

    /// Keeps the in-flight complete pointed at the same row after `removed`
    /// leaves the snapshot.
    fn rebase_complete_target(&mut self, removed: ItemId) {
        let Some(target) = self.complete_in_flight else {
            return;
        };
        if removed == target {
            self.complete_in_flight = None;
        } else if removed < target {
            self.complete_in_flight = Some(ItemId(target.0 - 1));
        }
    }

    fn renumber(&mut self) {
        for (index, item) in self.snapshot.iter_mut().enumerate() {
            item.id = ItemId(index);
        }
    }
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    Loaded { count: usize },
    AddSubmitted { name: String },
    AddConfirmed { name: String, ack: Ack },
    CompleteConfirmed { id: ItemId, ack: Ack },
    RemovedLocally { item: Item },
    CommandFailed { op: Operation, error: SyncError },
}

/// Clears a busy flag when the command settles, including when its future is
/// dropped halfway through.
struct InFlight<'a> {
    state: &'a watch::Sender<SyncState>,
    clear: fn(&mut SyncState),
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a watch::Sender<SyncState>, clear: fn(&mut SyncState)) -> Self {
        Self {
            state,
            clear,
            armed: true,
        }
    }

    fn settle(mut self, apply: impl FnOnce(&mut SyncState)) {
        self.armed = false;
        let clear = self.clear;
        self.state.send_modify(|state| {
            apply(state);
            clear(state);
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(self.clear);
        }
    }
}

fn end_load(state: &mut SyncState) {
    state.load_depth = state.load_depth.saturating_sub(1);
    state.loading = state.load_depth > 0;
}

fn end_add(state: &mut SyncState) {
    state.add_in_flight = false;
}

fn end_complete(state: &mut SyncState) {
    state.complete_in_flight = None;
    state.complete_requested = None;
}

pub struct ListSyncController {
    gateway: Arc<dyn RemoteListGateway>,
    state: watch::Sender<SyncState>,
    events: broadcast::Sender<SyncEvent>,
}

impl ListSyncController {
    /// Builds a controller in the `Loading` phase without fetching anything.
    pub fn new(gateway: Arc<dyn RemoteListGateway>) -> Arc<Self> {
        let (state, _) = watch::channel(SyncState::initial());
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            gateway,
            state,
            events,
        })
    }

    /// Builds a controller and spawns its initial `load()`.
    pub fn start(gateway: Arc<dyn RemoteListGateway>) -> Arc<Self> {
        let controller = Self::new(gateway);
        let task = Arc::clone(&controller);
        tokio::spawn(async move {
            let _ = task.load().await;
        });
        controller
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Vec<Item> {
        self.state.borrow().snapshot.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.state.borrow().phase()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn load(&self) -> Result<(), SyncError> {
        self.state.send_modify(|state| {
            state.load_depth += 1;
            state.loading = true;
        });
        let flight = InFlight::new(&self.state, end_load);

        match self.gateway.fetch_list().await {
            Ok(records) => {
                let count = records.len();
                flight.settle(|state| {
                    state.replace_snapshot(records);
                    state.clear_error_from(Operation::Load);
                });
                info!(count, "todo list loaded");
                let _ = self.events.send(SyncEvent::Loaded { count });
                Ok(())
            }
            Err(error) => {
                flight.settle(|state| state.record_error(Operation::Load, error.clone()));
                self.report_failure(Operation::Load, error)
            }
        }
    }

    /// Submits the new entry, waits for acknowledgment, then reloads so the
    /// entry's position comes from the backend.
    pub async fn add_item(&self, name: &str) -> Result<(), SyncError> {
        let name = match validate_name(name) {
            Ok(name) => name.to_string(),
            Err(error) => return self.record_failure(Operation::Add, error),
        };

        let admitted = self.state.send_if_modified(|state| {
            if state.add_in_flight {
                return false;
            }
            state.add_in_flight = true;
            true
        });
        if !admitted {
            debug!(%name, "rejecting add while another add is in flight");
            return Err(SyncError::Busy(Operation::Add));
        }
        let flight = InFlight::new(&self.state, end_add);
        let _ = self.events.send(SyncEvent::AddSubmitted { name: name.clone() });

        let outcome = async {
            let ack = self.gateway.submit_add(&name).await?;
            let records = self
                .gateway
                .fetch_list()
                .await
                .map_err(|err| err.reported_by(Operation::Add))?;
            Ok::<_, SyncError>((ack, records))
        }
        .await;

        match outcome {
            Ok((ack, records)) => {
                let count = records.len();
                flight.settle(|state| {
                    state.replace_snapshot(records);
                    state.clear_error_from(Operation::Add);
                });
                info!(%name, count, ix_hash = %ack.ix_hash, "todo added");
                let _ = self.events.send(SyncEvent::AddConfirmed { name, ack });
                Ok(())
            }
            Err(error) => {
                flight.settle(|state| state.record_error(Operation::Add, error.clone()));
                self.report_failure(Operation::Add, error)
            }
        }
    }

    /// Marks one entry completed. On acknowledgment only that position is
    /// patched; there is no reload.
    pub async fn complete_item(&self, id: ItemId) -> Result<(), SyncError> {
        let mut rejection = None;
        self.state.send_if_modified(|state| {
            if id.0 >= state.snapshot.len() {
                rejection = Some(SyncError::NotFound {
                    id,
                    len: Some(state.snapshot.len()),
                });
                return false;
            }
            if state.complete_requested.is_some() {
                rejection = Some(SyncError::Busy(Operation::Complete));
                return false;
            }
            state.complete_requested = Some(id);
            state.complete_in_flight = Some(id);
            true
        });
        match rejection {
            Some(error) if error.is_busy() => {
                debug!(id = id.0, "rejecting complete while another complete is in flight");
                return Err(error);
            }
            Some(error) => return self.record_failure(Operation::Complete, error),
            None => {}
        }
        let flight = InFlight::new(&self.state, end_complete);

        match self.gateway.submit_complete(id).await {
            Ok(ack) => {
                flight.settle(|state| {
                    let target = state.complete_in_flight;
                    match target.and_then(|target| state.snapshot.get_mut(target.0)) {
                        Some(item) => item.completed = true,
                        None => warn!(
                            id = id.0,
                            "completed todo was removed locally; skipping local patch"
                        ),
                    }
                    state.clear_error_from(Operation::Complete);
                });
                info!(id = id.0, ix_hash = %ack.ix_hash, "todo marked completed");
                let _ = self.events.send(SyncEvent::CompleteConfirmed { id, ack });
                Ok(())
            }
            Err(error) => {
                flight.settle(|state| state.record_error(Operation::Complete, error.clone()));
                self.report_failure(Operation::Complete, error)
            }
        }
    }

    /// Drops an entry from the snapshot only. Later ids shift down by one.
    pub fn remove_local(&self, id: ItemId) -> Result<(), SyncError> {
        let mut removed = None;
        let mut len = 0;
        self.state.send_if_modified(|state| {
            len = state.snapshot.len();
            if id.0 >= len {
                return false;
            }
            removed = Some(state.snapshot.remove(id.0));
            state.renumber();
            state.rebase_complete_target(id);
            state.clear_error_from(Operation::RemoveLocal);
            true
        });

        match removed {
            Some(item) => {
                debug!(id = id.0, name = %item.name, "removed todo locally; backend copy is untouched");
                let _ = self.events.send(SyncEvent::RemovedLocally { item });
                Ok(())
            }
            None => self.record_failure(
                Operation::RemoveLocal,
                SyncError::NotFound { id, len: Some(len) },
            ),
        }
    }

    /// Dismisses the recorded error whichever command left it.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| {
            state.last_error_op = None;
            state.last_error.take().is_some()
        });
    }

    fn record_failure(&self, op: Operation, error: SyncError) -> Result<(), SyncError> {
        self.state
            .send_modify(|state| state.record_error(op, error.clone()));
        self.report_failure(op, error)
    }

    fn report_failure(&self, op: Operation, error: SyncError) -> Result<(), SyncError> {
        warn!(%op, %error, "command failed");
        let _ = self.events.send(SyncEvent::CommandFailed {
            op,
            error: error.clone(),
        });
        Err(error)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
