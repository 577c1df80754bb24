//! List actor: one task owns a list and serializes every change to it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    core::{
        list::{ListState, Record, ViewFlags},
        optimistic::{self, MutationError, MutationOutcome, PendingMutation, Toggleable},
    },
    engine::{pipeline::DEFAULT_MAX_IN_FLIGHT, traits::Enriched},
    model::{Notification, Post},
    op::{EdgePatch, EdgeState, Toggle},
    service::{ServiceError, ServiceResult},
};

use super::{events::ListEvent, source::ListSource};

/// Error returned through a [`ListHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The toggle was refused locally.
    #[error(transparent)]
    Mutation(#[from] MutationError),
    /// A remote call made on behalf of the handle failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The actor has stopped.
    #[error("list actor is no longer running")]
    ChannelClosed,
}

/// Tunables for a list actor. Deserializes from partial JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the command queue.
    pub command_queue_bound: usize,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Enrichment fetches allowed in flight during a load.
    pub enrich_max_in_flight: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
            enrich_max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl RuntimeConfig {
    /// Parses a JSON config blob; absent keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Outcome of one `load` or `refresh` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Generation the call ran under; 0 when skipped.
    pub generation: u64,
    /// Nothing was fetched because the list was already populated or loading.
    pub skipped: bool,
    /// A newer refresh started before this result arrived; it was discarded.
    pub superseded: bool,
    /// The primary fetch failed; the list is empty.
    pub fetch_failed: bool,
    /// Records installed.
    pub loaded: usize,
    /// Records dropped because their id was already present.
    pub duplicates_dropped: usize,
    /// Enrichment sub-fetches that failed.
    pub missing_enrichment: usize,
}

/// Optimistic state handed back by a toggle, plus its eventual outcome.
#[derive(Debug)]
pub struct MutationTicket<R> {
    /// Record as it looked right after the local change.
    pub optimistic: R,
    settled: oneshot::Receiver<MutationOutcome>,
}

impl<R> MutationTicket<R> {
    /// Waits for the remote write to settle. A shut-down actor reports
    /// [`MutationOutcome::Superseded`].
    pub async fn settled(self) -> MutationOutcome {
        self.settled.await.unwrap_or(MutationOutcome::Superseded)
    }
}

/// Cloneable handle to a running list actor.
pub struct ListHandle<R> {
    cmd_tx: mpsc::Sender<Command<R>>,
    events_tx: broadcast::Sender<ListEvent>,
}

impl<R> Clone for ListHandle<R> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

/// Handle to the main feed.
pub type FeedHandle = ListHandle<Post>;
/// Handle to the notifications list.
pub type NotificationsHandle = ListHandle<Notification>;

enum Command<R> {
    Load {
        force: bool,
        resp: oneshot::Sender<LoadReport>,
    },
    Remove {
        id: String,
        resp: oneshot::Sender<bool>,
    },
    Delete {
        id: String,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Toggle {
        id: String,
        toggle: Toggle,
        resp: oneshot::Sender<Result<MutationTicket<R>, RuntimeError>>,
    },
    Get {
        id: String,
        resp: oneshot::Sender<Option<R>>,
    },
    Snapshot {
        resp: oneshot::Sender<Vec<R>>,
    },
    Flags {
        resp: oneshot::Sender<ViewFlags>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
    // Sent back by tasks the actor spawned.
    Fetched {
        generation: u64,
        result: ServiceResult<Enriched<R>>,
        resp: oneshot::Sender<LoadReport>,
    },
    Reconciled {
        generation: u64,
        states: Vec<(String, EdgeState)>,
        report: LoadReport,
        resp: oneshot::Sender<LoadReport>,
    },
    Settled {
        pending: PendingMutation,
        succeeded: bool,
        outcome: oneshot::Sender<MutationOutcome>,
    },
    Deleted {
        id: String,
        result: ServiceResult<()>,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

struct Actor<S: ListSource> {
    source: Arc<S>,
    state: ListState<S::Record>,
    config: RuntimeConfig,
    events_tx: broadcast::Sender<ListEvent>,
    self_tx: mpsc::WeakSender<Command<S::Record>>,
}

/// Spawns the actor owning one list. `initial` seeds the collection, in
/// which case `load` does nothing until `refresh`.
pub fn spawn_list<S: ListSource>(
    source: S,
    initial: Vec<S::Record>,
    config: RuntimeConfig,
) -> ListHandle<S::Record> {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command<S::Record>>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<ListEvent>(config.event_capacity.max(1));

    let mut actor = Actor {
        source: Arc::new(source),
        state: ListState::with_records(initial),
        config,
        events_tx: events_tx.clone(),
        self_tx: cmd_tx.downgrade(),
    };

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if actor.handle_command(cmd) {
                break;
            }
        }
        tracing::debug!("list actor stopped");
    });

    ListHandle { cmd_tx, events_tx }
}

impl<R: Toggleable> ListHandle<R> {
    /// Subscribes to list events.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command<R>,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Fetches the list if it is empty and not already loading.
    pub async fn load(&self) -> Result<LoadReport, RuntimeError> {
        self.request(|resp| Command::Load { force: false, resp }).await
    }

    /// Discards the collection and fetches it again.
    pub async fn refresh(&self) -> Result<LoadReport, RuntimeError> {
        self.request(|resp| Command::Load { force: true, resp }).await
    }

    /// Removes `id` locally. Returns whether it was present.
    pub async fn remove(&self, id: impl Into<String>) -> Result<bool, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::Remove { id, resp }).await
    }

    /// Deletes `id` remotely, then removes it locally.
    pub async fn delete(&self, id: impl Into<String>) -> Result<(), RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::Delete { id, resp }).await?
    }

    /// Applies `toggle` to the edge of `id` now and writes it in the background.
    pub async fn toggle(&self, id: impl Into<String>, toggle: Toggle) -> Result<MutationTicket<R>, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::Toggle { id, toggle, resp }).await?
    }

    /// Current copy of record `id`.
    pub async fn get(&self, id: impl Into<String>) -> Result<Option<R>, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::Get { id, resp }).await
    }

    /// Records in display order.
    pub async fn snapshot(&self) -> Result<Vec<R>, RuntimeError> {
        self.request(|resp| Command::Snapshot { resp }).await
    }

    /// Presence flags for the empty and loading views.
    pub async fn flags(&self) -> Result<ViewFlags, RuntimeError> {
        self.request(|resp| Command::Flags { resp }).await
    }

    /// Stops the actor. Outstanding tickets resolve as superseded.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await
    }
}

impl ListHandle<Post> {
    /// Likes `post_id`.
    pub async fn like(&self, post_id: impl Into<String>) -> Result<MutationTicket<Post>, RuntimeError> {
        self.toggle(post_id, Toggle::On).await
    }

    /// Removes the like on `post_id`.
    pub async fn unlike(&self, post_id: impl Into<String>) -> Result<MutationTicket<Post>, RuntimeError> {
        self.toggle(post_id, Toggle::Off).await
    }
}

impl ListHandle<Notification> {
    /// Follows the user who sent notification `id`.
    pub async fn follow(&self, id: impl Into<String>) -> Result<MutationTicket<Notification>, RuntimeError> {
        self.toggle(id, Toggle::On).await
    }

    /// Unfollows the user who sent notification `id`.
    pub async fn unfollow(&self, id: impl Into<String>) -> Result<MutationTicket<Notification>, RuntimeError> {
        self.toggle(id, Toggle::Off).await
    }
}

impl<S: ListSource> Actor<S> {
    fn emit(&self, event: ListEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Sends `cmd` back into the actor from a spawned task, if it still runs.
    fn spawn_reply<F>(&self, work: F)
    where
        F: std::future::Future<Output = Command<S::Record>> + Send + 'static,
    {
        let weak = self.self_tx.clone();
        tokio::spawn(async move {
            let cmd = work.await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(cmd).await;
            }
        });
    }

    fn handle_command(&mut self, cmd: Command<S::Record>) -> bool {
        match cmd {
            Command::Load { force, resp } => {
                if force {
                    self.state.discard();
                } else if !self.state.is_empty() || self.state.is_loading() {
                    let _ = resp.send(LoadReport {
                        skipped: true,
                        ..LoadReport::default()
                    });
                    return false;
                }

                let generation = self.state.begin_load();
                self.emit(ListEvent::LoadStarted { generation });
                tracing::debug!(generation, force, "list load started");

                let source = Arc::clone(&self.source);
                let max_in_flight = self.config.enrich_max_in_flight;
                self.spawn_reply(async move {
                    let result = source.fetch(max_in_flight).await;
                    Command::Fetched {
                        generation,
                        result,
                        resp,
                    }
                });
            }
            Command::Fetched {
                generation,
                result,
                resp,
            } => self.on_fetched(generation, result, resp),
            Command::Reconciled {
                generation,
                states,
                report,
                resp,
            } => {
                if self.state.generation() == generation {
                    for (id, edge) in states {
                        // Local toggles since install are newer than this read.
                        if self.state.is_touched(&id) {
                            continue;
                        }
                        let Some(record) = self.state.get_mut(&id) else {
                            continue;
                        };
                        if record.edge_state().is_some_and(|s| !s.is_pending()) {
                            record.apply_edge(&EdgePatch::state(edge));
                        }
                    }
                    self.emit(ListEvent::Reconciled { generation });
                }
                let _ = resp.send(report);
            }
            Command::Remove { id, resp } => {
                let removed = self.state.remove(&id).is_some();
                if removed {
                    self.emit(ListEvent::Removed { id });
                }
                let _ = resp.send(removed);
            }
            Command::Delete { id, resp } => {
                let Some(record) = self.state.get_cloned(&id) else {
                    let _ = resp.send(Err(MutationError::MissingRecord.into()));
                    return false;
                };
                let source = Arc::clone(&self.source);
                self.spawn_reply(async move {
                    let result = source.delete(&record).await;
                    Command::Deleted { id, result, resp }
                });
            }
            Command::Deleted { id, result, resp } => {
                let out = match result {
                    Ok(()) => {
                        if self.state.remove(&id).is_some() {
                            self.emit(ListEvent::Removed { id });
                        }
                        Ok(())
                    }
                    Err(err) => {
                        tracing::warn!(%id, %err, "remote delete failed");
                        Err(err.into())
                    }
                };
                let _ = resp.send(out);
            }
            Command::Toggle { id, toggle, resp } => {
                let _ = resp.send(self.on_toggle(id, toggle));
            }
            Command::Settled {
                pending,
                succeeded,
                outcome,
            } => {
                let result = self.on_settled(&pending, succeeded);
                let _ = outcome.send(result);
            }
            Command::Get { id, resp } => {
                let _ = resp.send(self.state.get_cloned(&id));
            }
            Command::Snapshot { resp } => {
                let _ = resp.send(self.state.snapshot());
            }
            Command::Flags { resp } => {
                let _ = resp.send(self.state.flags());
            }
            Command::Shutdown { resp } => {
                let _ = resp.send(());
                return true;
            }
        }

        false
    }

    fn on_fetched(
        &mut self,
        generation: u64,
        result: ServiceResult<Enriched<S::Record>>,
        resp: oneshot::Sender<LoadReport>,
    ) {
        let mut report = LoadReport {
            generation,
            ..LoadReport::default()
        };

        let mut enriched = match result {
            Ok(enriched) => enriched,
            Err(err) => {
                if self.state.abort_load(generation) {
                    tracing::error!(generation, %err, "list fetch failed");
                    self.emit(ListEvent::LoadFailed { generation });
                    report.fetch_failed = true;
                } else {
                    report.superseded = true;
                }
                let _ = resp.send(report);
                return;
            }
        };

        self.source.arrange(&mut enriched.records);
        report.missing_enrichment = enriched.misses.len();

        let Some(dropped) = self.state.install(generation, enriched.records) else {
            tracing::debug!(generation, "discarding stale load");
            report.superseded = true;
            let _ = resp.send(report);
            return;
        };
        if dropped > 0 {
            tracing::warn!(generation, dropped, "duplicate record ids dropped");
        }
        report.duplicates_dropped = dropped;
        report.loaded = self.state.len();
        self.emit(ListEvent::Loaded {
            generation,
            len: report.loaded,
        });

        let source = Arc::clone(&self.source);
        let records = self.state.snapshot();
        self.spawn_reply(async move {
            let states = source.reconcile(records).await;
            Command::Reconciled {
                generation,
                states,
                report,
                resp,
            }
        });
    }

    fn on_toggle(&mut self, id: String, toggle: Toggle) -> Result<MutationTicket<S::Record>, RuntimeError> {
        let generation = self.state.generation();
        let record = self.state.get_mut(&id).ok_or(MutationError::MissingRecord)?;
        let before = record.clone();
        let pending = optimistic::begin(record, toggle, generation)?;
        let optimistic = record.clone();
        self.state.touch(&id);
        self.mirror_edge(&id);
        self.emit(ListEvent::EdgeApplied { id });

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let source = Arc::clone(&self.source);
        self.spawn_reply(async move {
            let succeeded = match source.write_edge(&before, toggle).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(record_id = %pending.record_id, ?toggle, %err, "edge write failed");
                    false
                }
            };
            Command::Settled {
                pending,
                succeeded,
                outcome: outcome_tx,
            }
        });

        Ok(MutationTicket {
            optimistic,
            settled: outcome_rx,
        })
    }

    fn on_settled(&mut self, pending: &PendingMutation, succeeded: bool) -> MutationOutcome {
        if pending.generation != self.state.generation() {
            return MutationOutcome::Superseded;
        }
        let Some(record) = self.state.get_mut(&pending.record_id) else {
            return MutationOutcome::Superseded;
        };

        let outcome = optimistic::settle(record, pending, succeeded);
        let id = pending.record_id.clone();
        if outcome != MutationOutcome::Superseded {
            self.mirror_edge(&id);
        }
        match outcome {
            MutationOutcome::Confirmed => self.emit(ListEvent::EdgeConfirmed { id }),
            MutationOutcome::RolledBack => {
                tracing::warn!(record_id = %id, "optimistic edge rolled back");
                self.emit(ListEvent::EdgeRolledBack { id });
            }
            MutationOutcome::Superseded => {}
        }
        outcome
    }

    /// Copies the edge state of `id` onto every other record with the same
    /// edge target, e.g. all notifications from one user.
    fn mirror_edge(&mut self, id: &str) {
        let Some(record) = self.state.get(id) else {
            return;
        };
        let Some(edge) = record.edge_state() else {
            return;
        };
        let target = record.edge_target().to_string();

        let siblings: Vec<String> = self
            .state
            .ordered()
            .filter(|r| r.record_id() != id && r.edge_target() == target && r.edge_state().is_some())
            .map(|r| r.record_id().to_string())
            .collect();
        for sibling in siblings {
            if let Some(r) = self.state.get_mut(&sibling) {
                r.apply_edge(&EdgePatch::state(edge));
            }
            self.state.touch(&sibling);
        }
    }
}
