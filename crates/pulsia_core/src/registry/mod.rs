//! Candidate registry: the in-memory collection kept in sync with the
//! authoritative store.
//!
//! # Responsibility
//! - Own the ordered candidate collection and the change subscription.
//! - Combine one snapshot read with the live change feed.
//! - Publish `{candidates, loading, phase, error}` to observers.
//!
//! # Invariants
//! - All mutation goes through `&mut Registry`, one event at a time.
//! - The subscription opens before the snapshot read; events that arrive
//!   meanwhile are buffered and replayed after the snapshot is assigned, so
//!   no event is ever overwritten by the snapshot.
//! - Deactivation closes the subscription exactly once and nothing is
//!   applied afterwards.

pub mod collection;
pub mod error;
pub mod feed;
pub mod snapshot;
pub mod state;

use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::model::candidate::Candidate;
use crate::model::change::ChangeEvent;
use crate::store::CandidateStore;
use collection::{ApplyOutcome, CandidateCollection};
use error::RegistryError;
use feed::{apply_event, ChangeFeedConsumer};
use log::{debug, error, info, warn};
use snapshot::SnapshotLoader;
use state::{RegistryState, RegistryView, SyncPhase};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Requests deactivation of a running registry from another task.
#[derive(Debug, Clone)]
pub struct DeactivationHandle {
    token: CancellationToken,
}

impl DeactivationHandle {
    pub fn deactivate(&self) {
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

enum Step {
    Event(ChangeEvent),
    FeedEnded,
    Shutdown,
}

enum Reconnect {
    Resumed,
    Shutdown,
    Exhausted(RegistryError),
}

pub struct Registry<S: CandidateStore + ?Sized> {
    store: Arc<S>,
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
    collection: CandidateCollection,
    feed: Option<ChangeFeedConsumer>,
    state_tx: watch::Sender<RegistryState>,
    phase: SyncPhase,
    loading: bool,
    error: Option<RegistryError>,
    active: bool,
    shutdown: CancellationToken,
}

impl<S: CandidateStore + ?Sized> Registry<S> {
    pub fn new(store: Arc<S>, config: RegistryConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        let (state_tx, _) = watch::channel(RegistryState::inactive());
        Self {
            store,
            config,
            clock,
            collection: CandidateCollection::new(),
            feed: None,
            state_tx,
            phase: SyncPhase::Inactive,
            loading: true,
            error: None,
            active: false,
            shutdown: CancellationToken::new(),
        }
    }

    /// Read-only view for observers; stays valid across reactivation.
    pub fn view(&self) -> RegistryView {
        RegistryView::new(self.state_tx.subscribe())
    }

    /// Handle that makes the current activation's `run` stop and deactivate.
    ///
    /// A handle taken before a deactivation does not carry over to the next
    /// activation; take a fresh one after `activate`.
    pub fn deactivation_handle(&self) -> DeactivationHandle {
        DeactivationHandle {
            token: self.shutdown.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn candidates(&self) -> &[Candidate] {
        self.collection.as_slice()
    }

    pub fn state(&self) -> RegistryState {
        self.state_tx.borrow().clone()
    }

    /// Subscribes, loads the snapshot, then replays events buffered meanwhile.
    ///
    /// Returns the collection size on success. A failed snapshot leaves the
    /// registry active with an empty collection, `loading == false` and the
    /// error published; the feed (if open) keeps applying changes.
    /// Calling this on an active registry does not read again.
    pub async fn activate(&mut self) -> Result<usize, RegistryError> {
        if self.active {
            debug!("event=registry_activate module=registry status=skip reason=already_active");
            return Ok(self.collection.len());
        }
        info!("event=registry_activate module=registry status=start");

        if self.shutdown.is_cancelled() {
            self.shutdown = CancellationToken::new();
        }
        self.active = true;
        self.loading = true;
        self.error = None;
        self.collection.clear();
        self.set_phase(SyncPhase::Loading);

        match ChangeFeedConsumer::open(&*self.store).await {
            Ok(consumer) => self.feed = Some(consumer),
            Err(err) => self.error = Some(err),
        }

        let loaded = self.load_and_replay(true).await;
        self.loading = false;
        self.set_phase(self.feed_phase());

        match &loaded {
            Ok(count) => info!(
                "event=registry_activate module=registry status=ok count={} feed_open={}",
                count,
                self.feed.is_some()
            ),
            Err(err) => error!(
                "event=registry_activate module=registry status=error error_code={} error={}",
                err.code(),
                err
            ),
        }
        loaded
    }

    /// Applies every change already delivered to the feed, without waiting.
    ///
    /// Returns how many events were applied.
    pub fn apply_pending(&mut self) -> usize {
        if !self.active {
            return 0;
        }
        let events = match self.feed.as_mut() {
            Some(feed) => feed.drain_buffered(),
            None => return 0,
        };
        let count = events.len();
        for event in events {
            apply_event(&mut self.collection, event, &*self.clock);
        }
        if count > 0 {
            self.publish();
        }
        count
    }

    /// Applies one event received from the feed and publishes the new state.
    ///
    /// Ignored while the registry is inactive.
    fn apply(&mut self, event: ChangeEvent) -> ApplyOutcome {
        if !self.active {
            debug!(
                "event=feed_apply module=registry status=skip reason=inactive candidate_id={}",
                event.id()
            );
            return ApplyOutcome::Unchanged;
        }
        let outcome = apply_event(&mut self.collection, event, &*self.clock);
        self.publish();
        outcome
    }

    /// Consumes the live feed until deactivation is requested.
    ///
    /// A dropped feed triggers bounded reconnects; each successful reconnect
    /// reloads the snapshot and replays buffered events. Returns the
    /// subscription error once reconnects are exhausted, leaving the stale
    /// collection published.
    pub async fn run(&mut self) -> Result<(), RegistryError> {
        while self.active {
            let step = {
                let shutdown = self.shutdown.clone();
                match self.feed.as_mut() {
                    Some(feed) => tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => Step::Shutdown,
                        event = feed.next_event() => match event {
                            Some(event) => Step::Event(event),
                            None => Step::FeedEnded,
                        },
                    },
                    None => Step::FeedEnded,
                }
            };

            match step {
                Step::Event(event) => {
                    self.apply(event);
                }
                Step::Shutdown => {
                    self.deactivate().await;
                }
                Step::FeedEnded => {
                    if let Some(mut consumer) = self.feed.take() {
                        warn!(
                            "event=feed_subscribe module=registry status=error error_code=feed_closed subscription_id={}",
                            consumer.subscription_id()
                        );
                        consumer.close(&*self.store).await;
                    }
                    match self.reconnect().await {
                        Reconnect::Resumed => {}
                        Reconnect::Shutdown => {
                            self.deactivate().await;
                        }
                        Reconnect::Exhausted(err) => return Err(err),
                    }
                }
            }
        }
        Ok(())
    }

    /// Closes the subscription, discards the collection and publishes the
    /// inactive state. Returns `false` when already inactive.
    pub async fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.shutdown.cancel();
        if let Some(mut consumer) = self.feed.take() {
            consumer.close(&*self.store).await;
        }
        self.collection.clear();
        self.loading = true;
        self.error = None;
        self.phase = SyncPhase::Inactive;
        self.state_tx.send_replace(RegistryState::inactive());
        info!("event=registry_deactivate module=registry status=ok");
        true
    }

    async fn reconnect(&mut self) -> Reconnect {
        let policy = self.config.reconnect.clone();
        let shutdown = self.shutdown.clone();
        self.error = Some(RegistryError::subscription("change feed closed", 0));
        self.set_phase(SyncPhase::Reconnecting);

        let mut last_reason = "change feed closed".to_string();
        for attempt in 1..=policy.max_attempts {
            let delay = policy.backoff_for(attempt);
            info!(
                "event=feed_reconnect module=registry status=start attempt={} delay_ms={}",
                attempt,
                delay.as_millis()
            );
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Reconnect::Shutdown,
                _ = tokio::time::sleep(delay) => {}
            }

            match ChangeFeedConsumer::open(&*self.store).await {
                Ok(consumer) => {
                    self.feed = Some(consumer);
                    info!(
                        "event=feed_reconnect module=registry status=ok attempt={}",
                        attempt
                    );
                    self.error = None;
                    // The snapshot error, if any, is kept by `load_and_replay`.
                    let _ = self.load_and_replay(false).await;
                    self.set_phase(self.feed_phase());
                    return Reconnect::Resumed;
                }
                Err(err) => {
                    last_reason = match &err {
                        RegistryError::SubscriptionFailure { reason, .. } => reason.clone(),
                        other => other.to_string(),
                    };
                    warn!(
                        "event=feed_reconnect module=registry status=error attempt={} error={}",
                        attempt, err
                    );
                }
            }
        }

        let err = RegistryError::subscription(last_reason, policy.max_attempts);
        error!(
            "event=feed_reconnect module=registry status=error error_code=reconnect_exhausted attempts={}",
            policy.max_attempts
        );
        self.error = Some(err.clone());
        self.set_phase(SyncPhase::Disconnected);
        Reconnect::Exhausted(err)
    }

    /// Loads the snapshot into the collection, then replays buffered events.
    ///
    /// On failure an initial load leaves the collection empty, a resync keeps
    /// the stale collection; buffered events are replayed either way.
    async fn load_and_replay(&mut self, initial: bool) -> Result<usize, RegistryError> {
        let loader = SnapshotLoader::new(&*self.store, self.config.snapshot_timeout());
        let loaded = loader.load(&*self.clock).await;

        let result = match loaded {
            Ok(snapshot) => {
                self.collection = CandidateCollection::from_snapshot(snapshot.candidates);
                Ok(())
            }
            Err(err) => {
                if initial {
                    self.collection.clear();
                }
                self.error = Some(err.clone());
                Err(err)
            }
        };

        let buffered = match self.feed.as_mut() {
            Some(consumer) => consumer.drain_buffered(),
            None => Vec::new(),
        };
        if !buffered.is_empty() {
            info!(
                "event=feed_replay module=registry status=ok count={}",
                buffered.len()
            );
        }
        for event in buffered {
            apply_event(&mut self.collection, event, &*self.clock);
        }

        result.map(|()| self.collection.len())
    }

    fn feed_phase(&self) -> SyncPhase {
        if self.feed.is_some() {
            SyncPhase::Live
        } else {
            SyncPhase::Disconnected
        }
    }

    fn set_phase(&mut self, phase: SyncPhase) {
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(RegistryState {
            candidates: self.collection.to_shared(),
            loading: self.loading,
            phase: self.phase,
            error: self.error.clone(),
        });
    }
}
