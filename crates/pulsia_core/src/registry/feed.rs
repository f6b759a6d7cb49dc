//! Change-feed consumption.
//!
//! # Responsibility
//! - Own one open change subscription for the registry.
//! - Turn raw messages into validated `ChangeEvent`s, dropping malformed ones.
//! - Apply events to the collection.
//!
//! # Invariants
//! - `close` releases the subscription exactly once; later calls are no-ops.
//! - After `close`, no message is ever yielded again.

use super::collection::{ApplyOutcome, CandidateCollection};
use super::error::RegistryError;
use crate::clock::Clock;
use crate::model::change::ChangeEvent;
use crate::payload::{parse_change, RawChange};
use crate::store::{CandidateStore, ChangeFeed, SubscriptionId};
use log::{debug, info, warn};

pub struct ChangeFeedConsumer {
    feed: Option<ChangeFeed>,
    subscription_id: SubscriptionId,
}

impl ChangeFeedConsumer {
    /// Opens a subscription on `store`.
    pub async fn open<S: CandidateStore + ?Sized>(store: &S) -> Result<Self, RegistryError> {
        match store.subscribe().await {
            Ok(feed) => {
                let subscription_id = feed.id();
                info!(
                    "event=feed_subscribe module=registry status=ok subscription_id={}",
                    subscription_id
                );
                Ok(Self {
                    feed: Some(feed),
                    subscription_id,
                })
            }
            Err(err) => {
                warn!(
                    "event=feed_subscribe module=registry status=error error={}",
                    err
                );
                Err(RegistryError::subscription(err.to_string(), 0))
            }
        }
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub fn is_open(&self) -> bool {
        self.feed.is_some()
    }

    /// Drains every message already delivered, in arrival order.
    pub fn drain_buffered(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        let Some(feed) = self.feed.as_mut() else {
            return events;
        };
        while let Ok(raw) = feed.try_recv() {
            if let Some(event) = validate(&raw) {
                events.push(event);
            }
        }
        events
    }

    /// Waits for the next valid event; `None` once the feed has ended or
    /// been closed. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        let feed = self.feed.as_mut()?;
        loop {
            let raw = feed.recv().await?;
            if let Some(event) = validate(&raw) {
                return Some(event);
            }
        }
    }

    /// Closes the subscription. Returns `false` when already closed.
    pub async fn close<S: CandidateStore + ?Sized>(&mut self, store: &S) -> bool {
        let Some(mut feed) = self.feed.take() else {
            return false;
        };
        feed.close();
        store.unsubscribe(feed.id()).await;
        info!(
            "event=feed_close module=registry status=ok subscription_id={}",
            self.subscription_id
        );
        true
    }
}

/// Applies one event at the clock's current time.
pub fn apply_event(
    collection: &mut CandidateCollection,
    event: ChangeEvent,
    clock: &dyn Clock,
) -> ApplyOutcome {
    let kind = event.kind();
    let id = event.id().clone();
    let outcome = collection.apply(event, clock.now());
    debug!(
        "event=feed_apply module=registry status=ok kind={} candidate_id={} outcome={:?} len={}",
        kind,
        id,
        outcome,
        collection.len()
    );
    outcome
}

fn validate(raw: &RawChange) -> Option<ChangeEvent> {
    match parse_change(raw) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(
                "event=payload_reject module=registry status=skip source=feed event_type={} error_code={} error={}",
                raw.event_type,
                err.code(),
                err
            );
            None
        }
    }
}
