#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pulsia_core::payload::encode_record;
use pulsia_core::{
    CandidateRecord, CandidateStatus, CandidateStore, ChangeFeed, RawChange, StoreError,
    StoreResult, SubscriptionId,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot, Notify};
use uuid::Uuid;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

pub fn record(id: &str, minutes_ago: i64) -> CandidateRecord {
    CandidateRecord::new(
        id,
        format!("Candidate {id}"),
        CandidateStatus::New,
        now() - Duration::minutes(minutes_ago),
    )
}

/// In-test store with scripted snapshot rows, failures and a manual feed.
#[derive(Default)]
pub struct ScriptedStore {
    rows: Mutex<Vec<Value>>,
    snapshot_error: Mutex<Option<String>>,
    snapshot_gate: Mutex<Option<oneshot::Receiver<()>>>,
    sender: Mutex<Option<(SubscriptionId, mpsc::UnboundedSender<RawChange>)>>,
    /// Subscribe calls allowed to succeed before every later one fails.
    subscribe_budget: Mutex<Option<u32>>,
    pub subscribed: Notify,
    pub fetches: AtomicU32,
    pub subscribes: AtomicU32,
    pub unsubscribes: AtomicU32,
}

impl ScriptedStore {
    pub fn with_records(records: &[CandidateRecord]) -> Self {
        let store = Self::default();
        store.set_records(records);
        store
    }

    pub fn set_records(&self, records: &[CandidateRecord]) {
        *self.rows.lock().unwrap() = records.iter().map(encode_record).collect();
    }

    pub fn set_rows(&self, rows: Vec<Value>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn fail_snapshot(&self, reason: &str) {
        *self.snapshot_error.lock().unwrap() = Some(reason.to_string());
    }

    /// Holds the next snapshot read until the returned sender fires (or drops).
    pub fn gate_snapshot(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.snapshot_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn limit_subscribes(&self, successes: u32) {
        *self.subscribe_budget.lock().unwrap() = Some(successes);
    }

    /// Delivers one message to the open subscription, if any.
    pub fn emit(&self, change: RawChange) -> bool {
        match self.sender.lock().unwrap().as_ref() {
            Some((_, sender)) => sender.send(change).is_ok(),
            None => false,
        }
    }

    /// Drops the sending half, ending the current feed.
    pub fn drop_feed(&self) {
        self.sender.lock().unwrap().take();
    }
}

#[async_trait]
impl CandidateStore for ScriptedStore {
    async fn fetch_snapshot(&self) -> StoreResult<Vec<Value>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = self.snapshot_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(reason) = self.snapshot_error.lock().unwrap().clone() {
            return Err(StoreError::Unavailable(reason));
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn subscribe(&self) -> StoreResult<ChangeFeed> {
        let attempt = self.subscribes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(budget) = *self.subscribe_budget.lock().unwrap() {
            if attempt > budget {
                return Err(StoreError::Unavailable("realtime channel refused".to_string()));
            }
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        *self.sender.lock().unwrap() = Some((id, sender));
        self.subscribed.notify_one();
        Ok(ChangeFeed::new(id, receiver))
    }

    async fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        let mut sender = self.sender.lock().unwrap();
        if sender.as_ref().is_some_and(|(current, _)| *current == id) {
            sender.take();
        }
    }
}
