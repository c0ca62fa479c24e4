//! Persistent-state synchronizer over the fast mirror and the durable store.
//!
//! ## Attach
//!
//! 1. Read the fast mirror; a value that parses becomes the provisional state.
//! 2. Ask the durable store for a durability upgrade (denial is tolerated).
//! 3. Read the durable store. A stored value replaces the provisional state
//!    and is copied back into the mirror. An absent value changes nothing.
//! 4. Clear the loading flag. It never goes back to `true`.
//!
//! ## Writes
//!
//! After loading, every update writes the mirror synchronously and then hands
//! the durable write to a background writer. Durable failures are logged and
//! dropped. Each durable write carries a per-key sequence number and the store
//! ignores writes older than the last one it applied.

use super::backend::{DurableStore, FastMirror};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// Monotonic per-key logical clock.
///
/// Seeded from wall-clock microseconds so sequence numbers keep increasing
/// across process restarts. [`Sequencer::observe`] raises the floor to the
/// last sequence the store applied, so a store that is ahead of the local
/// clock still accepts new writes.
#[derive(Debug, Default)]
pub struct Sequencer {
    last: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never hand out a sequence at or below `seq`.
    pub fn observe(&mut self, seq: u64) {
        self.last = self.last.max(seq);
    }

    pub fn next(&mut self) -> u64 {
        let now = chrono::Utc::now().timestamp_micros().max(0) as u64;
        self.last = now.max(self.last.saturating_add(1));
        self.last
    }
}

enum WriteJob {
    Put { key: String, value: Value, seq: u64 },
    Flush(Sender<()>),
}

/// Background thread applying durable writes in submission order.
struct DurableWriter {
    tx: Option<Sender<WriteJob>>,
    handle: Option<JoinHandle<()>>,
}

impl DurableWriter {
    fn spawn(store: Arc<dyn DurableStore>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<WriteJob>();
        let handle = thread::Builder::new()
            .name("ks-durable-writer".to_string())
            .spawn(move || {
                for job in rx {
                    match job {
                        WriteJob::Put { key, value, seq } => {
                            apply_durable_write(store.as_ref(), &key, &value, seq)
                        }
                        WriteJob::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Returns the job back if the writer has gone away.
    fn submit(&self, job: WriteJob) -> Result<(), WriteJob> {
        match self.tx {
            Some(ref tx) => tx.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.submit(WriteJob::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }

    fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("durable writer thread panicked");
            }
        }
    }
}

impl Drop for DurableWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply_durable_write(store: &dyn DurableStore, key: &str, value: &Value, seq: u64) {
    match store.set(key, value, seq) {
        Ok(true) => tracing::debug!(key, seq, "durable write applied"),
        Ok(false) => tracing::debug!(key, seq, "stale durable write discarded"),
        Err(e) => tracing::warn!(key, seq, error = %e, "failed to save to durable storage"),
    }
}

/// Value + setter + loading flag for one key, mirrored across both tiers.
pub struct Synchronizer<T> {
    key: String,
    state: T,
    loading: bool,
    mirror: Arc<dyn FastMirror>,
    durable: Option<Arc<dyn DurableStore>>,
    writer: Option<DurableWriter>,
    sequencer: Sequencer,
}

impl<T> Synchronizer<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create a synchronizer holding the provisional state from the mirror
    /// (or `initial`). Loading stays `true` until [`reconcile`] runs.
    ///
    /// [`reconcile`]: Synchronizer::reconcile
    pub fn new(
        key: impl Into<String>,
        initial: T,
        mirror: Arc<dyn FastMirror>,
        durable: Arc<dyn DurableStore>,
    ) -> Self {
        let key = key.into();
        let state = match mirror.get(&key) {
            Some(text) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "parsing error on mirrored value");
                    initial
                }
            },
            None => initial,
        };

        Self {
            key,
            state,
            loading: true,
            mirror,
            durable: Some(durable),
            writer: None,
            sequencer: Sequencer::new(),
        }
    }

    /// Create and immediately reconcile.
    pub fn attach(
        key: impl Into<String>,
        initial: T,
        mirror: Arc<dyn FastMirror>,
        durable: Arc<dyn DurableStore>,
    ) -> Self {
        let mut sync = Self::new(key, initial, mirror, durable);
        sync.reconcile();
        sync
    }

    /// Consult the durable store and finish loading. Runs once; later calls
    /// are no-ops.
    pub fn reconcile(&mut self) {
        if !self.loading {
            return;
        }

        if let Some(durable) = self.durable.clone() {
            match durable.init() {
                Ok(()) => {
                    durable.request_persistence();
                    self.adopt_durable_value(durable.as_ref());
                    self.seed_sequencer(durable.as_ref());
                    self.start_writer(durable);
                }
                Err(e) => {
                    tracing::warn!(
                        key = %self.key,
                        location = %durable.location(),
                        mirror = %self.mirror.location(),
                        error = %e,
                        "durable storage unavailable, using mirror only"
                    );
                    self.durable = None;
                }
            }
        }

        self.loading = false;
    }

    fn adopt_durable_value(&mut self, durable: &dyn DurableStore) {
        match durable.get(&self.key) {
            Ok(Some(value)) => match serde_json::from_value::<T>(value.clone()) {
                Ok(state) => {
                    self.state = state;
                    match serde_json::to_string(&value) {
                        Ok(text) => {
                            if let Err(e) = self.mirror.set(&self.key, &text) {
                                tracing::warn!(key = %self.key, error = %e, "failed to refresh mirror");
                            }
                        }
                        Err(e) => tracing::warn!(key = %self.key, error = %e, "failed to serialize durable value"),
                    }
                    tracing::debug!(key = %self.key, "adopted durable value");
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "durable value has unexpected shape, keeping mirror value");
                }
            },
            Ok(None) => tracing::debug!(key = %self.key, "no durable value, keeping provisional state"),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to load from durable storage");
            }
        }
    }

    fn seed_sequencer(&mut self, durable: &dyn DurableStore) {
        match durable.last_seq(&self.key) {
            Ok(Some(seq)) => self.sequencer.observe(seq),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read durable sequence");
            }
        }
    }

    fn start_writer(&mut self, durable: Arc<dyn DurableStore>) {
        match DurableWriter::spawn(durable) {
            Ok(writer) => self.writer = Some(writer),
            Err(e) => {
                tracing::warn!(error = %e, "could not start durable writer, writing inline");
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether durable writes are still being attempted.
    pub fn is_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// Replace the value.
    pub fn set(&mut self, value: T) {
        self.state = value;
        self.persist();
    }

    /// Derive the next value from the current one.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.state);
        self.set(next);
    }

    /// Wait until every durable write submitted so far has been applied.
    pub fn flush(&self) {
        if let Some(ref writer) = self.writer {
            writer.flush();
        }
    }

    /// Drain pending durable writes and release the writer.
    pub fn close(mut self) {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown();
        }
    }

    fn persist(&mut self) {
        if self.loading {
            tracing::debug!(key = %self.key, "write suppressed while loading");
            return;
        }

        let value = match serde_json::to_value(&self.state) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to serialize state");
                return;
            }
        };

        match serde_json::to_string(&value) {
            Ok(text) => {
                if let Err(e) = self.mirror.set(&self.key, &text) {
                    tracing::warn!(key = %self.key, error = %e, "failed to save to mirror");
                }
            }
            Err(e) => tracing::warn!(key = %self.key, error = %e, "failed to serialize state"),
        }

        let Some(ref durable) = self.durable else {
            return;
        };
        let seq = self.sequencer.next();
        let job = WriteJob::Put {
            key: self.key.clone(),
            value,
            seq,
        };
        let job = match self.writer {
            Some(ref writer) => match writer.submit(job) {
                Ok(()) => return,
                Err(job) => job,
            },
            None => job,
        };
        if let WriteJob::Put { key, value, seq } = job {
            apply_durable_write(durable.as_ref(), &key, &value, seq);
        }
    }
}
