//! Per-user conversation history, persisted in the cache.
//!
//! Each user's history is a JSON list of turns under `chat:<user>`, capped
//! at 100 entries with a 7-day TTL reset on every write. Writes run on a
//! dedicated background task so they can never block or fail the reply
//! path; the single writer also serializes the read-modify-write cycle.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{KvStore, StoreError};
use crate::gemini::Turn;

/// Maximum turns kept per user; oldest are evicted first.
const MAX_TURNS: usize = 100;

/// History lifetime, refreshed on every write.
const HISTORY_TTL_SECS: u64 = 86_400 * 7;

/// Capacity of the pending-write queue. When full, writes are dropped
/// with a warning rather than blocking the reply path.
const WRITE_QUEUE_CAPACITY: usize = 64;

fn history_key(user_id: &str) -> String {
    format!("chat:{user_id}")
}

/// Cache-backed conversation history store.
pub struct HistoryStore<S> {
    store: S,
}

impl<S: KvStore> HistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Load a user's history to seed a new model session. Absent, expired,
    /// malformed, or unreachable all yield an empty history.
    pub async fn load(&self, user_id: &str) -> Vec<Turn> {
        let raw = match self.store.get(&history_key(user_id)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("History read failed for {user_id}, starting fresh: {e}");
                return Vec::new();
            }
        };

        let Some(raw) = raw else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<Turn>>(&raw) {
            Ok(turns) => turns,
            Err(e) => {
                warn!("Corrupt history for {user_id}, starting fresh: {e}");
                Vec::new()
            }
        }
    }

    /// Append a user turn and a model turn, evict down to the newest
    /// [`MAX_TURNS`], and write back with a fresh TTL.
    pub async fn append(
        &self,
        user_id: &str,
        query: &str,
        response_text: &str,
    ) -> Result<(), StoreError> {
        let mut turns = self.load(user_id).await;
        turns.push(Turn::user(query));
        turns.push(Turn::model(response_text));

        if turns.len() > MAX_TURNS {
            let excess = turns.len() - MAX_TURNS;
            turns.drain(..excess);
        }

        let encoded = serde_json::to_string(&turns)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.store
            .set_ex(&history_key(user_id), &encoded, HISTORY_TTL_SECS)
            .await
    }
}

/// One queued history append.
#[derive(Debug)]
pub struct HistoryWrite {
    pub user_id: String,
    pub query: String,
    pub response_text: String,
}

/// Handle for enqueueing history writes onto the background writer.
#[derive(Clone)]
pub struct HistoryWriter {
    tx: mpsc::Sender<HistoryWrite>,
}

impl HistoryWriter {
    /// Queue an append without waiting for it. A full queue drops the
    /// write with a warning.
    pub fn enqueue(&self, write: HistoryWrite) {
        match self.tx.try_send(write) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(write)) => {
                warn!("History queue full, dropping write for {}", write.user_id);
            }
            Err(mpsc::error::TrySendError::Closed(write)) => {
                warn!("History writer gone, dropping write for {}", write.user_id);
            }
        }
    }
}

/// Spawn the background writer task.
///
/// The task drains the queue until every [`HistoryWriter`] handle is
/// dropped, then exits; the join handle lets shutdown wait for the drain.
pub fn spawn_history_writer<S>(history: HistoryStore<S>) -> (HistoryWriter, JoinHandle<()>)
where
    S: KvStore + 'static,
{
    let (tx, mut rx) = mpsc::channel::<HistoryWrite>(WRITE_QUEUE_CAPACITY);

    let handle = tokio::spawn(async move {
        while let Some(write) = rx.recv().await {
            debug!("💾 Persisting history for {}", write.user_id);
            if let Err(e) = history
                .append(&write.user_id, &write.query, &write.response_text)
                .await
            {
                // Swallowed on purpose: history is best-effort.
                warn!("Failed to save chat history for {}: {e}", write.user_id);
            }
        }
        info!("History writer drained");
    });

    (HistoryWriter { tx }, handle)
}
