use crate::ledger::client::LedgerReader;
use crate::ledger::processor::HistoryProcessor;
use crate::models::UserTransaction;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

/// Point-in-time view of the history state machine: the last successfully
/// assembled list, whether a fetch is in flight, and the last fetch-fatal
/// error, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    pub transactions: Vec<UserTransaction>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The public entry point. Tracks one observed wallet address, re-assembles
/// the history whenever it changes or on demand, and publishes snapshots
/// over a watch channel. Neither `set_address` nor `refetch` ever returns an
/// error: fetch-fatal failures land in the snapshot's `error` field and
/// leave the previous transaction list in place.
pub struct HistoryService<R> {
    processor: HistoryProcessor<R>,
    address: Mutex<Option<String>>,
    generation: AtomicU64,
    snapshot_tx: watch::Sender<HistorySnapshot>,
}

impl<R: LedgerReader> HistoryService<R> {
    pub fn new(processor: HistoryProcessor<R>) -> Self {
        let (snapshot_tx, _) = watch::channel(HistorySnapshot::default());

        Self {
            processor,
            address: Mutex::new(None),
            generation: AtomicU64::new(0),
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HistorySnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Point the service at a new wallet address (or none) and re-run the
    /// fetch. An empty address counts as none.
    pub async fn set_address(&self, address: Option<String>) {
        let address = address.filter(|a| !a.is_empty());
        {
            let mut current = self.address.lock().await;
            *current = address;
        }
        self.refetch().await;
    }

    /// Repeat the full assembly for the current address.
    pub async fn refetch(&self) {
        let address = { self.address.lock().await.clone() };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // No address: reset to the empty state without touching the network
        let Some(address) = address else {
            self.publish(generation, HistorySnapshot::default());
            return;
        };

        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.is_loading = true;
            snapshot.error = None;
        });

        match self.processor.user_transactions(&address).await {
            Ok(transactions) => {
                self.publish(
                    generation,
                    HistorySnapshot {
                        transactions,
                        is_loading: false,
                        error: None,
                    },
                );
            }
            Err(e) => {
                warn!(
                    "Failed to assemble transaction history for {}: {}",
                    address, e
                );
                if self.is_current(generation) {
                    self.snapshot_tx.send_modify(|snapshot| {
                        snapshot.is_loading = false;
                        snapshot.error = Some(e.to_string());
                    });
                }
            }
        }
    }

    /// Latest-wins: a fetch superseded by a newer one publishes nothing.
    fn publish(&self, generation: u64, snapshot: HistorySnapshot) {
        if self.is_current(generation) {
            self.snapshot_tx.send_modify(|current| *current = snapshot);
        } else {
            debug!("Discarding superseded history fetch");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}
