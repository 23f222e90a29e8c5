//! Reconciles local state with the node.
//!
//! A cycle fetches the balance, the block height and any transfers newer
//! than each history source's stored cursor, then stores and publishes them. At most one cycle
//! runs at a time per syncer. `stop()` aborts in-flight cycles; an aborted
//! or superseded cycle never publishes a final state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use derivable_rpc::JsonRpcClient;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{KitResult, SyncError};
use crate::history::HistoryFetcher;
use crate::managers::{AccountInfoManager, TransactionManager};
use crate::storage::{CoinStorage, CoinTransaction};
use crate::sync_state::SyncState;

const IDLE: u64 = 0;

struct Shared {
    api: Arc<JsonRpcClient>,
    history: HistoryFetcher,
    account_info: Arc<AccountInfoManager>,
    transactions: Arc<TransactionManager>,
    storage: Arc<dyn CoinStorage>,
    address: String,
    chain_uid: String,
    state_tx: watch::Sender<SyncState>,
    height_tx: watch::Sender<u64>,
    /// Bumped by `stop()`; cycles from an older epoch stay silent.
    epoch: AtomicU64,
    /// Epoch of the running cycle, or `IDLE`.
    running: AtomicU64,
}

/// Clears the single-flight slot when a cycle ends or is dropped mid-flight.
struct RunningGuard<'a> {
    running: &'a AtomicU64,
    epoch: u64,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let _ = self
            .running
            .compare_exchange(self.epoch, IDLE, Ordering::SeqCst, Ordering::SeqCst);
    }
}

impl Shared {
    fn try_begin(&self) -> Option<RunningGuard<'_>> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.running
            .compare_exchange(IDLE, epoch, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunningGuard {
                running: &self.running,
                epoch,
            })
    }

    fn publish(&self, epoch: u64, state: SyncState) {
        self.state_tx.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != epoch || *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    async fn run(&self) {
        let Some(guard) = self.try_begin() else {
            debug!(address = %self.address, "sync already running");
            return;
        };
        let epoch = guard.epoch;

        self.publish(epoch, SyncState::Syncing { progress: None });
        debug!(address = %self.address, chain = %self.chain_uid, "sync started");

        match self.cycle(epoch).await {
            Ok(count) => {
                self.publish(epoch, SyncState::Synced);
                info!(address = %self.address, new_transactions = count, "sync finished");
            }
            Err(e) => {
                warn!(address = %self.address, error = %e, "sync failed");
                self.publish(epoch, SyncState::NotSynced(SyncError::from(e)));
            }
        }
        drop(guard);
    }

    async fn cycle(&self, epoch: u64) -> KitResult<usize> {
        let balance = self.api.get_balance(&self.address, None).await?;
        if !self.is_current(epoch) {
            return Ok(0);
        }
        self.account_info.handle_balance(balance)?;

        let height = self.api.get_block_height().await?;
        if !self.is_current(epoch) {
            return Ok(0);
        }
        let changed = *self.height_tx.borrow() != height;
        if changed {
            self.storage
                .save_last_block_height(&self.address, &self.chain_uid, height)?;
            self.height_tx.send_replace(height);
        }

        let rpc_source = self.api.endpoint();
        let cursors = self
            .storage
            .signature_cursors(&rpc_source, &self.address, &self.chain_uid)?;

        let mut fetched = self
            .history
            .native_transfers(&self.address, &rpc_source, &cursors)
            .await?;
        fetched.extend(
            self.history
                .token_transfers(&self.address, &rpc_source, &cursors)
                .await?,
        );
        if !self.is_current(epoch) {
            return Ok(0);
        }

        let merged = dedup_sorted(fetched.records);
        let count = merged.len();
        self.transactions.save(merged, true)?;
        self.storage.save_signature_cursors(
            &rpc_source,
            &self.address,
            &self.chain_uid,
            &fetched.cursors,
        )?;
        Ok(count)
    }
}

/// Unique by hash (first occurrence wins), oldest first.
fn dedup_sorted(transactions: Vec<CoinTransaction>) -> Vec<CoinTransaction> {
    let mut seen = HashSet::new();
    let mut unique: Vec<CoinTransaction> = transactions
        .into_iter()
        .filter(|tx| seen.insert(tx.hash.clone()))
        .collect();
    unique.sort_by_key(|tx| tx.block_time);
    unique
}

pub struct Syncer {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    interval: Option<Duration>,
}

impl Syncer {
    pub fn new(
        api: Arc<JsonRpcClient>,
        history: HistoryFetcher,
        account_info: Arc<AccountInfoManager>,
        transactions: Arc<TransactionManager>,
        storage: Arc<dyn CoinStorage>,
        address: impl Into<String>,
        chain_uid: impl Into<String>,
    ) -> KitResult<Self> {
        let address = address.into();
        let chain_uid = chain_uid.into();
        let height = storage
            .last_block_height(&address, &chain_uid)?
            .unwrap_or(0);
        let (state_tx, _) = watch::channel(SyncState::default());
        let (height_tx, _) = watch::channel(height);

        Ok(Self {
            shared: Arc::new(Shared {
                api,
                history,
                account_info,
                transactions,
                storage,
                address,
                chain_uid,
                state_tx,
                height_tx,
                epoch: AtomicU64::new(1),
                running: AtomicU64::new(IDLE),
            }),
            tasks: Mutex::new(Vec::new()),
            interval: None,
        })
    }

    /// Run a cycle every `interval` after `start()`.
    pub fn with_interval(mut self, interval: Option<Duration>) -> Self {
        self.interval = interval.filter(|i| !i.is_zero());
        self
    }

    pub fn state(&self) -> SyncState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.shared.state_tx.subscribe()
    }

    pub fn last_block_height(&self) -> u64 {
        *self.shared.height_tx.borrow()
    }

    pub fn subscribe_block_height(&self) -> watch::Receiver<u64> {
        self.shared.height_tx.subscribe()
    }

    /// Run one cycle on the calling task. Returns at once if a cycle is
    /// already running.
    pub async fn sync(&self) {
        self.shared.run().await;
    }

    /// Start an immediate cycle and, with an interval, periodic ones.
    pub fn start(&self) {
        info!(address = %self.shared.address, chain = %self.shared.chain_uid, "syncer started");
        self.spawn_cycle();

        if let Some(period) = self.interval {
            let shared = self.shared.clone();
            self.spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first tick completes immediately.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    shared.run().await;
                }
            });
        }
    }

    /// Abort every task and return to `NotSynced(NotStarted)`.
    pub fn stop(&self) {
        let aborted = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
            let count = tasks.len();
            for task in tasks.drain(..) {
                task.abort();
            }
            count
        };
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.running.store(IDLE, Ordering::SeqCst);
        self.shared.state_tx.send_replace(SyncState::default());
        info!(address = %self.shared.address, aborted, "syncer stopped");
    }

    /// Supersede any running cycle with a fresh one. Periodic cycles stay
    /// scheduled.
    pub fn restart(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.shared.running.store(IDLE, Ordering::SeqCst);
        debug!(address = %self.shared.address, "sync restarted");
        self.spawn_cycle();
    }

    /// Start a cycle unless one is running.
    pub fn refresh(&self) {
        if self.state().is_syncing() {
            return;
        }
        self.spawn_cycle();
    }

    fn spawn_cycle(&self) {
        let shared = self.shared.clone();
        self.spawn(async move { shared.run().await });
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, sync task not started");
            return;
        };
        let handle = runtime.spawn(task);
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }
}

impl Drop for Syncer {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(|p| p.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}
