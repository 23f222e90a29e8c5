//! Thin layers over [`CoinStorage`] that also publish what they store.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::error::KitResult;
use crate::storage::{CoinStorage, CoinTransaction, TransactionFilter, TransactionQuery};

const TRANSACTION_CHANNEL_CAPACITY: usize = 100;

/// Native balance of the owner address.
pub struct AccountInfoManager {
    storage: Arc<dyn CoinStorage>,
    address: String,
    chain_uid: String,
    balance_tx: watch::Sender<u64>,
}

impl AccountInfoManager {
    pub fn new(
        storage: Arc<dyn CoinStorage>,
        address: impl Into<String>,
        chain_uid: impl Into<String>,
    ) -> KitResult<Self> {
        let address = address.into();
        let chain_uid = chain_uid.into();
        let stored = storage.balance(&address, &chain_uid)?.unwrap_or(0);
        let (balance_tx, _) = watch::channel(stored);
        Ok(Self {
            storage,
            address,
            chain_uid,
            balance_tx,
        })
    }

    /// Last stored balance; zero before the first sync.
    pub fn balance(&self) -> u64 {
        *self.balance_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.balance_tx.subscribe()
    }

    pub fn handle_balance(&self, balance: u64) -> KitResult<()> {
        self.storage
            .save_balance(&self.address, &self.chain_uid, balance)?;
        self.balance_tx.send_replace(balance);
        debug!(address = %self.address, balance, "balance updated");
        Ok(())
    }
}

/// Transfer history of the owner address.
pub struct TransactionManager {
    storage: Arc<dyn CoinStorage>,
    address: String,
    chain_uid: String,
    transactions_tx: broadcast::Sender<Vec<CoinTransaction>>,
}

impl TransactionManager {
    pub fn new(
        storage: Arc<dyn CoinStorage>,
        address: impl Into<String>,
        chain_uid: impl Into<String>,
    ) -> Self {
        let (transactions_tx, _) = broadcast::channel(TRANSACTION_CHANNEL_CAPACITY);
        Self {
            storage,
            address: address.into(),
            chain_uid: chain_uid.into(),
            transactions_tx,
        }
    }

    /// Every batch saved from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<CoinTransaction>> {
        self.transactions_tx.subscribe()
    }

    pub fn transactions(
        &self,
        rpc_source: &str,
        filter: TransactionFilter,
        from_hash: Option<&str>,
        limit: Option<usize>,
    ) -> KitResult<Vec<CoinTransaction>> {
        self.storage.transactions(&TransactionQuery {
            rpc_source,
            address: &self.address,
            chain_uid: &self.chain_uid,
            filter,
            from_hash,
            limit,
        })
    }

    pub fn last_transaction(&self, rpc_source: &str) -> KitResult<Option<CoinTransaction>> {
        self.storage
            .last_transaction(rpc_source, &self.address, &self.chain_uid)
    }

    pub fn save(
        &self,
        transactions: Vec<CoinTransaction>,
        replace_on_conflict: bool,
    ) -> KitResult<()> {
        self.storage
            .save_transactions(&transactions, replace_on_conflict)?;
        if !transactions.is_empty() {
            // No receivers is fine.
            let _ = self.transactions_tx.send(transactions);
        }
        Ok(())
    }
}
