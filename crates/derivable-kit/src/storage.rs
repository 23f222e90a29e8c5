//! Persistence boundary for balances, block heights and transfer history.
//!
//! Everything is keyed by chain uid and owner address; transfer history is
//! further scoped by the RPC source it was fetched from.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{KitError, KitResult};

/// One transfer touching the owner address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinTransaction {
    pub rpc_source: String,
    pub chain_uid: String,
    pub hash: String,
    pub owner: String,
    pub block_time: u64,
    pub from: String,
    pub to: String,
    pub value: u64,
    pub fee: u64,
    pub is_failed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionFilter {
    #[default]
    All,
    /// `to == owner`
    Incoming,
    /// `from == owner`
    Outgoing,
}

impl TransactionFilter {
    fn matches(self, tx: &CoinTransaction) -> bool {
        match self {
            TransactionFilter::All => true,
            TransactionFilter::Incoming => tx.to == tx.owner,
            TransactionFilter::Outgoing => tx.from == tx.owner,
        }
    }
}

/// Query over stored history.
#[derive(Debug, Clone, Copy)]
pub struct TransactionQuery<'a> {
    pub rpc_source: &'a str,
    pub address: &'a str,
    pub chain_uid: &'a str,
    pub filter: TransactionFilter,
    /// Only records strictly newer than this one.
    pub from_hash: Option<&'a str>,
    pub limit: Option<usize>,
}

pub trait CoinStorage: Send + Sync {
    fn balance(&self, address: &str, chain_uid: &str) -> KitResult<Option<u64>>;

    fn save_balance(&self, address: &str, chain_uid: &str, balance: u64) -> KitResult<()>;

    fn last_block_height(&self, address: &str, chain_uid: &str) -> KitResult<Option<u64>>;

    fn save_last_block_height(&self, address: &str, chain_uid: &str, height: u64)
        -> KitResult<()>;

    /// Matching records ordered by block time, oldest first.
    fn transactions(&self, query: &TransactionQuery<'_>) -> KitResult<Vec<CoinTransaction>>;

    /// The newest stored record, used as the history cursor.
    fn last_transaction(
        &self,
        rpc_source: &str,
        address: &str,
        chain_uid: &str,
    ) -> KitResult<Option<CoinTransaction>>;

    /// With `replace_on_conflict == false` records already stored are kept.
    fn save_transactions(
        &self,
        transactions: &[CoinTransaction],
        replace_on_conflict: bool,
    ) -> KitResult<()>;

    /// Newest recorded signature per history source, keyed by the source
    /// address (the owner itself or one of its token accounts).
    fn signature_cursors(
        &self,
        rpc_source: &str,
        address: &str,
        chain_uid: &str,
    ) -> KitResult<HashMap<String, String>>;

    /// Overwrites the named cursors and keeps the rest.
    fn save_signature_cursors(
        &self,
        rpc_source: &str,
        address: &str,
        chain_uid: &str,
        cursors: &HashMap<String, String>,
    ) -> KitResult<()>;
}

type AccountKey = (String, String);
type TransactionKey = (String, String, String, String);
type CursorKey = (String, String, String);

#[derive(Debug, Default)]
struct MemoryState {
    balances: HashMap<AccountKey, u64>,
    heights: HashMap<AccountKey, u64>,
    transactions: BTreeMap<TransactionKey, CoinTransaction>,
    cursors: HashMap<CursorKey, HashMap<String, String>>,
}

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> KitResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| KitError::Storage("memory storage lock poisoned".into()))
    }
}

fn account_key(address: &str, chain_uid: &str) -> AccountKey {
    (chain_uid.to_string(), address.to_string())
}

fn cursor_key(rpc_source: &str, address: &str, chain_uid: &str) -> CursorKey {
    (
        rpc_source.to_string(),
        chain_uid.to_string(),
        address.to_string(),
    )
}

fn transaction_key(tx: &CoinTransaction) -> TransactionKey {
    (
        tx.rpc_source.clone(),
        tx.chain_uid.clone(),
        tx.owner.clone(),
        tx.hash.clone(),
    )
}

impl CoinStorage for MemoryStorage {
    fn balance(&self, address: &str, chain_uid: &str) -> KitResult<Option<u64>> {
        Ok(self
            .lock()?
            .balances
            .get(&account_key(address, chain_uid))
            .copied())
    }

    fn save_balance(&self, address: &str, chain_uid: &str, balance: u64) -> KitResult<()> {
        self.lock()?
            .balances
            .insert(account_key(address, chain_uid), balance);
        Ok(())
    }

    fn last_block_height(&self, address: &str, chain_uid: &str) -> KitResult<Option<u64>> {
        Ok(self
            .lock()?
            .heights
            .get(&account_key(address, chain_uid))
            .copied())
    }

    fn save_last_block_height(
        &self,
        address: &str,
        chain_uid: &str,
        height: u64,
    ) -> KitResult<()> {
        self.lock()?
            .heights
            .insert(account_key(address, chain_uid), height);
        Ok(())
    }

    fn transactions(&self, query: &TransactionQuery<'_>) -> KitResult<Vec<CoinTransaction>> {
        let state = self.lock()?;
        let mut matching: Vec<&CoinTransaction> = state
            .transactions
            .values()
            .filter(|tx| {
                tx.rpc_source == query.rpc_source
                    && tx.owner == query.address
                    && tx.chain_uid == query.chain_uid
                    && query.filter.matches(tx)
            })
            .collect();

        if let Some(hash) = query.from_hash {
            let Some(anchor) = matching.iter().find(|tx| tx.hash == hash) else {
                return Ok(Vec::new());
            };
            let anchor_time = anchor.block_time;
            matching.retain(|tx| tx.block_time > anchor_time);
        }

        matching.sort_by(|a, b| {
            a.block_time
                .cmp(&b.block_time)
                .then_with(|| a.hash.cmp(&b.hash))
        });
        if let Some(limit) = query.limit {
            matching.truncate(limit);
        }
        Ok(matching.into_iter().cloned().collect())
    }

    fn last_transaction(
        &self,
        rpc_source: &str,
        address: &str,
        chain_uid: &str,
    ) -> KitResult<Option<CoinTransaction>> {
        let state = self.lock()?;
        Ok(state
            .transactions
            .values()
            .filter(|tx| {
                tx.rpc_source == rpc_source && tx.owner == address && tx.chain_uid == chain_uid
            })
            .max_by(|a, b| {
                a.block_time
                    .cmp(&b.block_time)
                    .then_with(|| a.hash.cmp(&b.hash))
            })
            .cloned())
    }

    fn save_transactions(
        &self,
        transactions: &[CoinTransaction],
        replace_on_conflict: bool,
    ) -> KitResult<()> {
        let mut state = self.lock()?;
        for tx in transactions {
            let key = transaction_key(tx);
            if !replace_on_conflict && state.transactions.contains_key(&key) {
                continue;
            }
            state.transactions.insert(key, tx.clone());
        }
        Ok(())
    }

    fn signature_cursors(
        &self,
        rpc_source: &str,
        address: &str,
        chain_uid: &str,
    ) -> KitResult<HashMap<String, String>> {
        Ok(self
            .lock()?
            .cursors
            .get(&cursor_key(rpc_source, address, chain_uid))
            .cloned()
            .unwrap_or_default())
    }

    fn save_signature_cursors(
        &self,
        rpc_source: &str,
        address: &str,
        chain_uid: &str,
        cursors: &HashMap<String, String>,
    ) -> KitResult<()> {
        self.lock()?
            .cursors
            .entry(cursor_key(rpc_source, address, chain_uid))
            .or_default()
            .extend(cursors.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RPC: &str = "https://api.devnet.solana.com/";
    const OWNER: &str = "owner";
    const CHAIN: &str = "solana";

    fn tx(hash: &str, block_time: u64, from: &str, to: &str) -> CoinTransaction {
        CoinTransaction {
            rpc_source: RPC.into(),
            chain_uid: CHAIN.into(),
            hash: hash.into(),
            owner: OWNER.into(),
            block_time,
            from: from.into(),
            to: to.into(),
            value: 1,
            fee: 5000,
            is_failed: false,
        }
    }

    fn query(filter: TransactionFilter) -> TransactionQuery<'static> {
        TransactionQuery {
            rpc_source: RPC,
            address: OWNER,
            chain_uid: CHAIN,
            filter,
            from_hash: None,
            limit: None,
        }
    }

    fn seeded() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage
            .save_transactions(
                &[
                    tx("c", 30, OWNER, "bob"),
                    tx("a", 10, "alice", OWNER),
                    tx("b", 20, OWNER, "carol"),
                    tx("d", 40, "dave", OWNER),
                ],
                true,
            )
            .unwrap();
        storage
    }

    fn hashes(txs: &[CoinTransaction]) -> Vec<&str> {
        txs.iter().map(|t| t.hash.as_str()).collect()
    }

    // -- balances and heights -----------------------------------------------

    #[test]
    fn balance_roundtrip_per_chain() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.balance(OWNER, CHAIN).unwrap(), None);
        storage.save_balance(OWNER, CHAIN, 42).unwrap();
        storage.save_balance(OWNER, "safe-coin", 7).unwrap();
        assert_eq!(storage.balance(OWNER, CHAIN).unwrap(), Some(42));
        assert_eq!(storage.balance(OWNER, "safe-coin").unwrap(), Some(7));
    }

    #[test]
    fn height_overwrites() {
        let storage = MemoryStorage::new();
        storage.save_last_block_height(OWNER, CHAIN, 100).unwrap();
        storage.save_last_block_height(OWNER, CHAIN, 101).unwrap();
        assert_eq!(storage.last_block_height(OWNER, CHAIN).unwrap(), Some(101));
    }

    // -- history ------------------------------------------------------------

    #[test]
    fn all_sorted_by_block_time() {
        let storage = seeded();
        let txs = storage.transactions(&query(TransactionFilter::All)).unwrap();
        assert_eq!(hashes(&txs), ["a", "b", "c", "d"]);
    }

    #[test]
    fn direction_filters() {
        let storage = seeded();
        let incoming = storage
            .transactions(&query(TransactionFilter::Incoming))
            .unwrap();
        assert_eq!(hashes(&incoming), ["a", "d"]);
        let outgoing = storage
            .transactions(&query(TransactionFilter::Outgoing))
            .unwrap();
        assert_eq!(hashes(&outgoing), ["b", "c"]);
    }

    #[test]
    fn from_hash_is_exclusive_and_limited() {
        let storage = seeded();
        let txs = storage
            .transactions(&TransactionQuery {
                from_hash: Some("a"),
                limit: Some(2),
                ..query(TransactionFilter::All)
            })
            .unwrap();
        assert_eq!(hashes(&txs), ["b", "c"]);
    }

    #[test]
    fn unknown_from_hash_yields_nothing() {
        let storage = seeded();
        let txs = storage
            .transactions(&TransactionQuery {
                from_hash: Some("zzz"),
                ..query(TransactionFilter::All)
            })
            .unwrap();
        assert!(txs.is_empty());
    }

    #[test]
    fn from_hash_must_match_filter() {
        let storage = seeded();
        let txs = storage
            .transactions(&TransactionQuery {
                from_hash: Some("b"),
                ..query(TransactionFilter::Incoming)
            })
            .unwrap();
        assert!(txs.is_empty());
    }

    #[test]
    fn scoped_by_rpc_source() {
        let storage = seeded();
        let txs = storage
            .transactions(&TransactionQuery {
                rpc_source: "https://other/",
                ..query(TransactionFilter::All)
            })
            .unwrap();
        assert!(txs.is_empty());
        assert!(storage
            .last_transaction("https://other/", OWNER, CHAIN)
            .unwrap()
            .is_none());
    }

    #[test]
    fn last_transaction_is_newest() {
        let storage = seeded();
        let last = storage.last_transaction(RPC, OWNER, CHAIN).unwrap().unwrap();
        assert_eq!(last.hash, "d");
    }

    #[test]
    fn conflict_policy() {
        let storage = seeded();
        let mut updated = tx("a", 10, "alice", OWNER);
        updated.is_failed = true;

        storage.save_transactions(&[updated.clone()], false).unwrap();
        let txs = storage.transactions(&query(TransactionFilter::All)).unwrap();
        assert!(!txs[0].is_failed);

        storage.save_transactions(&[updated], true).unwrap();
        let txs = storage.transactions(&query(TransactionFilter::All)).unwrap();
        assert!(txs[0].is_failed);
        assert_eq!(txs.len(), 4);
    }

    #[test]
    fn signature_cursors_merge_per_source() {
        let storage = MemoryStorage::new();
        assert!(storage.signature_cursors(RPC, OWNER, CHAIN).unwrap().is_empty());

        let first = HashMap::from([
            (OWNER.to_string(), "s1".to_string()),
            ("tokenA".to_string(), "t1".to_string()),
        ]);
        storage.save_signature_cursors(RPC, OWNER, CHAIN, &first).unwrap();
        let update = HashMap::from([(OWNER.to_string(), "s2".to_string())]);
        storage.save_signature_cursors(RPC, OWNER, CHAIN, &update).unwrap();

        let cursors = storage.signature_cursors(RPC, OWNER, CHAIN).unwrap();
        assert_eq!(cursors[OWNER], "s2");
        assert_eq!(cursors["tokenA"], "t1");
        assert!(storage
            .signature_cursors("https://other/", OWNER, CHAIN)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(tx("a", 10, "x", "y")).unwrap();
        assert_eq!(json["rpcSource"], RPC);
        assert_eq!(json["blockTime"], 10);
        assert_eq!(json["isFailed"], false);
    }
}
