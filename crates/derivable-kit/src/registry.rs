//! Open kits, one per chain and wallet account.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::error::KitResult;
use crate::kit::DerivableCoinKit;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KitKey {
    chain_uid: String,
    account_id: String,
}

impl KitKey {
    fn new(chain_uid: &str, account_id: &str) -> Self {
        Self {
            chain_uid: chain_uid.to_string(),
            account_id: account_id.to_string(),
        }
    }
}

/// Owns running kits. A kit lives from `open` until `close`.
#[derive(Default)]
pub struct KitRegistry {
    kits: DashMap<KitKey, Arc<DerivableCoinKit>>,
}

impl std::fmt::Debug for KitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KitRegistry")
            .field("open_kits", &self.kits.len())
            .finish()
    }
}

impl KitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The open kit for `(chain_uid, account_id)`, or a new one from `build`,
    /// started before it is returned.
    ///
    /// `build` runs without holding the map lock. When two callers race, the
    /// first insert wins and the other caller's kit is dropped unstarted.
    pub fn open<F>(
        &self,
        chain_uid: &str,
        account_id: &str,
        build: F,
    ) -> KitResult<Arc<DerivableCoinKit>>
    where
        F: FnOnce() -> KitResult<DerivableCoinKit>,
    {
        let key = KitKey::new(chain_uid, account_id);
        if let Some(open) = self.kits.get(&key) {
            return Ok(open.clone());
        }

        let built = Arc::new(build()?);
        let kit = match self.kits.entry(key) {
            Entry::Occupied(open) => return Ok(open.get().clone()),
            Entry::Vacant(slot) => slot.insert(built).clone(),
        };
        kit.start();
        info!(chain = chain_uid, account = account_id, "kit opened");
        Ok(kit)
    }

    pub fn get(&self, chain_uid: &str, account_id: &str) -> Option<Arc<DerivableCoinKit>> {
        self.kits
            .get(&KitKey::new(chain_uid, account_id))
            .map(|kit| kit.clone())
    }

    /// Stop and forget the kit. Returns whether one was open.
    pub fn close(&self, chain_uid: &str, account_id: &str) -> bool {
        match self.kits.remove(&KitKey::new(chain_uid, account_id)) {
            Some((_, kit)) => {
                kit.stop();
                info!(chain = chain_uid, account = account_id, "kit closed");
                true
            }
            None => false,
        }
    }

    pub fn close_all(&self) {
        let keys: Vec<KitKey> = self.kits.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            self.close(&key.chain_uid, &key.account_id);
        }
    }

    pub fn len(&self) -> usize {
        self.kits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kits.is_empty()
    }
}
