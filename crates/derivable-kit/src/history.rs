//! Transfer history as the node reports it.

use std::collections::HashMap;
use std::sync::Arc;

use derivable_rpc::{
    JsonRpcClient, RequestConfiguration, RpcError, SignatureInfo, TokenAccountFilter,
    TransactionInfo,
};
use derivable_tx::ProgramIds;
use tracing::{debug, warn};

use crate::error::KitResult;
use crate::storage::CoinTransaction;

/// Records from one fetch plus the newest recorded signature of every
/// source that produced any.
#[derive(Debug, Default)]
pub struct FetchedHistory {
    pub records: Vec<CoinTransaction>,
    pub cursors: HashMap<String, String>,
}

impl FetchedHistory {
    pub fn extend(&mut self, other: FetchedHistory) {
        self.records.extend(other.records);
        self.cursors.extend(other.cursors);
    }
}

/// Pages signature lists and turns parsed transactions into
/// [`CoinTransaction`] records for one owner.
pub struct HistoryFetcher {
    api: Arc<JsonRpcClient>,
    chain_uid: String,
    programs: ProgramIds,
    page_limit: usize,
}

impl HistoryFetcher {
    pub fn new(
        api: Arc<JsonRpcClient>,
        chain_uid: impl Into<String>,
        programs: ProgramIds,
        page_limit: usize,
    ) -> Self {
        Self {
            api,
            chain_uid: chain_uid.into(),
            programs,
            page_limit: page_limit.max(1),
        }
    }

    /// Signatures touching `address`, newest first, stopping at `until`.
    ///
    /// Pages backwards with `before` until the node returns a short page.
    pub async fn signatures(
        &self,
        address: &str,
        until: Option<&str>,
    ) -> KitResult<Vec<SignatureInfo>> {
        let mut all: Vec<SignatureInfo> = Vec::new();
        loop {
            let config = RequestConfiguration {
                limit: Some(self.page_limit),
                before: all.last().map(|s| s.signature.clone()),
                until: until.map(str::to_string),
                ..RequestConfiguration::default()
            };
            let page = self.api.get_signatures_for_address(address, config).await?;
            let short = page.len() < self.page_limit;
            all.extend(page);
            if short {
                break;
            }
        }
        debug!(address, count = all.len(), "fetched signatures");
        Ok(all)
    }

    /// Native transfers of `owner` newer than its cursor.
    pub async fn native_transfers(
        &self,
        owner: &str,
        rpc_source: &str,
        cursors: &HashMap<String, String>,
    ) -> KitResult<FetchedHistory> {
        let mut fetched = FetchedHistory::default();
        self.source_transfers(owner, owner, rpc_source, cursors, &mut fetched)
            .await?;
        Ok(fetched)
    }

    /// Transfers on every token account `owner` holds, each newer than that
    /// account's cursor.
    pub async fn token_transfers(
        &self,
        owner: &str,
        rpc_source: &str,
        cursors: &HashMap<String, String>,
    ) -> KitResult<FetchedHistory> {
        let token_accounts = self
            .api
            .get_token_accounts_by_owner(
                owner,
                TokenAccountFilter::ProgramId(self.programs.token.to_base58()),
                None,
            )
            .await?;

        let mut fetched = FetchedHistory::default();
        for account in &token_accounts {
            self.source_transfers(owner, &account.pubkey, rpc_source, cursors, &mut fetched)
                .await?;
        }
        Ok(fetched)
    }

    async fn source_transfers(
        &self,
        owner: &str,
        source: &str,
        rpc_source: &str,
        cursors: &HashMap<String, String>,
        fetched: &mut FetchedHistory,
    ) -> KitResult<()> {
        let until = cursors.get(source).map(String::as_str);
        let signatures = self.signatures(source, until).await?;
        let records = self.records(owner, rpc_source, &signatures).await?;
        if let Some(newest) = records.first() {
            fetched
                .cursors
                .insert(source.to_string(), newest.hash.clone());
        }
        fetched.records.extend(records);
        Ok(())
    }

    /// Records in signature order, newest first.
    async fn records(
        &self,
        owner: &str,
        rpc_source: &str,
        signatures: &[SignatureInfo],
    ) -> KitResult<Vec<CoinTransaction>> {
        if signatures.is_empty() {
            return Ok(Vec::new());
        }
        let hashes: Vec<String> = signatures.iter().map(|s| s.signature.clone()).collect();
        let replies = self.api.get_transactions(&hashes, None).await?;

        let mut records = Vec::with_capacity(replies.len());
        for (info, reply) in signatures.iter().zip(replies) {
            match reply {
                Ok(tx) => records.push(self.record(owner, rpc_source, info, &tx)),
                // Not yet available on this node.
                Err(RpcError::InvalidResponse) => {
                    warn!(signature = %info.signature, "transaction not available, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(records)
    }

    fn record(
        &self,
        owner: &str,
        rpc_source: &str,
        info: &SignatureInfo,
        tx: &TransactionInfo,
    ) -> CoinTransaction {
        let transfer = tx.first_parsed_info();
        let block_time = info.block_time.or(tx.block_time).unwrap_or(0).max(0) as u64;

        CoinTransaction {
            rpc_source: rpc_source.to_string(),
            chain_uid: self.chain_uid.clone(),
            hash: info.signature.clone(),
            owner: owner.to_string(),
            block_time,
            from: transfer.and_then(|t| t.source.clone()).unwrap_or_default(),
            to: transfer
                .and_then(|t| t.destination.clone())
                .unwrap_or_default(),
            value: transfer.map(|t| t.value()).unwrap_or(0),
            fee: tx.meta.as_ref().and_then(|m| m.fee).unwrap_or(0),
            is_failed: tx.is_failed() || info.err.is_some(),
        }
    }
}
