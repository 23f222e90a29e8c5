//! One wallet account on one chain: its signer, the node it talks to and
//! the synced state the app reads.

use std::sync::Arc;
use std::time::Duration;

use derivable_keys::{DerivableKeyPair, PublicKey};
use derivable_rpc::JsonRpcClient;
use derivable_tx::programs::TOKEN_ACCOUNT_SPAN;
use derivable_tx::PreparedTransaction;
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::blockchain_client::{BlockchainClient, TokenTransfer};
use crate::chain::DerivableChain;
use crate::config::KitConfig;
use crate::error::{KitError, KitResult};
use crate::history::HistoryFetcher;
use crate::managers::{AccountInfoManager, TransactionManager};
use crate::storage::{CoinStorage, CoinTransaction, MemoryStorage, TransactionFilter};
use crate::sync_state::SyncState;
use crate::syncer::Syncer;

pub struct DerivableCoinKit {
    chain: &'static dyn DerivableChain,
    signer: DerivableKeyPair,
    address: String,
    client: BlockchainClient,
    account_info: Arc<AccountInfoManager>,
    transactions: Arc<TransactionManager>,
    syncer: Syncer,
    post_send_refresh_delay: Duration,
}

impl std::fmt::Debug for DerivableCoinKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivableCoinKit")
            .field("chain", &self.chain.uid())
            .field("address", &self.address)
            .field("rpc", &self.client.api().endpoint())
            .finish()
    }
}

impl DerivableCoinKit {
    /// Derive the signer from `words` at the configured path and talk to the
    /// configured node over HTTP. State is kept in memory.
    pub fn from_mnemonic(config: &KitConfig, words: &str, passphrase: &str) -> KitResult<Self> {
        let signer = DerivableKeyPair::from_mnemonic(words, passphrase, &config.derivation_path())?;
        let api = JsonRpcClient::with_http(config.rpc_url(), config.request_timeout())?;
        Self::new(
            config,
            signer,
            Arc::new(api),
            Arc::new(MemoryStorage::new()),
        )
    }

    pub fn new(
        config: &KitConfig,
        signer: DerivableKeyPair,
        api: Arc<JsonRpcClient>,
        storage: Arc<dyn CoinStorage>,
    ) -> KitResult<Self> {
        let chain = config.chain();
        let programs = chain.program_ids();
        let address = signer.public_key().to_base58();

        let account_info = Arc::new(AccountInfoManager::new(
            storage.clone(),
            address.as_str(),
            chain.uid(),
        )?);
        let transactions = Arc::new(TransactionManager::new(
            storage.clone(),
            address.as_str(),
            chain.uid(),
        ));
        let history = HistoryFetcher::new(
            api.clone(),
            chain.uid(),
            programs,
            config.signature_page_limit,
        );
        let syncer = Syncer::new(
            api.clone(),
            history,
            account_info.clone(),
            transactions.clone(),
            storage,
            address.as_str(),
            chain.uid(),
        )?
        .with_interval(config.sync_interval());

        info!(chain = chain.uid(), %address, rpc = %api.endpoint(), "kit created");

        Ok(Self {
            chain,
            signer,
            address,
            client: BlockchainClient::new(api, programs),
            account_info,
            transactions,
            syncer,
            post_send_refresh_delay: config.post_send_refresh_delay(),
        })
    }

    // -- identity -------------------------------------------------------------

    pub fn chain(&self) -> &'static dyn DerivableChain {
        self.chain
    }

    /// Base58 address of the signer.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn is_mainnet(&self) -> bool {
        self.chain.is_mainnet(&self.client.api().endpoint())
    }

    pub fn blockchain_client(&self) -> &BlockchainClient {
        &self.client
    }

    // -- synced state ---------------------------------------------------------

    pub fn balance(&self) -> u64 {
        self.account_info.balance()
    }

    pub fn subscribe_balance(&self) -> watch::Receiver<u64> {
        self.account_info.subscribe()
    }

    pub fn sync_state(&self) -> SyncState {
        self.syncer.state()
    }

    pub fn subscribe_sync_state(&self) -> watch::Receiver<SyncState> {
        self.syncer.subscribe_state()
    }

    pub fn last_block_height(&self) -> u64 {
        self.syncer.last_block_height()
    }

    pub fn subscribe_block_height(&self) -> watch::Receiver<u64> {
        self.syncer.subscribe_block_height()
    }

    pub fn subscribe_transactions(&self) -> broadcast::Receiver<Vec<CoinTransaction>> {
        self.transactions.subscribe()
    }

    /// Stored transfers seen through the current node, oldest first.
    pub fn transactions(
        &self,
        filter: TransactionFilter,
        from_hash: Option<&str>,
        limit: Option<usize>,
    ) -> KitResult<Vec<CoinTransaction>> {
        self.transactions
            .transactions(&self.client.api().endpoint(), filter, from_hash, limit)
    }

    // -- sending --------------------------------------------------------------

    /// Rent exemption of a token-account sized account.
    pub async fn calc_min_rent(&self) -> KitResult<u64> {
        Ok(self
            .client
            .api()
            .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_SPAN)
            .await?)
    }

    /// Native transfer of `amount` to `to`, checked against the synced
    /// balance. What stays behind must be zero or at least the rent minimum.
    pub async fn prepare_send_native(
        &self,
        to: &str,
        amount: u64,
    ) -> KitResult<PreparedTransaction> {
        let to: PublicKey = to.parse()?;
        let prepared = self
            .client
            .prepare_sending_native(&self.signer, &to, amount, None)
            .await?;

        let available = self.balance();
        let required = amount.saturating_add(prepared.expected_fee.total());
        if available < required {
            return Err(KitError::InsufficientBalance {
                required,
                available,
            });
        }

        let remaining = available - required;
        if remaining > 0 {
            let minimum = self.calc_min_rent().await?;
            if remaining < minimum {
                return Err(KitError::RentShortfall { remaining, minimum });
            }
        }
        Ok(prepared)
    }

    /// Token transfer signed by this account. The native balance must
    /// cover the fee, including any account the transfer creates.
    pub async fn prepare_send_spl_tokens(
        &self,
        transfer: &TokenTransfer,
    ) -> KitResult<(PreparedTransaction, PublicKey)> {
        let (prepared, destination) = self
            .client
            .prepare_sending_spl_tokens(&self.signer, transfer)
            .await?;

        let required = prepared.expected_fee.total();
        let available = self.balance();
        if transfer.fee_payer.is_none() && available < required {
            return Err(KitError::InsufficientBalance {
                required,
                available,
            });
        }
        Ok((prepared, destination))
    }

    /// Submit, then refresh once the node has had time to apply it.
    pub async fn send(&self, prepared: &mut PreparedTransaction) -> KitResult<String> {
        let signature = self.client.send_transaction(prepared).await?;
        tokio::time::sleep(self.post_send_refresh_delay).await;
        self.syncer.refresh();
        Ok(signature)
    }

    // -- lifecycle ------------------------------------------------------------

    pub fn start(&self) {
        self.syncer.start();
    }

    pub fn stop(&self) {
        self.syncer.stop();
    }

    pub fn refresh(&self) {
        self.syncer.refresh();
    }

    /// Point every later call at `url` and sync against it, superseding a
    /// cycle still running against the old node.
    pub fn update_network(&self, url: impl Into<String>) {
        let url = url.into();
        info!(chain = self.chain.uid(), %url, "switching node");
        self.client.api().update_endpoint(url);
        self.syncer.restart();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainKind;
    use crate::error::SyncError;
    use crate::test_support::*;
    use derivable_keys::DerivablePath;
    use serde_json::{json, Value};

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon \
                          abandon abandon abandon about";
    const MIN_RENT: u64 = 2_039_280;
    const DEST: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn node(method: &str, _params: &Value) -> Value {
        match method {
            "getFees" | "getRecentBlockhash" => fees(5000),
            "getMinimumBalanceForRentExemption" => ok(json!(MIN_RENT)),
            "getAccountInfo" => with_context(Value::Null),
            "getBalance" => with_context(json!(3_000_000)),
            "getBlockHeight" => ok(json!(42)),
            "getSignaturesForAddress" => ok(json!([])),
            "getTokenAccountsByOwner" => with_context(json!([])),
            "sendTransaction" => ok(json!("5xSig")),
            _ => Value::Null,
        }
    }

    fn config() -> KitConfig {
        KitConfig {
            rpc_url: Some(URL.into()),
            post_send_refresh_delay_ms: 500,
            ..KitConfig::for_chain(ChainKind::Solana)
        }
    }

    fn kit_with(stub: StubTransport, balance: u64) -> (DerivableCoinKit, Arc<StubTransport>) {
        let (api, stub) = client(stub);
        let signer =
            DerivableKeyPair::from_mnemonic(PHRASE, "", &DerivablePath::default_for(501))
                .unwrap();
        let storage = Arc::new(MemoryStorage::new());
        storage
            .save_balance(&signer.public_key().to_base58(), "solana", balance)
            .unwrap();
        let kit = DerivableCoinKit::new(&config(), signer, api, storage).unwrap();
        (kit, stub)
    }

    // -- identity -------------------------------------------------------------

    #[tokio::test]
    async fn exposes_account_and_network() {
        let (kit, _) = kit_with(StubTransport::new(node), 0);

        assert_eq!(kit.address(), kit.public_key().to_base58());
        assert_eq!(kit.chain().uid(), "solana");
        assert!(!kit.is_mainnet());
        assert_eq!(
            kit.sync_state(),
            SyncState::NotSynced(SyncError::NotStarted)
        );

        kit.update_network("https://api.mainnet-beta.solana.com");
        assert!(kit.is_mainnet());
    }

    // -- native sends ---------------------------------------------------------

    #[tokio::test]
    async fn native_send_within_balance() {
        let (kit, _) = kit_with(StubTransport::new(node), 10_000_000);

        let prepared = kit.prepare_send_native(DEST, 1_000_000).await.unwrap();

        assert_eq!(prepared.expected_fee.transaction, 5000);
        assert_eq!(prepared.expected_fee.account_balances, 0);
        assert!(prepared.transaction.is_fully_signed());
    }

    #[tokio::test]
    async fn native_send_over_balance() {
        let (kit, _) = kit_with(StubTransport::new(node), 1_000_000);

        let err = kit.prepare_send_native(DEST, 1_000_000).await.unwrap_err();

        assert!(matches!(
            err,
            KitError::InsufficientBalance {
                required: 1_005_000,
                available: 1_000_000
            }
        ));
    }

    #[tokio::test]
    async fn native_send_leaving_dust() {
        let (kit, _) = kit_with(StubTransport::new(node), 1_005_100);

        let err = kit.prepare_send_native(DEST, 1_000_000).await.unwrap_err();

        assert!(matches!(
            err,
            KitError::RentShortfall {
                remaining: 100,
                minimum: MIN_RENT
            }
        ));
    }

    #[tokio::test]
    async fn native_send_of_everything() {
        let (kit, stub) = kit_with(StubTransport::new(node), 1_005_000);

        kit.prepare_send_native(DEST, 1_000_000).await.unwrap();

        // No leftover, so rent is only fetched for the fee calculator.
        assert_eq!(stub.calls("getMinimumBalanceForRentExemption"), 1);
    }

    #[tokio::test]
    async fn native_send_to_bad_address() {
        let (kit, _) = kit_with(StubTransport::new(node), 10_000_000);
        let err = kit.prepare_send_native("not-base58!", 1).await.unwrap_err();
        assert!(matches!(err, KitError::Key(_)));
    }

    // -- token sends ----------------------------------------------------------

    #[tokio::test]
    async fn token_send_needs_fee_and_rent() {
        let (kit, _) = kit_with(StubTransport::new(node), 10_000);
        let transfer = TokenTransfer {
            mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".parse().unwrap(),
            decimals: 6,
            source: PublicKey::new([7; 32]),
            destination: DEST.parse().unwrap(),
            amount: 10,
            fee_payer: None,
            transfer_checked: true,
            minimum_rent_exemption: None,
        };

        let err = kit.prepare_send_spl_tokens(&transfer).await.unwrap_err();

        assert!(matches!(
            err,
            KitError::InsufficientBalance {
                required,
                available: 10_000
            } if required == 5000 + MIN_RENT
        ));
    }

    // -- send and sync --------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn send_refreshes_after_delay() {
        let (kit, stub) = kit_with(StubTransport::new(node), 10_000_000);
        let mut prepared = kit.prepare_send_native(DEST, 1_000_000).await.unwrap();
        let mut state = kit.subscribe_sync_state();

        let signature = kit.send(&mut prepared).await.unwrap();
        state.wait_for(|s| s.is_synced()).await.unwrap();

        assert_eq!(signature, "5xSig");
        assert_eq!(stub.calls("getBalance"), 1);
        assert_eq!(kit.balance(), 3_000_000);
        assert_eq!(kit.last_block_height(), 42);
    }

    #[tokio::test]
    async fn start_then_stop() {
        let (kit, _) = kit_with(StubTransport::new(node), 0);
        let mut state = kit.subscribe_sync_state();

        kit.start();
        state.wait_for(|s| s.is_synced()).await.unwrap();
        assert!(kit
            .transactions(TransactionFilter::All, None, None)
            .unwrap()
            .is_empty());

        kit.stop();
        assert_eq!(
            kit.sync_state(),
            SyncState::NotSynced(SyncError::NotStarted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn network_switch_mid_sync_starts_fresh_cycle() {
        let (kit, stub) = kit_with(StubTransport::new(node).with_delay(Duration::from_secs(2)), 0);
        let mut state = kit.subscribe_sync_state();

        kit.start();
        state.wait_for(|s| s.is_syncing()).await.unwrap();
        kit.update_network("https://api.mainnet-beta.solana.com");
        state.wait_for(|s| s.is_synced()).await.unwrap();

        assert!(kit.is_mainnet());
        assert_eq!(stub.calls("getBalance"), 2);
        assert_eq!(stub.calls("getTokenAccountsByOwner"), 1);
        kit.stop();
    }

    #[tokio::test]
    async fn min_rent_uses_token_account_span() {
        let (kit, stub) = kit_with(StubTransport::new(node), 0);
        assert_eq!(kit.calc_min_rent().await.unwrap(), MIN_RENT);
        assert_eq!(
            stub.params_of("getMinimumBalanceForRentExemption")[0][0],
            165
        );
    }
}
