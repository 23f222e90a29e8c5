//! Builds ready-to-submit transactions for the send flows.

use std::sync::Arc;

use derivable_keys::{DerivableKeyPair, PublicKey};
use derivable_rpc::{AccountInfo, JsonRpcClient, RequestConfiguration, RpcError, SimulationResult};
use derivable_tx::programs::{associated_token, system, token, TOKEN_ACCOUNT_SPAN};
use derivable_tx::{
    Blockhash, DefaultFeeCalculator, FeeCalculator, PreparedTransaction, ProgramIds,
    TransactionInstruction, TransactionMessage, VersionedMessage, VersionedTransaction,
};
use tracing::{debug, info};

use crate::error::{KitError, KitResult};

/// An SPL token transfer to prepare.
#[derive(Debug, Clone)]
pub struct TokenTransfer {
    pub mint: PublicKey,
    pub decimals: u8,
    /// Sender's token account.
    pub source: PublicKey,
    /// Recipient wallet, or a token account of the same mint.
    pub destination: PublicKey,
    pub amount: u64,
    /// Defaults to the signing account.
    pub fee_payer: Option<PublicKey>,
    pub transfer_checked: bool,
    /// Fetched for a token account when absent.
    pub minimum_rent_exemption: Option<u64>,
}

/// Prepares transactions against one node for one chain's programs.
#[derive(Debug, Clone)]
pub struct BlockchainClient {
    api: Arc<JsonRpcClient>,
    programs: ProgramIds,
}

impl BlockchainClient {
    pub fn new(api: Arc<JsonRpcClient>, programs: ProgramIds) -> Self {
        Self { api, programs }
    }

    pub fn api(&self) -> &Arc<JsonRpcClient> {
        &self.api
    }

    pub fn programs(&self) -> &ProgramIds {
        &self.programs
    }

    /// Compile `instructions` against a fresh blockhash and price them.
    ///
    /// Without `fee_calculator` the node's fee per signature and the rent
    /// exemption of a token account are fetched. The transaction is signed
    /// when `signers` is non-empty.
    pub async fn prepare_transaction(
        &self,
        instructions: Vec<TransactionInstruction>,
        signers: Vec<DerivableKeyPair>,
        fee_payer: PublicKey,
        fee_calculator: Option<&dyn FeeCalculator>,
    ) -> KitResult<PreparedTransaction> {
        let fetched;
        let calculator: &dyn FeeCalculator = match fee_calculator {
            Some(calculator) => calculator,
            None => {
                fetched = self.default_fee_calculator(None).await?;
                &fetched
            }
        };

        let blockhash: Blockhash = self.api.get_recent_blockhash(None).await?.parse()?;
        let message = TransactionMessage::new(fee_payer, instructions, blockhash);
        let expected_fee = calculator.calculate_fee(&message)?;
        let transaction =
            VersionedTransaction::new(VersionedMessage::Legacy(message.compile_to_legacy()?));

        let mut prepared = PreparedTransaction::new(transaction, signers, expected_fee);
        if !prepared.signers.is_empty() {
            prepared.sign()?;
        }
        debug!(
            payer = %fee_payer.short(),
            %blockhash,
            fee = prepared.expected_fee.total(),
            "prepared transaction"
        );
        Ok(prepared)
    }

    /// System transfer of `amount` lamports from `account` to `to`.
    pub async fn prepare_sending_native(
        &self,
        account: &DerivableKeyPair,
        to: &PublicKey,
        amount: u64,
        fee_payer: Option<PublicKey>,
    ) -> KitResult<PreparedTransaction> {
        let from = account.public_key();
        if from == *to {
            return Err(KitError::SendToYourself);
        }

        if let Some(info) = self.lookup_account(to).await? {
            if info.owner != self.programs.system.to_base58() {
                return Err(KitError::InvalidAccountInfo(format!(
                    "{to} is owned by {}",
                    info.owner
                )));
            }
        }

        let instruction = system::transfer(&from, to, amount);
        self.prepare_transaction(
            vec![instruction],
            vec![account.clone()],
            fee_payer.unwrap_or(from),
            None,
        )
        .await
    }

    /// The token account a transfer of `mint` to `destination` should
    /// credit, and whether it is an associated account that must be created
    /// first.
    pub async fn find_spl_token_destination_address(
        &self,
        mint: &PublicKey,
        destination: &PublicKey,
    ) -> KitResult<(PublicKey, bool)> {
        if let Some(info) = self.lookup_account(destination).await? {
            if self.is_token_account(&info) {
                return match info.data.get(..32) {
                    Some(account_mint) if account_mint == mint.as_bytes() => {
                        Ok((*destination, false))
                    }
                    _ => Err(KitError::InvalidAccountInfo(format!(
                        "{destination} is a token account of another mint"
                    ))),
                };
            }
        }

        let associated =
            associated_token::get_associated_token_address(&self.programs, destination, mint)?;
        let registered = self
            .lookup_account(&associated)
            .await?
            .is_some_and(|info| self.is_token_account(&info));
        Ok((associated, !registered))
    }

    /// Token transfer signed by `account`, creating the recipient's
    /// associated account when needed.
    ///
    /// Returns the prepared transaction and the address the recipient is
    /// known by: the wallet when an associated account is being created,
    /// otherwise the resolved token account.
    pub async fn prepare_sending_spl_tokens(
        &self,
        account: &DerivableKeyPair,
        transfer: &TokenTransfer,
    ) -> KitResult<(PreparedTransaction, PublicKey)> {
        let owner = account.public_key();
        let fee_payer = transfer.fee_payer.unwrap_or(owner);
        let calculator = self
            .default_fee_calculator(transfer.minimum_rent_exemption)
            .await?;

        let (destination, unregistered) = self
            .find_spl_token_destination_address(&transfer.mint, &transfer.destination)
            .await?;
        if transfer.source == destination {
            return Err(KitError::SendToYourself);
        }

        let mut instructions = Vec::with_capacity(2);
        if unregistered {
            instructions.push(associated_token::create_associated_token_account(
                &self.programs,
                &fee_payer,
                &transfer.destination,
                &transfer.mint,
            )?);
        }
        instructions.push(if transfer.transfer_checked {
            token::transfer_checked(
                &self.programs.token,
                &transfer.source,
                &transfer.mint,
                &destination,
                &owner,
                &[],
                transfer.amount,
                transfer.decimals,
            )
        } else {
            token::transfer(
                &self.programs.token,
                &transfer.source,
                &destination,
                &owner,
                transfer.amount,
            )
        });

        let prepared = self
            .prepare_transaction(
                instructions,
                vec![account.clone()],
                fee_payer,
                Some(&calculator),
            )
            .await?;
        let real_destination = if unregistered {
            transfer.destination
        } else {
            destination
        };
        Ok((prepared, real_destination))
    }

    /// Sign if needed, submit, and return the transaction signature.
    pub async fn send_transaction(&self, prepared: &mut PreparedTransaction) -> KitResult<String> {
        let wire = prepared.serialize()?;
        let config = RequestConfiguration {
            encoding: Some("base64".into()),
            preflight_commitment: Some("confirmed".into()),
            ..RequestConfiguration::default()
        };
        let signature = self.api.send_transaction(&wire, Some(config)).await?;
        info!(%signature, "transaction submitted");
        Ok(signature)
    }

    pub async fn simulate_transaction(
        &self,
        prepared: &mut PreparedTransaction,
    ) -> KitResult<SimulationResult> {
        let wire = prepared.serialize()?;
        Ok(self.api.simulate_transaction(&wire).await?)
    }

    async fn default_fee_calculator(
        &self,
        minimum_rent_exemption: Option<u64>,
    ) -> KitResult<DefaultFeeCalculator> {
        let lamports_per_signature = self.api.get_fees(None).await?.lamports_per_signature();
        let minimum_rent_exemption = match minimum_rent_exemption {
            Some(rent) => rent,
            None => {
                self.api
                    .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_SPAN)
                    .await?
            }
        };
        Ok(DefaultFeeCalculator::new(
            lamports_per_signature,
            minimum_rent_exemption,
            self.programs,
        ))
    }

    /// Account info, with "could not retrieve" read as "does not exist".
    async fn lookup_account(&self, account: &PublicKey) -> KitResult<Option<AccountInfo>> {
        match self.api.get_account_info(&account.to_base58()).await {
            Ok(info) => Ok(info),
            Err(RpcError::CouldNotRetrieveAccountInfo) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn is_token_account(&self, info: &AccountInfo) -> bool {
        info.owner == self.programs.token.to_base58()
    }
}
