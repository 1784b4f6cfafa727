//! Payment transaction assembly.
//!
//! Transactions are built unsigned with the buyer as fee payer; the wallet
//! signs and submits them.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction, hash::Hash, message::Message, pubkey::Pubkey,
    system_instruction, transaction::Transaction,
};

use crate::error::AppError;

/// Priority fee attached to every payment, in micro-lamports per CU.
pub const COMPUTE_UNIT_PRICE_MICRO_LAMPORTS: u64 = 1_000;

#[async_trait]
pub trait BlockhashSource {
    async fn latest_blockhash(&self) -> Result<Hash, AppError>;
}

pub struct RpcBlockhashSource {
    rpc: RpcClient,
}

impl RpcBlockhashSource {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc: RpcClient::new(rpc_url.into()),
        }
    }
}

#[async_trait]
impl BlockhashSource for RpcBlockhashSource {
    async fn latest_blockhash(&self) -> Result<Hash, AppError> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(|err| AppError::Solana(err.to_string()))
    }
}

/// Unsigned `payer -> recipient` transfer, base64 over bincode.
pub fn build_payment_transaction(
    payer: &Pubkey,
    recipient: &Pubkey,
    lamports: u64,
    blockhash: Hash,
) -> Result<String, AppError> {
    let instructions = [
        ComputeBudgetInstruction::set_compute_unit_price(COMPUTE_UNIT_PRICE_MICRO_LAMPORTS),
        system_instruction::transfer(payer, recipient, lamports),
    ];
    let message = Message::new_with_blockhash(&instructions, Some(payer), &blockhash);
    let transaction = Transaction::new_unsigned(message);

    let bytes =
        bincode::serialize(&transaction).map_err(|err| AppError::Solana(err.to_string()))?;
    Ok(general_purpose::STANDARD.encode(bytes))
}
