use crate::prelude::*;
use crate::state::{State, StateContext};

/// Dedup entries keyed by transaction id
const TRANSACTIONS: Map<&str, TransactionDedupEntry> = Map::new(namespace::TRANSACTIONS);
/// Dedup entries by expiration
const TRANSACTIONS_BY_EXPIRATION: Map<(Timestamp, &str), ()> =
    Map::new(namespace::TRANSACTIONS_BY_EXPIRATION);

/// Retained identity of an applied transaction, so a replay inside the
/// expiration window is detectable.
#[cw_serde]
pub struct TransactionDedupEntry {
    /// Identity of the applied transaction
    pub tx_id: TransactionId,
    /// When the transaction expires and the entry may be dropped
    pub expiration: Timestamp,
}

impl State {
    /// Record dedup entries for every transaction in the block.
    pub(crate) fn record_transaction_dedup(
        &self,
        ctx: &mut StateContext,
        block: &Block,
    ) -> Result<()> {
        for tx in &block.transactions {
            chain_ensure!(
                !TRANSACTIONS.has(ctx.storage, &tx.id.0),
                ErrorId::IndexInvariantViolated,
                ErrorDomain::Chain,
                "duplicate transaction {} inside the dedup window",
                tx.id
            );
            TRANSACTIONS.save(
                ctx.storage,
                &tx.id.0,
                &TransactionDedupEntry {
                    tx_id: tx.id.clone(),
                    expiration: tx.expiration,
                },
            )?;
            TRANSACTIONS_BY_EXPIRATION.save(ctx.storage, (tx.expiration, &tx.id.0), &())?;
        }
        Ok(())
    }

    /// Drop dedup entries whose expiration lies strictly in the past.
    pub fn clear_expired_transactions(&self, ctx: &mut StateContext) -> Result<()> {
        let head_time = self.head_block_time(ctx.storage)?;
        loop {
            let front = TRANSACTIONS_BY_EXPIRATION
                .keys(ctx.storage, None, None, Order::Ascending)
                .next()
                .transpose()?;
            let (expiration, tx_id) = match front {
                Some(key) => key,
                None => break,
            };
            if head_time <= expiration {
                break;
            }
            TRANSACTIONS.remove(ctx.storage, &tx_id);
            TRANSACTIONS_BY_EXPIRATION.remove(ctx.storage, (expiration, &tx_id));
        }
        Ok(())
    }
}
