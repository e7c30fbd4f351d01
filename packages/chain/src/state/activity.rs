pub(crate) mod calculator;

use crate::prelude::*;
use crate::state::{State, StateContext};
use self::calculator::{ActivityIndexCalculator, BufferedTransfer};

/// Rolling buffer of transfer records, keyed by block then sequence within
/// the block
const TRANSFER_BUFFER: Map<(u64, u32), TransferRecord> = Map::new(namespace::TRANSFER_BUFFER);
/// Aggregate over the current emission epoch
const ACTIVITY_EPOCH: Item<ActivityEpoch> = Item::new(namespace::ACTIVITY_EPOCH);
/// Block of the most recent activity calculation
const LAST_ACTIVITY_BLOCK: Item<u32> = Item::new(namespace::LAST_ACTIVITY_BLOCK);

/// One transfer as seen by the activity index, amounts in real units.
#[cw_serde]
pub struct TransferRecord {
    /// Sending account
    pub from: String,
    /// Receiving account
    pub to: String,
    /// Amount moved
    pub amount: Decimal256,
    /// Fee paid by the sender
    pub fee: Decimal256,
    /// Sender's core balance after the transfer
    pub source_balance: Decimal256,
    /// Receiver's core balance after the transfer
    pub target_balance: Decimal256,
    /// When the transfer was applied
    pub timestamp: Timestamp,
}

/// Counters over the rolling window, cleared by each emission event.
#[cw_serde]
#[derive(Default)]
pub struct ActivityEpoch {
    /// All transfers seen
    pub transfers: u32,
    /// Transfers whose USD value met the transaction threshold
    pub qualified_transfers: u32,
    /// First block of the epoch
    pub started_at_block: u32,
}

impl ActivityEpoch {
    /// The integer activity aggregate the emission model consumes.
    pub fn get_activity(&self) -> u32 {
        self.qualified_transfers
    }
}

impl State {
    pub fn get_activity_epoch(&self, store: &dyn Storage) -> Result<ActivityEpoch> {
        Ok(ACTIVITY_EPOCH.may_load(store)?.unwrap_or_default())
    }

    pub(crate) fn clear_activity_epoch(
        &self,
        ctx: &mut StateContext,
        block_num: u32,
    ) -> Result<()> {
        ACTIVITY_EPOCH.save(
            ctx.storage,
            &ActivityEpoch {
                started_at_block: block_num,
                ..Default::default()
            },
        )?;
        Ok(())
    }

    /// Pull every transfer out of the block into the rolling buffer and the
    /// epoch accumulator.
    pub(crate) fn extract_transfers(&self, ctx: &mut StateContext, block: &Block) -> Result<()> {
        let mut epoch = self.get_activity_epoch(ctx.storage)?;
        let mut seq: u32 = 0;

        for tx in &block.transactions {
            for op in &tx.operations {
                let transfer = match op {
                    Operation::Transfer(transfer) => transfer,
                    _ => continue,
                };
                let amount = self.amount_to_real(ctx.storage, transfer.amount)?;
                let fee = self.amount_to_real(ctx.storage, transfer.fee)?;
                let core = AssetId::core();
                let record = TransferRecord {
                    from: transfer.from.clone(),
                    to: transfer.to.clone(),
                    amount,
                    fee,
                    source_balance: self.amount_to_real(
                        ctx.storage,
                        self.get_balance(ctx.storage, &transfer.from, core)?,
                    )?,
                    target_balance: self.amount_to_real(
                        ctx.storage,
                        self.get_balance(ctx.storage, &transfer.to, core)?,
                    )?,
                    timestamp: block.timestamp,
                };

                TRANSFER_BUFFER.save(ctx.storage, (block.number as u64, seq), &record)?;
                seq += 1;

                epoch.transfers += 1;
                let usd = amount.checked_mul(self.params.token_usd_rate)?;
                if usd >= self.params.transaction_amount_threshold {
                    epoch.qualified_transfers += 1;
                }

                ctx.diagnostics_mut().add_event(
                    Event::new("transfer-log")
                        .add_attribute("time", record.timestamp.to_string())
                        .add_attribute("from", record.from.clone())
                        .add_attribute("to", record.to.clone())
                        .add_attribute("amount", record.amount.to_string())
                        .add_attribute("fee", record.fee.to_string()),
                );
            }
        }

        ACTIVITY_EPOCH.save(ctx.storage, &epoch)?;
        Ok(())
    }

    /// Recompute activity indexes once per activity period.
    ///
    /// Replays the buffered window through the flow calculator and writes the
    /// result onto every account; accounts absent from the result go to zero.
    pub fn process_activity(&self, ctx: &mut StateContext, block_num: u32) -> Result<()> {
        let last = LAST_ACTIVITY_BLOCK.may_load(ctx.storage)?.unwrap_or(0);
        if block_num - last < self.params.activity_period {
            return Ok(());
        }

        // Only the trailing activity window feeds the calculator
        let horizon = (block_num.saturating_sub(self.params.activity_period)) as u64;
        let buffered = TRANSFER_BUFFER
            .range(
                ctx.storage,
                Some(Bound::inclusive((horizon + 1, 0u32))),
                None,
                Order::Ascending,
            )
            .map(|res| -> Result<BufferedTransfer> {
                let ((block, _), record) = res?;
                Ok(BufferedTransfer {
                    block,
                    from: record.from,
                    to: record.to,
                    amount: record.amount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        ctx.diagnostics_mut().add_event(
            Event::new("activity-calculation")
                .add_attribute("block_num", block_num.to_string())
                .add_attribute("activity_period", self.params.activity_period.to_string())
                .add_attribute(
                    "account_amount_threshold",
                    self.params.account_amount_threshold.to_string(),
                )
                .add_attribute(
                    "transaction_amount_threshold",
                    self.params.transaction_amount_threshold.to_string(),
                )
                .add_attribute("outlink_weight", self.params.outlink_weight.to_string())
                .add_attribute(
                    "interlevel_weight",
                    self.params.interlevel_weight.to_string(),
                )
                .add_attribute("transfers", buffered.len().to_string()),
        );

        let calculator = ActivityIndexCalculator::new(self.params.activity_parameters());
        let indexes = calculator.calculate(&buffered, block_num as u64)?;

        for name in self.account_names(ctx.storage)? {
            let index = indexes.get(&name).copied().unwrap_or_default();
            self.modify_account(ctx, &name, |account| {
                account.activity_index = index;
            })?;
            if !index.is_zero() {
                ctx.diagnostics_mut().add_event(
                    Event::new("activity-index")
                        .add_attribute("name", name)
                        .add_attribute("activity_index", index.to_string()),
                );
            }
        }

        // Buffered blocks that fell out of the window are dead weight; drop
        // them
        let stale: Vec<(u64, u32)> = TRANSFER_BUFFER
            .keys(
                ctx.storage,
                None,
                Some(Bound::inclusive((horizon, u32::MAX))),
                Order::Ascending,
            )
            .collect::<Result<Vec<_>, _>>()?;
        for key in stale {
            TRANSFER_BUFFER.remove(ctx.storage, key);
        }

        LAST_ACTIVITY_BLOCK.save(ctx.storage, &block_num)?;
        Ok(())
    }
}
