use crate::block::BlockId;
use crate::prelude::*;
use crate::state::{State, StateContext};

const DYNAMIC_STATE: Item<DynamicGlobalState> = Item::new(namespace::DYNAMIC_STATE);
const GENESIS_TIME: Item<Timestamp> = Item::new(namespace::GENESIS_TIME);

/// Chain-wide dynamic properties, a singleton advanced once per block.
#[cw_serde]
pub struct DynamicGlobalState {
    /// Height of the most recently applied block
    pub head_block_number: u32,
    /// Identity of the most recently applied block
    pub head_block_id: BlockId,
    /// Timestamp of the head block
    pub head_time: Timestamp,
    /// Witness that produced the head block
    pub current_witness: WitnessId,
    /// Absolute slot counter, including missed slots
    pub current_aslot: u64,
    /// Bitmap of the last 64 slots; bit 0 is the head slot, set bits were
    /// filled
    pub recent_slots_filled: u64,
    /// Rolling indicator of recent missed blocks
    pub recently_missed_count: u32,
    /// Highest block that can no longer be reverted
    pub last_irreversible_block_num: u32,
    /// Funds available to pay witnesses
    pub witness_budget: Uint128,
    /// Miscellaneous flags, see [crate::constants::MAINTENANCE_FLAG]
    pub dynamic_flags: u32,
    /// Highest checkpointed block; blocks at or below it reset the missed
    /// counter
    pub latest_checkpoint: u32,
}

/// Left shift that saturates to zero once every bit is gone, so a long gap of
/// missed slots cannot wrap the bitmap.
fn shl_saturating(value: u64, shift: u32) -> u64 {
    if shift >= u64::BITS {
        0
    } else {
        value << shift
    }
}

pub(crate) fn init_dynamic_state(
    store: &mut dyn Storage,
    genesis_time: Timestamp,
    witness_budget: Uint128,
) -> Result<()> {
    GENESIS_TIME.save(store, &genesis_time)?;
    DYNAMIC_STATE.save(
        store,
        &DynamicGlobalState {
            head_block_number: 0,
            head_block_id: BlockId(String::new()),
            head_time: genesis_time,
            current_witness: WitnessId::new(0),
            current_aslot: 0,
            recent_slots_filled: 0,
            recently_missed_count: 0,
            last_irreversible_block_num: 0,
            witness_budget,
            dynamic_flags: 0,
            latest_checkpoint: 0,
        },
    )?;
    Ok(())
}

impl State {
    pub fn get_dynamic(&self, store: &dyn Storage) -> Result<DynamicGlobalState> {
        DYNAMIC_STATE.load(store).map_err(|e| e.into())
    }

    /// Scoped mutation of the dynamic state singleton.
    pub(crate) fn modify_dynamic(
        &self,
        ctx: &mut StateContext,
        f: impl FnOnce(&mut DynamicGlobalState),
    ) -> Result<()> {
        let mut dgs = self.get_dynamic(ctx.storage)?;
        f(&mut dgs);
        DYNAMIC_STATE.save(ctx.storage, &dgs)?;
        Ok(())
    }

    /// Timestamp of the head block.
    pub fn head_block_time(&self, store: &dyn Storage) -> Result<Timestamp> {
        Ok(self.get_dynamic(store)?.head_time)
    }

    /// When the given future slot begins. Slot 0 is the head slot.
    pub(crate) fn get_slot_time(&self, store: &dyn Storage, slot_num: u32) -> Result<Timestamp> {
        if slot_num == 0 {
            return Ok(Timestamp::default());
        }
        let interval = self.params.block_interval as u64;
        let dgs = self.get_dynamic(store)?;
        if dgs.head_block_number == 0 {
            // Before the first block, slot 1 opens one interval past genesis
            let genesis_time = GENESIS_TIME.load(store)?;
            return Ok(genesis_time.plus_seconds(slot_num as u64 * interval));
        }
        let head_slot_start = (dgs.head_time.seconds() / interval) * interval;
        Ok(Timestamp::from_seconds(
            head_slot_start + slot_num as u64 * interval,
        ))
    }

    /// Which future slot the given instant falls in; 0 when it precedes the
    /// next slot.
    pub(crate) fn get_slot_at_time(&self, store: &dyn Storage, when: Timestamp) -> Result<u32> {
        let first_slot_time = self.get_slot_time(store, 1)?;
        if when < first_slot_time {
            return Ok(0);
        }
        let elapsed = when.checked_sub(first_slot_time, "get_slot_at_time")?;
        Ok((elapsed.as_seconds() / self.params.block_interval as u64) as u32 + 1)
    }

    /// Advance the dynamic global state over a freshly accepted block.
    pub fn update_global_dynamic_data(
        &self,
        ctx: &mut StateContext,
        block: &Block,
    ) -> Result<()> {
        let slot = self.get_slot_at_time(ctx.storage, block.timestamp)?;
        chain_ensure!(
            slot >= 1,
            ErrorId::IndexInvariantViolated,
            ErrorDomain::Chain,
            "block {} timestamp {} does not advance the slot grid",
            block.number,
            block.timestamp
        );
        let missed_blocks = slot - 1;

        for i in 1..=missed_blocks {
            let witness_missed = self.get_scheduled_witness(ctx.storage, i)?;
            if witness_missed != block.witness {
                self.modify_witness(ctx, witness_missed, |w| {
                    w.total_missed += 1;
                })?;
            }
        }

        self.modify_dynamic(ctx, |dgs| {
            if block.number == 1 || block.number <= dgs.latest_checkpoint {
                dgs.recently_missed_count = 0;
            } else if missed_blocks > 0 {
                dgs.recently_missed_count +=
                    RECENTLY_MISSED_COUNT_INCREMENT * missed_blocks;
            } else if dgs.recently_missed_count > RECENTLY_MISSED_COUNT_INCREMENT {
                dgs.recently_missed_count -= RECENTLY_MISSED_COUNT_DECREMENT;
            } else if dgs.recently_missed_count > 0 {
                dgs.recently_missed_count -= 1;
            }

            dgs.head_block_number = block.number;
            dgs.head_block_id = block.id.clone();
            dgs.head_time = block.timestamp;
            dgs.current_witness = block.witness;
            dgs.recent_slots_filled =
                shl_saturating(shl_saturating(dgs.recent_slots_filled, 1) | 1, missed_blocks);
            dgs.current_aslot += (missed_blocks + 1) as u64;
        })?;

        let dgs = self.get_dynamic(ctx.storage)?;
        chain_ensure!(
            dgs.head_block_number - dgs.last_irreversible_block_num < MAX_UNDO_HISTORY,
            ErrorId::UndoHistoryExhausted,
            ErrorDomain::Chain,
            "not enough undo history to support a chain with this many missed blocks; \
             add a checkpoint to continue past block {} (last irreversible {})",
            dgs.head_block_number,
            dgs.last_irreversible_block_num
        );

        ctx.diagnostics_mut().add_event(
            Event::new("block-info")
                .add_attribute("block_num", block.number.to_string())
                .add_attribute("time", block.timestamp.to_string())
                .add_attribute("witness", block.witness.to_string())
                .add_attribute("aslot", dgs.current_aslot.to_string())
                .add_attribute("missed", missed_blocks.to_string())
                .add_attribute(
                    "recently_missed",
                    dgs.recently_missed_count.to_string(),
                ),
        );

        Ok(())
    }

    /// Number of blocks the undo and fork windows must retain.
    pub fn retention_window(&self, store: &dyn Storage) -> Result<u32> {
        let dgs = self.get_dynamic(store)?;
        Ok(dgs.head_block_number - dgs.last_irreversible_block_num + 1)
    }

    /// Record a checkpoint; blocks at or below it reset the missed counter
    /// and are trusted without confirmation.
    pub fn add_checkpoint(&self, ctx: &mut StateContext, block_num: u32) -> Result<()> {
        self.modify_dynamic(ctx, |dgs| {
            if block_num > dgs.latest_checkpoint {
                dgs.latest_checkpoint = block_num;
            }
        })
    }

    /// Raise or clear the maintenance flag.
    pub fn update_maintenance_flag(
        &self,
        ctx: &mut StateContext,
        new_maintenance_flag: bool,
    ) -> Result<()> {
        self.modify_dynamic(ctx, |dgs| {
            dgs.dynamic_flags = (dgs.dynamic_flags & !MAINTENANCE_FLAG)
                | if new_maintenance_flag {
                    MAINTENANCE_FLAG
                } else {
                    0
                };
        })
    }
}
