use crate::prelude::*;
use crate::state::{State, StateContext};
use crate::undo::{UndoLog, UndoSession};

impl State {
    /// Run every end-of-block maintenance routine, in consensus order.
    ///
    /// Called after the block's operations have been applied. Dynamic state
    /// advances first so the sweeps see the new head time; settlements run
    /// before the feed refresh so black-swan detection inside them observes
    /// the feeds the block started with; irreversibility is re-derived after
    /// the signing witness recorded its confirmation.
    pub fn apply_block_maintenance(&self, ctx: &mut StateContext, block: &Block) -> Result<()> {
        self.update_global_dynamic_data(ctx, block)?;
        self.update_signing_witness(ctx, block)?;

        self.clear_expired_transactions(ctx)?;
        self.record_transaction_dedup(ctx, block)?;
        self.clear_expired_proposals(ctx)?;
        self.clear_expired_orders(ctx)?;
        self.update_expired_feeds(ctx)?;
        self.update_withdraw_permissions(ctx)?;

        self.update_last_irreversible_block(ctx)?;

        self.extract_transfers(ctx, block)?;
        self.process_activity(ctx, block.number)?;
        self.process_gravity_emission(ctx, block.number)?;

        #[cfg(feature = "sanity")]
        {
            self.sanity_check_limit_orders(ctx.storage)?;
            self.sanity_check_call_orders(ctx.storage)?;
            self.sanity_check_settlements(ctx.storage)?;
        }
        Ok(())
    }
}

/// Apply one block's maintenance under a transactional undo scope.
///
/// On success the mutations are committed as one frame in the undo log and
/// the retention windows are resized to `head - last_irreversible + 1`. On
/// any error the storage is left exactly as it was.
pub fn apply_block(
    store: &mut dyn Storage,
    undo: &mut UndoLog,
    block: &Block,
) -> Result<Vec<Event>> {
    let mut session = UndoSession::new(store);
    let state = State::load(&session)?;
    let mut ctx = StateContext::new(&mut session);
    match state.apply_block_maintenance(&mut ctx, block) {
        Ok(()) => {
            let events = ctx.into_events();
            let window = state.retention_window(&session)?;
            undo.commit(session.into_frame(block.number));
            undo.set_max_size(window as usize);
            Ok(events)
        }
        Err(e) => {
            drop(ctx);
            session.revert();
            Err(e)
        }
    }
}
