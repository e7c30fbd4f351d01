use crate::block::{LimitOrderCancelOperation, TransferOperation};
use crate::prelude::*;
use crate::state::{State, StateContext};

impl State {
    /// Apply one of the operations the core evaluates itself.
    ///
    /// User-submitted operations pass signature and authority checks before
    /// they ever reach this crate, so a context without
    /// `skip_authority_check` is rejected rather than silently trusted.
    pub fn apply_operation(
        &self,
        ctx: &mut StateContext,
        op_context: OperationContext,
        op: &Operation,
    ) -> Result<()> {
        chain_ensure!(
            op_context.skip_authority_check,
            ErrorId::Auth,
            ErrorDomain::Chain,
            "authority resolution happens outside the maintenance core"
        );
        if !op_context.skip_fee_schedule_check {
            let expected = self.params.fee_schedule.calculate_fee(op);
            let given = match op {
                Operation::Transfer(transfer) => transfer.fee,
                Operation::LimitOrderCancel(cancel) => cancel.fee,
            };
            chain_ensure!(
                given == expected,
                ErrorId::Config,
                ErrorDomain::Chain,
                "operation fee {given} does not match the schedule fee {expected}"
            );
        }

        match op {
            Operation::Transfer(transfer) => self.apply_transfer(ctx, transfer),
            Operation::LimitOrderCancel(cancel) => self.apply_limit_order_cancel(ctx, cancel),
        }
    }

    fn apply_transfer(&self, ctx: &mut StateContext, op: &TransferOperation) -> Result<()> {
        chain_ensure!(
            self.has_account(ctx.storage, &op.to),
            ErrorId::MissingObject,
            ErrorDomain::Chain,
            "transfer recipient {} does not exist",
            op.to
        );
        self.debit_balance(ctx, &op.from, op.amount)?;
        self.credit_balance(ctx, &op.to, op.amount)?;
        if !op.fee.is_zero() {
            self.debit_balance(ctx, &op.from, op.fee)?;
            self.collect_fee(ctx, op.fee)?;
        }
        Ok(())
    }

    fn apply_limit_order_cancel(
        &self,
        ctx: &mut StateContext,
        op: &LimitOrderCancelOperation,
    ) -> Result<()> {
        let order = self.limit_order_load(ctx.storage, op.order)?;
        chain_ensure!(
            order.seller == op.fee_paying_account,
            ErrorId::Auth,
            ErrorDomain::Market,
            "order {} belongs to {}, not {}",
            op.order,
            order.seller,
            op.fee_paying_account
        );

        self.limit_order_remove(ctx.storage, &order)?;
        self.credit_balance(ctx, &order.seller, order.amount_for_sale())?;

        if !op.fee.is_zero() {
            // The seller's spendable balance bounds the fee so a depleted
            // account cannot wedge the expiry sweep
            let available = self.get_balance(ctx.storage, &order.seller, op.fee.asset_id)?;
            let fee = op.fee.min(available)?;
            if !fee.is_zero() {
                self.debit_balance(ctx, &order.seller, fee)?;
                self.collect_fee(ctx, fee)?;
            }
        }
        Ok(())
    }
}
