use crate::prelude::*;
use crate::state::{State, StateContext};

/// Balances keyed by account then asset, the `by_account_asset` view.
const BALANCES: Map<(&str, AssetId), Uint128> = Map::new(namespace::BALANCES);

impl State {
    /// The account's balance in the given asset, zero when absent.
    pub fn get_balance(
        &self,
        store: &dyn Storage,
        account: &str,
        asset_id: AssetId,
    ) -> Result<AssetAmount> {
        let amount = BALANCES
            .may_load(store, (account, asset_id))?
            .unwrap_or_default();
        Ok(AssetAmount::new(amount, asset_id))
    }

    /// Does the account hold a balance entry in the given asset?
    ///
    /// A zero entry still participates in emission; absence does not.
    pub(crate) fn has_balance_entry(
        &self,
        store: &dyn Storage,
        account: &str,
        asset_id: AssetId,
    ) -> bool {
        BALANCES.has(store, (account, asset_id))
    }

    pub(crate) fn credit_balance(
        &self,
        ctx: &mut StateContext,
        account: &str,
        amount: AssetAmount,
    ) -> Result<()> {
        let current = self.get_balance(ctx.storage, account, amount.asset_id)?;
        BALANCES.save(
            ctx.storage,
            (account, amount.asset_id),
            &current.amount.checked_add(amount.amount)?,
        )?;
        Ok(())
    }

    pub(crate) fn debit_balance(
        &self,
        ctx: &mut StateContext,
        account: &str,
        amount: AssetAmount,
    ) -> Result<()> {
        let current = self.get_balance(ctx.storage, account, amount.asset_id)?;
        chain_ensure!(
            current.amount >= amount.amount,
            ErrorId::InsufficientBalance,
            ErrorDomain::Chain,
            "insufficient balance: {account} holds {current}, needs {amount}"
        );
        BALANCES.save(
            ctx.storage,
            (account, amount.asset_id),
            &(current.amount - amount.amount),
        )?;
        Ok(())
    }
}
