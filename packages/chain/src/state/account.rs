use crate::prelude::*;
use crate::state::{State, StateContext};

/// Accounts keyed by name; name order is the consensus iteration order for
/// the emission distribution.
const ACCOUNTS: Map<&str, Account> = Map::new(namespace::ACCOUNTS);

/// A named account.
#[cw_serde]
pub struct Account {
    /// Globally unique account name
    pub name: String,
    /// Activity index from the most recent activity calculation, in `[0, 1]`
    pub activity_index: Decimal256,
    /// Amount credited to this account by the most recent emission event
    pub emission_volume: Uint128,
}

impl State {
    pub fn create_account(&self, ctx: &mut StateContext, name: &str) -> Result<()> {
        chain_ensure!(
            !ACCOUNTS.has(ctx.storage, name),
            ErrorId::Config,
            ErrorDomain::Chain,
            "account {name} already exists"
        );
        ACCOUNTS.save(
            ctx.storage,
            name,
            &Account {
                name: name.to_owned(),
                activity_index: Decimal256::zero(),
                emission_volume: Uint128::zero(),
            },
        )?;
        Ok(())
    }

    pub fn get_account(&self, store: &dyn Storage, name: &str) -> Result<Account> {
        ACCOUNTS.load(store, name).map_err(|_| {
            chain_anyhow!(
                ErrorId::MissingObject,
                ErrorDomain::Chain,
                "no account named {name}"
            )
        })
    }

    pub(crate) fn has_account(&self, store: &dyn Storage, name: &str) -> bool {
        ACCOUNTS.has(store, name)
    }

    /// All account names in `by_name` order.
    pub(crate) fn account_names(&self, store: &dyn Storage) -> Result<Vec<String>> {
        ACCOUNTS
            .keys(store, None, None, Order::Ascending)
            .map(|r| r.map_err(|e| e.into()))
            .collect()
    }

    /// Scoped mutation of one account; derived state stays consistent because
    /// accounts carry no secondary index.
    pub(crate) fn modify_account(
        &self,
        ctx: &mut StateContext,
        name: &str,
        f: impl FnOnce(&mut Account),
    ) -> Result<()> {
        let mut account = self.get_account(ctx.storage, name)?;
        f(&mut account);
        ACCOUNTS.save(ctx.storage, name, &account)?;
        Ok(())
    }
}
