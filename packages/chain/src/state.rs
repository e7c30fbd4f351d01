// re-exporting
pub(crate) mod account;
pub(crate) mod activity;
pub(crate) mod asset;
pub(crate) mod balance;
pub(crate) mod call;
pub(crate) mod dynamic;
pub(crate) mod emission;
pub(crate) mod feed;
pub mod genesis;
pub(crate) mod maintenance;
pub(crate) mod ops;
pub(crate) mod order;
pub(crate) mod params;
pub(crate) mod proposal;
pub(crate) mod settlement;
pub(crate) mod transactions;
pub(crate) mod withdraw;
pub(crate) mod witness;

use crate::prelude::*;
use shared::diagnostics::Diagnostics;

pub use self::account::Account;
pub use self::activity::{ActivityEpoch, TransferRecord};
pub use self::asset::{
    Asset, AssetDynamicData, BitAssetData, BitAssetOptions, FeedEntry, PriceFeed,
};
pub use self::call::CallOrder;
pub use self::dynamic::DynamicGlobalState;
pub use self::maintenance::apply_block;
pub use self::order::LimitOrder;
pub use self::params::{ChainParameters, FeeSchedule, ParametersUpdate};
pub use self::proposal::Proposal;
pub use self::settlement::ForceSettlementOrder;
pub use self::transactions::TransactionDedupEntry;
pub use self::withdraw::WithdrawPermission;
pub use self::witness::Witness;

use self::params::load_parameters;

/// Read-only view over the chain, holding the loaded consensus parameters.
///
/// All maintenance routines hang off this type; mutation goes through a
/// [StateContext].
pub struct State {
    pub(crate) params: ChainParameters,
}

/// Exclusive mutable access to the chain for the duration of one block.
pub struct StateContext<'a> {
    pub(crate) storage: &'a mut dyn Storage,
    /// Hidden so every diagnostic goes through [StateContext::diagnostics_mut]
    diagnostics: Diagnostics,
}

impl State {
    /// Load the state view from storage.
    pub fn load(store: &dyn Storage) -> Result<Self> {
        let params = load_parameters(store)?;
        Ok(State { params })
    }

    /// The loaded consensus parameters.
    pub fn params(&self) -> &ChainParameters {
        &self.params
    }
}

impl<'a> StateContext<'a> {
    /// Wrap the given storage for mutation.
    pub fn new(storage: &'a mut dyn Storage) -> Self {
        StateContext {
            storage,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Like [StateContext::new] but diagnostic events are dropped.
    pub fn new_mute(storage: &'a mut dyn Storage) -> Self {
        StateContext {
            storage,
            diagnostics: Diagnostics::new_mute(),
        }
    }

    /// The diagnostics sink for this block.
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Finalize, handing the diagnostic events to the caller.
    pub fn into_events(self) -> Vec<Event> {
        self.diagnostics.into_events()
    }
}
