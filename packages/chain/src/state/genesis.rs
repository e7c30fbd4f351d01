//! Chain bootstrap: creates the singletons and the core asset.
use crate::prelude::*;
use crate::state::dynamic::init_dynamic_state;
use crate::state::params::{save_parameters, ChainParameters};
use crate::state::{State, StateContext};

/// An account seeded at genesis.
#[cw_serde]
pub struct GenesisAccount {
    /// Account name
    pub name: String,
    /// Initial balance in the core asset
    pub balance: Uint128,
}

/// A witness seeded at genesis.
#[cw_serde]
pub struct GenesisWitness {
    /// Identity of the witness
    pub id: WitnessId,
    /// Account credited with witness pay; must be among the genesis accounts
    pub account: String,
}

/// Everything needed to bring up an empty chain.
#[cw_serde]
pub struct GenesisConfig {
    /// Timestamp the slot grid starts from
    pub genesis_time: Timestamp,
    /// Initial consensus parameters
    pub parameters: ChainParameters,
    /// Ticker of the core asset
    pub core_symbol: String,
    /// Precision of the core asset
    pub core_precision: u8,
    /// Initial funds for paying witnesses
    pub witness_budget: Uint128,
    /// Seeded accounts
    pub accounts: Vec<GenesisAccount>,
    /// Seeded witnesses
    pub witnesses: Vec<GenesisWitness>,
}

/// Initialize storage from the genesis configuration.
///
/// Called exactly once, before any block is applied.
pub fn init_chain(store: &mut dyn Storage, genesis: &GenesisConfig) -> Result<()> {
    genesis.parameters.validate()?;
    save_parameters(store, &genesis.parameters)?;
    init_dynamic_state(store, genesis.genesis_time, genesis.witness_budget)?;

    let state = State::load(store)?;
    let mut ctx = StateContext::new_mute(store);

    let core = state.create_asset(&mut ctx, &genesis.core_symbol, genesis.core_precision, None)?;
    chain_ensure!(
        core == AssetId::core(),
        ErrorId::Config,
        ErrorDomain::Chain,
        "core asset must be created first"
    );

    for account in &genesis.accounts {
        state.create_account(&mut ctx, &account.name)?;
        if !account.balance.is_zero() {
            state.issue_asset(
                &mut ctx,
                &account.name,
                AssetAmount::new(account.balance, core),
            )?;
        }
    }

    for witness in &genesis.witnesses {
        state.create_witness(&mut ctx, witness.id, &witness.account)?;
    }

    Ok(())
}
