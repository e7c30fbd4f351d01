//! Shared harness for driving the maintenance core over an in-memory store.
#![allow(dead_code)]

use cosmwasm_std::MemoryStorage;
use gravity_chain::block::{Block, BlockId, Operation, OperationContext, Transaction, TransactionId};
use gravity_chain::state::genesis::{init_chain, GenesisAccount, GenesisConfig, GenesisWitness};
use gravity_chain::state::{ChainParameters, State, StateContext};
use shared::prelude::*;

/// Genesis instant used by every test; safely past the feed-expiry cutover.
pub const GENESIS_SECONDS: u64 = 1_500_000_000;

pub struct TestChain {
    pub store: MemoryStorage,
    next_tx: u64,
}

impl TestChain {
    /// Bootstrap a chain with the given witnesses and funded accounts.
    ///
    /// Witness `i` gets id `i`, account `witness-i`, and sits at index `i`
    /// of the active list, so the producer of slot `s` (from aslot 0) is
    /// witness `s mod n`.
    pub fn new(
        witness_count: u64,
        accounts: &[(&str, u128)],
        tweak: impl FnOnce(&mut ChainParameters),
    ) -> Self {
        let mut params = ChainParameters {
            active_witnesses: (0..witness_count).map(WitnessId::new).collect(),
            ..Default::default()
        };
        tweak(&mut params);

        let mut genesis_accounts: Vec<GenesisAccount> = (0..witness_count)
            .map(|i| GenesisAccount {
                name: format!("witness-{i}"),
                balance: Uint128::zero(),
            })
            .collect();
        genesis_accounts.extend(accounts.iter().map(|(name, balance)| GenesisAccount {
            name: (*name).to_owned(),
            balance: Uint128::new(*balance),
        }));

        let genesis = GenesisConfig {
            genesis_time: Timestamp::from_seconds(GENESIS_SECONDS),
            parameters: params,
            core_symbol: "GVT".to_owned(),
            core_precision: 0,
            witness_budget: Uint128::zero(),
            accounts: genesis_accounts,
            witnesses: (0..witness_count)
                .map(|i| GenesisWitness {
                    id: WitnessId::new(i),
                    account: format!("witness-{i}"),
                })
                .collect(),
        };

        let mut store = MemoryStorage::new();
        init_chain(&mut store, &genesis).expect("init_chain failed");
        TestChain { store, next_tx: 0 }
    }

    pub fn state(&self) -> State {
        State::load(&self.store).expect("State::load failed")
    }

    /// Run a closure with a state view and a mutable context.
    pub fn with_ctx<T>(
        &mut self,
        f: impl FnOnce(&State, &mut StateContext) -> Result<T>,
    ) -> Result<T> {
        let state = State::load(&self.store)?;
        let mut ctx = StateContext::new(&mut self.store);
        f(&state, &mut ctx)
    }

    /// A block at the given offset (seconds past genesis) from the witness.
    pub fn block_at(&self, number: u32, witness: u64, offset_seconds: u64) -> Block {
        Block {
            number,
            id: BlockId(format!("block-{number}")),
            timestamp: Timestamp::from_seconds(GENESIS_SECONDS + offset_seconds),
            witness: WitnessId::new(witness),
            transactions: Vec::new(),
        }
    }

    /// Wrap operations into a transaction expiring well in the future.
    pub fn tx(&mut self, operations: Vec<Operation>) -> Transaction {
        self.next_tx += 1;
        Transaction {
            id: TransactionId(format!("tx-{}", self.next_tx)),
            expiration: Timestamp::from_seconds(GENESIS_SECONDS + 1_000_000),
            operations,
        }
    }

    /// Apply a block the way the node does: operations first, then the
    /// maintenance routines.
    pub fn apply(&mut self, block: &Block) -> Result<()> {
        let skip = OperationContext {
            skip_authority_check: true,
            skip_fee_schedule_check: true,
        };
        self.with_ctx(|state, ctx| {
            for tx in &block.transactions {
                for op in &tx.operations {
                    state.apply_operation(ctx, skip, op)?;
                }
            }
            state.apply_block_maintenance(ctx, block)
        })
    }

    pub fn balance(&self, account: &str, asset: AssetId) -> u128 {
        self.state()
            .get_balance(&self.store, account, asset)
            .expect("get_balance failed")
            .amount
            .u128()
    }
}

/// A price as a plain ratio between two assets.
pub fn price(
    base_amount: u128,
    base_asset: AssetId,
    quote_amount: u128,
    quote_asset: AssetId,
) -> Price {
    Price::new(
        AssetAmount::new(base_amount, base_asset),
        AssetAmount::new(quote_amount, quote_asset),
    )
    .expect("invalid test price")
}
