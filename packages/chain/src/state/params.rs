use crate::prelude::*;
use crate::state::{State, StateContext};
use cw_storage_plus::Item;

const PARAMETERS_STORAGE: Item<ChainParameters> = Item::new(namespace::PARAMETERS);

pub(crate) fn load_parameters(store: &dyn Storage) -> Result<ChainParameters> {
    PARAMETERS_STORAGE.load(store).map_err(|e| e.into())
}

pub(crate) fn save_parameters(store: &mut dyn Storage, params: &ChainParameters) -> Result<()> {
    PARAMETERS_STORAGE.save(store, params)?;
    Ok(())
}

/// Flat per-operation fees, denominated in the core asset.
#[cw_serde]
pub struct FeeSchedule {
    /// Fee for a transfer operation
    pub transfer: Uint128,
    /// Fee for cancelling a limit order
    pub limit_order_cancel: Uint128,
}

impl FeeSchedule {
    /// The fee the schedule assigns to the given operation.
    pub fn calculate_fee(&self, op: &Operation) -> AssetAmount {
        let amount = match op {
            Operation::Transfer(_) => self.transfer,
            Operation::LimitOrderCancel(_) => self.limit_order_cancel,
        };
        AssetAmount::new(amount, AssetId::core())
    }
}

/// Consensus-tunable parameters, a singleton created at genesis.
#[cw_serde]
pub struct ChainParameters {
    /// The witnesses currently scheduled to produce blocks
    pub active_witnesses: Vec<WitnessId>,
    /// Pay credited to a witness per signed block, bounded by the budget
    pub witness_pay_per_block: Uint128,
    /// Seconds between block slots
    pub block_interval: u32,
    /// Fraction of witnesses, in basis points, whose confirmation makes a
    /// block irreversible
    pub irreversible_threshold_bps: u32,

    /// Blocks between emission events
    pub emission_period: u32,
    /// Base amount minted per emission event
    pub emission_scale: Uint128,
    /// Attenuation applied when activity sits below its recorded peak
    pub delay_koefficient: Decimal256,
    /// Fraction of supply that may be minted per year
    pub year_emission_limit: Decimal256,
    /// Amount distributed by the most recent emission event
    pub current_emission_volume: Uint128,

    /// Blocks between activity index recomputations
    pub activity_period: u32,
    /// Weight of the activity index against balance share in the gravity index
    pub activity_weight: Decimal256,
    /// Minimum qualified flow, in USD, for an account to participate
    pub account_amount_threshold: Decimal256,
    /// Minimum transfer size, in USD, to count toward activity
    pub transaction_amount_threshold: Decimal256,
    /// Conversion rate from core-asset real units to USD for the thresholds
    pub token_usd_rate: Decimal256,
    /// Damping factor of the flow propagation
    pub outlink_weight: Decimal256,
    /// Weight of the neighbor-smoothing pass over raw ranks
    pub interlevel_weight: Decimal256,
    /// Heaviest outlinks retained per account
    pub clustering_m: u32,
    /// Minimum share of an account's outflow for a link to survive
    pub clustering_e: Decimal256,
    /// Blocks per decay epoch for buffered transfers
    pub decay_period: u32,
    /// Weight multiplier per elapsed decay epoch
    pub decay_koefficient: Decimal256,

    /// Default settlement offset, in basis points, for new bitassets
    pub force_settlement_offset_percent: u32,
    /// Flat operation fees
    pub fee_schedule: FeeSchedule,
}

impl Default for ChainParameters {
    fn default() -> Self {
        ChainParameters {
            active_witnesses: Vec::new(),
            witness_pay_per_block: Uint128::new(1000),
            block_interval: 3,
            irreversible_threshold_bps: 7000,
            emission_period: 1000,
            emission_scale: Uint128::new(100_000),
            delay_koefficient: Decimal256::percent(50),
            year_emission_limit: Decimal256::percent(10),
            current_emission_volume: Uint128::zero(),
            activity_period: 100,
            activity_weight: Decimal256::percent(50),
            account_amount_threshold: Decimal256::from_ratio(10u128, 1u128),
            transaction_amount_threshold: Decimal256::one(),
            token_usd_rate: Decimal256::percent(10),
            outlink_weight: Decimal256::percent(85),
            interlevel_weight: Decimal256::percent(10),
            clustering_m: 16,
            clustering_e: Decimal256::permille(1),
            decay_period: 1000,
            decay_koefficient: Decimal256::percent(90),
            force_settlement_offset_percent: 100,
            fee_schedule: FeeSchedule {
                transfer: Uint128::new(20),
                limit_order_cancel: Uint128::new(5),
            },
        }
    }
}

impl ChainParameters {
    pub(crate) fn validate(&self) -> Result<()> {
        chain_ensure!(
            self.block_interval > 0,
            ErrorId::Config,
            ErrorDomain::Chain,
            "block_interval must be positive"
        );
        chain_ensure!(
            self.irreversible_threshold_bps > 0
                && self.irreversible_threshold_bps as u64 <= PERCENT_100,
            ErrorId::Config,
            ErrorDomain::Chain,
            "irreversible threshold must be in (0, 100%], got {} bps",
            self.irreversible_threshold_bps
        );
        chain_ensure!(
            self.emission_period > 0 && self.activity_period > 0 && self.decay_period > 0,
            ErrorId::Config,
            ErrorDomain::Chain,
            "emission, activity and decay periods must be positive"
        );
        chain_ensure!(
            self.activity_weight <= Decimal256::one(),
            ErrorId::Config,
            ErrorDomain::Emission,
            "activity_weight must not exceed one"
        );
        chain_ensure!(
            self.outlink_weight < Decimal256::one(),
            ErrorId::Config,
            ErrorDomain::Activity,
            "outlink_weight must be below one"
        );
        chain_ensure!(
            self.interlevel_weight <= Decimal256::one(),
            ErrorId::Config,
            ErrorDomain::Activity,
            "interlevel_weight must not exceed one"
        );
        chain_ensure!(
            self.delay_koefficient <= Decimal256::one(),
            ErrorId::Config,
            ErrorDomain::Emission,
            "delay_koefficient must not exceed one"
        );
        chain_ensure!(
            self.force_settlement_offset_percent as u64 <= PERCENT_100,
            ErrorId::Config,
            ErrorDomain::Settlement,
            "force_settlement_offset_percent must not exceed 100%"
        );
        Ok(())
    }
}

/// Partial update to [ChainParameters], applied field by field.
#[cw_serde]
#[derive(Default)]
pub struct ParametersUpdate {
    #[allow(missing_docs)]
    pub active_witnesses: Option<Vec<WitnessId>>,
    #[allow(missing_docs)]
    pub witness_pay_per_block: Option<Uint128>,
    #[allow(missing_docs)]
    pub irreversible_threshold_bps: Option<u32>,
    #[allow(missing_docs)]
    pub emission_period: Option<u32>,
    #[allow(missing_docs)]
    pub emission_scale: Option<Uint128>,
    #[allow(missing_docs)]
    pub delay_koefficient: Option<Decimal256>,
    #[allow(missing_docs)]
    pub year_emission_limit: Option<Decimal256>,
    #[allow(missing_docs)]
    pub activity_period: Option<u32>,
    #[allow(missing_docs)]
    pub activity_weight: Option<Decimal256>,
    #[allow(missing_docs)]
    pub account_amount_threshold: Option<Decimal256>,
    #[allow(missing_docs)]
    pub transaction_amount_threshold: Option<Decimal256>,
    #[allow(missing_docs)]
    pub token_usd_rate: Option<Decimal256>,
    #[allow(missing_docs)]
    pub outlink_weight: Option<Decimal256>,
    #[allow(missing_docs)]
    pub interlevel_weight: Option<Decimal256>,
    #[allow(missing_docs)]
    pub clustering_m: Option<u32>,
    #[allow(missing_docs)]
    pub clustering_e: Option<Decimal256>,
    #[allow(missing_docs)]
    pub decay_period: Option<u32>,
    #[allow(missing_docs)]
    pub decay_koefficient: Option<Decimal256>,
    #[allow(missing_docs)]
    pub force_settlement_offset_percent: Option<u32>,
    #[allow(missing_docs)]
    pub fee_schedule: Option<FeeSchedule>,
}

impl State {
    /// Patch the consensus parameters, validating the result.
    pub fn update_parameters(
        &self,
        ctx: &mut StateContext,
        ParametersUpdate {
            active_witnesses,
            witness_pay_per_block,
            irreversible_threshold_bps,
            emission_period,
            emission_scale,
            delay_koefficient,
            year_emission_limit,
            activity_period,
            activity_weight,
            account_amount_threshold,
            transaction_amount_threshold,
            token_usd_rate,
            outlink_weight,
            interlevel_weight,
            clustering_m,
            clustering_e,
            decay_period,
            decay_koefficient,
            force_settlement_offset_percent,
            fee_schedule,
        }: ParametersUpdate,
    ) -> Result<()> {
        let mut params = load_parameters(ctx.storage)?;

        if let Some(x) = active_witnesses {
            params.active_witnesses = x;
        }
        if let Some(x) = witness_pay_per_block {
            params.witness_pay_per_block = x;
        }
        if let Some(x) = irreversible_threshold_bps {
            params.irreversible_threshold_bps = x;
        }
        if let Some(x) = emission_period {
            params.emission_period = x;
        }
        if let Some(x) = emission_scale {
            params.emission_scale = x;
        }
        if let Some(x) = delay_koefficient {
            params.delay_koefficient = x;
        }
        if let Some(x) = year_emission_limit {
            params.year_emission_limit = x;
        }
        if let Some(x) = activity_period {
            params.activity_period = x;
        }
        if let Some(x) = activity_weight {
            params.activity_weight = x;
        }
        if let Some(x) = account_amount_threshold {
            params.account_amount_threshold = x;
        }
        if let Some(x) = transaction_amount_threshold {
            params.transaction_amount_threshold = x;
        }
        if let Some(x) = token_usd_rate {
            params.token_usd_rate = x;
        }
        if let Some(x) = outlink_weight {
            params.outlink_weight = x;
        }
        if let Some(x) = interlevel_weight {
            params.interlevel_weight = x;
        }
        if let Some(x) = clustering_m {
            params.clustering_m = x;
        }
        if let Some(x) = clustering_e {
            params.clustering_e = x;
        }
        if let Some(x) = decay_period {
            params.decay_period = x;
        }
        if let Some(x) = decay_koefficient {
            params.decay_koefficient = x;
        }
        if let Some(x) = force_settlement_offset_percent {
            params.force_settlement_offset_percent = x;
        }
        if let Some(x) = fee_schedule {
            params.fee_schedule = x;
        }

        params.validate()?;
        save_parameters(ctx.storage, &params)?;
        Ok(())
    }
}
