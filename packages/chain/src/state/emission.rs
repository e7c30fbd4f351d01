use crate::prelude::*;
use crate::state::params::{load_parameters, save_parameters, ChainParameters};
use crate::state::{State, StateContext};

/// Block of the most recent emission event
const LAST_EMISSION_BLOCK: Item<u32> = Item::new(namespace::LAST_EMISSION_BLOCK);
/// Highest epoch activity ever observed
const LAST_PEAK_ACTIVITY: Item<u32> = Item::new(namespace::LAST_PEAK_ACTIVITY);

/// Per-account emission weight: balance share and activity index blended
/// under the activity weight.
pub(crate) struct GravityIndexCalculator {
    activity_weight: Decimal256,
    current_supply: Uint128,
}

impl GravityIndexCalculator {
    pub(crate) fn new(activity_weight: Decimal256, current_supply: Uint128) -> Self {
        GravityIndexCalculator {
            activity_weight,
            current_supply,
        }
    }

    /// `share * (1 - w) + activity * w`
    pub(crate) fn calculate_index(
        &self,
        balance: Uint128,
        activity_index: Decimal256,
    ) -> Result<Decimal256> {
        let share = if self.current_supply.is_zero() {
            Decimal256::zero()
        } else {
            Decimal256::from_ratio(balance, self.current_supply)
        };
        let balance_part =
            share.checked_mul(Decimal256::one().checked_sub(self.activity_weight)?)?;
        let activity_part = activity_index.checked_mul(self.activity_weight)?;
        Ok(balance_part.checked_add(activity_part)?)
    }
}

/// The amount to mint this emission event.
///
/// The base amount is `emission_scale`, attenuated by `delay_koefficient`
/// while activity sits below its recorded peak, and always bounded by the
/// per-event share of the yearly limit.
pub(crate) fn calculate_emission(
    params: &ChainParameters,
    current_supply: Uint128,
    current_activity: u32,
    peak_activity: u32,
) -> Result<Uint128> {
    let seconds_per_event = params.block_interval as u64 * params.emission_period as u64;
    let events_per_year = (SECONDS_PER_YEAR / seconds_per_event.max(1)).max(1);

    let cap = Decimal256::from_ratio(current_supply, events_per_year)
        .checked_mul(params.year_emission_limit)?
        .to_uint_floor();
    let cap: Uint128 = cap.try_into()?;

    let mut emission = params.emission_scale;
    if current_activity < peak_activity {
        emission = Decimal256::from_ratio(emission, 1u64)
            .checked_mul(params.delay_koefficient)?
            .to_uint_floor()
            .try_into()?;
    }

    Ok(emission.min(cap))
}

impl State {
    /// Mint and distribute once per emission period.
    ///
    /// Every account holding a core-asset balance entry is credited
    /// `floor(gravity_index * emission)`, in `by_name` order. The supply
    /// grows by exactly the distributed sum; whatever rounding leaves behind
    /// is simply not minted.
    pub fn process_gravity_emission(&self, ctx: &mut StateContext, block_num: u32) -> Result<()> {
        let last = LAST_EMISSION_BLOCK.may_load(ctx.storage)?.unwrap_or(0);
        if block_num - last < self.params.emission_period {
            return Ok(());
        }
        LAST_EMISSION_BLOCK.save(ctx.storage, &block_num)?;

        let epoch = self.get_activity_epoch(ctx.storage)?;
        let current_activity = epoch.get_activity();

        let mut peak_activity = LAST_PEAK_ACTIVITY.may_load(ctx.storage)?.unwrap_or(0);
        if current_activity > peak_activity {
            peak_activity = current_activity;
            LAST_PEAK_ACTIVITY.save(ctx.storage, &peak_activity)?;
        }

        let core = AssetId::core();
        let current_supply = self.get_asset_dynamic(ctx.storage, core)?.current_supply;
        let current_emission =
            calculate_emission(&self.params, current_supply, current_activity, peak_activity)?;

        ctx.diagnostics_mut().add_event(
            Event::new("emission-started")
                .add_attribute("block_num", block_num.to_string())
                .add_attribute("emission_period", self.params.emission_period.to_string())
                .add_attribute("activity_weight", self.params.activity_weight.to_string())
                .add_attribute(
                    "year_emission_limit",
                    self.params.year_emission_limit.to_string(),
                )
                .add_attribute("emission_scale", self.params.emission_scale.to_string())
                .add_attribute("current_activity", current_activity.to_string())
                .add_attribute("last_peak_activity", peak_activity.to_string())
                .add_attribute("current_supply", current_supply.to_string())
                .add_attribute("current_emission", current_emission.to_string()),
        );

        let gic = GravityIndexCalculator::new(self.params.activity_weight, current_supply);
        let mut distributed_emission = Uint128::zero();

        for name in self.account_names(ctx.storage)? {
            if !self.has_balance_entry(ctx.storage, &name, core) {
                continue;
            }
            let balance = self.get_balance(ctx.storage, &name, core)?.amount;
            let account = self.get_account(ctx.storage, &name)?;

            let index = gic.calculate_index(balance, account.activity_index)?;
            let gain: Uint128 = index
                .checked_mul(Decimal256::from_ratio(current_emission, 1u64))?
                .to_uint_floor()
                .try_into()?;

            if !gain.is_zero() {
                self.credit_balance(ctx, &name, AssetAmount::new(gain, core))?;
            }
            self.modify_account(ctx, &name, |account| {
                account.emission_volume = gain;
            })?;
            distributed_emission += gain;

            ctx.diagnostics_mut().add_event(
                Event::new("emission-credit")
                    .add_attribute("name", name)
                    .add_attribute("balance", balance.to_string())
                    .add_attribute("activity", account.activity_index.to_string())
                    .add_attribute("importance", index.to_string())
                    .add_attribute("emission", gain.to_string()),
            );
        }

        // The distribution is authoritative: supply grows by what was
        // actually credited, never by the computed emission
        self.modify_asset_dynamic(ctx, core, |dynamic| {
            dynamic.current_supply = dynamic.current_supply.checked_add(distributed_emission)?;
            Ok(())
        })?;

        let mut params = load_parameters(ctx.storage)?;
        params.current_emission_volume = distributed_emission;
        save_parameters(ctx.storage, &params)?;

        self.clear_activity_epoch(ctx, block_num)?;

        ctx.diagnostics_mut().add_event(
            Event::new("emission-ended")
                .add_attribute("distributed", distributed_emission.to_string()),
        );
        Ok(())
    }
}
