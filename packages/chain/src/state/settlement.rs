use crate::prelude::*;
use crate::state::{State, StateContext};

/// Stores [ForceSettlementOrder]s by [SettlementId]
const SETTLEMENTS: Map<SettlementId, ForceSettlementOrder> = Map::new(namespace::SETTLEMENTS);
/// Indexes settlement orders by asset then settlement date, so one ascending
/// scan visits each asset's due orders in order
const SETTLEMENTS_BY_EXPIRATION: Map<(AssetId, Timestamp, SettlementId), ()> =
    Map::new(namespace::SETTLEMENTS_BY_EXPIRATION);
const LAST_SETTLEMENT_ID: Item<SettlementId> = Item::new(namespace::LAST_SETTLEMENT_ID);

/// A holder's pending redemption of a synthetic for its backing collateral.
#[cw_serde]
pub struct ForceSettlementOrder {
    /// Identity of the order
    pub id: SettlementId,
    /// The account redeeming
    pub owner: String,
    /// Escrowed synthetic remaining to settle
    pub balance: Uint128,
    /// The synthetic asset being settled
    pub asset_id: AssetId,
    /// When the order becomes executable
    pub settlement_date: Timestamp,
}

impl ForceSettlementOrder {
    /// Remaining balance as an amount of the settlement asset.
    pub fn amount(&self) -> AssetAmount {
        AssetAmount::new(self.balance, self.asset_id)
    }

    fn expiration_key(&self) -> (AssetId, Timestamp, SettlementId) {
        (self.asset_id, self.settlement_date, self.id)
    }
}

impl State {
    /// Request settlement of the given amount, escrowing it from the owner.
    /// Executes after the asset's settlement delay.
    pub fn create_settlement_order(
        &self,
        ctx: &mut StateContext,
        owner: &str,
        amount: AssetAmount,
    ) -> Result<SettlementId> {
        let bitasset = self
            .get_bitasset(ctx.storage, amount.asset_id)?
            .ok_or_else(|| {
                chain_anyhow!(
                    ErrorId::MissingObject,
                    ErrorDomain::Settlement,
                    "asset {} is not market issued",
                    amount.asset_id
                )
            })?;
        self.debit_balance(ctx, owner, amount)?;

        let id = LAST_SETTLEMENT_ID
            .may_load(ctx.storage)?
            .map(|last| last.next())
            .unwrap_or_else(|| SettlementId::new(1));
        LAST_SETTLEMENT_ID.save(ctx.storage, &id)?;

        let order = ForceSettlementOrder {
            id,
            owner: owner.to_owned(),
            balance: amount.amount,
            asset_id: amount.asset_id,
            settlement_date: self
                .head_block_time(ctx.storage)?
                .plus_seconds(bitasset.options.force_settlement_delay_seconds as u64),
        };
        SETTLEMENTS.save(ctx.storage, id, &order)?;
        SETTLEMENTS_BY_EXPIRATION.save(ctx.storage, order.expiration_key(), &())?;
        Ok(id)
    }

    pub fn get_settlement_order(
        &self,
        store: &dyn Storage,
        id: SettlementId,
    ) -> Result<ForceSettlementOrder> {
        SETTLEMENTS.load(store, id).map_err(|_| {
            chain_anyhow!(
                ErrorId::MissingObject,
                ErrorDomain::Settlement,
                "no settlement order {id}"
            )
        })
    }

    fn settlement_remove(&self, storage: &mut dyn Storage, order: &ForceSettlementOrder) {
        SETTLEMENTS.remove(storage, order.id);
        SETTLEMENTS_BY_EXPIRATION.remove(storage, order.expiration_key());
    }

    /// Return the escrowed balance to the owner and drop the order.
    pub(crate) fn cancel_settlement_order(
        &self,
        ctx: &mut StateContext,
        order: &ForceSettlementOrder,
    ) -> Result<()> {
        if !order.balance.is_zero() {
            self.credit_balance(ctx, &order.owner, order.amount())?;
        }
        self.settlement_remove(ctx.storage, order);
        Ok(())
    }

    /// Consume part of the order after a match; removes it once empty.
    pub(crate) fn settlement_fill(
        &self,
        ctx: &mut StateContext,
        id: SettlementId,
        filled: Uint128,
    ) -> Result<()> {
        let mut order = self.get_settlement_order(ctx.storage, id)?;
        order.balance = order.balance.checked_sub(filled)?;
        if order.balance.is_zero() {
            self.settlement_remove(ctx.storage, &order);
        } else {
            SETTLEMENTS.save(ctx.storage, id, &order)?;
        }
        Ok(())
    }

    /// First settlement entry whose asset id is `from` or greater.
    fn first_settlement_from(
        &self,
        store: &dyn Storage,
        from: AssetId,
    ) -> Result<Option<(AssetId, Timestamp, SettlementId)>> {
        SETTLEMENTS_BY_EXPIRATION
            .keys(
                store,
                Some(Bound::inclusive((
                    from,
                    Timestamp::from_nanos(0),
                    SettlementId::new(0),
                ))),
                None,
                Order::Ascending,
            )
            .next()
            .transpose()
            .map_err(|e| e.into())
    }

    /// Every settlement order must appear in the expiration view.
    #[cfg(feature = "sanity")]
    pub(crate) fn sanity_check_settlements(&self, store: &dyn Storage) -> Result<()> {
        let mut orders = 0usize;
        for res in SETTLEMENTS.range(store, None, None, Order::Ascending) {
            let (id, order) = res?;
            orders += 1;
            chain_ensure!(
                SETTLEMENTS_BY_EXPIRATION.has(store, order.expiration_key()),
                ErrorId::IndexInvariantViolated,
                ErrorDomain::Settlement,
                "settlement order {id} missing from the expiration view"
            );
        }
        let indexed = SETTLEMENTS_BY_EXPIRATION
            .keys(store, None, None, Order::Ascending)
            .count();
        chain_ensure!(
            indexed == orders,
            ErrorId::IndexInvariantViolated,
            ErrorDomain::Settlement,
            "stale settlement index entries: {orders} orders, {indexed} indexed"
        );
        Ok(())
    }

    /// Start a fresh settlement-volume window on every bitasset.
    ///
    /// Called by the maintenance-interval processing, which owns the cadence.
    pub fn reset_force_settlement_volumes(&self, ctx: &mut StateContext) -> Result<()> {
        for asset_id in self.market_issued_assets(ctx.storage)? {
            self.modify_bitasset(ctx, asset_id, |bitasset| {
                bitasset.force_settled_volume = Uint128::zero();
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Cancel expired limit orders and execute due force settlements.
    pub fn clear_expired_orders(&self, ctx: &mut StateContext) -> Result<()> {
        self.clear_expired_limit_orders(ctx)?;
        self.process_force_settlements(ctx)
    }

    /// Work through force settlements grouped by asset.
    ///
    /// Each round either consumes the front order of the current asset or
    /// advances to the next asset. The front is re-queried every round
    /// because matching mutates the index.
    fn process_force_settlements(&self, ctx: &mut StateContext) -> Result<()> {
        let head_time = self.head_block_time(ctx.storage)?;
        // Cursor into the (asset, date) ordering; bumping the asset id by one
        // is the upper_bound step to the next asset
        let mut cursor = AssetId::new(0);
        // (asset, cap) of the asset currently being settled
        let mut max_settlement_volume: Option<(AssetId, Uint128)> = None;

        while let Some((current_asset, _, settlement_id)) =
            self.first_settlement_from(ctx.storage, cursor)?
        {
            cursor = current_asset;
            let order = self.get_settlement_order(ctx.storage, settlement_id)?;
            let bitasset = self
                .get_bitasset(ctx.storage, current_asset)?
                .ok_or_else(|| {
                    chain_anyhow!(
                        ErrorId::IndexInvariantViolated,
                        ErrorDomain::Settlement,
                        "settlement order {settlement_id} references non-bitasset {current_asset}"
                    )
                })?;

            if bitasset.has_settlement() {
                // Globally settled: pending settlements are void
                self.cancel_settlement_order(ctx, &order)?;
                continue;
            }

            if order.settlement_date > head_time {
                // This asset's earliest order is not due yet; move on
                cursor = current_asset.next();
                continue;
            }

            let settlement_price_feed = match &bitasset.current_feed {
                Some(feed) => feed.settlement_price,
                None => {
                    self.cancel_settlement_order(ctx, &order)?;
                    continue;
                }
            };

            let max_volume = match max_settlement_volume {
                Some((asset, cap)) if asset == current_asset => cap,
                _ => {
                    let supply = self
                        .get_asset_dynamic(ctx.storage, current_asset)?
                        .current_supply;
                    let cap = bitasset.max_force_settlement_volume(supply);
                    max_settlement_volume = Some((current_asset, cap));
                    cap
                }
            };
            if bitasset.force_settled_volume >= max_volume {
                cursor = current_asset.next();
                continue;
            }

            let pays = order.amount();
            let gross = pays.checked_mul_price(&settlement_price_feed)?;
            let receives = AssetAmount::new(
                gross.amount.multiply_ratio(
                    PERCENT_100 - bitasset.options.force_settlement_offset_percent as u64,
                    PERCENT_100,
                ),
                gross.asset_id,
            );
            chain_ensure!(
                receives.amount <= gross.amount,
                ErrorId::InvalidAmount,
                ErrorDomain::Settlement,
                "settlement offset increased the payout for order {settlement_id}"
            );
            if receives.is_zero() {
                // Too small to yield any collateral at all
                self.cancel_settlement_order(ctx, &order)?;
                continue;
            }
            let match_price = Price::new(pays, receives)?;

            let mut settled = AssetAmount::new(bitasset.force_settled_volume, current_asset);
            // Match against the least collateralized short until the
            // settlement is finished or the volume cap is reached
            while settled.amount < max_volume {
                let order = match SETTLEMENTS.may_load(ctx.storage, settlement_id)? {
                    Some(order) => order,
                    None => break,
                };
                if order.balance.is_zero() {
                    self.cancel_settlement_order(ctx, &order)?;
                    break;
                }
                let call = self
                    .least_collateralized_call(ctx.storage, current_asset)?
                    .ok_or_else(|| {
                        chain_anyhow!(
                            ErrorId::IndexInvariantViolated,
                            ErrorDomain::Settlement,
                            "no call order backing {current_asset} despite outstanding supply"
                        )
                    })?;
                let max_settlement = AssetAmount::new(max_volume - settled.amount, current_asset);

                match self.match_settlement(
                    ctx,
                    call.id,
                    settlement_id,
                    &match_price,
                    max_settlement,
                ) {
                    Ok(filled) => settled = settled.checked_add(filled)?,
                    Err(e) if ChainError::is(&e, ErrorId::BlackSwanDuringMatch) => {
                        ctx.diagnostics_mut().add_event(
                            Event::new("settlement-black-swan")
                                .add_attribute("asset", current_asset.to_string())
                                .add_attribute("order", settlement_id.to_string()),
                        );
                        if let Some(order) = SETTLEMENTS.may_load(ctx.storage, settlement_id)? {
                            self.cancel_settlement_order(ctx, &order)?;
                        }
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }

            if self
                .get_bitasset(ctx.storage, current_asset)?
                .map(|b| b.force_settled_volume != settled.amount)
                .unwrap_or(false)
            {
                self.modify_bitasset(ctx, current_asset, |bitasset| {
                    bitasset.force_settled_volume = settled.amount;
                    Ok(())
                })?;
            }
        }
        Ok(())
    }
}
