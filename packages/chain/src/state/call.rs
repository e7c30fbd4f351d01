use crate::prelude::*;
use crate::state::{State, StateContext};

/// Stores [CallOrder]s by [CallOrderId]
const CALL_ORDERS: Map<CallOrderId, CallOrder> = Map::new(namespace::CALL_ORDERS);
/// Indexes [CallOrder]s by collateralization within their debt asset,
/// least collateralized first
const CALLS_BY_COLLATERAL: Map<(AssetId, PriceKey, CallOrderId), ()> =
    Map::new(namespace::CALLS_BY_COLLATERAL);
const LAST_CALL_ID: Item<CallOrderId> = Item::new(namespace::LAST_CALL_ID);

/// A short position: collateral held against synthetic debt.
#[cw_serde]
pub struct CallOrder {
    /// Identity of the position
    pub id: CallOrderId,
    /// The account that owes the debt and owns the collateral
    pub borrower: String,
    /// Collateral held, in the backing asset
    pub collateral: Uint128,
    /// Debt owed, in the synthetic asset
    pub debt: Uint128,
    /// The backing asset
    pub collateral_asset: AssetId,
    /// The synthetic asset
    pub debt_asset: AssetId,
    /// Price at which this position becomes callable
    pub call_price: Price,
    /// Collateral ratio the borrower wants restored after a partial call,
    /// in basis points
    pub target_collateral_ratio: Option<u32>,
}

impl CallOrder {
    /// Collateral over debt as an exact price.
    pub fn collateralization(&self) -> Result<Price> {
        Price::new(
            AssetAmount::new(self.collateral, self.collateral_asset),
            AssetAmount::new(self.debt, self.debt_asset),
        )
    }

    fn collateral_key(&self) -> (AssetId, PriceKey, CallOrderId) {
        (
            self.debt_asset,
            PriceKey::from_ratio(self.collateral, self.debt),
            self.id,
        )
    }
}

impl State {
    /// Open a short position: escrow collateral, mint the synthetic to the
    /// borrower.
    pub fn create_call_order(
        &self,
        ctx: &mut StateContext,
        borrower: &str,
        collateral: AssetAmount,
        debt: AssetAmount,
        target_collateral_ratio: Option<u32>,
    ) -> Result<CallOrderId> {
        let bitasset = self
            .get_bitasset(ctx.storage, debt.asset_id)?
            .ok_or_else(|| {
                chain_anyhow!(
                    ErrorId::MissingObject,
                    ErrorDomain::Market,
                    "asset {} is not market issued",
                    debt.asset_id
                )
            })?;
        chain_ensure!(
            bitasset.options.short_backing_asset == collateral.asset_id,
            ErrorId::Config,
            ErrorDomain::Market,
            "asset {} is backed by {}, not {}",
            debt.asset_id,
            bitasset.options.short_backing_asset,
            collateral.asset_id
        );
        chain_ensure!(
            !debt.is_zero() && !collateral.is_zero(),
            ErrorId::InvalidAmount,
            ErrorDomain::Market,
            "call order needs nonzero debt and collateral"
        );

        let id = LAST_CALL_ID
            .may_load(ctx.storage)?
            .map(|last| last.next())
            .unwrap_or_else(|| CallOrderId::new(1));
        LAST_CALL_ID.save(ctx.storage, &id)?;

        self.debit_balance(ctx, borrower, collateral)?;
        self.issue_asset(ctx, borrower, debt)?;

        let order = CallOrder {
            id,
            borrower: borrower.to_owned(),
            collateral: collateral.amount,
            debt: debt.amount,
            collateral_asset: collateral.asset_id,
            debt_asset: debt.asset_id,
            call_price: Price::new(collateral, debt)?,
            target_collateral_ratio,
        };
        self.call_order_save(ctx.storage, &order)?;
        Ok(id)
    }

    fn call_order_save(&self, storage: &mut dyn Storage, order: &CallOrder) -> Result<()> {
        CALL_ORDERS.save(storage, order.id, order)?;
        CALLS_BY_COLLATERAL.save(storage, order.collateral_key(), &())?;
        Ok(())
    }

    fn call_order_remove(&self, storage: &mut dyn Storage, order: &CallOrder) {
        CALL_ORDERS.remove(storage, order.id);
        CALLS_BY_COLLATERAL.remove(storage, order.collateral_key());
    }

    pub fn get_call_order(
        &self,
        store: &dyn Storage,
        id: CallOrderId,
    ) -> Result<CallOrder> {
        CALL_ORDERS.load(store, id).map_err(|_| {
            chain_anyhow!(
                ErrorId::MissingObject,
                ErrorDomain::Market,
                "no call order {id}"
            )
        })
    }

    /// The least collateralized call of the given synthetic, if any.
    ///
    /// Collateralization keys are scanned ascending between the boundary
    /// prices of the (backing, debt) pair.
    pub fn least_collateralized_call(
        &self,
        store: &dyn Storage,
        debt_asset: AssetId,
    ) -> Result<Option<CallOrder>> {
        let bitasset = match self.get_bitasset(store, debt_asset)? {
            Some(bitasset) => bitasset,
            None => return Ok(None),
        };
        let backing = bitasset.options.short_backing_asset;
        let call_min = Price::min(backing, debt_asset)?;
        let call_max = Price::max(backing, debt_asset)?;
        match CALLS_BY_COLLATERAL
            .sub_prefix(debt_asset)
            .keys(
                store,
                Some(Bound::inclusive((
                    PriceKey::from(&call_min),
                    CallOrderId::new(0),
                ))),
                Some(Bound::inclusive((
                    PriceKey::from(&call_max),
                    CallOrderId::new(u64::MAX),
                ))),
                Order::Ascending,
            )
            .next()
        {
            None => Ok(None),
            Some(res) => {
                let (_, id) = res?;
                self.get_call_order(store, id).map(Some)
            }
        }
    }

    /// All call orders of the given synthetic, least collateralized first.
    fn call_orders_of(&self, store: &dyn Storage, debt_asset: AssetId) -> Result<Vec<CallOrderId>> {
        CALLS_BY_COLLATERAL
            .sub_prefix(debt_asset)
            .keys(store, None, None, Order::Ascending)
            .map(|r| r.map(|(_, id)| id).map_err(|e| e.into()))
            .collect()
    }

    /// Every call must sit in the collateral view under its current ratio.
    #[cfg(feature = "sanity")]
    pub(crate) fn sanity_check_call_orders(&self, store: &dyn Storage) -> Result<()> {
        let mut calls = 0usize;
        for res in CALL_ORDERS.range(store, None, None, Order::Ascending) {
            let (id, call) = res?;
            calls += 1;
            chain_ensure!(
                !call.debt.is_zero(),
                ErrorId::IndexInvariantViolated,
                ErrorDomain::Market,
                "call order {id} persisted with zero debt"
            );
            chain_ensure!(
                CALLS_BY_COLLATERAL.has(store, call.collateral_key()),
                ErrorId::IndexInvariantViolated,
                ErrorDomain::Market,
                "call order {id} missing from the collateral view"
            );
        }
        let indexed = CALLS_BY_COLLATERAL
            .keys(store, None, None, Order::Ascending)
            .count();
        chain_ensure!(
            indexed == calls,
            ErrorId::IndexInvariantViolated,
            ErrorDomain::Market,
            "stale collateral index entries: {calls} calls, {indexed} indexed"
        );
        Ok(())
    }

    /// Decide whether the market-issued asset has collapsed.
    ///
    /// With HB the best bid for the collateral, SP the median settlement
    /// price and LC the inverted collateralization of the worst call, a black
    /// swan has occurred iff `LC >= max(HB, SP)`: not even the best bid or
    /// the feed covers the least collateralized short. No feed or no calls
    /// means no black swan.
    pub fn check_for_blackswan(
        &self,
        ctx: &mut StateContext,
        asset_id: AssetId,
        enable_black_swan: bool,
    ) -> Result<bool> {
        let bitasset = match self.get_bitasset(ctx.storage, asset_id)? {
            Some(bitasset) => bitasset,
            None => return Ok(false),
        };
        if bitasset.has_settlement() {
            return Ok(true); // already force settled
        }
        let settle_price = match &bitasset.current_feed {
            Some(feed) => feed.settlement_price,
            None => return Ok(false), // no feed
        };

        let least = match self.least_collateralized_call(ctx.storage, asset_id)? {
            Some(call) => call,
            None => return Ok(false), // no call orders
        };

        // Bids sell the synthetic for its backing asset
        let backing = bitasset.options.short_backing_asset;
        let mut highest = settle_price;
        if let Some(bid) = self.best_limit_order(ctx.storage, asset_id, backing)? {
            highest = highest.max(bid.sell_price);
        }

        let least_collateral = least.collateralization()?;
        if least_collateral.inverted() >= highest {
            ctx.diagnostics_mut().add_event(
                Event::new("black-swan")
                    .add_attribute("asset", asset_id.to_string())
                    .add_attribute("least_collateral", least_collateral.to_string())
                    .add_attribute("settle_price", settle_price.to_string())
                    .add_attribute("highest", highest.to_string()),
            );
            chain_ensure!(
                enable_black_swan,
                ErrorId::BlackSwanDisallowed,
                ErrorDomain::Market,
                "black swan detected during a margin update which is not allowed to trigger one"
            );
            self.globally_settle_asset(ctx, asset_id, least_collateral.inverted())?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Freeze the bitasset at the given price, closing every short.
    ///
    /// Each position pays `debt * price` of collateral (capped by what it
    /// holds) into the settlement fund and gets the rest back; holders of the
    /// synthetic redeem against the fund from then on.
    pub fn globally_settle_asset(
        &self,
        ctx: &mut StateContext,
        asset_id: AssetId,
        settlement_price: Price,
    ) -> Result<()> {
        chain_ensure!(
            !self
                .get_bitasset(ctx.storage, asset_id)?
                .map(|b| b.has_settlement())
                .unwrap_or(true),
            ErrorId::IndexInvariantViolated,
            ErrorDomain::Market,
            "asset {asset_id} cannot be globally settled twice"
        );

        let mut collateral_gathered = Uint128::zero();
        for id in self.call_orders_of(ctx.storage, asset_id)? {
            let order = self.get_call_order(ctx.storage, id)?;
            let owed = AssetAmount::new(order.debt, order.debt_asset)
                .checked_mul_price(&settlement_price)?;
            let pays = owed.amount.min(order.collateral);
            collateral_gathered += pays;
            let refund = order.collateral - pays;
            if !refund.is_zero() {
                self.credit_balance(
                    ctx,
                    &order.borrower,
                    AssetAmount::new(refund, order.collateral_asset),
                )?;
            }
            self.call_order_remove(ctx.storage, &order);
        }

        self.modify_bitasset(ctx, asset_id, |bitasset| {
            bitasset.settlement_price = Some(settlement_price);
            bitasset.settlement_fund = collateral_gathered;
            Ok(())
        })?;
        Ok(())
    }

    /// Re-examine call orders of the given synthetic after a feed change.
    ///
    /// Margin matching against the book belongs to the order evaluators; the
    /// maintenance core only owns the collapse check.
    pub(crate) fn check_call_orders(&self, ctx: &mut StateContext, asset_id: AssetId) -> Result<()> {
        self.check_for_blackswan(ctx, asset_id, true)?;
        Ok(())
    }

    /// Settle part of a force settlement against one call order.
    ///
    /// Consumes up to `max_settlement` of the order's balance at
    /// `match_price`, paying the holder collateral and burning the settled
    /// synthetic. Signals [ErrorId::BlackSwanDuringMatch] when the call
    /// cannot cover what it owes.
    pub(crate) fn match_settlement(
        &self,
        ctx: &mut StateContext,
        call_id: CallOrderId,
        settlement_id: SettlementId,
        match_price: &Price,
        max_settlement: AssetAmount,
    ) -> Result<AssetAmount> {
        let mut call = self.get_call_order(ctx.storage, call_id)?;
        let order = self.get_settlement_order(ctx.storage, settlement_id)?;
        let debt_asset = call.debt_asset;

        let settled = order
            .amount()
            .min(max_settlement)?
            .min(AssetAmount::new(call.debt, debt_asset))?;
        let collateral_paid = settled.checked_mul_price(match_price)?;

        chain_ensure!(
            collateral_paid.amount <= call.collateral,
            ErrorId::BlackSwanDuringMatch,
            ErrorDomain::Settlement,
            "call {call_id} owes {collateral_paid} but holds only {} collateral",
            call.collateral
        );
        let remaining_debt = call.debt - settled.amount;
        let remaining_collateral = call.collateral - collateral_paid.amount;
        chain_ensure!(
            remaining_debt.is_zero() || !remaining_collateral.is_zero(),
            ErrorId::BlackSwanDuringMatch,
            ErrorDomain::Settlement,
            "matching would strip call {call_id} of collateral with {remaining_debt} debt left"
        );

        // Fill the call side
        self.call_order_remove(ctx.storage, &call);
        call.debt = remaining_debt;
        call.collateral = remaining_collateral;
        if call.debt.is_zero() {
            if !call.collateral.is_zero() {
                self.credit_balance(
                    ctx,
                    &call.borrower,
                    AssetAmount::new(call.collateral, call.collateral_asset),
                )?;
            }
        } else {
            call.call_price = call.collateralization()?;
            self.call_order_save(ctx.storage, &call)?;
        }

        // Fill the settlement side: the holder receives collateral, the
        // escrowed synthetic is destroyed
        self.credit_balance(ctx, &order.owner, collateral_paid)?;
        self.burn_supply(ctx, settled)?;
        self.settlement_fill(ctx, settlement_id, settled.amount)?;

        Ok(settled)
    }
}
