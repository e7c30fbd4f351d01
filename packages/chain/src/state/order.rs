use crate::block::LimitOrderCancelOperation;
use crate::prelude::*;
use crate::state::{State, StateContext};

/// Stores [LimitOrder]s by [OrderId]
const LIMIT_ORDERS: Map<OrderId, LimitOrder> = Map::new(namespace::LIMIT_ORDERS);
/// Indexes [LimitOrder]s by sell price within their market, greatest first
/// when scanned descending
const LIMIT_ORDERS_BY_PRICE: Map<(AssetPairKey, PriceKey, OrderId), ()> =
    Map::new(namespace::LIMIT_ORDERS_BY_PRICE);
/// Indexes [LimitOrder]s by expiration
const LIMIT_ORDERS_BY_EXPIRATION: Map<(Timestamp, OrderId), ()> =
    Map::new(namespace::LIMIT_ORDERS_BY_EXPIRATION);
/// Stores the last used [OrderId]
const LAST_ORDER_ID: Item<OrderId> = Item::new(namespace::LAST_ORDER_ID);

/// An open offer to sell one asset for another at a fixed price.
#[cw_serde]
pub struct LimitOrder {
    /// Identity of the order
    pub order_id: OrderId,
    /// The account that placed the order and receives refunds
    pub seller: String,
    /// Price asked: base is the asset being sold
    pub sell_price: Price,
    /// Remaining balance for sale, denominated in the sell asset
    pub for_sale: Uint128,
    /// When the order stops being valid
    pub expiration: Timestamp,
    /// Fee deferred from order creation, in the core asset. Caps the fee
    /// charged when the chain cancels the order on expiry.
    pub deferred_fee: Uint128,
}

impl LimitOrder {
    /// The remaining balance as an amount of the sell asset.
    pub fn amount_for_sale(&self) -> AssetAmount {
        AssetAmount::new(self.for_sale, self.sell_price.base.asset_id)
    }
}

impl State {
    /// Place a limit order, escrowing the sale balance from the seller.
    #[allow(clippy::too_many_arguments)]
    pub fn place_limit_order(
        &self,
        ctx: &mut StateContext,
        seller: &str,
        sell_price: Price,
        for_sale: Uint128,
        expiration: Timestamp,
        deferred_fee: Uint128,
    ) -> Result<OrderId> {
        chain_ensure!(
            !for_sale.is_zero(),
            ErrorId::InvalidAmount,
            ErrorDomain::Market,
            "cannot place an empty order"
        );
        let order_id = LAST_ORDER_ID
            .may_load(ctx.storage)?
            .map(|last| last.next())
            .unwrap_or_else(|| OrderId::new(1));
        LAST_ORDER_ID.save(ctx.storage, &order_id)?;

        self.debit_balance(
            ctx,
            seller,
            AssetAmount::new(for_sale, sell_price.base.asset_id),
        )?;

        let order = LimitOrder {
            order_id,
            seller: seller.to_owned(),
            sell_price,
            for_sale,
            expiration,
            deferred_fee,
        };
        LIMIT_ORDERS.save(ctx.storage, order_id, &order)?;
        LIMIT_ORDERS_BY_PRICE.save(
            ctx.storage,
            (
                AssetPairKey::from(&sell_price),
                PriceKey::from(&sell_price),
                order_id,
            ),
            &(),
        )?;
        LIMIT_ORDERS_BY_EXPIRATION.save(ctx.storage, (expiration, order_id), &())?;

        Ok(order_id)
    }

    /// Loads a single [LimitOrder] by [OrderId]
    pub fn limit_order_load(
        &self,
        store: &dyn Storage,
        order_id: OrderId,
    ) -> Result<LimitOrder> {
        LIMIT_ORDERS.load(store, order_id).map_err(|_| {
            chain_anyhow!(
                ErrorId::MissingObject,
                ErrorDomain::Market,
                "no limit order {order_id}"
            )
        })
    }

    /// The best-priced order selling `base` for `quote`, if any.
    ///
    /// Scans the boundary prices of the pair descending, so the first hit
    /// pays the most quote for the least base.
    pub(crate) fn best_limit_order(
        &self,
        store: &dyn Storage,
        base: AssetId,
        quote: AssetId,
    ) -> Result<Option<LimitOrder>> {
        let lowest_possible = Price::min(base, quote)?;
        let highest_possible = Price::max(base, quote)?;
        match LIMIT_ORDERS_BY_PRICE
            .sub_prefix(AssetPairKey::new(base, quote))
            .keys(
                store,
                Some(Bound::inclusive((
                    PriceKey::from(&lowest_possible),
                    OrderId::new(0),
                ))),
                Some(Bound::inclusive((
                    PriceKey::from(&highest_possible),
                    OrderId::new(u64::MAX),
                ))),
                Order::Descending,
            )
            .next()
        {
            None => Ok(None),
            Some(res) => {
                let (_, order_id) = res?;
                self.limit_order_load(store, order_id).map(Some)
            }
        }
    }

    pub(crate) fn limit_order_remove(
        &self,
        storage: &mut dyn Storage,
        order: &LimitOrder,
    ) -> Result<()> {
        LIMIT_ORDERS.remove(storage, order.order_id);
        LIMIT_ORDERS_BY_PRICE.remove(
            storage,
            (
                AssetPairKey::from(&order.sell_price),
                PriceKey::from(&order.sell_price),
                order.order_id,
            ),
        );
        LIMIT_ORDERS_BY_EXPIRATION.remove(storage, (order.expiration, order.order_id));
        Ok(())
    }

    /// Every order must appear in both secondary views, and the views must
    /// hold nothing else.
    #[cfg(feature = "sanity")]
    pub(crate) fn sanity_check_limit_orders(&self, store: &dyn Storage) -> Result<()> {
        let mut orders = 0usize;
        for res in LIMIT_ORDERS.range(store, None, None, Order::Ascending) {
            let (order_id, order) = res?;
            orders += 1;
            chain_ensure!(
                LIMIT_ORDERS_BY_PRICE.has(
                    store,
                    (
                        AssetPairKey::from(&order.sell_price),
                        PriceKey::from(&order.sell_price),
                        order_id,
                    ),
                ) && LIMIT_ORDERS_BY_EXPIRATION.has(store, (order.expiration, order_id)),
                ErrorId::IndexInvariantViolated,
                ErrorDomain::Market,
                "limit order {order_id} missing from a secondary view"
            );
        }
        let by_price = LIMIT_ORDERS_BY_PRICE
            .keys(store, None, None, Order::Ascending)
            .count();
        let by_expiration = LIMIT_ORDERS_BY_EXPIRATION
            .keys(store, None, None, Order::Ascending)
            .count();
        chain_ensure!(
            by_price == orders && by_expiration == orders,
            ErrorId::IndexInvariantViolated,
            ErrorDomain::Market,
            "stale limit order index entries: {orders} orders, {by_price} by price, \
             {by_expiration} by expiration"
        );
        Ok(())
    }

    /// Cancel expired limit orders.
    ///
    /// Each cancel is a chain-constructed operation paid by the seller. The
    /// schedule fee is capped at the order's deferred fee; without the cap an
    /// expired order too poor to pay the current schedule would wedge the
    /// sweep forever.
    pub(crate) fn clear_expired_limit_orders(&self, ctx: &mut StateContext) -> Result<()> {
        let head_time = self.head_block_time(ctx.storage)?;
        let cancel_context = OperationContext {
            skip_authority_check: true,
            skip_fee_schedule_check: true,
        };

        loop {
            let front = LIMIT_ORDERS_BY_EXPIRATION
                .keys(ctx.storage, None, None, Order::Ascending)
                .next()
                .transpose()?;
            let (expiration, order_id) = match front {
                Some(key) => key,
                None => break,
            };
            if expiration > head_time {
                break;
            }

            let order = self.limit_order_load(ctx.storage, order_id)?;
            let mut canceler = LimitOrderCancelOperation {
                fee_paying_account: order.seller.clone(),
                order: order_id,
                fee: AssetAmount::zero(AssetId::core()),
            };
            canceler.fee = self
                .params
                .fee_schedule
                .calculate_fee(&Operation::LimitOrderCancel(canceler.clone()));
            if canceler.fee.amount > order.deferred_fee {
                // Cap auto-cancel fees at deferred_fee to avoid a hung chain
                canceler.fee = AssetAmount::new(order.deferred_fee, AssetId::core());
            }
            // The fee is set by the chain itself, so the schedule check is
            // skipped when applying
            self.apply_operation(
                ctx,
                cancel_context,
                &Operation::LimitOrderCancel(canceler),
            )?;
        }
        Ok(())
    }
}
