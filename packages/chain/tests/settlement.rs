mod common;

use common::{price, TestChain};
use gravity_chain::state::{BitAssetOptions, PriceFeed};
use shared::prelude::*;

fn bitasset_options(backing: AssetId, volume_pct_bps: u32) -> BitAssetOptions {
    BitAssetOptions {
        short_backing_asset: backing,
        feed_lifetime_seconds: 86_400,
        minimum_feeds: 1,
        force_settlement_delay_seconds: 0,
        force_settlement_offset_percent: 0,
        max_force_settlement_volume_percent: volume_pct_bps,
    }
}

fn feed_at_parity(gusd: AssetId) -> PriceFeed {
    PriceFeed {
        settlement_price: price(100, gusd, 100, AssetId::core()),
        core_exchange_rate: None,
        maintenance_collateral_ratio: 17_500,
        maximum_short_squeeze_ratio: 11_000,
    }
}

#[test]
fn settlement_volume_is_capped_per_asset() {
    let mut chain = TestChain::new(2, &[("shorty", 2_000_000), ("feeder", 0)], |_| {});
    let core = AssetId::core();

    // 1% volume cap over a supply of 1,000,000
    let gusd = chain
        .with_ctx(|state, ctx| {
            let gusd = state.create_asset(ctx, "GUSD", 0, Some(bitasset_options(core, 100)))?;
            state.publish_feed(ctx, "feeder", gusd, feed_at_parity(gusd))?;
            state.create_call_order(
                ctx,
                "shorty",
                AssetAmount::new(2_000_000u128, core),
                AssetAmount::new(1_000_000u128, gusd),
                None,
            )?;
            // Five settlement requests of 4000 each
            for _ in 0..5 {
                state.create_settlement_order(
                    ctx,
                    "shorty",
                    AssetAmount::new(4_000u128, gusd),
                )?;
            }
            Ok(gusd)
        })
        .unwrap();

    let block = chain.block_at(1, 0, 3);
    chain.apply(&block).unwrap();

    let state = chain.state();
    let bitasset = state.get_bitasset(&chain.store, gusd).unwrap().unwrap();
    assert_eq!(bitasset.force_settled_volume, Uint128::new(10_000));

    // Two orders fully settled, the third partially, the rest untouched
    assert!(state
        .get_settlement_order(&chain.store, SettlementId::new(1))
        .is_err());
    assert!(state
        .get_settlement_order(&chain.store, SettlementId::new(2))
        .is_err());
    let third = state
        .get_settlement_order(&chain.store, SettlementId::new(3))
        .unwrap();
    assert_eq!(third.balance, Uint128::new(2_000));
    for id in [4u64, 5] {
        let order = state
            .get_settlement_order(&chain.store, SettlementId::new(id))
            .unwrap();
        assert_eq!(order.balance, Uint128::new(4_000));
    }

    // Settled synthetic is burned; the holder received collateral at parity
    let supply = state.get_asset_dynamic(&chain.store, gusd).unwrap();
    assert_eq!(supply.current_supply, Uint128::new(990_000));
    assert_eq!(chain.balance("shorty", core), 10_000);

    let call = state
        .least_collateralized_call(&chain.store, gusd)
        .unwrap()
        .unwrap();
    assert_eq!(call.debt, Uint128::new(990_000));
    assert_eq!(call.collateral, Uint128::new(1_990_000));
}

#[test]
fn volume_window_reset_allows_further_settlement() {
    let mut chain = TestChain::new(2, &[("shorty", 2_000_000), ("feeder", 0)], |_| {});
    let core = AssetId::core();

    let gusd = chain
        .with_ctx(|state, ctx| {
            let gusd = state.create_asset(ctx, "GUSD", 0, Some(bitasset_options(core, 100)))?;
            state.publish_feed(ctx, "feeder", gusd, feed_at_parity(gusd))?;
            state.create_call_order(
                ctx,
                "shorty",
                AssetAmount::new(2_000_000u128, core),
                AssetAmount::new(1_000_000u128, gusd),
                None,
            )?;
            state.create_settlement_order(ctx, "shorty", AssetAmount::new(15_000u128, gusd))?;
            Ok(gusd)
        })
        .unwrap();

    let block = chain.block_at(1, 0, 3);
    chain.apply(&block).unwrap();
    let bitasset = chain
        .state()
        .get_bitasset(&chain.store, gusd)
        .unwrap()
        .unwrap();
    assert_eq!(bitasset.force_settled_volume, Uint128::new(10_000));

    // A new maintenance interval opens the window again
    chain
        .with_ctx(|state, ctx| state.reset_force_settlement_volumes(ctx))
        .unwrap();
    let block = chain.block_at(2, 1, 6);
    chain.apply(&block).unwrap();

    let state = chain.state();
    assert!(state
        .get_settlement_order(&chain.store, SettlementId::new(1))
        .is_err());
    let bitasset = state.get_bitasset(&chain.store, gusd).unwrap().unwrap();
    assert_eq!(bitasset.force_settled_volume, Uint128::new(5_000));
}

#[test]
fn settlement_without_a_feed_is_cancelled() {
    let mut chain = TestChain::new(1, &[("shorty", 10_000)], |_| {});
    let core = AssetId::core();

    // The feed lives two seconds; the settlement comes due after it is gone
    let mut options = bitasset_options(core, 100);
    options.feed_lifetime_seconds = 2;
    options.force_settlement_delay_seconds = 10;

    let gusd = chain
        .with_ctx(|state, ctx| {
            let gusd = state.create_asset(ctx, "GUSD", 0, Some(options))?;
            state.publish_feed(ctx, "feeder", gusd, feed_at_parity(gusd))?;
            state.create_call_order(
                ctx,
                "shorty",
                AssetAmount::new(1_000u128, core),
                AssetAmount::new(500u128, gusd),
                None,
            )?;
            state.create_settlement_order(ctx, "shorty", AssetAmount::new(100u128, gusd))?;
            Ok(gusd)
        })
        .unwrap();

    // First block expires the feed; the settlement is not yet due
    let block = chain.block_at(1, 0, 3);
    chain.apply(&block).unwrap();
    let bitasset = chain
        .state()
        .get_bitasset(&chain.store, gusd)
        .unwrap()
        .unwrap();
    assert!(bitasset.current_feed.is_none());

    // Second block: the order is due but there is nothing to price it with
    let block = chain.block_at(2, 0, 12);
    chain.apply(&block).unwrap();

    let state = chain.state();
    // Cancelled with a full refund, not settled
    assert!(state
        .get_settlement_order(&chain.store, SettlementId::new(1))
        .is_err());
    assert_eq!(chain.balance("shorty", gusd), 500);
}

#[test]
fn settlements_of_a_globally_settled_asset_are_voided() {
    let mut chain = TestChain::new(1, &[("shorty", 10_000), ("feeder", 0)], |_| {});
    let core = AssetId::core();

    let gusd = chain
        .with_ctx(|state, ctx| {
            let gusd = state.create_asset(ctx, "GUSD", 0, Some(bitasset_options(core, 100)))?;
            state.publish_feed(ctx, "feeder", gusd, feed_at_parity(gusd))?;
            state.create_call_order(
                ctx,
                "shorty",
                AssetAmount::new(1_000u128, core),
                AssetAmount::new(500u128, gusd),
                None,
            )?;
            state.create_settlement_order(ctx, "shorty", AssetAmount::new(100u128, gusd))?;
            state.globally_settle_asset(ctx, gusd, price(100, gusd, 100, core))?;
            Ok(gusd)
        })
        .unwrap();

    let block = chain.block_at(1, 0, 3);
    chain.apply(&block).unwrap();

    let state = chain.state();
    assert!(state
        .get_settlement_order(&chain.store, SettlementId::new(1))
        .is_err());
    // The escrowed balance came back untouched
    assert_eq!(chain.balance("shorty", gusd), 500);
}
