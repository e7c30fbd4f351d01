mod common;

use common::{price, TestChain, GENESIS_SECONDS};
use gravity_chain::block::{Operation, TransferOperation};
use shared::prelude::*;

fn expires_at(offset_seconds: u64) -> Timestamp {
    Timestamp::from_seconds(GENESIS_SECONDS + offset_seconds)
}

fn transfer(from: &str, to: &str, amount: u128) -> Operation {
    Operation::Transfer(TransferOperation {
        from: from.to_owned(),
        to: to.to_owned(),
        amount: AssetAmount::new(amount, AssetId::core()),
        fee: AssetAmount::zero(AssetId::core()),
    })
}

#[test]
fn expired_limit_order_fee_is_capped_at_deferred_fee() {
    let mut chain = TestChain::new(1, &[("seller", 1000)], |params| {
        params.fee_schedule.limit_order_cancel = Uint128::new(20);
    });
    let core = AssetId::core();

    let iou = chain
        .with_ctx(|state, ctx| state.create_asset(ctx, "IOU", 0, None))
        .unwrap();

    let order_id = chain
        .with_ctx(|state, ctx| {
            state.place_limit_order(
                ctx,
                "seller",
                price(100, core, 100, iou),
                Uint128::new(100),
                expires_at(4),
                Uint128::new(5),
            )
        })
        .unwrap();
    assert_eq!(chain.balance("seller", core), 900);

    let block = chain.block_at(1, 0, 6);
    chain.apply(&block).unwrap();

    // The order is gone and the seller paid 5, not the schedule's 20
    assert!(chain
        .state()
        .limit_order_load(&chain.store, order_id)
        .is_err());
    assert_eq!(chain.balance("seller", core), 995);
}

#[test]
fn cheap_schedule_fee_is_charged_in_full() {
    let mut chain = TestChain::new(1, &[("seller", 1000)], |params| {
        params.fee_schedule.limit_order_cancel = Uint128::new(3);
    });
    let core = AssetId::core();

    let iou = chain
        .with_ctx(|state, ctx| state.create_asset(ctx, "IOU", 0, None))
        .unwrap();
    chain
        .with_ctx(|state, ctx| {
            state.place_limit_order(
                ctx,
                "seller",
                price(100, core, 100, iou),
                Uint128::new(100),
                expires_at(4),
                Uint128::new(5),
            )
        })
        .unwrap();

    let block = chain.block_at(1, 0, 6);
    chain.apply(&block).unwrap();
    assert_eq!(chain.balance("seller", core), 997);
}

#[test]
fn unexpired_orders_survive_the_sweep() {
    let mut chain = TestChain::new(1, &[("seller", 1000)], |_| {});
    let core = AssetId::core();

    let iou = chain
        .with_ctx(|state, ctx| state.create_asset(ctx, "IOU", 0, None))
        .unwrap();
    let order_id = chain
        .with_ctx(|state, ctx| {
            state.place_limit_order(
                ctx,
                "seller",
                price(100, core, 100, iou),
                Uint128::new(100),
                expires_at(1_000),
                Uint128::new(5),
            )
        })
        .unwrap();

    let block = chain.block_at(1, 0, 6);
    chain.apply(&block).unwrap();
    assert!(chain
        .state()
        .limit_order_load(&chain.store, order_id)
        .is_ok());
}

#[test]
fn replayed_transaction_id_is_rejected_inside_the_window() {
    let mut chain = TestChain::new(1, &[("alice", 100), ("bob", 0)], |_| {});

    let mut block1 = chain.block_at(1, 0, 3);
    let mut tx = chain.tx(vec![transfer("alice", "bob", 10)]);
    tx.expiration = expires_at(1_000);
    block1.transactions.push(tx.clone());
    chain.apply(&block1).unwrap();

    let mut block2 = chain.block_at(2, 0, 6);
    block2.transactions.push(tx);
    assert!(chain.apply(&block2).is_err());
}

#[test]
fn transaction_dedup_entries_expire_strictly_after_their_window() {
    let mut chain = TestChain::new(1, &[("alice", 100), ("bob", 0)], |_| {});

    let mut block1 = chain.block_at(1, 0, 3);
    let mut tx = chain.tx(vec![transfer("alice", "bob", 10)]);
    tx.expiration = expires_at(6);
    block1.transactions.push(tx.clone());
    chain.apply(&block1).unwrap();

    // At head time equal to the expiration the entry is still retained
    let block2 = chain.block_at(2, 0, 6);
    chain.apply(&block2).unwrap();

    // Strictly past it the entry is swept and the id is usable again
    let mut block3 = chain.block_at(3, 0, 9);
    block3.transactions.push(tx);
    chain.apply(&block3).unwrap();
}

#[test]
fn authorized_proposal_executes_on_expiry() {
    let mut chain = TestChain::new(1, &[("alice", 100), ("bob", 0)], |params| {
        params.fee_schedule.transfer = Uint128::zero();
    });

    let proposal_id = chain
        .with_ctx(|state, ctx| {
            state.create_proposal(
                ctx,
                expires_at(4),
                vec!["alice".to_owned()],
                vec![transfer("alice", "bob", 40)],
            )
        })
        .unwrap();
    chain
        .with_ctx(|state, ctx| state.approve_proposal(ctx, proposal_id, "alice"))
        .unwrap();

    let block = chain.block_at(1, 0, 6);
    chain.apply(&block).unwrap();

    assert_eq!(chain.balance("alice", AssetId::core()), 60);
    assert_eq!(chain.balance("bob", AssetId::core()), 40);
    assert!(chain
        .state()
        .get_proposal(&chain.store, proposal_id)
        .is_err());
}

#[test]
fn unauthorized_proposal_is_dropped_without_effect() {
    let mut chain = TestChain::new(1, &[("alice", 100), ("bob", 0)], |params| {
        params.fee_schedule.transfer = Uint128::zero();
    });

    let proposal_id = chain
        .with_ctx(|state, ctx| {
            state.create_proposal(
                ctx,
                expires_at(4),
                vec!["alice".to_owned()],
                vec![transfer("alice", "bob", 40)],
            )
        })
        .unwrap();

    let block = chain.block_at(1, 0, 6);
    chain.apply(&block).unwrap();

    assert_eq!(chain.balance("alice", AssetId::core()), 100);
    assert!(chain
        .state()
        .get_proposal(&chain.store, proposal_id)
        .is_err());
}

#[test]
fn failing_proposal_is_logged_and_dropped() {
    let mut chain = TestChain::new(1, &[("alice", 100), ("bob", 0)], |params| {
        params.fee_schedule.transfer = Uint128::zero();
    });

    let proposal_id = chain
        .with_ctx(|state, ctx| {
            let id = state.create_proposal(
                ctx,
                expires_at(4),
                vec!["alice".to_owned()],
                // More than alice holds: the proposal cannot apply
                vec![transfer("alice", "bob", 1_000)],
            )?;
            state.approve_proposal(ctx, id, "alice")?;
            Ok(id)
        })
        .unwrap();

    // The sweep itself must not fail
    let block = chain.block_at(1, 0, 6);
    chain.apply(&block).unwrap();

    assert_eq!(chain.balance("alice", AssetId::core()), 100);
    assert_eq!(chain.balance("bob", AssetId::core()), 0);
    assert!(chain
        .state()
        .get_proposal(&chain.store, proposal_id)
        .is_err());
}

#[test]
fn withdraw_permissions_lapse() {
    let mut chain = TestChain::new(1, &[("alice", 100), ("bob", 0)], |_| {});

    let (expired, live) = chain
        .with_ctx(|state, ctx| {
            let expired =
                state.create_withdraw_permission(ctx, "alice", "bob", expires_at(4))?;
            let live =
                state.create_withdraw_permission(ctx, "alice", "bob", expires_at(1_000))?;
            Ok((expired, live))
        })
        .unwrap();

    let block = chain.block_at(1, 0, 6);
    chain.apply(&block).unwrap();

    let state = chain.state();
    assert!(state.get_withdraw_permission(&chain.store, expired).is_err());
    assert!(state.get_withdraw_permission(&chain.store, live).is_ok());
}
