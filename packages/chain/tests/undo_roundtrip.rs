mod common;

use common::{price, TestChain, GENESIS_SECONDS};
use cosmwasm_std::{Order as IterOrder, Record, Storage};
use gravity_chain::state::apply_block;
use gravity_chain::undo::UndoLog;
use shared::prelude::*;

fn dump(store: &dyn Storage) -> Vec<Record> {
    store.range(None, None, IterOrder::Ascending).collect()
}

#[test]
fn applying_and_unwinding_a_block_is_bit_identical() {
    let mut chain = TestChain::new(3, &[("seller", 1_000)], |params| {
        params.fee_schedule.limit_order_cancel = Uint128::new(20);
    });
    let core = AssetId::core();

    // Seed work for the maintenance pass: an order that will expire and a
    // permission that will lapse
    chain
        .with_ctx(|state, ctx| {
            let iou = state.create_asset(ctx, "IOU", 0, None)?;
            state.place_limit_order(
                ctx,
                "seller",
                price(100, core, 100, iou),
                Uint128::new(100),
                Timestamp::from_seconds(GENESIS_SECONDS + 4),
                Uint128::new(5),
            )?;
            state.create_withdraw_permission(
                ctx,
                "seller",
                "witness-0",
                Timestamp::from_seconds(GENESIS_SECONDS + 4),
            )?;
            Ok(())
        })
        .unwrap();

    let before = dump(&chain.store);
    let block = chain.block_at(1, 1, 6);

    let mut undo = UndoLog::new(8);
    let events = apply_block(&mut chain.store, &mut undo, &block).unwrap();
    let info = events
        .iter()
        .find(|e| e.ty == "block-info")
        .expect("maintenance emits a block-info event");
    assert_eq!(info.u64_attr("block_num").unwrap(), 1);
    assert_eq!(info.u64_attr("missed").unwrap(), 1);

    let after = dump(&chain.store);
    assert_ne!(before, after, "maintenance should have mutated state");
    assert_eq!(undo.len(), 1);

    assert_eq!(undo.undo_head(&mut chain.store), Some(1));
    assert_eq!(dump(&chain.store), before);
}

#[test]
fn failed_maintenance_leaves_storage_untouched() {
    let mut chain = TestChain::new(3, &[], |_| {});
    let before = dump(&chain.store);

    // A block signed by a witness that does not exist fails partway through
    let mut block = chain.block_at(1, 0, 3);
    block.witness = WitnessId::new(99);

    let mut undo = UndoLog::new(8);
    assert!(apply_block(&mut chain.store, &mut undo, &block).is_err());
    assert!(undo.is_empty());
    assert_eq!(dump(&chain.store), before);
}

#[test]
fn retention_window_follows_head_minus_irreversible() {
    let mut chain = TestChain::new(1, &[], |_| {});
    let mut undo = UndoLog::new(64);

    for number in 1..=5u32 {
        let block = chain.block_at(number, 0, number as u64 * 3);
        apply_block(&mut chain.store, &mut undo, &block).unwrap();
    }

    // A single witness confirms every block immediately, so everything up to
    // the head is irreversible and the window stays at one frame
    let dgs = chain.state().get_dynamic(&chain.store).unwrap();
    assert_eq!(dgs.last_irreversible_block_num, 5);
    assert_eq!(undo.len(), 1);
}
