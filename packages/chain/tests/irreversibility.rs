mod common;

use common::TestChain;
use shared::prelude::*;

fn set_confirmations(chain: &mut TestChain, confirmations: &[u32]) {
    chain
        .with_ctx(|state, ctx| {
            for (i, block_num) in confirmations.iter().enumerate() {
                state.record_witness_confirmation(ctx, WitnessId::new(i as u64), *block_num)?;
            }
            Ok(())
        })
        .unwrap();
}

fn last_irreversible(chain: &mut TestChain) -> u32 {
    chain
        .with_ctx(|state, ctx| state.update_last_irreversible_block(ctx))
        .unwrap();
    chain
        .state()
        .get_dynamic(&chain.store)
        .unwrap()
        .last_irreversible_block_num
}

#[test]
fn order_statistic_picks_the_covered_block() {
    // offset = floor(0.3 * 7) = 2; the third lowest confirmation wins
    let mut chain = TestChain::new(7, &[], |_| {});

    set_confirmations(&mut chain, &[10, 10, 10, 11, 12, 12, 12]);
    assert_eq!(last_irreversible(&mut chain), 10);

    set_confirmations(&mut chain, &[10, 10, 12, 12, 12, 12, 12]);
    assert_eq!(last_irreversible(&mut chain), 12);
}

#[test]
fn ten_witness_examples() {
    let mut chain = TestChain::new(10, &[], |_| {});

    set_confirmations(&mut chain, &[1, 1, 1, 2, 2, 2, 2, 2, 2, 2]);
    assert_eq!(last_irreversible(&mut chain), 2);

    let mut chain = TestChain::new(10, &[], |_| {});
    set_confirmations(&mut chain, &[1, 1, 1, 1, 1, 1, 1, 2, 2, 2]);
    assert_eq!(last_irreversible(&mut chain), 1);

    let mut chain = TestChain::new(10, &[], |_| {});
    set_confirmations(&mut chain, &[3, 3, 3, 3, 3, 3, 3, 3, 3, 3]);
    assert_eq!(last_irreversible(&mut chain), 3);
}

#[test]
fn never_decreases() {
    let mut chain = TestChain::new(7, &[], |_| {});

    set_confirmations(&mut chain, &[12; 7]);
    assert_eq!(last_irreversible(&mut chain), 12);

    // Confirmations regressing (e.g. witness set rotation) must not lower it
    set_confirmations(&mut chain, &[5; 7]);
    assert_eq!(last_irreversible(&mut chain), 12);
}

#[test]
fn unordered_confirmations_are_ranked_not_positional() {
    let mut chain = TestChain::new(7, &[], |_| {});

    set_confirmations(&mut chain, &[12, 10, 12, 10, 12, 10, 12]);
    assert_eq!(last_irreversible(&mut chain), 10);
}
