mod common;

use common::TestChain;
use gravity_chain::block::{Operation, TransferOperation};
use shared::prelude::*;

fn transfer(from: &str, to: &str, amount: u128) -> Operation {
    Operation::Transfer(TransferOperation {
        from: from.to_owned(),
        to: to.to_owned(),
        amount: AssetAmount::new(amount, AssetId::core()),
        fee: AssetAmount::zero(AssetId::core()),
    })
}

fn activity_chain() -> TestChain {
    TestChain::new(
        1,
        &[("alice", 1_000), ("bob", 1_000), ("carol", 1_000)],
        |params| {
            params.activity_period = 2;
            params.account_amount_threshold = Decimal256::zero();
            params.transaction_amount_threshold = Decimal256::zero();
            params.token_usd_rate = Decimal256::one();
            params.interlevel_weight = Decimal256::zero();
        },
    )
}

fn index_of(chain: &TestChain, name: &str) -> Decimal256 {
    chain
        .state()
        .get_account(&chain.store, name)
        .unwrap()
        .activity_index
}

#[test]
fn transfer_flows_concentrate_the_index_on_the_sink() {
    let mut chain = activity_chain();

    let mut block1 = chain.block_at(1, 0, 3);
    let tx = chain.tx(vec![
        transfer("alice", "carol", 100),
        transfer("bob", "carol", 100),
        transfer("carol", "alice", 10),
    ]);
    block1.transactions.push(tx);
    chain.apply(&block1).unwrap();

    // Nothing is computed until the period elapses
    assert!(index_of(&chain, "carol").is_zero());

    let block2 = chain.block_at(2, 0, 6);
    chain.apply(&block2).unwrap();

    let alice = index_of(&chain, "alice");
    let bob = index_of(&chain, "bob");
    let carol = index_of(&chain, "carol");
    assert!(carol > alice);
    assert!(carol > bob);
    // Uninvolved accounts stay at zero
    assert!(index_of(&chain, "witness-0").is_zero());

    let total = alice + bob + carol;
    assert!(total <= Decimal256::one() + Decimal256::permille(1));
}

#[test]
fn indexes_reset_to_zero_when_the_window_empties() {
    let mut chain = activity_chain();

    let mut block1 = chain.block_at(1, 0, 3);
    let tx = chain.tx(vec![transfer("alice", "carol", 100)]);
    block1.transactions.push(tx);
    chain.apply(&block1).unwrap();

    let block2 = chain.block_at(2, 0, 6);
    chain.apply(&block2).unwrap();
    assert!(!index_of(&chain, "carol").is_zero());

    // Two more quiet blocks: the buffered window is pruned and the next
    // calculation sees no flow at all
    let block3 = chain.block_at(3, 0, 9);
    chain.apply(&block3).unwrap();
    let block4 = chain.block_at(4, 0, 12);
    chain.apply(&block4).unwrap();

    assert!(index_of(&chain, "carol").is_zero());
    assert!(index_of(&chain, "alice").is_zero());
}

#[test]
fn transfers_below_the_threshold_do_not_count() {
    let mut chain = TestChain::new(1, &[("alice", 1_000), ("bob", 1_000)], |params| {
        params.activity_period = 2;
        params.account_amount_threshold = Decimal256::zero();
        params.transaction_amount_threshold = Decimal256::from_ratio(50u128, 1u128);
        params.token_usd_rate = Decimal256::one();
    });

    let mut block1 = chain.block_at(1, 0, 3);
    let tx = chain.tx(vec![transfer("alice", "bob", 10)]);
    block1.transactions.push(tx);
    chain.apply(&block1).unwrap();

    let block2 = chain.block_at(2, 0, 6);
    chain.apply(&block2).unwrap();

    assert!(index_of(&chain, "alice").is_zero());
    assert!(index_of(&chain, "bob").is_zero());

    // The epoch aggregate saw the transfer but did not qualify it
    let epoch = chain.state().get_activity_epoch(&chain.store).unwrap();
    assert_eq!(epoch.transfers, 1);
    assert_eq!(epoch.get_activity(), 0);
}
