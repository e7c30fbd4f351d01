mod common;

use common::TestChain;
use proptest::prelude::*;
use shared::prelude::*;

proptest! {
    /// Price-key byte order must agree with exact rational comparison,
    /// otherwise the ordered indexes would disagree across nodes.
    #[test]
    fn price_key_order_matches_price_order(
        (ab, aq, bb, bq) in (1u64..1_000_000, 1u64..1_000_000, 1u64..1_000_000, 1u64..1_000_000)
    ) {
        let base = AssetId::new(1);
        let quote = AssetId::new(0);
        let a = Price::new(
            AssetAmount::new(ab as u128, base),
            AssetAmount::new(aq as u128, quote),
        ).unwrap();
        let b = Price::new(
            AssetAmount::new(bb as u128, base),
            AssetAmount::new(bq as u128, quote),
        ).unwrap();
        let ka = PriceKey::from(&a);
        let kb = PriceKey::from(&b);
        prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
    }

    /// Applying blocks over arbitrary slot gaps: the absolute slot counter
    /// advances by exactly missed + 1, and the low bitmap bits replay the
    /// fill pattern.
    #[test]
    fn aslot_and_bitmap_replay_the_fill_pattern(gaps in prop::collection::vec(0u64..6, 1..12)) {
        let mut chain = TestChain::new(5, &[], |_| {});

        let mut slot = 0u64;
        let mut expected_bitmap: u64 = 0;
        for (i, gap) in gaps.iter().enumerate() {
            slot += gap + 1;
            let witness = slot % 5;
            let block = chain.block_at(i as u32 + 1, witness, slot * 3);
            chain.apply(&block).unwrap();

            expected_bitmap = if *gap >= 64 {
                0
            } else {
                ((expected_bitmap << 1) | 1) << gap
            };
            let dgs = chain.state().get_dynamic(&chain.store).unwrap();
            prop_assert_eq!(dgs.current_aslot, slot);
            prop_assert_eq!(dgs.recent_slots_filled, expected_bitmap);
        }
    }

    /// The irreversibility rank statistic equals its defining property: the
    /// chosen block is confirmed by at least a threshold fraction of
    /// witnesses, and no higher block is.
    #[test]
    fn irreversible_rank_matches_definition(
        confirmations in prop::collection::vec(0u32..20, 3..9)
    ) {
        let n = confirmations.len();
        let mut chain = TestChain::new(n as u64, &[], |_| {});
        chain.with_ctx(|state, ctx| {
            for (i, block_num) in confirmations.iter().enumerate() {
                state.record_witness_confirmation(ctx, WitnessId::new(i as u64), *block_num)?;
            }
            state.update_last_irreversible_block(ctx)
        }).unwrap();

        let lib = chain
            .state()
            .get_dynamic(&chain.store)
            .unwrap()
            .last_irreversible_block_num;

        let mut sorted = confirmations.clone();
        sorted.sort_unstable();
        let offset = (10_000 - 7_000) * n / 10_000;
        prop_assert_eq!(lib, sorted[offset]);

        // Defining property: at least 70% of witnesses confirmed a block at
        // or past the chosen one
        let covering = confirmations.iter().filter(|c| **c >= lib).count();
        prop_assert!(covering * 10_000 >= n * 7_000);
    }
}
