use crate::prelude::*;
use crate::state::{State, StateContext};

const WITNESSES: Map<WitnessId, Witness> = Map::new(namespace::WITNESSES);

/// A block producer.
#[cw_serde]
pub struct Witness {
    /// Identity of the witness
    pub id: WitnessId,
    /// The account credited with witness pay
    pub witness_account: String,
    /// Absolute slot of the last block this witness signed
    pub last_aslot: u64,
    /// Height of the last block this witness signed; feeds the
    /// irreversibility statistic
    pub last_confirmed_block_num: u32,
    /// Scheduled slots this witness failed to fill
    pub total_missed: u64,
}

impl State {
    pub fn create_witness(
        &self,
        ctx: &mut StateContext,
        id: WitnessId,
        witness_account: &str,
    ) -> Result<()> {
        chain_ensure!(
            !WITNESSES.has(ctx.storage, id),
            ErrorId::Config,
            ErrorDomain::Chain,
            "witness {id} already exists"
        );
        chain_ensure!(
            self.has_account(ctx.storage, witness_account),
            ErrorId::MissingObject,
            ErrorDomain::Chain,
            "witness account {witness_account} does not exist"
        );
        WITNESSES.save(
            ctx.storage,
            id,
            &Witness {
                id,
                witness_account: witness_account.to_owned(),
                last_aslot: 0,
                last_confirmed_block_num: 0,
                total_missed: 0,
            },
        )?;
        Ok(())
    }

    pub fn get_witness(&self, store: &dyn Storage, id: WitnessId) -> Result<Witness> {
        WITNESSES.load(store, id).map_err(|_| {
            chain_anyhow!(ErrorId::MissingObject, ErrorDomain::Chain, "no witness {id}")
        })
    }

    pub(crate) fn modify_witness(
        &self,
        ctx: &mut StateContext,
        id: WitnessId,
        f: impl FnOnce(&mut Witness),
    ) -> Result<()> {
        let mut witness = self.get_witness(ctx.storage, id)?;
        f(&mut witness);
        WITNESSES.save(ctx.storage, id, &witness)?;
        Ok(())
    }

    /// The witness scheduled for the slot `slot_offset` slots past the head.
    ///
    /// The production schedule itself is computed elsewhere; this consumes it
    /// as a rotation of the active witness list over absolute slots.
    pub(crate) fn get_scheduled_witness(
        &self,
        store: &dyn Storage,
        slot_offset: u32,
    ) -> Result<WitnessId> {
        let active = &self.params.active_witnesses;
        chain_ensure!(
            !active.is_empty(),
            ErrorId::Config,
            ErrorDomain::Chain,
            "no active witnesses"
        );
        let aslot = self.get_dynamic(store)?.current_aslot;
        let index = (aslot + slot_offset as u64) % active.len() as u64;
        Ok(active[index as usize])
    }

    /// Pay the witness that signed the block and record its confirmation.
    pub fn update_signing_witness(&self, ctx: &mut StateContext, block: &Block) -> Result<()> {
        let dgs = self.get_dynamic(ctx.storage)?;
        let new_block_aslot =
            dgs.current_aslot + self.get_slot_at_time(ctx.storage, block.timestamp)? as u64;

        let witness_pay = self.params.witness_pay_per_block.min(dgs.witness_budget);

        self.modify_dynamic(ctx, |dgs| {
            dgs.witness_budget -= witness_pay;
        })?;

        let signing_witness = self.get_witness(ctx.storage, block.witness)?;
        self.deposit_witness_pay(ctx, &signing_witness, witness_pay)?;

        self.modify_witness(ctx, block.witness, |w| {
            w.last_aslot = new_block_aslot;
            w.last_confirmed_block_num = block.number;
        })?;

        Ok(())
    }

    fn deposit_witness_pay(
        &self,
        ctx: &mut StateContext,
        witness: &Witness,
        pay: Uint128,
    ) -> Result<()> {
        if pay.is_zero() {
            return Ok(());
        }
        self.credit_balance(
            ctx,
            &witness.witness_account,
            AssetAmount::new(pay, AssetId::core()),
        )
    }

    /// Record a confirmation outside normal block application, e.g. when
    /// syncing blocks below a checkpoint. Safe to follow with
    /// [State::update_last_irreversible_block].
    pub fn record_witness_confirmation(
        &self,
        ctx: &mut StateContext,
        id: WitnessId,
        block_num: u32,
    ) -> Result<()> {
        self.modify_witness(ctx, id, |w| {
            w.last_confirmed_block_num = block_num;
        })
    }

    /// Re-derive the last irreversible block from witness confirmations.
    ///
    /// With N active witnesses and threshold t, the block confirmed by the
    /// witness at ascending rank `floor((1 - t) * N)` is covered by at least
    /// `ceil(t * N)` confirmations. Never decreases.
    pub fn update_last_irreversible_block(&self, ctx: &mut StateContext) -> Result<()> {
        let active = &self.params.active_witnesses;
        chain_ensure!(
            !active.is_empty(),
            ErrorId::Config,
            ErrorDomain::Chain,
            "no active witnesses"
        );

        let mut confirmations = active
            .iter()
            .map(|id| {
                self.get_witness(ctx.storage, *id)
                    .map(|w| w.last_confirmed_block_num)
            })
            .collect::<Result<Vec<_>>>()?;

        let offset = ((PERCENT_100 - self.params.irreversible_threshold_bps as u64)
            * confirmations.len() as u64
            / PERCENT_100) as usize;

        confirmations.sort_unstable();
        let new_last_irreversible = confirmations[offset];

        let dgs = self.get_dynamic(ctx.storage)?;
        if new_last_irreversible > dgs.last_irreversible_block_num {
            self.modify_dynamic(ctx, |dgs| {
                dgs.last_irreversible_block_num = new_last_irreversible;
            })?;
        }
        Ok(())
    }
}
