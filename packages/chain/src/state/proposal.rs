use crate::prelude::*;
use crate::state::{State, StateContext};
use crate::undo::UndoSession;

const PROPOSALS: Map<ProposalId, Proposal> = Map::new(namespace::PROPOSALS);
const PROPOSALS_BY_EXPIRATION: Map<(Timestamp, ProposalId), ()> =
    Map::new(namespace::PROPOSALS_BY_EXPIRATION);
const LAST_PROPOSAL_ID: Item<ProposalId> = Item::new(namespace::LAST_PROPOSAL_ID);

/// A bundle of operations awaiting approvals, executed at expiry if approved.
#[cw_serde]
pub struct Proposal {
    /// Identity of the proposal
    pub id: ProposalId,
    /// When the proposal executes or dies
    pub expiration_time: Timestamp,
    /// Accounts whose approval is required
    pub required_approvals: Vec<String>,
    /// Approvals granted so far
    pub available_approvals: Vec<String>,
    /// The operations to apply
    pub operations: Vec<Operation>,
}

impl State {
    /// Register a proposal.
    pub fn create_proposal(
        &self,
        ctx: &mut StateContext,
        expiration_time: Timestamp,
        required_approvals: Vec<String>,
        operations: Vec<Operation>,
    ) -> Result<ProposalId> {
        let id = LAST_PROPOSAL_ID
            .may_load(ctx.storage)?
            .map(|last| last.next())
            .unwrap_or_else(|| ProposalId::new(1));
        LAST_PROPOSAL_ID.save(ctx.storage, &id)?;

        let proposal = Proposal {
            id,
            expiration_time,
            required_approvals,
            available_approvals: Vec::new(),
            operations,
        };
        PROPOSALS.save(ctx.storage, id, &proposal)?;
        PROPOSALS_BY_EXPIRATION.save(ctx.storage, (expiration_time, id), &())?;
        Ok(id)
    }

    /// Load a proposal by id.
    pub fn get_proposal(&self, store: &dyn Storage, id: ProposalId) -> Result<Proposal> {
        PROPOSALS.load(store, id).map_err(|_| {
            chain_anyhow!(
                ErrorId::MissingObject,
                ErrorDomain::Proposal,
                "no proposal {id}"
            )
        })
    }

    /// Grant an account's approval.
    pub fn approve_proposal(
        &self,
        ctx: &mut StateContext,
        id: ProposalId,
        approver: &str,
    ) -> Result<()> {
        let mut proposal = self.get_proposal(ctx.storage, id)?;
        if !proposal.available_approvals.iter().any(|a| a == approver) {
            proposal.available_approvals.push(approver.to_owned());
            PROPOSALS.save(ctx.storage, id, &proposal)?;
        }
        Ok(())
    }

    /// Are all required approvals present?
    pub(crate) fn is_authorized_to_execute(&self, proposal: &Proposal) -> bool {
        proposal
            .required_approvals
            .iter()
            .all(|required| proposal.available_approvals.iter().any(|a| a == required))
    }

    fn proposal_remove(&self, storage: &mut dyn Storage, proposal: &Proposal) {
        PROPOSALS.remove(storage, proposal.id);
        PROPOSALS_BY_EXPIRATION.remove(storage, (proposal.expiration_time, proposal.id));
    }

    /// Apply a proposal's operations and remove it.
    ///
    /// The operations run inside a nested undo scope: either all of them land
    /// or none do.
    pub fn push_proposal(&self, ctx: &mut StateContext, proposal: &Proposal) -> Result<()> {
        let op_context = OperationContext {
            skip_authority_check: true,
            skip_fee_schedule_check: false,
        };

        let mut session = UndoSession::new(&mut *ctx.storage);
        let result: Result<()> = (|| {
            // Nested scope is muted; the sweeper emits its own summary events
            let mut subctx = StateContext::new_mute(&mut session);
            for op in &proposal.operations {
                self.apply_operation(&mut subctx, op_context, op)?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                drop(session);
                self.proposal_remove(ctx.storage, proposal);
                Ok(())
            }
            Err(e) => {
                session.revert();
                Err(e)
            }
        }
    }

    /// Execute or drop proposals whose expiration has arrived.
    pub fn clear_expired_proposals(&self, ctx: &mut StateContext) -> Result<()> {
        let head_time = self.head_block_time(ctx.storage)?;
        loop {
            let front = PROPOSALS_BY_EXPIRATION
                .keys(ctx.storage, None, None, Order::Ascending)
                .next()
                .transpose()?;
            let (expiration, id) = match front {
                Some(key) => key,
                None => break,
            };
            if expiration > head_time {
                break;
            }

            let proposal = PROPOSALS.load(ctx.storage, id)?;
            if self.is_authorized_to_execute(&proposal) {
                match self.push_proposal(ctx, &proposal) {
                    Ok(()) => continue,
                    Err(e) => {
                        // Failure to execute must not stall the sweep; log
                        // and drop the proposal
                        ctx.diagnostics_mut().add_event(
                            Event::new("proposal-failed")
                                .add_attribute("proposal", id.to_string())
                                .add_attribute("error", format!("{e:#}")),
                        );
                    }
                }
            }
            self.proposal_remove(ctx.storage, &proposal);
        }
        Ok(())
    }
}
