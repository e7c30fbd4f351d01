//! The slice of a block the maintenance core consumes.
//!
//! Signature checks and operation evaluation happen before a block reaches
//! this crate; what arrives here is the already validated header plus the
//! operations the core itself needs to see (transfers for the activity index,
//! and the cancel operations the expiry sweeper constructs on its own).
use crate::prelude::*;

/// Identifier of a block, opaque to the core.
#[cw_serde]
#[derive(Eq, Hash)]
pub struct BlockId(pub String);

impl Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a transaction, used for deduplication retention.
#[cw_serde]
#[derive(Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub String);

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated block, as handed to `apply_block_maintenance`.
#[cw_serde]
pub struct Block {
    /// Height of this block
    pub number: u32,
    /// Identity of this block
    pub id: BlockId,
    /// Timestamp, always on the slot grid
    pub timestamp: Timestamp,
    /// The witness that produced the block
    pub witness: WitnessId,
    /// Transactions carried by the block
    pub transactions: Vec<Transaction>,
}

/// A transaction inside a block.
#[cw_serde]
pub struct Transaction {
    /// Identity used for dedup retention
    pub id: TransactionId,
    /// Instant after which the dedup entry may be dropped
    pub expiration: Timestamp,
    /// Operations carried by the transaction
    pub operations: Vec<Operation>,
}

/// Operations the core applies itself.
///
/// All other operation kinds are handled by external evaluators before the
/// block reaches maintenance; they are invisible here.
#[cw_serde]
pub enum Operation {
    /// Move an amount between two accounts. Feeds the activity index and is
    /// the only operation proposals may carry through this core.
    Transfer(TransferOperation),
    /// Cancel a limit order, refunding its balance. Constructed by the expiry
    /// sweeper with a fee capped at the order's deferred fee.
    LimitOrderCancel(LimitOrderCancelOperation),
}

/// Payload of [Operation::Transfer].
#[cw_serde]
pub struct TransferOperation {
    /// Sending account
    pub from: String,
    /// Receiving account
    pub to: String,
    /// Amount moved
    pub amount: AssetAmount,
    /// Fee paid by the sender, in the core asset
    pub fee: AssetAmount,
}

/// Payload of [Operation::LimitOrderCancel].
#[cw_serde]
pub struct LimitOrderCancelOperation {
    /// Account paying the cancel fee; must own the order
    pub fee_paying_account: String,
    /// The order being cancelled
    pub order: OrderId,
    /// Fee in the core asset. When the sweeper builds this operation the fee
    /// is already capped at the order's deferred fee.
    pub fee: AssetAmount,
}

/// Evaluation context for applying an operation.
///
/// The expiry sweepers apply operations the chain itself constructed, so they
/// skip the checks a user-submitted operation would have to pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationContext {
    /// Do not verify the acting account's authority
    pub skip_authority_check: bool,
    /// Accept the operation's fee as-is instead of re-deriving it from the
    /// fee schedule
    pub skip_fee_schedule_check: bool,
}
