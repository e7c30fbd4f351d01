//! Deterministic per-block maintenance core of the gravity chain.
//!
//! Everything here runs after a block's operations have been applied: dynamic
//! global state advances, expired market artefacts are swept, force
//! settlements execute against the least collateralized shorts, feeds
//! refresh, irreversibility is re-derived from witness confirmations, and the
//! periodic activity/emission routines fire. Every routine is consensus
//! critical: given the same storage and the same block, every node produces
//! bit-identical results.

pub mod block;
pub mod constants;
pub mod prelude;
pub mod state;
pub mod undo;
