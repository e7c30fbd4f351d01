//! Shared primitives for the gravity chain core: typed object ids, exact
//! rational prices, timestamps on the block slot grid, the error taxonomy,
//! storage namespaces, and the diagnostics sink.
//!
//! Nothing in this crate touches ledger state; it only defines the vocabulary
//! the `gravity-chain` crate speaks.

#![deny(missing_docs)]

pub mod asset;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod ids;
pub mod namespace;
pub mod prelude;
pub mod price;
pub mod time;
