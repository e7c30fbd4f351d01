//! Convenience re-exports for downstream crates.
#![allow(missing_docs)]

pub use crate::asset::{AssetAmount, MAX_ASSET_SUPPLY};
pub use crate::diagnostics::Diagnostics;
pub use crate::error::{ChainError, ErrorDomain, ErrorId};
pub use crate::event::ChainEventExt;
pub use crate::ids::{
    AssetId, CallOrderId, OrderId, PermissionId, ProposalId, SettlementId, WitnessId,
};
pub use crate::namespace;
pub use crate::price::{AssetPairKey, Price, PriceKey};
pub use crate::time::{Duration, Timestamp};
pub use crate::{chain_anyhow, chain_bail, chain_ensure};

pub use anyhow::{anyhow, bail, Context, Result};
pub use cosmwasm_schema::cw_serde;
pub use cosmwasm_std::{Decimal256, Event, Order, Storage, Uint128, Uint256, Uint64};
pub use cw_storage_plus::{Bound, Item, Map, PrefixBound};
pub use std::fmt::Display;
pub use std::str::FromStr;
