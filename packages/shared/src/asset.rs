//! An amount of a specific asset.
use crate::error::{ErrorDomain, ErrorId};
use crate::ids::AssetId;
use anyhow::Result;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::Uint128;
use std::fmt;

/// The largest amount of any single asset that can ever exist.
///
/// Bounds the numerators and denominators of [crate::price::Price] so that all
/// cross-multiplied comparisons fit comfortably in 256 bits.
pub const MAX_ASSET_SUPPLY: Uint128 = Uint128::new(1_000_000_000_000_000);

/// An integer amount of a specific asset, in its smallest indivisible unit.
#[cw_serde]
#[derive(Copy, Eq)]
pub struct AssetAmount {
    /// Raw amount in satoshis of the asset
    pub amount: Uint128,
    /// Which asset this amount is denominated in
    pub asset_id: AssetId,
}

impl AssetAmount {
    /// Construct a new amount.
    pub fn new(amount: impl Into<Uint128>, asset_id: AssetId) -> Self {
        AssetAmount {
            amount: amount.into(),
            asset_id,
        }
    }

    /// A zero amount of the given asset.
    pub fn zero(asset_id: AssetId) -> Self {
        AssetAmount {
            amount: Uint128::zero(),
            asset_id,
        }
    }

    /// Is the raw amount zero?
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Add two amounts of the same asset.
    pub fn checked_add(self, rhs: AssetAmount) -> Result<AssetAmount> {
        self.require_same_asset(&rhs, "add")?;
        Ok(AssetAmount {
            amount: self.amount.checked_add(rhs.amount)?,
            asset_id: self.asset_id,
        })
    }

    /// Subtract two amounts of the same asset, failing on underflow.
    pub fn checked_sub(self, rhs: AssetAmount) -> Result<AssetAmount> {
        self.require_same_asset(&rhs, "sub")?;
        Ok(AssetAmount {
            amount: self.amount.checked_sub(rhs.amount)?,
            asset_id: self.asset_id,
        })
    }

    /// The smaller of two amounts of the same asset.
    pub fn min(self, rhs: AssetAmount) -> Result<AssetAmount> {
        self.require_same_asset(&rhs, "min")?;
        Ok(if rhs.amount < self.amount { rhs } else { self })
    }

    fn require_same_asset(&self, rhs: &AssetAmount, desc: &str) -> Result<()> {
        crate::chain_ensure!(
            self.asset_id == rhs.asset_id,
            ErrorId::InvalidAmount,
            ErrorDomain::Default,
            "asset mismatch in {desc}: {} vs {}",
            self.asset_id,
            rhs.asset_id
        );
        Ok(())
    }
}

impl fmt::Display for AssetAmount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.amount, self.asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_asset_arithmetic_rejected() {
        let a = AssetAmount::new(5u128, AssetId::core());
        let b = AssetAmount::new(3u128, AssetId::new(1));
        assert!(a.checked_add(b).is_err());
        assert!(a.checked_sub(b).is_err());
        assert!(a.min(b).is_err());
    }

    #[test]
    fn same_asset_arithmetic() {
        let a = AssetAmount::new(5u128, AssetId::core());
        let b = AssetAmount::new(3u128, AssetId::core());
        assert_eq!(a.checked_add(b).unwrap().amount.u128(), 8);
        assert_eq!(a.checked_sub(b).unwrap().amount.u128(), 2);
        assert_eq!(a.min(b).unwrap().amount.u128(), 3);
        assert!(b.checked_sub(a).is_err());
    }
}
