//! The exact rational price type used by the market maintenance routines.
//!
//! A [Price] is the ratio between two asset amounts. It is never reduced and
//! never rounded; all comparisons cross-multiply into 256-bit intermediates so
//! that two prices compare exactly, and all amount conversions truncate toward
//! zero. Ordering between prices of different asset pairs groups by the pair
//! first, which is what lets a single ordered index hold every market.
use crate::asset::{AssetAmount, MAX_ASSET_SUPPLY};
use crate::chain_bail;
use crate::error::{ErrorDomain, ErrorId};
use crate::ids::AssetId;
use anyhow::Result;
use cosmwasm_std::{StdError, StdResult, Uint128, Uint256};
use cw_storage_plus::{Key, KeyDeserialize, Prefixer, PrimaryKey};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The price of `base` in terms of `quote`, as a ratio of two asset amounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct Price {
    /// Amount on the base side of the ratio
    pub base: AssetAmount,
    /// Amount on the quote side of the ratio
    pub quote: AssetAmount,
}

impl Price {
    /// Construct a price, validating that the assets are distinct and both
    /// amounts are nonzero.
    pub fn new(base: AssetAmount, quote: AssetAmount) -> Result<Self> {
        crate::chain_ensure!(
            base.asset_id != quote.asset_id,
            ErrorId::InvalidPrice,
            ErrorDomain::Market,
            "price must relate two distinct assets, got {} twice",
            base.asset_id
        );
        crate::chain_ensure!(
            !base.amount.is_zero() && !quote.amount.is_zero(),
            ErrorId::InvalidPrice,
            ErrorDomain::Market,
            "price amounts must be nonzero: {base} / {quote}"
        );
        Ok(Price { base, quote })
    }

    /// The reciprocal price: base and quote swapped.
    pub fn inverted(self) -> Self {
        Price {
            base: self.quote,
            quote: self.base,
        }
    }

    /// The asset pair this price relates, base first.
    pub fn pair(&self) -> (AssetId, AssetId) {
        (self.base.asset_id, self.quote.asset_id)
    }

    /// The smallest representable price of `base` quoted in `quote`.
    ///
    /// Used as the lower bound of open-ended range scans over a price index.
    pub fn min(base: AssetId, quote: AssetId) -> Result<Self> {
        Price::new(
            AssetAmount::new(1u128, base),
            AssetAmount::new(MAX_ASSET_SUPPLY, quote),
        )
    }

    /// The greatest representable price of `base` quoted in `quote`.
    pub fn max(base: AssetId, quote: AssetId) -> Result<Self> {
        Price::new(
            AssetAmount::new(MAX_ASSET_SUPPLY, base),
            AssetAmount::new(1u128, quote),
        )
    }

    fn cross(&self, other: &Price) -> (Uint256, Uint256) {
        // self/other compared as base-per-quote ratios
        (
            self.base.amount.full_mul(other.quote.amount),
            other.base.amount.full_mul(self.quote.amount),
        )
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        if self.pair() != other.pair() {
            return false;
        }
        let (a, b) = self.cross(other);
        a == b
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        // Group by asset pair first so one ordered index can span all markets
        match self.pair().cmp(&other.pair()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        let (a, b) = self.cross(other);
        a.cmp(&b)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} / {}", self.base, self.quote)
    }
}

impl AssetAmount {
    /// Convert this amount through the given price, truncating toward zero.
    ///
    /// If the amount is denominated in the price's base asset the result is in
    /// the quote asset, and vice versa. Any other asset is an error.
    pub fn checked_mul_price(self, price: &Price) -> Result<AssetAmount> {
        let (num, den, result_asset) = if self.asset_id == price.base.asset_id {
            (price.quote.amount, price.base.amount, price.quote.asset_id)
        } else if self.asset_id == price.quote.asset_id {
            (price.base.amount, price.quote.amount, price.base.asset_id)
        } else {
            chain_bail!(
                ErrorId::InvalidPrice,
                ErrorDomain::Market,
                "cannot multiply {self} by unrelated price {price}"
            );
        };
        let wide = self.amount.full_mul(num);
        let out = wide
            .checked_div(Uint256::from(den))
            .map_err(|_| {
                crate::chain_anyhow!(
                    ErrorId::InvalidPrice,
                    ErrorDomain::Market,
                    "zero denominator multiplying {self} by {price}"
                )
            })?;
        let out: Uint128 = out.try_into().map_err(|_| {
            crate::chain_anyhow!(
                ErrorId::InvalidAmount,
                ErrorDomain::Market,
                "overflow multiplying {self} by {price}"
            )
        })?;
        Ok(AssetAmount::new(out, result_asset))
    }
}

/// A modified version of a [Price] used as a key in a `Map`.
///
/// Due to how cw-storage-plus works, we need to have a reference to a slice,
/// so we store the big-endian bytes of the ratio quantized to 128 fractional
/// bits. With amounts bounded by [MAX_ASSET_SUPPLY] the quantization step is
/// finer than the gap between any two distinct ratios, so key order equals
/// exact rational order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriceKey([u8; 32]);

impl<'a> PrimaryKey<'a> for PriceKey {
    type Prefix = ();
    type SubPrefix = ();
    type Suffix = Self;
    type SuperSuffix = Self;

    fn key(&self) -> Vec<Key> {
        vec![Key::Ref(&self.0)]
    }
}

impl Prefixer<'_> for PriceKey {
    fn prefix(&self) -> Vec<Key> {
        vec![Key::Ref(&self.0)]
    }
}

impl KeyDeserialize for PriceKey {
    type Output = PriceKey;

    const KEY_ELEMS: u16 = 1;

    fn from_vec(value: Vec<u8>) -> StdResult<Self::Output> {
        value
            .try_into()
            .map(PriceKey)
            .map_err(|_| StdError::generic_err("unable to convert value into PriceKey"))
    }
}

impl From<&Price> for PriceKey {
    fn from(price: &Price) -> Self {
        PriceKey(ratio_key(price.base.amount, price.quote.amount))
    }
}

impl PriceKey {
    /// Key for an explicit numerator/denominator ratio (e.g. a call order's
    /// collateral over debt).
    pub fn from_ratio(num: Uint128, den: Uint128) -> Self {
        PriceKey(ratio_key(num, den))
    }
}

fn ratio_key(num: Uint128, den: Uint128) -> [u8; 32] {
    let shifted = Uint256::from(num) << 128;
    let q = if den.is_zero() {
        Uint256::MAX
    } else {
        shifted / Uint256::from(den)
    };
    q.to_be_bytes()
}

/// An ordered pair of asset ids packed into a single fixed-width storage key.
///
/// Prefixes the per-market secondary indexes (orders by price, calls by
/// collateralization) so that one `Map` spans every market while range scans
/// stay confined to a single pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPairKey([u8; 16]);

impl AssetPairKey {
    /// Pack the given pair, base first.
    pub fn new(base: AssetId, quote: AssetId) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&base.u64().to_be_bytes());
        bytes[8..].copy_from_slice(&quote.u64().to_be_bytes());
        AssetPairKey(bytes)
    }
}

impl From<&Price> for AssetPairKey {
    fn from(price: &Price) -> Self {
        AssetPairKey::new(price.base.asset_id, price.quote.asset_id)
    }
}

impl<'a> PrimaryKey<'a> for AssetPairKey {
    type Prefix = ();
    type SubPrefix = ();
    type Suffix = Self;
    type SuperSuffix = Self;

    fn key(&self) -> Vec<Key> {
        vec![Key::Ref(&self.0)]
    }
}

impl Prefixer<'_> for AssetPairKey {
    fn prefix(&self) -> Vec<Key> {
        vec![Key::Ref(&self.0)]
    }
}

impl KeyDeserialize for AssetPairKey {
    type Output = AssetPairKey;

    const KEY_ELEMS: u16 = 1;

    fn from_vec(value: Vec<u8>) -> StdResult<Self::Output> {
        value
            .try_into()
            .map(AssetPairKey)
            .map_err(|_| StdError::generic_err("unable to convert value into AssetPairKey"))
    }
}
