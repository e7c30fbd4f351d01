//! Typed numeric ids for ledger objects.
//!
//! Every object the core owns is addressed by a small integer id wrapped in a
//! distinct newtype so that an order id can never be passed where a witness id
//! is expected. Each id doubles as a storage key for its primary container and
//! as a component of secondary index keys.
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdResult, Uint64};
use cw_storage_plus::{IntKey, Key, KeyDeserialize, Prefixer, PrimaryKey};
use std::fmt;
use std::hash::Hash;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! object_id {
    ($(#[doc = $doc:expr])* $t:ident) => {
        $(#[doc = $doc])*
        #[cw_serde]
        #[derive(Copy, PartialOrd, Ord, Eq)]
        pub struct $t(Uint64);

        #[allow(clippy::derived_hash_with_manual_eq)]
        impl Hash for $t {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.u64().hash(state);
            }
        }

        impl $t {
            /// Construct a new value from a [u64].
            pub const fn new(x: u64) -> Self {
                $t(Uint64::new(x))
            }

            /// Get the underlying `u64` representation of the id.
            pub const fn u64(self) -> u64 {
                self.0.u64()
            }

            /// The id immediately following this one.
            pub fn next(self) -> Self {
                $t(Uint64::new(self.0.u64() + 1))
            }
        }

        impl<'a> PrimaryKey<'a> for $t {
            type Prefix = ();
            type SubPrefix = ();
            type Suffix = Self;
            type SuperSuffix = Self;

            fn key(&self) -> Vec<Key> {
                vec![Key::Val64(self.0.u64().to_cw_bytes())]
            }
        }

        impl<'a> Prefixer<'a> for $t {
            fn prefix(&self) -> Vec<Key> {
                vec![Key::Val64(self.0.u64().to_cw_bytes())]
            }
        }

        impl KeyDeserialize for $t {
            type Output = $t;

            const KEY_ELEMS: u16 = 1;

            #[inline(always)]
            fn from_vec(value: Vec<u8>) -> StdResult<Self::Output> {
                u64::from_vec(value).map(|x| $t(Uint64::new(x)))
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $t {
            type Err = ParseIntError;
            fn from_str(src: &str) -> Result<Self, ParseIntError> {
                src.parse().map(|x| $t(Uint64::new(x)))
            }
        }
    };
}

object_id! {
    /// A unique numeric id for each asset on the chain. The core asset is id 0.
    AssetId
}

object_id! {
    /// A unique numeric id for each block-producing witness.
    WitnessId
}

object_id! {
    /// A unique numeric id for each limit order.
    OrderId
}

object_id! {
    /// A unique numeric id for each call order (short position).
    CallOrderId
}

object_id! {
    /// A unique numeric id for each force settlement order.
    SettlementId
}

object_id! {
    /// A unique numeric id for each proposal.
    ProposalId
}

object_id! {
    /// A unique numeric id for each withdraw permission.
    PermissionId
}

impl AssetId {
    /// The core asset of the chain, created at genesis.
    pub const fn core() -> Self {
        AssetId::new(0)
    }

    /// Is this the core asset?
    pub fn is_core(self) -> bool {
        self.u64() == 0
    }
}
