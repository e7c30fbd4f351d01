//! This is a centralized location for cw_storage Item storage keys and Map namespaces
#![allow(missing_docs)]

pub const PARAMETERS: &str = "a";
pub const DYNAMIC_STATE: &str = "b";
pub const WITNESSES: &str = "c";
pub const ACCOUNTS: &str = "d";
pub const BALANCES: &str = "e";
pub const ASSETS: &str = "f";
pub const ASSET_DYNAMIC: &str = "g";
pub const ASSETS_BY_TYPE: &str = "h";
pub const BITASSETS: &str = "i";
pub const LAST_ASSET_ID: &str = "j";
pub const LIMIT_ORDERS: &str = "k";
pub const LIMIT_ORDERS_BY_PRICE: &str = "l";
pub const LIMIT_ORDERS_BY_EXPIRATION: &str = "m";
pub const LAST_ORDER_ID: &str = "n";
pub const CALL_ORDERS: &str = "o";
pub const CALLS_BY_COLLATERAL: &str = "p";
pub const LAST_CALL_ID: &str = "q";
pub const SETTLEMENTS: &str = "r";
pub const SETTLEMENTS_BY_EXPIRATION: &str = "s";
pub const LAST_SETTLEMENT_ID: &str = "t";
pub const PROPOSALS: &str = "u";
pub const PROPOSALS_BY_EXPIRATION: &str = "v";
pub const LAST_PROPOSAL_ID: &str = "w";
pub const TRANSACTIONS: &str = "x";
pub const TRANSACTIONS_BY_EXPIRATION: &str = "y";
pub const WITHDRAW_PERMISSIONS: &str = "z";
pub const WITHDRAWS_BY_EXPIRATION: &str = "aa";
pub const LAST_PERMISSION_ID: &str = "ab";
pub const TRANSFER_BUFFER: &str = "ac";
pub const ACTIVITY_EPOCH: &str = "ad";
pub const LAST_ACTIVITY_BLOCK: &str = "ae";
pub const LAST_EMISSION_BLOCK: &str = "af";
pub const LAST_PEAK_ACTIVITY: &str = "ag";
pub const GENESIS_TIME: &str = "ah";
