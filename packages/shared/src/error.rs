//! Error handling helpers for the chain core
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A structured error raised by the chain core
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ChainError<T = ()> {
    /// Unique identifier for this error
    pub id: ErrorId,
    /// Where in the core the error came from
    pub domain: ErrorDomain,
    /// User friendly description
    pub description: String,
    /// Optional additional information
    pub data: Option<T>,
}

/// Unique identifier for an error within the chain core
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorId {
    /// The gap between head and last irreversible block exhausted the undo
    /// history. Fatal to the node; the operator must add a checkpoint.
    UndoHistoryExhausted,
    /// Black swan detected during a margin update that forbids triggering one.
    BlackSwanDisallowed,
    /// Black swan detected while matching a force settlement. Handled by
    /// cancelling the affected settlement order.
    BlackSwanDuringMatch,
    /// A proposal failed to apply on its expiration.
    ProposalExecutionFailed,
    /// An ordered index no longer agrees with its primary container.
    IndexInvariantViolated,
    InsufficientBalance,
    MissingObject,
    PriceNotFound,
    InvalidAmount,
    InvalidPrice,
    Auth,
    Conversion,
    Config,
    Any,
}

/// Source within the core for the error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ErrorDomain {
    Chain,
    Market,
    Settlement,
    Feed,
    Proposal,
    Activity,
    Emission,
    Default,
}

/// Generate a [ChainError] and then wrap it up in an anyhow error
#[macro_export]
macro_rules! chain_anyhow {
    ($id:expr, $domain:expr, $($t:tt)*) => {{
        anyhow::Error::new($crate::error::ChainError {
            id: $id,
            domain: $domain,
            description: format!($($t)*),
            data: None::<()>,
        })
    }};
}

/// Ensure a condition is true, otherwise returns from the function with an error.
#[macro_export]
macro_rules! chain_ensure {
    ($val:expr, $id:expr, $domain:expr, $($t:tt)*) => {{
        if !$val {
            return Err(anyhow::Error::new($crate::error::ChainError {
                id: $id,
                domain: $domain,
                description: format!($($t)*),
                data: None::<()>,
            }));
        }
    }};
}

/// Return early with the given chain error
#[macro_export]
macro_rules! chain_bail {
    ($id:expr, $domain:expr, $($t:tt)*) => {{
        return Err(anyhow::Error::new($crate::error::ChainError {
            id: $id,
            domain: $domain,
            description: format!($($t)*),
            data: None::<()>,
        }));
    }};
}

impl<T: Serialize> fmt::Display for ChainError<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(&self).map_err(|_| fmt::Error)?
        )
    }
}

impl<T: Serialize> fmt::Debug for ChainError<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(&self).map_err(|_| fmt::Error)?
        )
    }
}

impl<T: Serialize> std::error::Error for ChainError<T> {}

impl ChainError {
    /// Extract the structured error from an [anyhow::Error], if it is one.
    pub fn try_from_anyhow(err: &anyhow::Error) -> Option<&Self> {
        err.downcast_ref()
    }

    /// Does the given error carry this [ErrorId]?
    pub fn is(err: &anyhow::Error, id: ErrorId) -> bool {
        Self::try_from_anyhow(err).map(|e| e.id == id).unwrap_or(false)
    }
}
