#![allow(unused_imports)]
pub(crate) use crate::block::{Block, Operation, OperationContext, Transaction, TransactionId};
pub(crate) use crate::constants::*;
pub(crate) use crate::state::{State, StateContext};
pub use shared::prelude::*;
