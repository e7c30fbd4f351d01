//! Helpers for reading attributes back out of diagnostic [Event]s.
use anyhow::{anyhow, Context, Result};
use cosmwasm_std::{Decimal256, Event, Uint128};

/// Extension helpers on [Event] for attribute parsing, used mostly by tests.
pub trait ChainEventExt {
    /// Does the event carry the given attribute?
    fn has_attr(&self, key: &str) -> bool;

    /// Look up an attribute as a string.
    fn string_attr(&self, key: &str) -> Result<String>;

    /// Parse an attribute as a u64.
    fn u64_attr(&self, key: &str) -> Result<u64> {
        let s = self.string_attr(key)?;
        s.parse().with_context(|| format!("parsing {key}: {s}"))
    }

    /// Parse an attribute as a raw [Uint128] amount.
    fn amount_attr(&self, key: &str) -> Result<Uint128> {
        let s = self.string_attr(key)?;
        s.parse().with_context(|| format!("parsing {key}: {s}"))
    }

    /// Parse an attribute as a [Decimal256].
    fn decimal_attr(&self, key: &str) -> Result<Decimal256> {
        let s = self.string_attr(key)?;
        s.parse().with_context(|| format!("parsing {key}: {s}"))
    }
}

impl ChainEventExt for Event {
    fn has_attr(&self, key: &str) -> bool {
        self.attributes.iter().any(|a| a.key == key)
    }

    fn string_attr(&self, key: &str) -> Result<String> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.clone())
            .ok_or_else(|| anyhow!("event {} missing attribute {key}", self.ty))
    }
}
