//! Flow-propagation activity index.
//!
//! Transfers form a weighted digraph of qualified flows; the index is the
//! stationary share of flow attention each account commands, computed by
//! damped power iteration. Everything runs in [Decimal256] fixed point over
//! name-ordered maps, so the result depends only on the input set, never on
//! input order.
use crate::prelude::*;
use crate::state::params::ChainParameters;
use std::collections::{BTreeMap, BTreeSet};

/// Residual below which the iteration is considered converged.
fn convergence_residual() -> Decimal256 {
    Decimal256::from_ratio(1u128, 1_000_000_000u128)
}

/// Hard cap on power iterations.
const MAX_ITERATIONS: u32 = 128;

/// Tunables of the calculator, lifted from [ChainParameters].
#[derive(Debug, Clone)]
pub(crate) struct ActivityParameters {
    pub account_amount_threshold: Decimal256,
    pub transaction_amount_threshold: Decimal256,
    pub token_usd_rate: Decimal256,
    pub outlink_weight: Decimal256,
    pub interlevel_weight: Decimal256,
    pub clustering_m: u32,
    pub clustering_e: Decimal256,
    pub decay_period: u32,
    pub decay_koefficient: Decimal256,
}

impl ChainParameters {
    pub(crate) fn activity_parameters(&self) -> ActivityParameters {
        ActivityParameters {
            account_amount_threshold: self.account_amount_threshold,
            transaction_amount_threshold: self.transaction_amount_threshold,
            token_usd_rate: self.token_usd_rate,
            outlink_weight: self.outlink_weight,
            interlevel_weight: self.interlevel_weight,
            clustering_m: self.clustering_m,
            clustering_e: self.clustering_e,
            decay_period: self.decay_period,
            decay_koefficient: self.decay_koefficient,
        }
    }
}

/// A buffered transfer, ready for replay.
#[derive(Debug, Clone)]
pub(crate) struct BufferedTransfer {
    /// Block the transfer landed in, for decay
    pub block: u64,
    pub from: String,
    pub to: String,
    /// Amount in real units of the transferred asset
    pub amount: Decimal256,
}

pub(crate) struct ActivityIndexCalculator {
    params: ActivityParameters,
}

impl ActivityIndexCalculator {
    pub(crate) fn new(params: ActivityParameters) -> Self {
        ActivityIndexCalculator { params }
    }

    /// Compute `account -> index in [0, 1]` from the buffered window.
    ///
    /// Accounts and transfers below their thresholds drop out entirely; an
    /// empty surviving graph yields an empty map.
    pub(crate) fn calculate(
        &self,
        records: &[BufferedTransfer],
        head_block: u64,
    ) -> Result<BTreeMap<String, Decimal256>> {
        let (links, flow) = self.qualified_links(records, head_block)?;

        let participants: BTreeSet<String> = flow
            .iter()
            .filter(|(_, total)| **total >= self.params.account_amount_threshold)
            .map(|(name, _)| name.clone())
            .collect();
        if participants.is_empty() {
            return Ok(BTreeMap::new());
        }

        let outlinks = self.prune_links(links, &participants)?;
        let ranks = self.propagate(&participants, &outlinks)?;
        self.smooth(&ranks, &outlinks)
    }

    /// Decayed USD weight per directed pair, plus total qualified flow per
    /// account.
    #[allow(clippy::type_complexity)]
    fn qualified_links(
        &self,
        records: &[BufferedTransfer],
        head_block: u64,
    ) -> Result<(
        BTreeMap<(String, String), Decimal256>,
        BTreeMap<String, Decimal256>,
    )> {
        let mut links: BTreeMap<(String, String), Decimal256> = BTreeMap::new();
        let mut flow: BTreeMap<String, Decimal256> = BTreeMap::new();

        for record in records {
            if record.from == record.to {
                continue;
            }
            let usd = record.amount.checked_mul(self.params.token_usd_rate)?;
            if usd < self.params.transaction_amount_threshold {
                continue;
            }
            let age_epochs = ((head_block.saturating_sub(record.block))
                / self.params.decay_period.max(1) as u64) as u32;
            let weight = usd.checked_mul(self.params.decay_koefficient.checked_pow(age_epochs)?)?;
            if weight.is_zero() {
                continue;
            }

            let entry = links
                .entry((record.from.clone(), record.to.clone()))
                .or_default();
            *entry = entry.checked_add(weight)?;
            let from_flow = flow.entry(record.from.clone()).or_default();
            *from_flow = from_flow.checked_add(weight)?;
            let to_flow = flow.entry(record.to.clone()).or_default();
            *to_flow = to_flow.checked_add(weight)?;
        }
        Ok((links, flow))
    }

    /// Keep at most `clustering_m` outlinks per account and drop links below
    /// the `clustering_e` share of the account's outflow.
    fn prune_links(
        &self,
        links: BTreeMap<(String, String), Decimal256>,
        participants: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Vec<(String, Decimal256)>>> {
        let mut by_source: BTreeMap<String, Vec<(String, Decimal256)>> = BTreeMap::new();
        for ((from, to), weight) in links {
            if participants.contains(&from) && participants.contains(&to) {
                by_source.entry(from).or_default().push((to, weight));
            }
        }

        for outs in by_source.values_mut() {
            let mut total = Decimal256::zero();
            for (_, w) in outs.iter() {
                total = total.checked_add(*w)?;
            }
            let floor = total.checked_mul(self.params.clustering_e)?;
            outs.retain(|(_, w)| *w >= floor);
            // Heaviest first, name as the tie break
            outs.sort_by(|(a_name, a_w), (b_name, b_w)| {
                b_w.cmp(a_w).then_with(|| a_name.cmp(b_name))
            });
            outs.truncate(self.params.clustering_m as usize);
        }
        by_source.retain(|_, outs| !outs.is_empty());
        Ok(by_source)
    }

    /// Damped power iteration to a fixed point.
    fn propagate(
        &self,
        participants: &BTreeSet<String>,
        outlinks: &BTreeMap<String, Vec<(String, Decimal256)>>,
    ) -> Result<BTreeMap<String, Decimal256>> {
        let n = participants.len() as u128;
        let d = self.params.outlink_weight;
        let uniform = Decimal256::from_ratio(1u128, n);
        let base = Decimal256::one()
            .checked_sub(d)?
            .checked_mul(uniform)?;

        let out_totals: BTreeMap<&str, Decimal256> = outlinks
            .iter()
            .map(|(from, outs)| -> Result<(&str, Decimal256)> {
                let mut total = Decimal256::zero();
                for (_, w) in outs {
                    total = total.checked_add(*w)?;
                }
                Ok((from.as_str(), total))
            })
            .collect::<Result<_>>()?;

        let mut ranks: BTreeMap<String, Decimal256> = participants
            .iter()
            .map(|name| (name.clone(), uniform))
            .collect();

        for _ in 0..MAX_ITERATIONS {
            // Flow with no outlet is spread uniformly
            let mut dangling = Decimal256::zero();
            for (name, rank) in &ranks {
                if !outlinks.contains_key(name) {
                    dangling = dangling.checked_add(*rank)?;
                }
            }
            let spread = base.checked_add(
                d.checked_mul(dangling)?.checked_mul(uniform)?,
            )?;

            let mut next: BTreeMap<String, Decimal256> = participants
                .iter()
                .map(|name| (name.clone(), spread))
                .collect();
            for (from, outs) in outlinks {
                let rank = ranks[from];
                let total = out_totals[from.as_str()];
                for (to, weight) in outs {
                    let contribution = d
                        .checked_mul(rank)?
                        .checked_mul(weight.checked_div(total)?)?;
                    let entry = next.get_mut(to).expect("participant missing from next");
                    *entry = entry.checked_add(contribution)?;
                }
            }

            let mut residual = Decimal256::zero();
            for (name, rank) in &ranks {
                let diff = abs_diff(*rank, next[name]);
                residual = residual.checked_add(diff)?;
            }
            ranks = next;
            if residual < convergence_residual() {
                break;
            }
        }
        Ok(ranks)
    }

    /// Blend each rank with the mean rank of its direct peers.
    fn smooth(
        &self,
        ranks: &BTreeMap<String, Decimal256>,
        outlinks: &BTreeMap<String, Vec<(String, Decimal256)>>,
    ) -> Result<BTreeMap<String, Decimal256>> {
        let il = self.params.interlevel_weight;
        if il.is_zero() {
            return Ok(ranks.clone());
        }

        let mut peers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (from, outs) in outlinks {
            for (to, _) in outs {
                peers.entry(from.as_str()).or_default().insert(to.as_str());
                peers.entry(to.as_str()).or_default().insert(from.as_str());
            }
        }

        let mut smoothed = BTreeMap::new();
        for (name, rank) in ranks {
            let blended = match peers.get(name.as_str()) {
                Some(neighbors) if !neighbors.is_empty() => {
                    let mut total = Decimal256::zero();
                    for peer in neighbors {
                        total = total.checked_add(ranks[*peer])?;
                    }
                    let mean = total.checked_div(Decimal256::from_ratio(
                        neighbors.len() as u128,
                        1u128,
                    ))?;
                    Decimal256::one()
                        .checked_sub(il)?
                        .checked_mul(*rank)?
                        .checked_add(il.checked_mul(mean)?)?
                }
                _ => *rank,
            };
            smoothed.insert(name.clone(), blended);
        }
        Ok(smoothed)
    }
}

fn abs_diff(a: Decimal256, b: Decimal256) -> Decimal256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}
