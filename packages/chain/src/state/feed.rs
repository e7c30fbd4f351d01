use crate::prelude::*;
use crate::state::asset::{BitAssetData, FeedEntry, PriceFeed};
use crate::state::{State, StateContext};

/// Which comparison decides that a median feed is stale.
///
/// The legacy policy carries an inverted comparison: a feed counted as
/// expired exactly while it was still fresh, so medians were recomputed on
/// every maintenance run. Replaying old blocks needs that behavior, so it is
/// selected by timestamp rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeedExpiryPolicy {
    /// Inverted comparison used before the cutover
    Legacy,
    /// Corrected comparison
    Current,
}

impl FeedExpiryPolicy {
    /// The policy in force at the given head time.
    pub(crate) fn at(head_time: Timestamp) -> Self {
        if head_time < FEED_EXPIRY_FIX_TIME {
            FeedExpiryPolicy::Legacy
        } else {
            FeedExpiryPolicy::Current
        }
    }

    /// Is a median feed with the given expiration stale now?
    pub(crate) fn feed_is_expired(&self, expiration: Timestamp, now: Timestamp) -> bool {
        match self {
            FeedExpiryPolicy::Legacy => expiration >= now,
            FeedExpiryPolicy::Current => expiration <= now,
        }
    }
}

/// Upper median of a sorted slice.
fn median<T: Copy>(sorted: &[T]) -> T {
    sorted[sorted.len() / 2]
}

pub(crate) fn update_median_feeds(bitasset: &mut BitAssetData, now: Timestamp) {
    let lifetime = bitasset.options.feed_lifetime_seconds as u64;
    let valid: Vec<&FeedEntry> = bitasset
        .feeds
        .values()
        .filter(|entry| entry.publish_time.plus_seconds(lifetime) >= now)
        .collect();

    let mut publish_times: Vec<Timestamp> = valid.iter().map(|e| e.publish_time).collect();
    publish_times.sort_unstable();
    bitasset.current_feed_publication_time = if publish_times.is_empty() {
        now
    } else {
        median(&publish_times)
    };

    if (valid.len() as u32) < bitasset.options.minimum_feeds {
        bitasset.current_feed = None;
        return;
    }
    if valid.len() == 1 {
        bitasset.current_feed = Some(valid[0].feed.clone());
        return;
    }

    let mut settlement_prices: Vec<Price> =
        valid.iter().map(|e| e.feed.settlement_price).collect();
    settlement_prices.sort_unstable();

    let mut mcrs: Vec<u32> = valid
        .iter()
        .map(|e| e.feed.maintenance_collateral_ratio)
        .collect();
    mcrs.sort_unstable();

    let mut mssrs: Vec<u32> = valid
        .iter()
        .map(|e| e.feed.maximum_short_squeeze_ratio)
        .collect();
    mssrs.sort_unstable();

    let mut cers: Vec<Price> = valid
        .iter()
        .filter_map(|e| e.feed.core_exchange_rate)
        .collect();
    cers.sort_unstable();

    bitasset.current_feed = Some(PriceFeed {
        settlement_price: median(&settlement_prices),
        core_exchange_rate: if cers.is_empty() {
            None
        } else {
            Some(median(&cers))
        },
        maintenance_collateral_ratio: median(&mcrs),
        maximum_short_squeeze_ratio: median(&mssrs),
    });
}

impl State {
    /// Record a producer's feed and refresh the medians.
    pub fn publish_feed(
        &self,
        ctx: &mut StateContext,
        producer: &str,
        asset_id: AssetId,
        feed: PriceFeed,
    ) -> Result<()> {
        let now = self.head_block_time(ctx.storage)?;
        self.modify_bitasset(ctx, asset_id, |bitasset| {
            chain_ensure!(
                feed.settlement_price.pair()
                    == (asset_id, bitasset.options.short_backing_asset),
                ErrorId::InvalidPrice,
                ErrorDomain::Feed,
                "feed for {asset_id} must price it in its backing asset"
            );
            bitasset.feeds.insert(
                producer.to_owned(),
                FeedEntry {
                    publish_time: now,
                    feed,
                },
            );
            update_median_feeds(bitasset, now);
            Ok(())
        })
    }

    /// Refresh medians of every market-issued asset whose feed has gone
    /// stale, re-checking call orders and propagating the core exchange rate.
    pub fn update_expired_feeds(&self, ctx: &mut StateContext) -> Result<()> {
        let now = self.head_block_time(ctx.storage)?;
        let policy = FeedExpiryPolicy::at(now);

        for asset_id in self.market_issued_assets(ctx.storage)? {
            let bitasset = self
                .get_bitasset(ctx.storage, asset_id)?
                .ok_or_else(|| {
                    chain_anyhow!(
                        ErrorId::IndexInvariantViolated,
                        ErrorDomain::Feed,
                        "asset {asset_id} indexed as market issued without bitasset data"
                    )
                })?;

            if policy.feed_is_expired(bitasset.feed_expiration_time(), now) {
                self.modify_bitasset(ctx, asset_id, |bitasset| {
                    update_median_feeds(bitasset, now);
                    Ok(())
                })?;
                self.check_call_orders(ctx, asset_id)?;
            }

            // Keep the asset's advertised core exchange rate in step with
            // the median feed
            let bitasset = match self.get_bitasset(ctx.storage, asset_id)? {
                Some(bitasset) => bitasset,
                None => continue,
            };
            if let Some(feed_cer) = bitasset.current_feed.as_ref().and_then(|f| f.core_exchange_rate)
            {
                let asset = self.get_asset(ctx.storage, asset_id)?;
                if asset.options.core_exchange_rate != Some(feed_cer) {
                    self.modify_asset(ctx, asset_id, |asset| {
                        asset.options.core_exchange_rate = Some(feed_cer);
                    })?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_switches_at_the_cutover() {
        let before = FEED_EXPIRY_FIX_TIME - Duration::from_seconds(1);
        let after = FEED_EXPIRY_FIX_TIME;
        assert_eq!(FeedExpiryPolicy::at(before), FeedExpiryPolicy::Legacy);
        assert_eq!(FeedExpiryPolicy::at(after), FeedExpiryPolicy::Current);
    }

    #[test]
    fn legacy_policy_is_inverted() {
        let now = Timestamp::from_seconds(1_000);
        let fresh = Timestamp::from_seconds(2_000);
        let stale = Timestamp::from_seconds(500);
        // A feed that is still fresh counts as expired under the legacy rule
        assert!(FeedExpiryPolicy::Legacy.feed_is_expired(fresh, now));
        assert!(!FeedExpiryPolicy::Legacy.feed_is_expired(stale, now));
        // The corrected rule is the intuitive one
        assert!(!FeedExpiryPolicy::Current.feed_is_expired(fresh, now));
        assert!(FeedExpiryPolicy::Current.feed_is_expired(stale, now));
    }
}
