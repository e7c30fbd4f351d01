use crate::prelude::*;
use crate::state::{State, StateContext};
use std::collections::BTreeMap;

const ASSETS: Map<AssetId, Asset> = Map::new(namespace::ASSETS);
const ASSET_DYNAMIC: Map<AssetId, AssetDynamicData> = Map::new(namespace::ASSET_DYNAMIC);
const BITASSETS: Map<AssetId, BitAssetData> = Map::new(namespace::BITASSETS);
/// The `by_type` view: market-issued flag first, so all bitassets form one
/// contiguous range.
const ASSETS_BY_TYPE: Map<(u8, AssetId), ()> = Map::new(namespace::ASSETS_BY_TYPE);
const LAST_ASSET_ID: Item<AssetId> = Item::new(namespace::LAST_ASSET_ID);

/// An asset known to the chain.
#[cw_serde]
pub struct Asset {
    /// Identity of the asset
    pub id: AssetId,
    /// Ticker symbol
    pub symbol: String,
    /// Number of decimal digits in one full unit
    pub precision: u8,
    /// Mutable asset options
    pub options: AssetOptions,
}

/// Mutable options of an asset.
#[cw_serde]
pub struct AssetOptions {
    /// Exchange rate against the core asset, refreshed from the median feed
    /// for market-issued assets
    pub core_exchange_rate: Option<Price>,
}

/// Supply bookkeeping, split from [Asset] because it changes far more often.
#[cw_serde]
#[derive(Default)]
pub struct AssetDynamicData {
    /// Units of this asset currently in existence
    pub current_supply: Uint128,
    /// Fees collected in this asset, not part of the circulating supply
    pub accumulated_fees: Uint128,
}

/// A feed published by one producer.
#[cw_serde]
pub struct PriceFeed {
    /// Price of the synthetic in its backing asset (base is the synthetic)
    pub settlement_price: Price,
    /// Suggested exchange rate against the core asset
    pub core_exchange_rate: Option<Price>,
    /// Required collateral over debt, in basis points
    pub maintenance_collateral_ratio: u32,
    /// Cap on forced margin pricing, in basis points
    pub maximum_short_squeeze_ratio: u32,
}

/// Options fixed when a bitasset is created.
#[cw_serde]
pub struct BitAssetOptions {
    /// The collateral asset backing short positions
    pub short_backing_asset: AssetId,
    /// Seconds a published feed stays usable
    pub feed_lifetime_seconds: u32,
    /// Feeds required before a median exists
    pub minimum_feeds: u32,
    /// Seconds between requesting and executing a force settlement
    pub force_settlement_delay_seconds: u32,
    /// Discount taken from the feed price on forced settlement, basis points
    pub force_settlement_offset_percent: u32,
    /// Share of supply settleable per maintenance interval, basis points
    pub max_force_settlement_volume_percent: u32,
}

/// Market-issued (synthetic) asset state.
#[cw_serde]
pub struct BitAssetData {
    /// Creation-time options
    pub options: BitAssetOptions,
    /// Median over the valid published feeds, if enough exist
    pub current_feed: Option<PriceFeed>,
    /// Median publication time of the feeds composing [Self::current_feed]
    pub current_feed_publication_time: Timestamp,
    /// Latest feed per producer
    pub feeds: BTreeMap<String, FeedEntry>,
    /// Amount force-settled so far in the current maintenance interval
    pub force_settled_volume: Uint128,
    /// Set when the asset has been globally settled; the price everything
    /// froze at
    pub settlement_price: Option<Price>,
    /// Collateral collected from closed shorts at global settlement
    pub settlement_fund: Uint128,
}

/// A feed with its publication time.
#[cw_serde]
pub struct FeedEntry {
    /// When the producer published this feed
    pub publish_time: Timestamp,
    /// The published feed
    pub feed: PriceFeed,
}

impl BitAssetData {
    /// Has this asset been globally settled?
    pub fn has_settlement(&self) -> bool {
        self.settlement_price.is_some()
    }

    /// The most that may be force-settled in one maintenance interval.
    pub fn max_force_settlement_volume(&self, current_supply: Uint128) -> Uint128 {
        current_supply.multiply_ratio(
            self.options.max_force_settlement_volume_percent as u128,
            PERCENT_100 as u128,
        )
    }

    /// When the current median feed stops being usable.
    pub fn feed_expiration_time(&self) -> Timestamp {
        self.current_feed_publication_time
            .plus_seconds(self.options.feed_lifetime_seconds as u64)
    }
}

impl State {
    pub fn get_asset(&self, store: &dyn Storage, id: AssetId) -> Result<Asset> {
        ASSETS.load(store, id).map_err(|_| {
            chain_anyhow!(ErrorId::MissingObject, ErrorDomain::Chain, "no asset {id}")
        })
    }

    pub fn get_asset_dynamic(
        &self,
        store: &dyn Storage,
        id: AssetId,
    ) -> Result<AssetDynamicData> {
        Ok(ASSET_DYNAMIC.may_load(store, id)?.unwrap_or_default())
    }

    pub fn get_bitasset(
        &self,
        store: &dyn Storage,
        id: AssetId,
    ) -> Result<Option<BitAssetData>> {
        Ok(BITASSETS.may_load(store, id)?)
    }

    /// Create a new asset, market-issued when bitasset options are supplied.
    pub fn create_asset(
        &self,
        ctx: &mut StateContext,
        symbol: &str,
        precision: u8,
        bitasset: Option<BitAssetOptions>,
    ) -> Result<AssetId> {
        let id = LAST_ASSET_ID
            .may_load(ctx.storage)?
            .map(|last| last.next())
            .unwrap_or_else(AssetId::core);
        LAST_ASSET_ID.save(ctx.storage, &id)?;

        ASSETS.save(
            ctx.storage,
            id,
            &Asset {
                id,
                symbol: symbol.to_owned(),
                precision,
                options: AssetOptions {
                    core_exchange_rate: None,
                },
            },
        )?;
        ASSET_DYNAMIC.save(ctx.storage, id, &AssetDynamicData::default())?;

        match bitasset {
            Some(options) => {
                chain_ensure!(
                    options.short_backing_asset != id,
                    ErrorId::Config,
                    ErrorDomain::Market,
                    "asset {symbol} cannot back itself"
                );
                BITASSETS.save(
                    ctx.storage,
                    id,
                    &BitAssetData {
                        options,
                        current_feed: None,
                        current_feed_publication_time: Timestamp::default(),
                        feeds: BTreeMap::new(),
                        force_settled_volume: Uint128::zero(),
                        settlement_price: None,
                        settlement_fund: Uint128::zero(),
                    },
                )?;
                ASSETS_BY_TYPE.save(ctx.storage, (1, id), &())?;
            }
            None => ASSETS_BY_TYPE.save(ctx.storage, (0, id), &())?,
        }

        Ok(id)
    }

    /// All market-issued assets, in id order.
    pub(crate) fn market_issued_assets(&self, store: &dyn Storage) -> Result<Vec<AssetId>> {
        ASSETS_BY_TYPE
            .prefix(1)
            .keys(store, None, None, Order::Ascending)
            .map(|r| r.map_err(|e| e.into()))
            .collect()
    }

    pub(crate) fn modify_asset(
        &self,
        ctx: &mut StateContext,
        id: AssetId,
        f: impl FnOnce(&mut Asset),
    ) -> Result<()> {
        let mut asset = self.get_asset(ctx.storage, id)?;
        f(&mut asset);
        ASSETS.save(ctx.storage, id, &asset)?;
        Ok(())
    }

    pub(crate) fn modify_asset_dynamic(
        &self,
        ctx: &mut StateContext,
        id: AssetId,
        f: impl FnOnce(&mut AssetDynamicData) -> Result<()>,
    ) -> Result<()> {
        let mut dynamic = self.get_asset_dynamic(ctx.storage, id)?;
        f(&mut dynamic)?;
        ASSET_DYNAMIC.save(ctx.storage, id, &dynamic)?;
        Ok(())
    }

    pub(crate) fn modify_bitasset(
        &self,
        ctx: &mut StateContext,
        id: AssetId,
        f: impl FnOnce(&mut BitAssetData) -> Result<()>,
    ) -> Result<()> {
        let mut bitasset = BITASSETS.load(ctx.storage, id).map_err(|_| {
            chain_anyhow!(
                ErrorId::MissingObject,
                ErrorDomain::Market,
                "asset {id} is not market issued"
            )
        })?;
        f(&mut bitasset)?;
        BITASSETS.save(ctx.storage, id, &bitasset)?;
        Ok(())
    }

    /// Mint new units into an account, growing the supply.
    pub fn issue_asset(
        &self,
        ctx: &mut StateContext,
        to: &str,
        amount: AssetAmount,
    ) -> Result<()> {
        self.modify_asset_dynamic(ctx, amount.asset_id, |dynamic| {
            dynamic.current_supply = dynamic.current_supply.checked_add(amount.amount)?;
            chain_ensure!(
                dynamic.current_supply <= MAX_ASSET_SUPPLY,
                ErrorId::InvalidAmount,
                ErrorDomain::Chain,
                "supply of {} exceeds maximum",
                amount.asset_id
            );
            Ok(())
        })?;
        self.credit_balance(ctx, to, amount)
    }

    /// Destroy units that are already out of circulation (escrowed in an
    /// order), shrinking the supply.
    pub(crate) fn burn_supply(&self, ctx: &mut StateContext, amount: AssetAmount) -> Result<()> {
        self.modify_asset_dynamic(ctx, amount.asset_id, |dynamic| {
            dynamic.current_supply = dynamic.current_supply.checked_sub(amount.amount)?;
            Ok(())
        })
    }

    /// Collect a fee into the asset's accumulated fee bucket.
    pub(crate) fn collect_fee(&self, ctx: &mut StateContext, fee: AssetAmount) -> Result<()> {
        self.modify_asset_dynamic(ctx, fee.asset_id, |dynamic| {
            dynamic.accumulated_fees = dynamic.accumulated_fees.checked_add(fee.amount)?;
            Ok(())
        })
    }

    /// Convert a raw amount to real units via the asset's precision.
    pub(crate) fn amount_to_real(
        &self,
        store: &dyn Storage,
        amount: AssetAmount,
    ) -> Result<Decimal256> {
        let asset = self.get_asset(store, amount.asset_id)?;
        Decimal256::from_atomics(amount.amount, asset.precision as u32).map_err(|_| {
            chain_anyhow!(
                ErrorId::Conversion,
                ErrorDomain::Chain,
                "amount {amount} out of range for precision {}",
                asset.precision
            )
        })
    }
}
