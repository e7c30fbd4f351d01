//! Consensus constants. Changing any value here is a hardfork.
use shared::prelude::*;

/// Added to `recently_missed_count` per missed slot.
pub const RECENTLY_MISSED_COUNT_INCREMENT: u32 = 4;

/// Subtracted from `recently_missed_count` per produced block while the count
/// is above the increment. Must stay below the increment so recovery is slower
/// than decline.
pub const RECENTLY_MISSED_COUNT_DECREMENT: u32 = 3;

/// Hard ceiling on the gap between head and last irreversible block. Crossing
/// it stops the node rather than losing the ability to switch forks.
pub const MAX_UNDO_HISTORY: u32 = 10_000;

/// Percent values are carried as basis points of this.
pub const PERCENT_100: u64 = 10_000;

/// Cutover after which the corrected feed-expiry comparison applies. Before
/// this instant feeds were treated as expired while still fresh, forcing a
/// median recomputation every maintenance run; the behavior is kept for
/// replay compatibility.
pub const FEED_EXPIRY_FIX_TIME: Timestamp = Timestamp::from_seconds(1_450_288_800);

/// Seconds in the emission model's year.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Bit in `DynamicGlobalState::dynamic_flags` set while a maintenance interval
/// is being processed.
pub const MAINTENANCE_FLAG: u32 = 0x01;
