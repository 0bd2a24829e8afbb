//! Chain monetary policy: the block reward emission schedule.
//!
//! The supply after a height is defined recursively from the previous
//! height's supply, so it is memoized every [`SUPPLY_CACHE_INTERVAL`]
//! blocks for amortized O(1) lookups over chain history.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

pub const TOTAL_SUPPLY: u64 = 2_100_000_000_000_000;
pub const INITIAL_SUPPLY: u64 = 252_000_000_000_000;
pub const EMISSION_SPEED: u64 = 4_194_304; // 2^22
pub const EMISSION_TAIL_START: u32 = 48_692_960;
pub const EMISSION_TAIL_REWARD: u64 = 4_000;

pub const SUPPLY_CACHE_INTERVAL: u32 = 5_000;

static SUPPLY_CACHE: Lazy<Mutex<Vec<u64>>> = Lazy::new(|| Mutex::new(vec![INITIAL_SUPPLY]));

/// The miner reward minted by the block at `height` (excluding fees).
///
/// Panics for height 0: the genesis block mints nothing.
pub fn block_reward(height: u32) -> u64 {
    assert!(height >= 1, "no block reward at genesis");
    reward_by_supply(supply_after(height - 1), height)
}

/// Total supply in existence after the block at `height`.
pub fn supply_after(height: u32) -> u64 {
    let end_index = height / SUPPLY_CACHE_INTERVAL;

    // Extend the interval cache as far as needed, then step the rest.
    let mut cache = SUPPLY_CACHE.lock();
    let start_index = (cache.len() - 1).min(end_index as usize);
    let mut supply = cache[start_index];
    for i in start_index as u32..end_index {
        let start_height = i * SUPPLY_CACHE_INTERVAL;
        supply = supply_between(supply, start_height, start_height + SUPPLY_CACHE_INTERVAL);
        cache.push(supply);
    }
    drop(cache);

    supply_between(supply, end_index * SUPPLY_CACHE_INTERVAL, height + 1)
}

fn supply_between(mut supply: u64, start_height: u32, end_height: u32) -> u64 {
    for height in start_height..end_height {
        supply += reward_by_supply(supply, height);
    }
    supply
}

fn reward_by_supply(supply: u64, height: u32) -> u64 {
    if height == 0 {
        return 0;
    }
    let remaining = TOTAL_SUPPLY - supply;
    if height >= EMISSION_TAIL_START && remaining >= EMISSION_TAIL_REWARD {
        return EMISSION_TAIL_REWARD;
    }
    remaining / EMISSION_SPEED
}
