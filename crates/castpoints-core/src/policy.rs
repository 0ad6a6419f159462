//! Points policy configuration.
//!
//! Grant and cost amounts are policy, not logic: they are configured by the
//! operator and consumed by the service handlers. The ledger itself only sees
//! signed amounts.

use serde::{Deserialize, Serialize};

/// Default one-time bonus for new users.
pub const DEFAULT_BOOTSTRAP_BONUS_POINTS: i64 = 100;

/// Default daily sign-in reward.
pub const DEFAULT_DAILY_SIGN_IN_POINTS: i64 = 5;

/// Default base cost of one podcast generation.
pub const DEFAULT_GENERATION_BASE_COST: i64 = 10;

/// Default additional cost per minute of generated audio.
pub const DEFAULT_GENERATION_COST_PER_MINUTE: i64 = 1;

/// Environment-configurable point amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// One-time bonus granted when a new user's account is bootstrapped.
    pub bootstrap_bonus_points: i64,

    /// Reward for the once-per-day sign-in.
    pub daily_sign_in_points: i64,

    /// Base cost of one podcast generation.
    pub generation_base_cost: i64,

    /// Additional cost per full minute of generated audio.
    pub generation_cost_per_minute: i64,
}

impl PolicyConfig {
    /// Cost of a generation given the audio duration in seconds.
    ///
    /// Partial minutes are not charged; a 90-second episode costs the base
    /// plus one minute.
    #[must_use]
    pub const fn generation_cost(&self, duration_seconds: u64) -> i64 {
        #[allow(clippy::cast_possible_wrap)]
        let minutes = (duration_seconds / 60) as i64;
        self.generation_base_cost + minutes * self.generation_cost_per_minute
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            bootstrap_bonus_points: DEFAULT_BOOTSTRAP_BONUS_POINTS,
            daily_sign_in_points: DEFAULT_DAILY_SIGN_IN_POINTS,
            generation_base_cost: DEFAULT_GENERATION_BASE_COST,
            generation_cost_per_minute: DEFAULT_GENERATION_COST_PER_MINUTE,
        }
    }
}
