//! # Locks
//!
//! A [`Lock`] is one time-locked deposit. Everything about it is fixed at
//! creation except the `claimed` flag, which flips from `false` to `true`
//! exactly once.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::BPS_DENOMINATOR;

/// Global, creation-ordered lock identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(pub u64);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single time-locked deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// Global ID, informational. Claims address locks by `index`.
    pub id: LockId,
    /// The depositor. Only this account can claim.
    pub owner: Address,
    /// Position in the owner's lock list.
    pub index: usize,
    /// Token contract holding the deposit.
    pub token: Address,
    /// Raw token units deposited.
    pub amount: u128,
    /// Creation timestamp.
    pub lock_time: u64,
    /// `lock_time + duration`.
    pub unlock_time: u64,
    /// Set once the deposit has been withdrawn.
    pub claimed: bool,
}

impl Lock {
    /// Length of the lock period in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.unlock_time.saturating_sub(self.lock_time)
    }

    /// `true` once the unlock time has been reached.
    pub fn is_unlocked(&self, now: u64) -> bool {
        now >= self.unlock_time
    }

    /// `!claimed && now >= unlock_time`.
    pub fn is_claimable(&self, now: u64) -> bool {
        !self.claimed && self.is_unlocked(now)
    }

    /// Seconds until the lock matures; zero once it has.
    pub fn time_remaining(&self, now: u64) -> u64 {
        self.unlock_time.saturating_sub(now)
    }

    /// Elapsed share of the lock period in basis points, capped at 10_000.
    pub fn progress_bps(&self, now: u64) -> u64 {
        let total = self.duration_secs();
        if total == 0 || now >= self.unlock_time {
            return BPS_DENOMINATOR;
        }
        let elapsed = now.saturating_sub(self.lock_time);
        // u128 keeps elapsed * 10_000 from overflowing on far-future clocks.
        ((elapsed as u128 * BPS_DENOMINATOR as u128) / total as u128) as u64
    }

    /// Unlock time as a UTC date, if representable.
    pub fn unlock_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::try_from(self.unlock_time).ok()?, 0)
    }
}

/// Remaining time split into display units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    /// Splits `total` seconds into days / hours / minutes / seconds.
    pub fn from_secs(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }

    /// `true` when nothing remains.
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "unlocked");
        }
        if self.days > 7 {
            return write!(f, "{}d", self.days);
        }
        write!(
            f,
            "{}d {:02}h {:02}m {:02}s",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}
