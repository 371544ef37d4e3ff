//! # Duration Whitelist
//!
//! A lock is created for one of five fixed durations. There are no ranges and
//! no custom values: a request either names one of the whitelisted second
//! counts exactly or it is rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{
    ONE_MONTH_SECS, ONE_YEAR_SECS, SIX_MONTHS_SECS, TEN_YEARS_SECS, THREE_YEARS_SECS,
};
use crate::error::VaultError;

/// One of the permitted lock durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LockDuration {
    /// 30 days.
    OneMonth,
    /// 180 days.
    SixMonths,
    /// 365 days.
    OneYear,
    /// 1095 days.
    ThreeYears,
    /// 3650 days.
    TenYears,
}

impl LockDuration {
    /// The whitelist, shortest first.
    pub const ALL: [LockDuration; 5] = [
        LockDuration::OneMonth,
        LockDuration::SixMonths,
        LockDuration::OneYear,
        LockDuration::ThreeYears,
        LockDuration::TenYears,
    ];

    /// Length of the lock in seconds.
    pub const fn as_secs(self) -> u64 {
        match self {
            LockDuration::OneMonth => ONE_MONTH_SECS,
            LockDuration::SixMonths => SIX_MONTHS_SECS,
            LockDuration::OneYear => ONE_YEAR_SECS,
            LockDuration::ThreeYears => THREE_YEARS_SECS,
            LockDuration::TenYears => TEN_YEARS_SECS,
        }
    }

    /// Exact-match lookup. `None` for anything off the whitelist.
    pub fn from_secs(secs: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_secs() == secs)
    }

    /// Short label accepted by [`FromStr`] (`1m`, `6m`, `1y`, `3y`, `10y`).
    pub fn short_label(self) -> &'static str {
        match self {
            LockDuration::OneMonth => "1m",
            LockDuration::SixMonths => "6m",
            LockDuration::OneYear => "1y",
            LockDuration::ThreeYears => "3y",
            LockDuration::TenYears => "10y",
        }
    }

    /// Length in whole days.
    pub const fn days(self) -> u64 {
        self.as_secs() / crate::config::SECONDS_PER_DAY
    }
}

impl fmt::Display for LockDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockDuration::OneMonth => write!(f, "1 Month"),
            LockDuration::SixMonths => write!(f, "6 Months"),
            LockDuration::OneYear => write!(f, "1 Year"),
            LockDuration::ThreeYears => write!(f, "3 Years"),
            LockDuration::TenYears => write!(f, "10 Years"),
        }
    }
}

impl TryFrom<u64> for LockDuration {
    type Error = VaultError;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::from_secs(secs).ok_or(VaultError::InvalidDuration(secs))
    }
}

impl From<LockDuration> for u64 {
    fn from(d: LockDuration) -> u64 {
        d.as_secs()
    }
}

impl FromStr for LockDuration {
    type Err = VaultError;

    /// Accepts a short label or an exact number of seconds. A number off the
    /// whitelist is `InvalidDuration`; anything else is `UnrecognizedDuration`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(d) = Self::ALL
            .into_iter()
            .find(|d| d.short_label().eq_ignore_ascii_case(s))
        {
            return Ok(d);
        }
        match s.parse::<u64>() {
            Ok(secs) => Self::try_from(secs),
            Err(_) => Err(VaultError::UnrecognizedDuration(s.to_string())),
        }
    }
}
