//! # Vault Constants
//!
//! Every fixed parameter of the vault lives here. The duration whitelist in
//! particular is part of the contract's promise to depositors: a lock created
//! for "one year" must mean the same thing for the lifetime of the ledger, so
//! these values are compile-time constants with no setter anywhere.

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Seconds in a calendar day. Durations are counted in whole days; leap
/// seconds and leap years are ignored, same as the chain clock.
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// 30 days.
pub const ONE_MONTH_SECS: u64 = 30 * SECONDS_PER_DAY;

/// 180 days.
pub const SIX_MONTHS_SECS: u64 = 180 * SECONDS_PER_DAY;

/// 365 days.
pub const ONE_YEAR_SECS: u64 = 365 * SECONDS_PER_DAY;

/// 1095 days (3 x 365).
pub const THREE_YEARS_SECS: u64 = 1095 * SECONDS_PER_DAY;

/// 3650 days (10 x 365).
pub const TEN_YEARS_SECS: u64 = 3650 * SECONDS_PER_DAY;

/// The complete set of accepted lock durations, shortest first.
pub const ALLOWED_DURATIONS_SECS: [u64; 5] = [
    ONE_MONTH_SECS,
    SIX_MONTHS_SECS,
    ONE_YEAR_SECS,
    THREE_YEARS_SECS,
    TEN_YEARS_SECS,
];

// ---------------------------------------------------------------------------
// Accounting
// ---------------------------------------------------------------------------

/// Basis points denominator (10_000 = 100%). Used for lock progress.
pub const BPS_DENOMINATOR: u64 = 10_000;

// ---------------------------------------------------------------------------
// Devnet defaults
// ---------------------------------------------------------------------------

/// Custody address the local devnet assigns to the vault when none is given.
pub const DEVNET_VAULT_ADDRESS: &str = "0x000000000000000000000000000000000000da17";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_constants_match_published_values() {
        assert_eq!(ONE_MONTH_SECS, 2_592_000);
        assert_eq!(SIX_MONTHS_SECS, 15_552_000);
        assert_eq!(ONE_YEAR_SECS, 31_536_000);
        assert_eq!(THREE_YEARS_SECS, 94_608_000);
        assert_eq!(TEN_YEARS_SECS, 315_360_000);
    }

    #[test]
    fn test_allowed_durations_strictly_increasing() {
        assert!(ALLOWED_DURATIONS_SECS.windows(2).all(|w| w[0] < w[1]));
    }
}
