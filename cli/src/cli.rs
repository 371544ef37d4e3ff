//! # CLI Interface
//!
//! Command-line structure for `hodl-vault`, defined with `clap` derive. Every
//! subcommand maps to one vault or token operation against the state file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hodl_contracts::{Address, LockDuration};

use crate::logging::LogFormat;

/// Hodl Vault local devnet.
///
/// Keeps a vault and a set of simulated tokens in a JSON state file and
/// applies one operation per invocation. Time comes from the system clock
/// unless `--now` pins it.
#[derive(Parser, Debug)]
#[command(
    name = "hodl-vault",
    about = "Hodl Vault time-lock devnet",
    version,
    propagate_version = true
)]
pub struct HodlCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Path to the devnet state file.
    #[arg(long, short = 's', global = true, env = "HODL_STATE", default_value = "hodl-devnet.json")]
    pub state: PathBuf,

    /// Log format: pretty or json.
    #[arg(long, global = true, env = "HODL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    /// Pin the clock to this Unix timestamp instead of reading system time.
    #[arg(long, global = true, env = "HODL_NOW")]
    pub now: Option<u64>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a fresh vault into a new state file.
    Init(InitArgs),
    /// Mint simulated tokens to an account (deploys the token on first use).
    Mint(MintArgs),
    /// Approve the vault to pull tokens from a holder.
    Approve(ApproveArgs),
    /// Lock tokens for one of the whitelisted durations.
    Lock(LockArgs),
    /// Claim a matured lock by its index in the account's list.
    Claim(ClaimArgs),
    /// Block new locks (owner only).
    Pause(AdminArgs),
    /// Accept new locks again (owner only).
    Unpause(AdminArgs),
    /// Hand vault ownership to another account (owner only).
    TransferOwnership(TransferOwnershipArgs),
    /// List an account's locks.
    Locks(LocksArgs),
    /// Show an account's token balance.
    Balance(BalanceArgs),
    /// Show vault status.
    Status,
    /// List the allowed lock durations.
    Durations,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Owner account for pause control.
    #[arg(long)]
    pub owner: Address,

    /// Custody address of the vault.
    #[arg(long, default_value = hodl_contracts::config::DEVNET_VAULT_ADDRESS)]
    pub vault: Address,

    /// Overwrite an existing state file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct MintArgs {
    #[arg(long)]
    pub token: Address,
    #[arg(long)]
    pub to: Address,
    #[arg(long)]
    pub amount: u128,
}

#[derive(Args, Debug)]
pub struct ApproveArgs {
    #[arg(long)]
    pub token: Address,
    /// Account granting the allowance.
    #[arg(long)]
    pub holder: Address,
    #[arg(long)]
    pub amount: u128,
}

#[derive(Args, Debug)]
pub struct LockArgs {
    /// Depositing account.
    #[arg(long)]
    pub account: Address,
    #[arg(long)]
    pub token: Address,
    #[arg(long)]
    pub amount: u128,
    /// 1m, 6m, 1y, 3y, 10y, or an exact number of seconds.
    #[arg(long)]
    pub duration: LockDuration,
}

#[derive(Args, Debug)]
pub struct ClaimArgs {
    #[arg(long)]
    pub account: Address,
    /// Position in the account's lock list.
    #[arg(long)]
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct AdminArgs {
    /// Calling account.
    #[arg(long)]
    pub caller: Address,
}

#[derive(Args, Debug)]
pub struct TransferOwnershipArgs {
    #[arg(long)]
    pub caller: Address,
    #[arg(long)]
    pub new_owner: Address,
}

#[derive(Args, Debug)]
pub struct LocksArgs {
    #[arg(long)]
    pub account: Address,
    /// Only show unclaimed locks.
    #[arg(long)]
    pub active: bool,
}

#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[arg(long)]
    pub token: Address,
    #[arg(long)]
    pub account: Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        HodlCli::command().debug_assert();
    }

    #[test]
    fn parse_lock_command() {
        let cli = HodlCli::try_parse_from([
            "hodl-vault",
            "--now",
            "1700000000",
            "lock",
            "--account",
            "0x0101010101010101010101010101010101010101",
            "--token",
            "0x7070707070707070707070707070707070707070",
            "--amount",
            "100",
            "--duration",
            "1y",
        ])
        .unwrap();
        assert_eq!(cli.global.now, Some(1_700_000_000));
        match cli.command {
            Commands::Lock(args) => {
                assert_eq!(args.amount, 100);
                assert_eq!(args.duration, LockDuration::OneYear);
                assert_eq!(args.account, Address::repeat_byte(0x01));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn off_whitelist_duration_rejected_at_parse() {
        let result = HodlCli::try_parse_from([
            "hodl-vault",
            "lock",
            "--account",
            "0x0101010101010101010101010101010101010101",
            "--token",
            "0x7070707070707070707070707070707070707070",
            "--amount",
            "100",
            "--duration",
            "86400",
        ]);
        assert!(result.is_err());
    }
}
