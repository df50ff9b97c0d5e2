// src/config/env.rs

//! Environment switches, read once at the process boundary.
//!
//! Every function takes a lookup function rather than reading the process
//! environment directly; pass [`process_env`] in production.

use std::time::Duration;

use crate::types::PollSetting;

pub const USE_POLLING_VAR: &str = "ASSETPIPE_USE_POLLING";
pub const CI_VAR: &str = "CI";

/// Polling setting from `ASSETPIPE_USE_POLLING`, if set.
///
/// An integer is an interval in milliseconds; any other value enables
/// polling at the default interval, except for `false`/`no`/`off`/empty.
pub fn poll_from_env<F>(lookup: F) -> Option<PollSetting>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(USE_POLLING_VAR)?;
    raw.parse::<PollSetting>().ok()
}

/// `true` when running under CI, where watch errors should be fatal.
pub fn strict_from_env<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(CI_VAR).is_some()
}

/// The process environment, for the functions above.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Effective poll interval: the CLI flag wins over the config file, which
/// wins over the environment. `None` means native notifications.
///
/// `cli` is `--poll` as parsed: `Some(None)` for a bare flag, `Some(Some(ms))`
/// with a value.
pub fn resolve_poll(
    cli: Option<Option<u64>>,
    config: Option<PollSetting>,
    env: Option<PollSetting>,
) -> Option<Duration> {
    let setting = match cli {
        Some(Some(ms)) => PollSetting::IntervalMs(ms),
        Some(None) => PollSetting::Enabled(true),
        None => config.or(env).unwrap_or_default(),
    };
    setting.interval()
}

/// Effective error strictness, in the same order of precedence. The CLI flag
/// can only turn strictness on.
pub fn resolve_strict(cli: bool, config: Option<bool>, env: bool) -> bool {
    cli || config.unwrap_or(env)
}
