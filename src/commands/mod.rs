//! Per-command validators: argument-aware checks for high-risk commands.
//!
//! A command reaches its validator only after passing the project's
//! allow-list; the validator then inspects the full segment (arguments
//! included) and may deny it. Commands without a validator are decided by
//! the allow-list alone.

/// Database administration shells and tools (psql, mysql, redis-cli, mongosh, dropdb, ...).
pub mod database;
/// Filesystem commands: rm targets, chmod modes, the project init script.
pub mod filesystem;
/// Git identity and hook-bypass checks.
pub mod git;
/// Process signalling: kill, pkill, killall.
pub mod process;
/// Shell interpreters running an inline command string (`bash -c`).
pub mod shell;

use crate::eval::{SegmentContext, ValidationVerdict};

/// Trait for per-command validators.
///
/// Each implementation handles one command (or a family sharing the same
/// rules) and returns a verdict for the segment that invokes it.
pub trait CommandValidator: Send + Sync {
    /// Command names this validator is registered under.
    fn names(&self) -> &'static [&'static str];

    /// Validate one segment invoking this command.
    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict;
}

/// Compile-time registration table.
pub static VALIDATORS: &[&dyn CommandValidator] = &[
    &filesystem::RmValidator,
    &filesystem::ChmodValidator,
    &filesystem::InitScriptValidator,
    &process::PkillValidator,
    &process::KillValidator,
    &database::PsqlValidator,
    &database::MysqlValidator,
    &database::MysqladminValidator,
    &database::RedisCliValidator,
    &database::MongoshValidator,
    &database::DropdbValidator,
    &database::DropuserValidator,
    &git::GitValidator,
    &shell::ShellCValidator,
];

/// Validator bodies return `Err(verdict)` to deny and use `?` on context lookups.
pub(crate) type Check = Result<(), ValidationVerdict>;

pub(crate) fn into_verdict(check: Check) -> ValidationVerdict {
    match check {
        Ok(()) => ValidationVerdict::allow(),
        Err(verdict) => verdict,
    }
}

/// Deny with a policy reason.
pub(crate) fn deny(reason: impl Into<String>) -> Check {
    Err(ValidationVerdict::deny(reason))
}

/// Positional arguments, skipping flags and the values of flags listed in
/// `flags_with_values` (`-h host`). `--flag=value` forms are skipped as flags.
pub(crate) fn positional<'w>(args: &'w [String], flags_with_values: &[&str]) -> Vec<&'w str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if flags_with_values.contains(&arg.as_str()) {
            iter.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

/// Value of an option given as `-c VALUE`, `--command VALUE`,
/// `--command=VALUE` or (for single-letter flags) `-cVALUE`.
/// Every occurrence is returned.
pub(crate) fn option_values<'w>(args: &'w [String], short: &str, long: &str) -> Vec<&'w str> {
    let mut out = Vec::new();
    let long_eq = format!("{long}=");
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == short || arg == long {
            if let Some(value) = iter.next() {
                out.push(value.as_str());
            }
        } else if let Some(value) = arg.strip_prefix(&long_eq) {
            out.push(value);
        } else if let Some(value) = arg.strip_prefix(short)
            && short.len() == 2
            && !value.is_empty()
            && !arg.starts_with("--")
        {
            out.push(value);
        }
    }
    out
}
