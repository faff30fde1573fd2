//! shellward: a pre-execution gate for shell commands issued by an autonomous agent.
//!
//! Each command line is parsed into the commands it will run. Every command
//! must be in the project's allow-list ([`profile::SecurityProfile`]), and
//! high-risk commands (rm, chmod, kill, database clients, git, `bash -c`, ...)
//! must also pass an argument-aware validator. Anything that cannot be
//! parsed with confidence is denied.
//!
//! # Architecture
//!
//! - **[`parse`]**: quote-aware splitting, substitution extraction, shlex tokenizing, command-name extraction.
//! - **[`commands`]**: per-command validators and their static registration table.
//! - **[`eval`]**: verdict types, validator registry, whole-command validation.
//! - **[`profile`]**: security profile, project analyzer, per-project profile cache.
//! - **[`config`]**: embedded defaults + user overlay merge.
//! - **[`logging`]**: diagnostic log and decision log under `~/.local/share/shellward/`.

/// Per-command validators and the registration table.
pub mod commands;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Validation engine: verdicts, registry, segment context.
pub mod eval;
/// Diagnostic and decision logging.
pub mod logging;
/// Shell command parsing and command-name extraction.
pub mod parse;
/// Security profiles: allow-list tiers, analysis, caching.
pub mod profile;

use std::path::Path;

use log::warn;

pub use eval::{DenyKind, ValidationVerdict, validate_command};
pub use parse::extract_commands;
pub use profile::{ProfileCache, SecurityProfile};

/// Validate `command` for the project at `project_dir`, loading its profile
/// through `cache`.
///
/// A profile that cannot be loaded or generated denies the command.
/// [`ProfileCache::clear_all`] resets the cache between runs.
pub fn check_command(cache: &ProfileCache, project_dir: &Path, command: &str) -> ValidationVerdict {
    if command.trim().is_empty() {
        return ValidationVerdict::allow();
    }
    match cache.get_or_load(project_dir) {
        Ok(profile) => validate_command(command, &profile),
        Err(e) => {
            warn!("{e}");
            ValidationVerdict::unavailable(format!("security profile unavailable: {e}"))
        }
    }
}
