pub mod context;
pub mod decision;
pub mod registry;

pub use context::SegmentContext;
pub use decision::{DenyKind, ValidationVerdict};
pub use registry::{Lookup, ValidatorRegistry};

use std::collections::HashSet;

use log::debug;

use crate::parse::{self, CommandSegment, SUBST_PLACEHOLDER};
use crate::profile::SecurityProfile;

/// Validate a full command line against a project's profile.
///
/// Every distinct command must be in the profile's allow-list; commands with
/// a registered validator must also pass it on every segment that runs them.
/// The first failure decides.
pub fn validate_command(command: &str, profile: &SecurityProfile) -> ValidationVerdict {
    validate_nested(command, profile, 0)
}

/// [`validate_command`] for a command string found `depth` shells deep.
pub(crate) fn validate_nested(
    command: &str,
    profile: &SecurityProfile,
    depth: usize,
) -> ValidationVerdict {
    let command = command.trim();
    if command.is_empty() {
        return ValidationVerdict::allow();
    }

    let names = parse::extract_commands(command);
    if names.is_empty() {
        return ValidationVerdict::unparsable("could not identify any command to validate");
    }

    let registry = ValidatorRegistry::builtin();
    let mut segments: Option<Vec<CommandSegment>> = None;
    let mut seen = HashSet::new();

    for name in &names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        if name == SUBST_PLACEHOLDER {
            return ValidationVerdict::deny(
                "command name is produced by a substitution and cannot be validated",
            );
        }
        let Some(tier) = profile.tier_of(name) else {
            debug!("deny {name}: not in allow-list (depth {depth})");
            return ValidationVerdict::deny(format!(
                "command '{name}' is not in the allowed commands for this project"
            ));
        };

        let Lookup::Validator(validator) = registry.lookup(name) else {
            debug!("allow {name}: {} list", tier.as_str());
            continue;
        };

        let segments = segments.get_or_insert_with(|| parse::split_command_segments(command));
        let mut owning = segments
            .iter()
            .filter(|s| s.runs(name))
            .map(|s| s.text.as_str())
            .peekable();
        // Fallback extraction can name a command no segment owns
        let targets: Vec<&str> = if owning.peek().is_some() {
            owning.collect()
        } else {
            vec![command]
        };

        for text in targets {
            let ctx = SegmentContext::for_command(text, name).with_profile(profile, depth);
            let verdict = validator.validate(&ctx);
            if !verdict.is_allowed() {
                debug!("deny {name}: {}", verdict.reason().unwrap_or_default());
                return verdict;
            }
        }
        debug!("allow {name}: {} list, validator passed", tier.as_str());
    }

    ValidationVerdict::allow()
}
