use std::sync::LazyLock;

use regex::Regex;

use crate::commands::{Check, CommandValidator, deny, into_verdict};
use crate::eval::{SegmentContext, ValidationVerdict};

/// rm targets that are never allowed, matched after trailing-slash normalization.
static DANGEROUS_RM_TARGETS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^/$",
        r"^\.\.$",
        r"^~$",
        r"^\*$",
        r"^/\*$",
        r"^\.\./",
        r"^/(?:home|usr|etc|var|bin|lib|opt)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("rm target pattern"))
    .collect()
});

const SAFE_CHMOD_MODES: &[&str] = &[
    "755", "644", "700", "600", "775", "664", "+x", "a+x", "u+x", "g+x", "o+x", "ug+x",
];

static EXECUTABLE_MODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ugoa]*\+x$").expect("chmod mode pattern"));

fn normalize_target(arg: &str) -> &str {
    let trimmed = arg.trim_end_matches('/');
    if trimmed.is_empty() && !arg.is_empty() {
        "/"
    } else {
        trimmed
    }
}

fn check_rm(ctx: &SegmentContext) -> Check {
    for arg in ctx.args()? {
        if arg.starts_with('-') {
            continue;
        }
        let target = normalize_target(arg);
        if DANGEROUS_RM_TARGETS.iter().any(|re| re.is_match(target)) {
            return deny(format!("rm target '{arg}' is not allowed for safety"));
        }
    }
    Ok(())
}

fn check_chmod(ctx: &SegmentContext) -> Check {
    let mut mode = None;
    let mut files = 0usize;

    for arg in ctx.args()? {
        if arg == "-R" || arg == "--recursive" {
            continue;
        }
        if arg.starts_with('-') {
            return deny(format!("chmod flag '{arg}' is not allowed"));
        }
        if mode.is_none() {
            mode = Some(arg.as_str());
        } else {
            files += 1;
        }
    }

    let Some(mode) = mode else {
        return deny("chmod requires a mode");
    };
    if files == 0 {
        return deny("chmod requires at least one file");
    }
    if !SAFE_CHMOD_MODES.contains(&mode) && !EXECUTABLE_MODE.is_match(mode) {
        return deny(format!(
            "chmod only allowed with executable modes (+x) or common permissions, got: {mode}"
        ));
    }
    Ok(())
}

fn check_init(ctx: &SegmentContext) -> Check {
    let script = ctx.command_word()?;
    if script == "./init.sh" || script.ends_with("/init.sh") {
        Ok(())
    } else {
        deny(format!("only ./init.sh is allowed, got: {script}"))
    }
}

pub struct RmValidator;

impl CommandValidator for RmValidator {
    fn names(&self) -> &'static [&'static str] {
        &["rm"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_rm(ctx))
    }
}

pub struct ChmodValidator;

impl CommandValidator for ChmodValidator {
    fn names(&self) -> &'static [&'static str] {
        &["chmod"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_chmod(ctx))
    }
}

/// Project init scripts. Registered as `init` because `./init.sh`
/// normalizes to that name.
pub struct InitScriptValidator;

impl CommandValidator for InitScriptValidator {
    fn names(&self) -> &'static [&'static str] {
        &["init"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_init(ctx))
    }
}

pub fn validate_rm_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_rm(&SegmentContext::from_segment(segment)))
}

pub fn validate_chmod_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_chmod(&SegmentContext::from_segment(segment)))
}

pub fn validate_init_script(segment: &str) -> ValidationVerdict {
    into_verdict(check_init(&SegmentContext::from_segment(segment)))
}
