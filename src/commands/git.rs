use crate::commands::{Check, CommandValidator, deny, into_verdict};
use crate::eval::{SegmentContext, ValidationVerdict};

/// Config keys that set who a commit is attributed to.
const IDENTITY_KEYS: &[&str] = &[
    "user.name",
    "user.email",
    "author.name",
    "author.email",
    "committer.name",
    "committer.email",
];

/// Environment prefixes that override commit attribution.
const IDENTITY_ENV_PREFIXES: &[&str] = &["GIT_AUTHOR_", "GIT_COMMITTER_"];

/// Global options (before the subcommand) that take the next word as their value.
const GLOBAL_VALUE_FLAGS: &[&str] = &["-C", "--git-dir", "--work-tree", "--namespace"];

/// Short commit flags that consume the rest of their cluster as a value.
const COMMIT_VALUE_SHORTS: &[char] = &['m', 'F', 'c', 'C', 't'];

/// Read-only forms of `git config`.
const CONFIG_READ_FLAGS: &[&str] = &[
    "--get", "--get-all", "--get-regexp", "--get-urlmatch", "--list", "-l",
];

/// Flags that make `git config KEY` a write even without a value.
const CONFIG_WRITE_FLAGS: &[&str] = &["--unset", "--unset-all", "--add", "--replace-all"];

/// `git config` options whose next word is not the key.
const CONFIG_VALUE_FLAGS: &[&str] = &["-f", "--file", "--blob", "--type", "--default"];

fn is_identity_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    IDENTITY_KEYS.contains(&key.as_str())
}

/// Key part of `key=value`.
fn config_key(assignment: &str) -> &str {
    assignment.split_once('=').map_or(assignment, |(k, _)| k)
}

fn check_identity_env(ctx: &SegmentContext) -> Check {
    for (key, _) in &ctx.env_vars {
        if IDENTITY_ENV_PREFIXES.iter().any(|p| key.starts_with(p)) {
            return deny(format!("git identity override via {key} is not allowed"));
        }
    }
    Ok(())
}

/// Walk global options; returns the subcommand index in `args`.
fn check_global_options(args: &[String]) -> Result<Option<usize>, ValidationVerdict> {
    let mut i = 0;
    while let Some(arg) = args.get(i) {
        let arg = arg.as_str();
        if arg == "-c" || arg == "--config-env" {
            let value = args.get(i + 1).map_or("", String::as_str);
            if is_identity_key(config_key(value)) {
                return Err(ValidationVerdict::deny(format!(
                    "git identity override via {arg} {} is not allowed",
                    config_key(value)
                )));
            }
            i += 2;
            continue;
        }
        if let Some(value) = arg.strip_prefix("--config-env=")
            && is_identity_key(config_key(value))
        {
            return Err(ValidationVerdict::deny(format!(
                "git identity override via --config-env {} is not allowed",
                config_key(value)
            )));
        }
        if GLOBAL_VALUE_FLAGS.contains(&arg) {
            i += 2;
            continue;
        }
        if !arg.starts_with('-') {
            return Ok(Some(i));
        }
        i += 1;
    }
    Ok(None)
}

fn check_config(args: &[String]) -> Check {
    if args.iter().any(|a| CONFIG_READ_FLAGS.contains(&a.as_str())) {
        return Ok(());
    }
    let mut positional = Vec::new();
    let mut forced_write = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if CONFIG_VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if CONFIG_WRITE_FLAGS.contains(&arg.as_str()) {
            forced_write = true;
        } else if !arg.starts_with('-') {
            positional.push(arg.as_str());
        }
    }

    let (key, write) = match positional.as_slice() {
        ["get" | "list", ..] => return Ok(()),
        ["set" | "unset", key, ..] => (*key, true),
        [key, rest @ ..] => (*key, forced_write || !rest.is_empty()),
        [] => return Ok(()),
    };
    if write && is_identity_key(key) {
        return deny(format!("git config {key} changes commit identity and is not allowed"));
    }
    Ok(())
}

/// Whether `arg` is the long option `option`, or an abbreviation git would
/// accept of at least `min_len` characters, with or without `=value`.
fn abbreviates(arg: &str, option: &str, min_len: usize) -> bool {
    let name = arg.split_once('=').map_or(arg, |(name, _)| name);
    name.len() >= min_len && option.starts_with(name)
}

fn check_commit(args: &[String]) -> Check {
    for arg in args {
        let arg = arg.as_str();
        if abbreviates(arg, "--author", "--au".len()) {
            return deny("git commit --author is not allowed");
        }
        if abbreviates(arg, "--no-verify", "--no-v".len()) {
            return deny("git commit --no-verify bypasses hooks and is not allowed");
        }
        if let Some(cluster) = arg.strip_prefix('-')
            && !cluster.starts_with('-')
        {
            for c in cluster.chars() {
                if c == 'n' {
                    return deny("git commit -n bypasses hooks and is not allowed");
                }
                if COMMIT_VALUE_SHORTS.contains(&c) {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn check_git(ctx: &SegmentContext) -> Check {
    check_identity_env(ctx)?;
    let args = ctx.args()?;
    let Some(sub) = check_global_options(args)? else {
        return Ok(());
    };
    let rest = &args[sub + 1..];
    match args[sub].as_str() {
        "config" => check_config(rest),
        "commit" => check_commit(rest),
        _ => Ok(()),
    }
}

/// Commit attribution and hook bypass.
pub struct GitValidator;

impl CommandValidator for GitValidator {
    fn names(&self) -> &'static [&'static str] {
        &["git"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_git(ctx))
    }
}

pub fn validate_git_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_git(&SegmentContext::from_segment(segment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(cmd: &str) -> bool {
        validate_git_command(cmd).is_allowed()
    }

    #[test]
    fn allow_everyday_commands() {
        assert!(allowed("git status"));
        assert!(allowed("git log --oneline -10"));
        assert!(allowed("git diff HEAD~1"));
        assert!(allowed("git push origin main"));
        assert!(allowed("git commit -m 'fix parser'"));
        assert!(allowed("git -C sub commit -am 'wip'"));
        assert!(allowed("git"));
    }

    #[test]
    fn deny_inline_identity() {
        let v = validate_git_command("git -c user.name=Bot commit -m x");
        assert_eq!(v.reason(), Some("git identity override via -c user.name is not allowed"));
        assert!(!allowed("git -c User.Email=x@y.z commit -m x"));
        assert!(!allowed("git -c committer.name=x log"));
    }

    #[test]
    fn allow_unrelated_inline_config() {
        assert!(allowed("git -c core.pager=cat log"));
        assert!(allowed("git -c color.ui=never diff"));
    }

    #[test]
    fn deny_config_env() {
        assert!(!allowed("git --config-env=user.email=EMAIL commit -m x"));
        assert!(!allowed("git --config-env author.name=NAME commit -m x"));
    }

    #[test]
    fn deny_identity_env() {
        let v = validate_git_command("GIT_AUTHOR_NAME=bot git commit -m x");
        assert!(v.reason().unwrap().contains("GIT_AUTHOR_NAME"));
        assert!(!allowed("GIT_COMMITTER_EMAIL=a@b git commit -m x"));
        assert!(allowed("GIT_PAGER=cat git log"));
    }

    #[test]
    fn config_reads_allowed() {
        assert!(allowed("git config user.name"));
        assert!(allowed("git config --get user.email"));
        assert!(allowed("git config --list"));
        assert!(allowed("git config get user.name"));
    }

    #[test]
    fn config_identity_writes_denied() {
        assert!(!allowed("git config user.name 'AI Bot'"));
        assert!(!allowed("git config --global user.email bot@example.com"));
        assert!(!allowed("git config --unset user.name"));
        assert!(!allowed("git config set user.email x@y"));
    }

    #[test]
    fn config_other_writes_allowed() {
        assert!(allowed("git config core.autocrlf false"));
        assert!(allowed("git config -f .gitmodules submodule.x.url y"));
    }

    #[test]
    fn commit_author_denied() {
        assert!(!allowed("git commit --author='Bot <b@x>' -m x"));
        assert!(!allowed("git commit --author=Bot -m x"));
    }

    #[test]
    fn commit_hook_bypass_denied() {
        assert!(!allowed("git commit --no-verify -m x"));
        assert!(!allowed("git commit -n -m x"));
        assert!(!allowed("git commit -anm x"));
    }

    #[test]
    fn abbreviated_long_options_denied() {
        assert!(!allowed("git commit --no-veri -m x"));
        assert!(!allowed("git commit --no-v -m x"));
        assert!(!allowed("git commit --auth=Bot -m x"));
        assert!(!allowed("git commit --au 'Bot <b@x>' -m x"));
    }

    #[test]
    fn unrelated_long_options_allowed() {
        assert!(allowed("git commit --amend --no-edit"));
        assert!(allowed("git commit --all -m x"));
        assert!(allowed("git commit --no-status -m x"));
    }

    #[test]
    fn commit_message_containing_n_allowed() {
        assert!(allowed("git commit -mn"));
        assert!(allowed("git commit -am 'no verify'"));
    }

    #[test]
    fn no_verify_on_other_subcommands_passes() {
        assert!(allowed("git push --no-verify"));
    }
}
