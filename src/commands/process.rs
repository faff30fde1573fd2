use crate::commands::{Check, CommandValidator, deny, into_verdict};
use crate::eval::{SegmentContext, ValidationVerdict};

/// Processes an agent may stop: dev servers, build tools, test runners, local databases.
const DEV_PROCESSES: &[&str] = &[
    // JavaScript / TypeScript
    "node", "npm", "npx", "yarn", "pnpm", "bun", "deno", "vite", "next", "nuxt", "webpack",
    "esbuild", "rollup", "tsx", "ts-node", "tsc", "nodemon", "jest", "vitest", "playwright",
    "cypress", "watchman",
    // Python
    "python", "python3", "flask", "uvicorn", "gunicorn", "django", "celery", "streamlit",
    "gradio", "pytest", "mypy", "ruff",
    // Rust / Go
    "cargo", "rustc", "go",
    // Ruby / PHP
    "ruby", "rails", "puma", "bundle", "rake", "php", "composer", "artisan",
    // JVM / .NET
    "java", "gradle", "mvn", "dotnet",
    // Local databases
    "postgres", "mysql", "redis", "redis-server", "mongod",
];

/// Signal specifications that address every process the user can reach.
const BROADCAST_TARGETS: &[&str] = &["-1", "0", "-0"];

/// kill options whose next word is a signal, not a PID.
const KILL_VALUE_FLAGS: &[&str] = &["-s", "-n"];

fn check_pkill(ctx: &SegmentContext) -> Check {
    let tool = ctx.base_command.as_str();
    let Some(target) = ctx.args()?.iter().rev().find(|a| !a.starts_with('-')) else {
        return deny(format!("{tool} requires a process name"));
    };
    // `pkill -f "node server.js"` matches on the full command line
    let process = target.split_whitespace().next().unwrap_or_default();
    if DEV_PROCESSES.contains(&process) {
        Ok(())
    } else {
        deny(format!("{tool} only allowed for dev processes, got: {process}"))
    }
}

fn check_kill(ctx: &SegmentContext) -> Check {
    let args = ctx.args()?;
    if args.iter().any(|a| a == "-l" || a == "-L") {
        return Ok(());
    }
    if let Some(target) = args.iter().find(|a| BROADCAST_TARGETS.contains(&a.as_str())) {
        return deny(format!("kill {target} would signal every process"));
    }

    let mut iter = args.iter();
    let mut options_done = false;
    while let Some(arg) = iter.next() {
        if !options_done {
            if KILL_VALUE_FLAGS.contains(&arg.as_str()) {
                iter.next();
                continue;
            }
            if arg == "--" {
                options_done = true;
                continue;
            }
            if arg.starts_with('-') {
                continue;
            }
        }
        if arg == "1" {
            return deny("kill 1 would signal init");
        }
    }
    Ok(())
}

/// `pkill` and `killall`: only development processes.
pub struct PkillValidator;

impl CommandValidator for PkillValidator {
    fn names(&self) -> &'static [&'static str] {
        &["pkill", "killall"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_pkill(ctx))
    }
}

pub struct KillValidator;

impl CommandValidator for KillValidator {
    fn names(&self) -> &'static [&'static str] {
        &["kill"]
    }

    fn validate(&self, ctx: &SegmentContext) -> ValidationVerdict {
        into_verdict(check_kill(ctx))
    }
}

pub fn validate_pkill_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_pkill(&SegmentContext::from_segment(segment)))
}

pub fn validate_kill_command(segment: &str) -> ValidationVerdict {
    into_verdict(check_kill(&SegmentContext::from_segment(segment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkill_dev_process_allowed() {
        assert!(validate_pkill_command("pkill node").is_allowed());
        assert!(validate_pkill_command("pkill -9 vite").is_allowed());
        assert!(validate_pkill_command("killall python3").is_allowed());
    }

    #[test]
    fn pkill_system_process_denied() {
        let v = validate_pkill_command("pkill -f nginx");
        assert_eq!(v.reason(), Some("pkill only allowed for dev processes, got: nginx"));
        assert!(!validate_pkill_command("killall sshd").is_allowed());
    }

    #[test]
    fn pkill_full_command_line_uses_first_word() {
        assert!(validate_pkill_command("pkill -f 'node server.js'").is_allowed());
        assert!(!validate_pkill_command("pkill -f 'sshd -D'").is_allowed());
    }

    #[test]
    fn pkill_needs_target() {
        let v = validate_pkill_command("killall -9");
        assert_eq!(v.reason(), Some("killall requires a process name"));
    }

    #[test]
    fn kill_pid_allowed() {
        assert!(validate_kill_command("kill 4242").is_allowed());
        assert!(validate_kill_command("kill -9 4242 4243").is_allowed());
        assert!(validate_kill_command("kill -s TERM 4242").is_allowed());
        assert!(validate_kill_command("kill -l").is_allowed());
    }

    #[test]
    fn kill_broadcast_denied() {
        assert!(!validate_kill_command("kill -9 -1").is_allowed());
        assert!(!validate_kill_command("kill 0").is_allowed());
        assert!(!validate_kill_command("kill -TERM -0").is_allowed());
    }

    #[test]
    fn kill_init_denied() {
        let v = validate_kill_command("kill -9 1");
        assert_eq!(v.reason(), Some("kill 1 would signal init"));
        assert!(!validate_kill_command("kill -- 1").is_allowed());
    }

    #[test]
    fn kill_signal_number_not_a_pid() {
        assert!(validate_kill_command("kill -s 1 4242").is_allowed());
        assert!(validate_kill_command("kill -n 1 4242").is_allowed());
    }
}
