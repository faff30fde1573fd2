//! shellward: PreToolUse hook that denies unsafe Bash commands.
//!
//! Reads the hook event as JSON on stdin. Allowed commands produce no
//! output; denied commands get a `permissionDecision: "deny"` response on
//! stdout with the reason.

use std::io::Read;
use std::path::PathBuf;

use serde::Deserialize;
use shellward::config::Config;
use shellward::{ProfileCache, ValidationVerdict, check_command, logging};

#[derive(Deserialize)]
struct HookInput {
    tool_name: Option<String>,
    tool_input: Option<ToolInput>,
    cwd: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ToolInput {
    command: Option<String>,
}

/// Project root: the event's cwd, then `CLAUDE_PROJECT_DIR`, then our own cwd.
fn project_dir(event_cwd: Option<PathBuf>) -> PathBuf {
    event_cwd
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| std::env::var_os("CLAUDE_PROJECT_DIR").map(PathBuf::from))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn main() {
    let config = Config::load();

    if std::env::args().skip(1).any(|a| a == "--dump-config") {
        match toml::to_string_pretty(&config) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("cannot serialize config: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    logging::init(&config.settings);

    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        eprintln!("failed to read stdin");
        std::process::exit(1);
    }

    let hook_input: HookInput = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("JSON parse error: {e}");
            std::process::exit(1);
        }
    };

    if hook_input.tool_name.as_deref() != Some("Bash") {
        std::process::exit(0);
    }

    let command = hook_input
        .tool_input
        .and_then(|t| t.command)
        .unwrap_or_default();

    if command.trim().is_empty() {
        std::process::exit(0);
    }

    let cache = ProfileCache::from_config(&config);
    let verdict = check_command(&cache, &project_dir(hook_input.cwd), &command);

    if config.settings.decision_log {
        logging::log_decision(&command, &verdict);
    }

    let ValidationVerdict::Deny { reason, .. } = verdict else {
        return;
    };

    let output = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": "deny",
            "permissionDecisionReason": reason,
        }
    });
    println!("{output}");
}
