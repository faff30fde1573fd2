use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

use crate::config::Settings;
use crate::eval::{DenyKind, ValidationVerdict};

/// Environment variable overriding `settings.log_level`.
pub const LOG_ENV: &str = "SHELLWARD_LOG";

/// ~/.local/share/shellward, created on demand.
fn data_dir() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    let dir = Path::new(&home).join(".local/share/shellward");
    fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

fn open_append(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Level from an override (usually the env var), else the configured level.
/// Unknown names fall back to `warn`.
pub fn parse_level(env_override: Option<&str>, configured: &str) -> LevelFilter {
    env_override
        .unwrap_or(configured)
        .trim()
        .parse()
        .unwrap_or(LevelFilter::Warn)
}

/// Route `log` output to ~/.local/share/shellward/shellward.log.
/// Best-effort: without a writable data dir nothing is logged.
pub fn init(settings: &Settings) {
    let env_level = std::env::var(LOG_ENV).ok();
    let level = parse_level(env_level.as_deref(), &settings.log_level);
    if level == LevelFilter::Off {
        return;
    }
    let Some(file) = data_dir().and_then(|dir| open_append(&dir.join("shellward.log"))) else {
        return;
    };
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let _ = WriteLogger::init(level, config, file);
}

/// One tab-separated decision record, without the trailing newline.
pub fn format_decision(timestamp: &str, command: &str, verdict: &ValidationVerdict) -> String {
    // Compact single-line fields
    let cmd: String = command.replace('\n', "; ").chars().take(200).collect();
    let reason = verdict.reason().unwrap_or("").replace('\n', "; ");
    let kind = verdict.kind().map_or("-", DenyKind::as_str);
    format!("{timestamp}\t{}\t{kind}\t{cmd}\t{reason}", verdict.as_str())
}

/// Append a decision record to ~/.local/share/shellward/decisions.log.
/// Failures are ignored so logging never blocks the hook.
pub fn log_decision(command: &str, verdict: &ValidationVerdict) {
    let Some(mut file) = data_dir().and_then(|dir| open_append(&dir.join("decisions.log"))) else {
        return;
    };
    let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let _ = writeln!(file, "{}", format_decision(&ts, command, verdict));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_override_wins() {
        assert_eq!(parse_level(Some("debug"), "warn"), LevelFilter::Debug);
        assert_eq!(parse_level(None, "info"), LevelFilter::Info);
        assert_eq!(parse_level(None, "OFF"), LevelFilter::Off);
        assert_eq!(parse_level(Some("loud"), "info"), LevelFilter::Warn);
    }

    #[test]
    fn allow_record() {
        let line = format_decision("2026-01-01T00:00:00Z", "ls -la", &ValidationVerdict::allow());
        assert_eq!(line, "2026-01-01T00:00:00Z\tallow\t-\tls -la\t");
    }

    #[test]
    fn deny_record_is_single_line() {
        let verdict = ValidationVerdict::deny("bad\nthing");
        let line = format_decision("t", "rm -rf /\necho hi", &verdict);
        assert_eq!(line, "t\tdeny\tpolicy_denied\trm -rf /; echo hi\tbad; thing");
    }

    #[test]
    fn long_commands_truncated() {
        let cmd = "x".repeat(500);
        let line = format_decision("t", &cmd, &ValidationVerdict::allow());
        assert_eq!(line.split('\t').nth(3).unwrap().len(), 200);
    }
}
