use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Location of the user overlay, before tilde expansion.
const USER_CONFIG_PATH: &str = "~/.config/shellward/config.toml";

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub commands: Commands,
    #[serde(default)]
    pub stacks: Vec<StackRule>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Per-project profile file, relative to the project directory.
    #[serde(default = "default_profile_filename")]
    pub profile_filename: String,
    /// Per-project custom allow-list file, relative to the project directory.
    #[serde(default = "default_allowlist_filename")]
    pub allowlist_filename: String,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub decision_log: bool,
}

fn default_profile_filename() -> String {
    ".shellward-security.json".into()
}

fn default_allowlist_filename() -> String {
    ".shellward-allowlist".into()
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile_filename: default_profile_filename(),
            allowlist_filename: default_allowlist_filename(),
            log_level: default_log_level(),
            decision_log: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Commands {
    /// Commands allowed in every project.
    #[serde(default)]
    pub base: Vec<String>,
}

/// What kind of technology a stack rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StackCategory {
    #[default]
    Language,
    PackageManager,
    Framework,
    Database,
    Infrastructure,
    Tool,
}

/// A technology detected by marker files, and the commands it brings along.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StackRule {
    pub name: String,
    #[serde(default)]
    pub category: StackCategory,
    /// File names in the project root; `*.ext` matches by suffix.
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    commands: CommandsOverlay,
    #[serde(default)]
    stacks: Vec<StackRule>,
    #[serde(default)]
    remove_stacks: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    profile_filename: Option<String>,
    allowlist_filename: Option<String>,
    log_level: Option<String>,
    decision_log: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct CommandsOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    base: Vec<String>,
    #[serde(default)]
    remove_base: Vec<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

/// Merge user stack rules: same name replaces, new names append.
fn merge_stacks(base: &mut Vec<StackRule>, add: Vec<StackRule>, remove: &[String]) {
    base.retain(|rule| !remove.contains(&rule.name));
    for rule in add {
        match base.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => base.push(rule),
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/shellward/config.toml (if exists)
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Try to load the user overlay. A malformed overlay is reported and ignored.
    fn load_overlay() -> Option<ConfigOverlay> {
        let path = shellexpand::tilde(USER_CONFIG_PATH).into_owned();
        let content = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("shellward: config parse error in {path}: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.profile_filename {
            self.settings.profile_filename = v;
        }
        if let Some(v) = s.allowlist_filename {
            self.settings.allowlist_filename = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = s.decision_log {
            self.settings.decision_log = v;
        }

        let c = overlay.commands;
        merge_list(&mut self.commands.base, c.base, &c.remove_base, c.replace);

        merge_stacks(&mut self.stacks, overlay.stacks, &overlay.remove_stacks);
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
