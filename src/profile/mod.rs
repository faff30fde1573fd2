//! Per-project security profile: the tiered allow-list and how it is stored.

pub mod analyzer;
pub mod cache;
pub mod error;

pub use analyzer::{ProjectAnalyzer, StackAnalyzer};
pub use cache::{ProfileCache, ProfileCacheEntry};
pub use error::{ProfileError, Result};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parse::command_name;

/// Which part of the allow-list admitted a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowTier {
    /// Safe everywhere (ls, cat, grep, ...).
    Base,
    /// Enabled by a detected technology.
    Stack,
    /// A script the project defines.
    Script,
    /// Listed by the user in the allow-list file.
    Custom,
}

impl AllowTier {
    pub fn as_str(self) -> &'static str {
        match self {
            AllowTier::Base => "base",
            AllowTier::Stack => "stack",
            AllowTier::Script => "script",
            AllowTier::Custom => "custom",
        }
    }
}

/// Technologies found in a project, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyStack {
    pub languages: BTreeSet<String>,
    pub package_managers: BTreeSet<String>,
    pub frameworks: BTreeSet<String>,
    pub databases: BTreeSet<String>,
    pub infrastructure: BTreeSet<String>,
    pub tools: BTreeSet<String>,
}

/// Scripts a project defines for itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomScripts {
    pub npm_scripts: BTreeSet<String>,
    pub make_targets: BTreeSet<String>,
    pub shell_scripts: BTreeSet<String>,
}

/// The commands an agent may run in one project.
///
/// The four sets may overlap; the effective policy is their union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityProfile {
    #[serde(default)]
    pub base_commands: BTreeSet<String>,
    #[serde(default)]
    pub stack_commands: BTreeSet<String>,
    #[serde(default)]
    pub script_commands: BTreeSet<String>,
    #[serde(default)]
    pub custom_commands: BTreeSet<String>,
    #[serde(default)]
    pub detected_stack: TechnologyStack,
    #[serde(default)]
    pub custom_scripts: CustomScripts,
    pub project_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub project_hash: String,
}

impl SecurityProfile {
    /// An empty profile for `project_dir`, stamped now.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_commands: BTreeSet::new(),
            stack_commands: BTreeSet::new(),
            script_commands: BTreeSet::new(),
            custom_commands: BTreeSet::new(),
            detected_stack: TechnologyStack::default(),
            custom_scripts: CustomScripts::default(),
            project_dir: project_dir.into(),
            created_at: Utc::now(),
            project_hash: String::new(),
        }
    }

    fn tiers(&self) -> [(AllowTier, &BTreeSet<String>); 4] {
        [
            (AllowTier::Base, &self.base_commands),
            (AllowTier::Stack, &self.stack_commands),
            (AllowTier::Script, &self.script_commands),
            (AllowTier::Custom, &self.custom_commands),
        ]
    }

    /// First tier allowing `name`. Both sides are compared as base command
    /// names, so a `./build.sh` entry allows `build`.
    pub fn tier_of(&self, name: &str) -> Option<AllowTier> {
        let name = command_name(name);
        if name.is_empty() {
            return None;
        }
        self.tiers().into_iter().find_map(|(tier, set)| {
            let hit = set.contains(&name) || set.iter().any(|entry| command_name(entry) == name);
            hit.then_some(tier)
        })
    }

    pub fn is_command_allowed(&self, name: &str) -> bool {
        self.tier_of(name).is_some()
    }

    /// Union of all tiers, normalized.
    pub fn all_allowed_commands(&self) -> BTreeSet<String> {
        self.tiers()
            .into_iter()
            .flat_map(|(_, set)| set.iter().map(|entry| command_name(entry)))
            .collect()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Read and parse a profile file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ProfileError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the profile next to its final path, then rename over it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let write_err = |source| ProfileError::Write {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, json + "\n").map_err(write_err)?;
        fs::rename(&tmp, path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            write_err(source)
        })
    }
}

/// Parse an allow-list file: one command per line, `#` starts a comment.
pub fn parse_allowlist(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Commands from the project's allow-list file. A missing file is empty.
pub fn load_custom_allowlist(path: &Path) -> Result<BTreeSet<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_allowlist(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeSet::new()),
        Err(source) => Err(ProfileError::Unreadable {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SecurityProfile {
        let mut p = SecurityProfile::new("/work/app");
        p.base_commands.extend(["ls", "git"].map(String::from));
        p.stack_commands.extend(["cargo", "git"].map(String::from));
        p.script_commands.insert("./build.sh".into());
        p.custom_commands.insert("deploy-preview".into());
        p
    }

    #[test]
    fn union_membership() {
        let p = sample();
        for name in ["ls", "git", "cargo", "build", "deploy-preview"] {
            assert!(p.is_command_allowed(name), "{name}");
        }
        assert!(!p.is_command_allowed("curl"));
        assert!(!p.is_command_allowed(""));
    }

    #[test]
    fn first_tier_reported() {
        let p = sample();
        assert_eq!(p.tier_of("git"), Some(AllowTier::Base));
        assert_eq!(p.tier_of("cargo"), Some(AllowTier::Stack));
        assert_eq!(p.tier_of("build"), Some(AllowTier::Script));
        assert_eq!(p.tier_of("deploy-preview"), Some(AllowTier::Custom));
    }

    #[test]
    fn path_invocations_normalize() {
        let p = sample();
        assert!(p.is_command_allowed("/usr/bin/git"));
        assert!(p.is_command_allowed("./build.sh"));
    }

    #[test]
    fn all_allowed_is_normalized_union() {
        let all = sample().all_allowed_commands();
        assert_eq!(
            all.into_iter().collect::<Vec<_>>(),
            vec!["build", "cargo", "deploy-preview", "git", "ls"]
        );
    }

    #[test]
    fn json_uses_rfc3339_timestamps() {
        let p = sample();
        let json = p.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let created = value["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
        assert_eq!(SecurityProfile::from_json(&json).unwrap(), p);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"base_commands":["ls"],"project_dir":"/p","created_at":"2026-01-02T03:04:05Z"}"#;
        let p = SecurityProfile::from_json(json).unwrap();
        assert!(p.is_command_allowed("ls"));
        assert!(p.project_hash.is_empty());
        assert!(p.detected_stack.languages.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".shellward-security.json");
        let p = sample();
        p.save(&path).unwrap();
        assert_eq!(SecurityProfile::load(&path).unwrap(), p);
        assert!(!dir.path().join(".shellward-security.json.tmp").exists());
    }

    #[test]
    fn load_errors_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            SecurityProfile::load(&missing),
            Err(ProfileError::Unreadable { .. })
        ));

        let corrupt = dir.path().join("bad.json");
        fs::write(&corrupt, "{not json").unwrap();
        assert!(matches!(
            SecurityProfile::load(&corrupt),
            Err(ProfileError::Corrupt { .. })
        ));
    }

    #[test]
    fn allowlist_parsing() {
        let text = "# project tools\nterraform\n\n  ./scripts/seed.sh  \nkubectl # cluster access\n#disabled\n";
        let set = parse_allowlist(text);
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["./scripts/seed.sh", "kubectl", "terraform"]
        );
    }

    #[test]
    fn allowlist_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = load_custom_allowlist(&dir.path().join(".shellward-allowlist")).unwrap();
        assert!(set.is_empty());
    }
}
