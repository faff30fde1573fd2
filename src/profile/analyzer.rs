use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::{Config, StackCategory, StackRule};
use crate::profile::{ProfileError, Result, SecurityProfile, TechnologyStack, load_custom_allowlist};

/// Builds a profile for a project and fingerprints the files it was built from.
pub trait ProjectAnalyzer: Send + Sync {
    /// Scan the project and produce a fresh profile.
    fn analyze(&self, project_dir: &Path) -> Result<SecurityProfile>;

    /// Fingerprint of the inputs `analyze` reads.
    fn project_hash(&self, project_dir: &Path) -> String;

    /// Whether a stored profile was built from different inputs.
    fn is_outdated(&self, profile: &SecurityProfile, project_dir: &Path) -> bool {
        profile.project_hash != self.project_hash(project_dir)
    }
}

/// `target:` lines in a Makefile, excluding variable assignments (`X := y`).
static MAKE_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([A-Za-z0-9][A-Za-z0-9_.-]*)\s*:(?:[^=]|$)").expect("make target pattern")
});

const MAKEFILES: &[&str] = &["Makefile", "makefile", "GNUmakefile"];

/// Analyzer driven by the configured base commands and stack rules.
pub struct StackAnalyzer {
    base_commands: Vec<String>,
    stacks: Vec<StackRule>,
    allowlist_filename: String,
}

impl StackAnalyzer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_commands: config.commands.base.clone(),
            stacks: config.stacks.clone(),
            allowlist_filename: config.settings.allowlist_filename.clone(),
        }
    }

    fn root_entries(project_dir: &Path) -> Result<Vec<String>> {
        let entries = fs::read_dir(project_dir).map_err(|e| ProfileError::Analysis {
            dir: project_dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Files matched by a marker: an exact name, or `*.ext` by suffix.
    fn marker_matches(marker: &str, project_dir: &Path, entries: &[String]) -> Vec<PathBuf> {
        match marker.strip_prefix('*') {
            Some(suffix) => entries
                .iter()
                .filter(|name| name.ends_with(suffix))
                .map(|name| project_dir.join(name))
                .collect(),
            None => {
                let path = project_dir.join(marker);
                if path.exists() { vec![path] } else { Vec::new() }
            }
        }
    }

    fn rule_fires(rule: &StackRule, project_dir: &Path, entries: &[String]) -> bool {
        rule.markers
            .iter()
            .any(|m| !Self::marker_matches(m, project_dir, entries).is_empty())
    }

    /// Every existing file whose content feeds the analysis, sorted.
    fn hashed_inputs(&self, project_dir: &Path, entries: &[String]) -> Vec<PathBuf> {
        let mut inputs: BTreeSet<PathBuf> = self
            .stacks
            .iter()
            .flat_map(|rule| rule.markers.iter())
            .flat_map(|m| Self::marker_matches(m, project_dir, entries))
            .collect();
        for name in ["package.json", self.allowlist_filename.as_str()]
            .into_iter()
            .chain(MAKEFILES.iter().copied())
        {
            inputs.insert(project_dir.join(name));
        }
        inputs.into_iter().filter(|p| p.is_file()).collect()
    }
}

fn category_set(stack: &mut TechnologyStack, category: StackCategory) -> &mut BTreeSet<String> {
    match category {
        StackCategory::Language => &mut stack.languages,
        StackCategory::PackageManager => &mut stack.package_managers,
        StackCategory::Framework => &mut stack.frameworks,
        StackCategory::Database => &mut stack.databases,
        StackCategory::Infrastructure => &mut stack.infrastructure,
        StackCategory::Tool => &mut stack.tools,
    }
}

/// Script names from a package.json; unparseable manifests yield none.
fn npm_scripts(manifest: &str) -> BTreeSet<String> {
    serde_json::from_str::<serde_json::Value>(manifest)
        .ok()
        .and_then(|v| v.get("scripts")?.as_object().map(|s| s.keys().cloned().collect()))
        .unwrap_or_default()
}

fn make_targets(makefile: &str) -> BTreeSet<String> {
    MAKE_TARGET
        .captures_iter(makefile)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

impl ProjectAnalyzer for StackAnalyzer {
    fn analyze(&self, project_dir: &Path) -> Result<SecurityProfile> {
        if !project_dir.is_dir() {
            return Err(ProfileError::Analysis {
                dir: project_dir.to_path_buf(),
                reason: "not a directory".into(),
            });
        }
        let entries = Self::root_entries(project_dir)?;
        let mut profile = SecurityProfile::new(project_dir);
        profile.base_commands.extend(self.base_commands.iter().cloned());

        for rule in &self.stacks {
            if Self::rule_fires(rule, project_dir, &entries) {
                debug!("{}: detected {}", project_dir.display(), rule.name);
                category_set(&mut profile.detected_stack, rule.category).insert(rule.name.clone());
                profile.stack_commands.extend(rule.commands.iter().cloned());
            }
        }

        if let Ok(manifest) = fs::read_to_string(project_dir.join("package.json")) {
            profile.custom_scripts.npm_scripts = npm_scripts(&manifest);
            profile.script_commands.extend(["npm", "npx"].map(String::from));
        }

        if let Some(makefile) = MAKEFILES
            .iter()
            .find_map(|name| fs::read_to_string(project_dir.join(name)).ok())
        {
            profile.custom_scripts.make_targets = make_targets(&makefile);
            profile.script_commands.insert("make".into());
        }

        for name in entries.iter().filter(|n| n.ends_with(".sh")) {
            if project_dir.join(name).is_file() {
                profile.custom_scripts.shell_scripts.insert(format!("./{name}"));
                profile.script_commands.insert(format!("./{name}"));
            }
        }

        profile.custom_commands =
            load_custom_allowlist(&project_dir.join(&self.allowlist_filename))?;
        profile.project_hash = self.project_hash(project_dir);

        info!(
            "analyzed {}: {} stack, {} script, {} custom commands",
            project_dir.display(),
            profile.stack_commands.len(),
            profile.script_commands.len(),
            profile.custom_commands.len()
        );
        Ok(profile)
    }

    fn project_hash(&self, project_dir: &Path) -> String {
        let entries = Self::root_entries(project_dir).unwrap_or_default();
        let mut hasher = Sha256::new();
        for path in self.hashed_inputs(project_dir, &entries) {
            let Ok(content) = fs::read(&path) else {
                continue;
            };
            if let Some(name) = path.file_name() {
                hasher.update(name.as_encoded_bytes());
            }
            hasher.update([0u8]);
            hasher.update(&content);
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> StackAnalyzer {
        StackAnalyzer::from_config(&Config::default_config())
    }

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn empty_project_gets_base_only() {
        let dir = project(&[]);
        let p = analyzer().analyze(dir.path()).unwrap();
        assert!(p.is_command_allowed("ls"));
        assert!(p.stack_commands.is_empty());
        assert!(p.script_commands.is_empty());
        assert!(!p.is_command_allowed("cargo"));
    }

    #[test]
    fn rust_project_detected() {
        let dir = project(&[("Cargo.toml", "[package]\nname = \"x\"\n")]);
        let p = analyzer().analyze(dir.path()).unwrap();
        assert!(p.detected_stack.languages.contains("rust"));
        assert!(p.is_command_allowed("cargo"));
        assert!(!p.is_command_allowed("npm"));
    }

    #[test]
    fn glob_marker_matches_suffix() {
        let dir = project(&[("infra.tf", "")]);
        let p = analyzer().analyze(dir.path()).unwrap();
        assert!(p.detected_stack.infrastructure.contains("terraform"));
        assert!(p.is_command_allowed("terraform"));
    }

    #[test]
    fn package_json_scripts() {
        let dir = project(&[
            ("package.json", r#"{"scripts": {"dev": "vite", "test": "vitest"}}"#),
            ("pnpm-lock.yaml", ""),
        ]);
        let p = analyzer().analyze(dir.path()).unwrap();
        assert_eq!(
            p.custom_scripts.npm_scripts.iter().collect::<Vec<_>>(),
            vec!["dev", "test"]
        );
        assert!(p.script_commands.contains("npx"));
        assert!(p.detected_stack.package_managers.contains("pnpm"));
        assert!(p.is_command_allowed("pnpm"));
    }

    #[test]
    fn makefile_targets() {
        let dir = project(&[(
            "Makefile",
            "CC := gcc\n.PHONY: all\nall: build\n\nbuild:\n\tcc main.c\ntest-unit: build\n",
        )]);
        let p = analyzer().analyze(dir.path()).unwrap();
        assert_eq!(
            p.custom_scripts.make_targets.iter().collect::<Vec<_>>(),
            vec!["all", "build", "test-unit"]
        );
        assert_eq!(p.tier_of("make"), Some(crate::profile::AllowTier::Script));
    }

    #[test]
    fn root_shell_scripts() {
        let dir = project(&[("deploy.sh", "#!/bin/sh\n"), ("notes.txt", "")]);
        let p = analyzer().analyze(dir.path()).unwrap();
        assert!(p.custom_scripts.shell_scripts.contains("./deploy.sh"));
        assert!(p.is_command_allowed("deploy"));
        assert!(p.is_command_allowed("./deploy.sh"));
    }

    #[test]
    fn custom_allowlist() {
        let dir = project(&[(".shellward-allowlist", "# extras\nterraform\nflyctl\n")]);
        let p = analyzer().analyze(dir.path()).unwrap();
        assert_eq!(p.tier_of("flyctl"), Some(crate::profile::AllowTier::Custom));
    }

    #[test]
    fn hash_tracks_inputs() {
        let dir = project(&[("package.json", "{}")]);
        let a = analyzer();
        let before = a.project_hash(dir.path());
        assert_eq!(before, a.project_hash(dir.path()));
        assert_eq!(before.len(), 64);

        let profile = a.analyze(dir.path()).unwrap();
        assert!(!a.is_outdated(&profile, dir.path()));

        fs::write(dir.path().join("package.json"), r#"{"scripts":{"x":"y"}}"#).unwrap();
        assert_ne!(before, a.project_hash(dir.path()));
        assert!(a.is_outdated(&profile, dir.path()));
    }

    #[test]
    fn unrelated_files_do_not_change_hash() {
        let dir = project(&[("Cargo.toml", "")]);
        let a = analyzer();
        let before = a.project_hash(dir.path());
        fs::write(dir.path().join("README.md"), "hello").unwrap();
        assert_eq!(before, a.project_hash(dir.path()));
    }

    #[test]
    fn missing_dir_is_an_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyzer().analyze(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, ProfileError::Analysis { .. }));
    }
}
