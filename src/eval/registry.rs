use std::collections::HashMap;
use std::sync::LazyLock;

use crate::commands::{CommandValidator, VALIDATORS};

/// Result of looking a command up in the registry.
#[derive(Clone, Copy)]
pub enum Lookup {
    /// The command has argument rules.
    Validator(&'static dyn CommandValidator),
    /// No argument rules; the allow-list decides alone.
    Unvalidated,
}

impl Lookup {
    pub fn is_validated(&self) -> bool {
        matches!(self, Lookup::Validator(_))
    }
}

/// Read-only map from command name to validator.
pub struct ValidatorRegistry {
    validators: HashMap<&'static str, &'static dyn CommandValidator>,
}

static BUILTIN: LazyLock<ValidatorRegistry> =
    LazyLock::new(|| ValidatorRegistry::from_table(VALIDATORS));

impl ValidatorRegistry {
    /// Build a registry from a table; later entries win on name clashes.
    pub fn from_table(table: &[&'static dyn CommandValidator]) -> Self {
        let mut validators = HashMap::new();
        for &validator in table {
            for &name in validator.names() {
                validators.insert(name, validator);
            }
        }
        Self { validators }
    }

    /// The registry of all built-in validators.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Look up a command by its base name.
    pub fn lookup(&self, name: &str) -> Lookup {
        match self.validators.get(name) {
            Some(&validator) => Lookup::Validator(validator),
            None => Lookup::Unvalidated,
        }
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.validators.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_validators() {
        let registry = ValidatorRegistry::builtin();
        for name in [
            "rm", "chmod", "init", "kill", "pkill", "killall", "psql", "mysql", "mariadb",
            "mysqladmin", "redis-cli", "mongosh", "mongo", "dropdb", "dropuser", "git", "bash",
            "sh", "zsh",
        ] {
            assert!(registry.lookup(name).is_validated(), "{name}");
        }
    }

    #[test]
    fn unknown_is_unvalidated() {
        let registry = ValidatorRegistry::builtin();
        assert!(!registry.lookup("ls").is_validated());
        assert!(!registry.lookup("").is_validated());
        assert!(!registry.lookup("RM").is_validated());
    }

    #[test]
    fn names_sorted() {
        let names = ValidatorRegistry::builtin().names();
        assert_eq!(names.first(), Some(&"bash"));
        assert!(names.windows(2).all(|w| w[0] < w[1]));
    }
}
