/// Why a command was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyKind {
    /// The command line or a segment could not be parsed with confidence.
    ParseAmbiguous,
    /// A command or its arguments matched a deny rule or missed the allow-list.
    PolicyDenied,
    /// The project's security profile could not be loaded or regenerated.
    ProfileUnavailable,
}

impl DenyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyKind::ParseAmbiguous => "parse_ambiguous",
            DenyKind::PolicyDenied => "policy_denied",
            DenyKind::ProfileUnavailable => "profile_unavailable",
        }
    }
}

/// Outcome of one check. A reason is carried exactly when denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Allow,
    Deny { kind: DenyKind, reason: String },
}

impl ValidationVerdict {
    pub fn allow() -> Self {
        ValidationVerdict::Allow
    }

    /// Policy denial.
    pub fn deny(reason: impl Into<String>) -> Self {
        ValidationVerdict::Deny {
            kind: DenyKind::PolicyDenied,
            reason: reason.into(),
        }
    }

    pub fn unparsable(reason: impl Into<String>) -> Self {
        ValidationVerdict::Deny {
            kind: DenyKind::ParseAmbiguous,
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ValidationVerdict::Deny {
            kind: DenyKind::ProfileUnavailable,
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, ValidationVerdict::Allow)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationVerdict::Allow => None,
            ValidationVerdict::Deny { reason, .. } => Some(reason),
        }
    }

    pub fn kind(&self) -> Option<DenyKind> {
        match self {
            ValidationVerdict::Allow => None,
            ValidationVerdict::Deny { kind, .. } => Some(*kind),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationVerdict::Allow => "allow",
            ValidationVerdict::Deny { .. } => "deny",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValidationVerdict::Allow => "ALLOW",
            ValidationVerdict::Deny { .. } => "DENY",
        }
    }
}
