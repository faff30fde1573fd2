//! Types produced by the shell parser and consumed by the eval layer.

/// Shell operator separating consecutive segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `&&`: run next only if previous succeeded
    And,
    /// `||`: run next only if previous failed
    Or,
    /// `;` or an unquoted newline: run next unconditionally
    Semi,
    /// `|`: pipe stdout
    Pipe,
    /// `|&`: pipe stdout+stderr
    PipeErr,
    /// `&`: run previous in the background
    Background,
}

impl Operator {
    /// The operator's shell syntax.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Semi => ";",
            Operator::Pipe => "|",
            Operator::PipeErr => "|&",
            Operator::Background => "&",
        }
    }
}

/// Result of best-effort shell-word splitting.
///
/// Callers that make security decisions treat anything but `Ok` as
/// unparseable and fail closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tokenized {
    /// POSIX word splitting succeeded.
    Ok(Vec<String>),
    /// POSIX splitting failed (unclosed quote, dangling escape); these words
    /// come from plain whitespace splitting and are only good for guessing.
    Degraded(Vec<String>),
    /// Nothing usable.
    Failed,
}

impl Tokenized {
    pub fn is_ok(&self) -> bool {
        matches!(self, Tokenized::Ok(_))
    }

    /// Words from either a clean or a degraded split.
    pub fn words(&self) -> Option<&[String]> {
        match self {
            Tokenized::Ok(words) | Tokenized::Degraded(words) => Some(words),
            Tokenized::Failed => None,
        }
    }

    /// Words of a clean split only.
    pub fn clean(&self) -> Option<&[String]> {
        match self {
            Tokenized::Ok(words) => Some(words),
            _ => None,
        }
    }
}

/// One invocation within a command line: the text between chain, pipe or
/// background operators, or the body of a substitution.
#[derive(Debug, Clone)]
pub struct CommandSegment {
    /// Segment text. Nested substitution spans are replaced by
    /// [`SUBST_PLACEHOLDER`](crate::parse::SUBST_PLACEHOLDER).
    pub text: String,
    /// Shell words of `text`.
    pub words: Tokenized,
    /// Base command names executed by this segment, in order.
    pub commands: Vec<String>,
}

impl CommandSegment {
    /// Whether `name` is one of the commands this segment runs.
    pub fn runs(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c == name)
    }
}
