use crate::eval::ValidationVerdict;
use crate::parse::{self, Tokenized};
use crate::profile::SecurityProfile;

/// Context for validating a single command segment.
#[derive(Debug)]
pub struct SegmentContext<'a> {
    /// The full text of this segment.
    pub raw: &'a str,
    /// The base command name (e.g. "rm", "git", "psql").
    pub base_command: String,
    /// Shell words of the segment.
    pub words: Tokenized,
    /// KEY=VALUE environment variable assignments before the command.
    pub env_vars: Vec<(String, String)>,
    /// Profile in force, for validators that check nested command lines.
    pub profile: Option<&'a SecurityProfile>,
    /// How many `sh -c` levels deep this segment is.
    pub depth: usize,
    /// Command word as written, grouping parens removed.
    command: Option<String>,
    /// Words after the command word.
    arguments: Vec<String>,
}

/// Drop the parens that close an enclosing subshell from the end of the
/// arguments. Only parens left unmatched across the arguments are removed,
/// and only when the segment ends with an unescaped `)`.
fn strip_subshell_close(raw: &str, arguments: &mut Vec<String>) {
    let raw = raw.trim_end();
    if !raw.ends_with(')') || raw.ends_with("\\)") {
        return;
    }
    let count = |c: char| arguments.iter().map(|a| a.matches(c).count()).sum::<usize>();
    let mut unmatched = count(')').saturating_sub(count('('));
    while unmatched > 0 {
        let Some(last) = arguments.last_mut() else {
            break;
        };
        if !last.ends_with(')') {
            break;
        }
        last.pop();
        unmatched -= 1;
        if last.is_empty() {
            arguments.pop();
        }
    }
}

impl<'a> SegmentContext<'a> {
    /// Build a context for the first command in a raw segment, with no
    /// profile attached.
    pub fn from_segment(raw: &'a str) -> Self {
        Self::build(raw, None)
    }

    /// Build a context for the invocation of `name` in a raw segment,
    /// falling back to the first command when `name` isn't found.
    pub fn for_command(raw: &'a str, name: &str) -> Self {
        Self::build(raw, Some(name))
    }

    fn build(raw: &'a str, name: Option<&str>) -> Self {
        let words = parse::shell_words(raw);
        let all = words.words().unwrap_or(&[]);
        let positions = parse::command_positions(all);
        let position = name
            .and_then(|name| {
                positions
                    .iter()
                    .copied()
                    .find(|&i| parse::command_name(parse::strip_grouping(&all[i])) == name)
            })
            .or_else(|| positions.first().copied());

        let (command, env_vars, mut arguments) = match position {
            Some(i) => (
                Some(parse::strip_grouping(&all[i]).to_string()),
                parse::assignments(&all[..i]),
                all[i + 1..].to_vec(),
            ),
            None => (None, parse::assignments(all), Vec::new()),
        };
        strip_subshell_close(raw, &mut arguments);
        let base_command = command.as_deref().map(parse::command_name).unwrap_or_default();

        Self {
            raw,
            base_command,
            words,
            env_vars,
            profile: None,
            depth: 0,
            command,
            arguments,
        }
    }

    /// Attach the profile used for nested checks.
    pub fn with_profile(mut self, profile: &'a SecurityProfile, depth: usize) -> Self {
        self.profile = Some(profile);
        self.depth = depth;
        self
    }

    /// Cleanly tokenized words, or a fail-closed verdict.
    pub fn words(&self) -> Result<&[String], ValidationVerdict> {
        self.words.clean().ok_or_else(|| {
            let name: &str = if self.base_command.is_empty() {
                "segment"
            } else {
                &self.base_command
            };
            ValidationVerdict::unparsable(format!(
                "could not parse {name} command for security validation"
            ))
        })
    }

    /// The word in command position, as written (path included).
    pub fn command_word(&self) -> Result<&str, ValidationVerdict> {
        self.words()?;
        self.command
            .as_deref()
            .ok_or_else(|| ValidationVerdict::unparsable("no command found in segment"))
    }

    /// Words after the command itself, without leading keywords,
    /// assignments or redirections.
    pub fn args(&self) -> Result<&[String], ValidationVerdict> {
        self.words()?;
        Ok(&self.arguments)
    }

    /// Check if a specific env var key is present.
    pub fn has_env(&self, key: &str) -> bool {
        self.env_vars.iter().any(|(k, _)| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_command_skips_assignments() {
        let ctx = SegmentContext::from_segment("PGPASSWORD=x /usr/bin/psql -c 'select 1'");
        assert_eq!(ctx.base_command, "psql");
        assert!(ctx.has_env("PGPASSWORD"));
        assert_eq!(ctx.command_word().unwrap(), "/usr/bin/psql");
        assert_eq!(ctx.args().unwrap(), &["-c".to_string(), "select 1".to_string()]);
    }

    #[test]
    fn args_empty_for_bare_command() {
        let ctx = SegmentContext::from_segment("kill");
        assert!(ctx.args().unwrap().is_empty());
    }

    #[test]
    fn subshell_parens_removed() {
        let ctx = SegmentContext::from_segment("(rm -rf /)");
        assert_eq!(ctx.base_command, "rm");
        assert_eq!(ctx.command_word().unwrap(), "rm");
        assert_eq!(ctx.args().unwrap(), &["-rf".to_string(), "/".to_string()]);
    }

    #[test]
    fn closing_paren_of_earlier_subshell_removed() {
        let ctx = SegmentContext::from_segment("rm -rf ..)");
        assert_eq!(ctx.args().unwrap(), &["-rf".to_string(), "..".to_string()]);
        let ctx = SegmentContext::from_segment("( kill -9 -1 )");
        assert_eq!(ctx.args().unwrap(), &["-9".to_string(), "-1".to_string()]);
    }

    #[test]
    fn quoted_or_balanced_parens_kept() {
        let ctx = SegmentContext::from_segment("rm 'a)'");
        assert_eq!(ctx.args().unwrap(), &["a)".to_string()]);
        let ctx = SegmentContext::from_segment("echo $((1 + 2))");
        assert_eq!(
            ctx.args().unwrap(),
            &["$((1".to_string(), "+".to_string(), "2))".to_string()]
        );
    }

    #[test]
    fn keywords_before_command_skipped() {
        let ctx = SegmentContext::from_segment("then GIT_AUTHOR_NAME=x git -c user.name=x commit");
        assert_eq!(ctx.base_command, "git");
        assert!(ctx.has_env("GIT_AUTHOR_NAME"));
        assert_eq!(ctx.args().unwrap()[0], "-c");
    }

    #[test]
    fn for_command_picks_named_invocation() {
        let ctx = SegmentContext::for_command("echo '&&' rm -rf /", "rm");
        assert_eq!(ctx.base_command, "rm");
        assert_eq!(ctx.args().unwrap(), &["-rf".to_string(), "/".to_string()]);
    }

    #[test]
    fn no_command_word() {
        let ctx = SegmentContext::from_segment("--verbose");
        assert!(ctx.command_word().is_err());
        assert!(ctx.args().unwrap().is_empty());
    }

    #[test]
    fn degraded_words_fail_closed() {
        let ctx = SegmentContext::from_segment("rm 'unterminated");
        assert_eq!(ctx.base_command, "rm");
        let verdict = ctx.words().unwrap_err();
        assert_eq!(verdict.kind(), Some(crate::eval::DenyKind::ParseAmbiguous));
        assert!(verdict.reason().unwrap().contains("could not parse rm"));
    }
}
