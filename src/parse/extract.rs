//! Command-name extraction: which executables will a command line run?

use std::sync::LazyLock;

use regex::Regex;

use super::shell::{extract_substitutions, split_compound_command};
use super::tokenize::{command_name, is_assignment, shell_words};
use super::types::CommandSegment;

/// Substitutions nested deeper than this are not followed.
const MAX_SUBSTITUTION_DEPTH: usize = 8;

/// Shell reserved words and grouping tokens. Never command names.
const SHELL_KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "while", "until", "do", "done", "esac", "in", "function",
    "!", "{", "}", "[[", "]]", "(", ")", "((", "))", "coproc",
];

/// Keywords that start a loop header; the rest of the segment names
/// variables and words, not commands.
const LOOP_KEYWORDS: &[&str] = &["for", "select"];

/// Separator tokens that put the walker back in command position.
const OPERATOR_TOKENS: &[&str] = &["|", "||", "&&", "&", "|&", ";"];

/// Redirection operators that take the next word as their target.
const REDIRECT_TOKENS: &[&str] = &[
    "<", ">", ">>", "<<", "<<<", "<>", ">|", "&>", "&>>", "2>", "2>>", "1>", "1>>",
];

static WINDOWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s"'=])[A-Za-z]:\\|\\[\w.-]+\\|\\[\w.-]+\.(?i:exe|cmd|bat|ps1)\b"#)
        .expect("windows path pattern")
});

static FALLBACK_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&&|\|\||\||;|\n|&").expect("fallback separator pattern"));

static LEADING_ASSIGNMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:[A-Za-z_][A-Za-z0-9_]*=(?:"[^"]*"|'[^']*'|\S*)\s+)*"#)
        .expect("assignment pattern")
});

static FIRST_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"([^"]+)"|'([^']+)'|([^\s"']+))"#).expect("first token pattern")
});

/// Whether the command contains Windows-style paths (`C:\...`, `\dir\...`),
/// whose backslashes would be mangled by POSIX escape handling.
pub fn contains_windows_path(command: &str) -> bool {
    WINDOWS_PATH.is_match(command)
}

/// Is this word a redirection (`>`, `2>&1`, `>/dev/null`, `<input`)?
/// Returns `Some(true)` when the target is the following word.
fn redirection(word: &str) -> Option<bool> {
    if REDIRECT_TOKENS.contains(&word) {
        return Some(true);
    }
    let rest = word.trim_start_matches(|c: char| c.is_ascii_digit() || c == '&');
    if !rest.starts_with(['<', '>']) {
        return None;
    }
    let op_len = rest
        .chars()
        .take_while(|c| matches!(c, '<' | '>' | '&' | '|'))
        .count();
    // A bare operator (`3>`) takes the next word; `>out` and `2>&1` carry their own
    Some(op_len == rest.len())
}

/// Where the walker is within a simple command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// The next significant word is a command.
    Command,
    /// Past the command word; only an operator resets.
    Arguments,
    /// Inside a `for`/`select` header.
    LoopHeader,
    /// Between `case` and `in`.
    CaseHeader,
    /// After `case ... in`: words up to one ending in `)` form a pattern.
    CasePattern,
}

/// A word with subshell grouping parens removed: `(rm` → `rm`, `ls)` → `ls`.
pub fn strip_grouping(word: &str) -> &str {
    word.trim_start_matches('(').trim_end_matches(')')
}

/// Indices of the words in command position.
///
/// The walker starts in command position and returns to it after each
/// operator word. Keywords, flags, assignments and redirections are skipped,
/// as are loop headers and `case` subjects and patterns. Grouping parens do
/// not hide a command: `(rm` is in command position.
pub fn command_positions(words: &[String]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut position = Position::Command;
    let mut skip_next = false;

    for (i, word) in words.iter().enumerate() {
        if skip_next {
            skip_next = false;
            continue;
        }
        let word = word.as_str();
        if OPERATOR_TOKENS.contains(&word) {
            position = Position::Command;
            continue;
        }
        match position {
            Position::Command => {}
            Position::Arguments | Position::LoopHeader => continue,
            Position::CaseHeader => {
                if word == "in" {
                    position = Position::CasePattern;
                }
                continue;
            }
            Position::CasePattern => {
                if word.ends_with(')') {
                    position = Position::Command;
                }
                continue;
            }
        }

        let bare = word.trim_start_matches('(');
        if bare == "case" {
            position = Position::CaseHeader;
            continue;
        }
        if LOOP_KEYWORDS.contains(&bare) {
            position = Position::LoopHeader;
            continue;
        }
        if bare.is_empty()
            || SHELL_KEYWORDS.contains(&bare)
            || bare.starts_with('-')
            || is_assignment(bare)
        {
            continue;
        }
        if let Some(takes_target) = redirection(bare) {
            skip_next = takes_target;
            continue;
        }
        if strip_grouping(bare).is_empty() || SHELL_KEYWORDS.contains(&strip_grouping(bare)) {
            continue;
        }
        positions.push(i);
        position = Position::Arguments;
    }
    positions
}

/// Base names of the commands a word list runs, in order.
fn commands_in_words(words: &[String]) -> Vec<String> {
    command_positions(words)
        .into_iter()
        .map(|i| command_name(strip_grouping(&words[i])))
        .collect()
}

fn segment(text: String) -> CommandSegment {
    let words = shell_words(&text);
    let commands = words.words().map(commands_in_words).unwrap_or_default();
    CommandSegment {
        text,
        words,
        commands,
    }
}

fn collect_segments(command: &str, out: &mut Vec<CommandSegment>, depth: usize) {
    let (outer, inners) = extract_substitutions(command);
    // Substitutions run before the command that contains them
    if depth < MAX_SUBSTITUTION_DEPTH {
        for inner in &inners {
            collect_segments(inner, out, depth + 1);
        }
    }
    let (parts, _) = split_compound_command(&outer);
    out.extend(parts.into_iter().map(segment));
}

/// Split a command line into the segments that will run, substitution
/// bodies first, each with its tokenization and base command names.
pub fn split_command_segments(command: &str) -> Vec<CommandSegment> {
    let mut segments = Vec::new();
    collect_segments(command, &mut segments, 0);
    segments
}

/// Extract the ordered base command names from a command line.
///
/// Empty input yields an empty list. Inputs with Windows paths, or with a
/// segment POSIX splitting rejects, go through
/// [`fallback_extract_commands`]. Never panics.
pub fn extract_commands(command: &str) -> Vec<String> {
    let command = command.trim();
    if command.is_empty() {
        return Vec::new();
    }
    if contains_windows_path(command) {
        return fallback_extract_commands(command);
    }
    let segments = split_command_segments(command);
    if segments.iter().any(|s| !s.words.is_ok()) {
        return fallback_extract_commands(command);
    }
    segments.into_iter().flat_map(|s| s.commands).collect()
}

/// Cut at chain, pipe, background and newline separators regardless of
/// quoting. An `&` touching `<` or `>` belongs to a redirection.
fn fallback_parts(command: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for sep in FALLBACK_SEPARATOR.find_iter(command) {
        if sep.as_str() == "&"
            && (command[..sep.start()].ends_with(['<', '>'])
                || command[sep.end()..].starts_with('>'))
        {
            continue;
        }
        parts.push(&command[start..sep.start()]);
        start = sep.end();
    }
    parts.push(&command[start..]);
    parts
}

/// Permissive regex extraction for input POSIX rules can't handle.
///
/// Splits on `&&`, `||`, `|`, `;`, `&` and newlines regardless of quoting,
/// drops leading assignments, and takes the first token of each part.
/// Results that look like code fragments rather than command names are
/// discarded.
pub fn fallback_extract_commands(command: &str) -> Vec<String> {
    fallback_parts(command)
        .into_iter()
        .filter_map(|part| {
            let part = part.trim();
            let rest = &part[LEADING_ASSIGNMENTS.find(part).map_or(0, |m| m.end())..];
            let caps = FIRST_TOKEN.captures(rest)?;
            let token = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
            let name = command_name(token.as_str());
            let fragment = name.is_empty() || name.contains(['(', ')', '.']);
            (!fragment).then_some(name)
        })
        .collect()
}
