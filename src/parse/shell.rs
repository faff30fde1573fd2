use super::types::Operator;

/// Stands in for an extracted `$()`, backtick or process substitution span.
pub const SUBST_PLACEHOLDER: &str = "__SUBST__";

/// Quote/escape state while scanning a command character by character.
#[derive(Debug, Default)]
struct Quotes {
    single: bool,
    double: bool,
    escape: bool,
}

impl Quotes {
    /// Advance over `c`. Returns true when `c` is a quote or escape
    /// character, or is itself escaped.
    fn step(&mut self, c: char) -> bool {
        if self.escape {
            self.escape = false;
            return true;
        }
        if c == '\\' && !self.single {
            self.escape = true;
            return true;
        }
        if c == '\'' && !self.double {
            self.single = !self.single;
            return true;
        }
        if c == '"' && !self.single {
            self.double = !self.double;
            return true;
        }
        false
    }

    fn quoted(&self) -> bool {
        self.single || self.double
    }
}

/// A heredoc whose body has not been reached yet.
#[derive(Debug)]
struct PendingHeredoc {
    delimiter: String,
    strip_tabs: bool,
}

/// Split a command at shell operators (&&, ||, ;, |, |&, &, newline),
/// respecting single/double quotes and backslash escapes.
///
/// Heredoc bodies are data, not commands, and are dropped.
/// Returns segments and the operators between them.
pub fn split_compound_command(command: &str) -> (Vec<String>, Vec<Operator>) {
    let mut parts = Vec::new();
    let mut operators = Vec::new();
    let mut buf = String::new();
    let mut pending: Vec<PendingHeredoc> = Vec::new();

    let chars: Vec<char> = command.chars().collect();
    let len = chars.len();
    let mut i = 0;
    let mut quotes = Quotes::default();

    let mut flush = |buf: &mut String, op: Operator| {
        parts.push(buf.trim().to_string());
        operators.push(op);
        buf.clear();
    };

    while i < len {
        let c = chars[i];

        if quotes.step(c) || quotes.quoted() {
            buf.push(c);
            i += 1;
            continue;
        }

        // Heredoc `<<DELIM` / `<<-DELIM` (but not the `<<<` here-string)
        if c == '<'
            && chars.get(i + 1) == Some(&'<')
            && chars.get(i + 2) != Some(&'<')
            && !buf.ends_with('<')
        {
            let (heredoc, end) = read_heredoc_delimiter(&chars, i + 2);
            if let Some(heredoc) = heredoc {
                pending.push(heredoc);
            }
            buf.extend(&chars[i..end]);
            i = end;
            continue;
        }

        if c == '\n' {
            i = if pending.is_empty() {
                i + 1
            } else {
                skip_heredoc_bodies(&chars, i + 1, &mut pending)
            };
            flush(&mut buf, Operator::Semi);
            continue;
        }

        // Two-char operators
        if let Some(&next) = chars.get(i + 1) {
            let op = match (c, next) {
                ('&', '&') => Some(Operator::And),
                ('|', '|') => Some(Operator::Or),
                ('|', '&') => Some(Operator::PipeErr),
                _ => None,
            };
            if let Some(op) = op {
                flush(&mut buf, op);
                i += 2;
                continue;
            }
        }

        // Single-char operators
        match c {
            '|' => {
                flush(&mut buf, Operator::Pipe);
                i += 1;
                continue;
            }
            ';' => {
                flush(&mut buf, Operator::Semi);
                i += 1;
                continue;
            }
            // `&>`, `>&2`, `2>&1` and `<&0` are redirections, not backgrounding
            '&' if chars.get(i + 1) != Some(&'>') && !buf.ends_with(['>', '<']) => {
                flush(&mut buf, Operator::Background);
                i += 1;
                continue;
            }
            _ => {}
        }

        buf.push(c);
        i += 1;
    }

    let tail = buf.trim().to_string();
    if !tail.is_empty() {
        parts.push(tail);
    }

    // Filter empties
    parts.retain(|p| !p.is_empty());

    (parts, operators)
}

/// Read the delimiter word after `<<`. Returns the heredoc (if a delimiter
/// was present) and the index just past the word.
fn read_heredoc_delimiter(chars: &[char], start: usize) -> (Option<PendingHeredoc>, usize) {
    let mut i = start;
    let strip_tabs = chars.get(i) == Some(&'-');
    if strip_tabs {
        i += 1;
    }
    while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
        i += 1;
    }
    let mut delimiter = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || matches!(c, ';' | '|' | '&' | '<' | '>' | '(' | ')') {
            break;
        }
        if !matches!(c, '\'' | '"' | '\\') {
            delimiter.push(c);
        }
        i += 1;
    }
    let heredoc = (!delimiter.is_empty()).then_some(PendingHeredoc {
        delimiter,
        strip_tabs,
    });
    (heredoc, i)
}

/// Skip the bodies of all pending heredocs, starting at the line after the
/// one that introduced them. Returns the index after the last terminator.
fn skip_heredoc_bodies(chars: &[char], start: usize, pending: &mut Vec<PendingHeredoc>) -> usize {
    let mut i = start;
    for heredoc in pending.drain(..) {
        while i < chars.len() {
            let line_end = chars[i..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(chars.len(), |p| i + p);
            let line: String = chars[i..line_end].iter().collect();
            i = (line_end + 1).min(chars.len());
            let line = line.trim_end_matches('\r');
            let line = if heredoc.strip_tabs {
                line.trim_start_matches('\t')
            } else {
                line
            };
            if line == heredoc.delimiter {
                break;
            }
        }
    }
    i
}

/// Scan a balanced `( ... )` body starting just after the opening paren.
/// Returns the body and the index after the closing paren (or the end of
/// input when unbalanced).
fn take_balanced(chars: &[char], start: usize) -> (String, usize) {
    let mut depth: u32 = 1;
    let mut inner = String::new();
    let mut quotes = Quotes::default();
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if !quotes.step(c) && !quotes.quoted() {
            if c == '(' {
                depth += 1;
            }
            if c == ')' {
                depth -= 1;
                if depth == 0 {
                    return (inner, i + 1);
                }
            }
        }
        inner.push(c);
        i += 1;
    }
    (inner, i)
}

/// End of a `$((...))` arithmetic expansion starting at `start`.
///
/// `$((` is arithmetic only when the paren it opens closes right before the
/// final `)`. Otherwise, as in `$((cmd) )`, it is a command substitution
/// whose body starts with a subshell.
fn arithmetic_end(chars: &[char], start: usize) -> Option<usize> {
    if chars.get(start + 2) != Some(&'(') {
        return None;
    }
    let (_, end) = take_balanced(chars, start + 3);
    (chars.get(end) == Some(&')')).then_some(end + 1)
}

/// Extract command substitution contents from `$(...)`, backticks and
/// process substitution `<(...)` / `>(...)`.
/// Returns the outer command with substitutions replaced by
/// [`SUBST_PLACEHOLDER`], plus the extracted inner command strings.
///
/// Handles nesting: `$(cat $(which foo))` extracts `cat $(which foo)`,
/// which callers extract again. `$(...)` and backticks are extracted even
/// inside double quotes (the shell expands them there); only single quotes
/// block detection. `$((...))` is arithmetic and stays in place.
pub fn extract_substitutions(command: &str) -> (String, Vec<String>) {
    let chars: Vec<char> = command.chars().collect();
    let len = chars.len();
    let mut outer = String::new();
    let mut inners = Vec::new();
    let mut i = 0;
    let mut quotes = Quotes::default();

    fn keep(inner: String, inners: &mut Vec<String>) {
        let trimmed = inner.trim();
        if !trimmed.is_empty() {
            inners.push(trimmed.to_string());
        }
    }

    while i < len {
        let c = chars[i];

        if quotes.step(c) || quotes.single {
            outer.push(c);
            i += 1;
            continue;
        }

        if c == '$' && chars.get(i + 1) == Some(&'(') {
            if let Some(end) = arithmetic_end(&chars, i) {
                outer.extend(&chars[i..end]);
                i = end;
                continue;
            }
            let (inner, end) = take_balanced(&chars, i + 2);
            keep(inner, &mut inners);
            outer.push_str(SUBST_PLACEHOLDER);
            i = end;
            continue;
        }

        // Backtick: extract to matching backtick (no nesting)
        if c == '`' {
            let mut inner = String::new();
            i += 1;
            while i < len && chars[i] != '`' {
                if chars[i] == '\\' && i + 1 < len {
                    inner.push(chars[i]);
                    inner.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                inner.push(chars[i]);
                i += 1;
            }
            i = (i + 1).min(len);
            keep(inner, &mut inners);
            outer.push_str(SUBST_PLACEHOLDER);
            continue;
        }

        // Process substitution; the < or > prefix is dropped along with the body
        if (c == '<' || c == '>') && chars.get(i + 1) == Some(&'(') && !quotes.double {
            let (inner, end) = take_balanced(&chars, i + 2);
            keep(inner, &mut inners);
            outer.push_str(SUBST_PLACEHOLDER);
            i = end;
            continue;
        }

        outer.push(c);
        i += 1;
    }

    (outer, inners)
}
