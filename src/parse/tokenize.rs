use super::types::Tokenized;

/// Platform extensions stripped from command names (case-insensitive).
const STRIPPED_EXTENSIONS: &[&str] = &[".exe", ".cmd", ".bat", ".ps1", ".sh"];

/// Reduce a command token to its base name: directories (either separator)
/// and a platform extension are removed.
///
/// `/usr/bin/python3` → `python3`, `C:\Python312\python.exe` → `python`,
/// `./init.sh` → `init`.
pub fn command_name(token: &str) -> String {
    let base = match token.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name,
        _ => token,
    };
    for ext in STRIPPED_EXTENSIONS {
        if base.len() > ext.len()
            && let Some(tail) = base.get(base.len() - ext.len()..)
            && tail.eq_ignore_ascii_case(ext)
        {
            return base[..base.len() - ext.len()].to_string();
        }
    }
    base.to_string()
}

/// Whether a word is a shell variable assignment (`NAME=value`).
pub fn is_assignment(word: &str) -> bool {
    let Some((name, _)) = word.split_once('=') else {
        return false;
    };
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Extract leading KEY=VALUE pairs from a command string.
///
/// Works on shell words, so quoted values (`FOO="bar baz" cmd`) stay intact.
pub fn env_vars(command: &str) -> Vec<(String, String)> {
    let tokenized = shell_words(command);
    let Some(words) = tokenized.words() else {
        return Vec::new();
    };
    let leading = words.iter().take_while(|w| is_assignment(w)).count();
    assignments(&words[..leading])
}

/// KEY=VALUE pairs among `words`; other words are ignored.
pub fn assignments(words: &[String]) -> Vec<(String, String)> {
    words
        .iter()
        .map(|w| w.trim_start_matches('('))
        .filter(|w| is_assignment(w))
        .filter_map(|w| w.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Tokenize text into words using shlex (POSIX word splitting).
///
/// When shlex rejects the input, fall back to whitespace splitting with
/// quote characters trimmed and report the result as `Degraded`.
pub fn shell_words(text: &str) -> Tokenized {
    if let Some(words) = shlex::split(text) {
        return Tokenized::Ok(words);
    }
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(['"', '\'']).to_string())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        Tokenized::Failed
    } else {
        Tokenized::Degraded(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_name_simple() {
        assert_eq!(command_name("ls"), "ls");
    }

    #[test]
    fn command_name_absolute_path() {
        assert_eq!(command_name("/usr/bin/python3"), "python3");
    }

    #[test]
    fn command_name_relative_script() {
        assert_eq!(command_name("./init.sh"), "init");
    }

    #[test]
    fn command_name_windows_path() {
        assert_eq!(command_name(r"C:\Python312\python.exe"), "python");
    }

    #[test]
    fn command_name_extension_case_insensitive() {
        assert_eq!(command_name("NPM.CMD"), "NPM");
        assert_eq!(command_name("build.PS1"), "build");
    }

    #[test]
    fn command_name_bare_extension_kept() {
        assert_eq!(command_name(".sh"), ".sh");
    }

    #[test]
    fn command_name_multibyte_no_panic() {
        assert_eq!(command_name("ünïcödé"), "ünïcödé");
    }

    #[test]
    fn command_name_trailing_separator() {
        assert_eq!(command_name("/usr/bin/"), "/usr/bin/");
    }

    #[test]
    fn assignment_detection() {
        assert!(is_assignment("FOO=bar"));
        assert!(is_assignment("_X="));
        assert!(!is_assignment("=bar"));
        assert!(!is_assignment("1X=bar"));
        assert!(!is_assignment("--opt=value"));
        assert!(!is_assignment("ls"));
    }

    #[test]
    fn env_vars_single() {
        let vars = env_vars("FOO=bar cmd");
        assert_eq!(vars, vec![("FOO".into(), "bar".into())]);
    }

    #[test]
    fn env_vars_multiple() {
        let vars = env_vars("A=1 B=2 cmd");
        assert_eq!(
            vars,
            vec![("A".into(), "1".into()), ("B".into(), "2".into())]
        );
    }

    #[test]
    fn env_vars_quoted_value() {
        let vars = env_vars("GIT_AUTHOR_NAME=\"Jane Doe\" git commit");
        assert_eq!(vars, vec![("GIT_AUTHOR_NAME".into(), "Jane Doe".into())]);
    }

    #[test]
    fn assignments_among_keywords() {
        let words: Vec<String> = ["then", "(GIT_AUTHOR_NAME=x", "FOO=1"].map(String::from).to_vec();
        assert_eq!(
            assignments(&words),
            vec![("GIT_AUTHOR_NAME".into(), "x".into()), ("FOO".into(), "1".into())]
        );
    }

    #[test]
    fn env_vars_none() {
        assert!(env_vars("cmd --flag").is_empty());
    }

    #[test]
    fn words_simple() {
        assert_eq!(
            shell_words("ls -la /tmp"),
            Tokenized::Ok(vec!["ls".into(), "-la".into(), "/tmp".into()])
        );
    }

    #[test]
    fn words_quoted() {
        assert_eq!(
            shell_words("echo 'hello world'"),
            Tokenized::Ok(vec!["echo".into(), "hello world".into()])
        );
    }

    #[test]
    fn words_unterminated_quote_degrades() {
        assert_eq!(
            shell_words("echo 'unterminated"),
            Tokenized::Degraded(vec!["echo".into(), "unterminated".into()])
        );
    }

    #[test]
    fn words_lone_quote_fails() {
        assert_eq!(shell_words("'"), Tokenized::Failed);
    }

    #[test]
    fn words_empty_is_ok() {
        assert_eq!(shell_words(""), Tokenized::Ok(vec![]));
    }
}
