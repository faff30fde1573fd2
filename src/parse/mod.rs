pub mod extract;
pub mod shell;
pub mod tokenize;
pub mod types;

pub use extract::{
    command_positions, contains_windows_path, extract_commands, fallback_extract_commands,
    split_command_segments, strip_grouping,
};
pub use shell::{SUBST_PLACEHOLDER, extract_substitutions, split_compound_command};
pub use tokenize::{assignments, command_name, env_vars, is_assignment, shell_words};
pub use types::{CommandSegment, Operator, Tokenized};
