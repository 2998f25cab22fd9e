//! Shell-style word splitting for executable templates.
//!
//! Templates follow POSIX shell quoting, without any expansion:
//!
//! - blanks (space, tab, newline) separate words
//! - `'...'` keeps everything literally
//! - `"..."` keeps everything, except that `\` escapes `"`, `\`, `$`, `` ` ``
//!   and newline
//! - `#` at the start of a word comments out the rest of the line
//!
//! Adjacent quoted and unquoted pieces join into one word, so `-af "a, b"`
//! yields two words and `""` yields one empty word.

/// Why a template could not be split: a quote was opened and never closed.
pub use shell_words::ParseError as TemplateError;

/// Split `template` into words.
pub fn split(template: &str) -> Result<Vec<String>, TemplateError> {
    shell_words::split(template)
}
