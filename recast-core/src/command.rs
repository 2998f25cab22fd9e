//! Turns a profile and an input path into a runnable command.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::profile::Profile;
use crate::template;

/// A template word that is replaced at synthesis time.
///
/// Only whole words match: `<file>` is a placeholder, `out.<file>` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `<file>`: the input path, passed as one argument.
    File,
    /// `<seek>`: the seek offset in microseconds, e.g. `1500000us`.
    Seek,
    /// `<bitrate>`: the bitrate in kbit/s, e.g. `128k`.
    Bitrate,
}

impl Placeholder {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "<file>" => Some(Placeholder::File),
            "<seek>" => Some(Placeholder::Seek),
            "<bitrate>" => Some(Placeholder::Bitrate),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::File => "<file>",
            Placeholder::Seek => "<seek>",
            Placeholder::Bitrate => "<bitrate>",
        }
    }

    /// Value this placeholder stands for. Zero seek and zero bitrate are
    /// substituted like any other value.
    pub fn expand(&self, profile: &Profile, input: &Path) -> OsString {
        match self {
            Placeholder::File => input.as_os_str().to_owned(),
            Placeholder::Seek => format!("{}us", profile.seek().as_micros()).into(),
            Placeholder::Bitrate => format!("{}k", profile.bitrate()).into(),
        }
    }
}

/// Map every template word after the program name to its argument.
pub fn substitute<S: AsRef<str>>(words: &[S], profile: &Profile, input: &Path) -> Vec<OsString> {
    words
        .iter()
        .map(|word| {
            let word = word.as_ref();
            match Placeholder::from_token(word) {
                Some(placeholder) => placeholder.expand(profile, input),
                None => OsString::from(word),
            }
        })
        .collect()
}

/// A resolved program and its arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl fmt::Display for SynthesizedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the command for `profile` reading `input`, resolving the program
/// through `PATH`.
pub fn synthesize(profile: &Profile, input: &Path) -> Result<SynthesizedCommand> {
    build(profile, input, |program| which::which(program))
}

/// Same as [`synthesize`] but searches `search_path` (a `PATH`-style list)
/// instead of the process environment. Relative program paths resolve
/// against `cwd`.
pub fn synthesize_in(
    profile: &Profile,
    input: &Path,
    search_path: impl AsRef<OsStr>,
    cwd: &Path,
) -> Result<SynthesizedCommand> {
    let search_path = search_path.as_ref();
    build(profile, input, |program| {
        which::which_in(program, Some(search_path), cwd)
    })
}

/// Placeholders the profile's template uses, in template order.
///
/// A host can check this before running, e.g. to insist on a bitrate only
/// when the command actually takes one.
pub fn placeholders(profile: &Profile) -> Result<Vec<Placeholder>> {
    Ok(words(profile)?
        .iter()
        .filter_map(|word| Placeholder::from_token(word))
        .collect())
}

fn words(profile: &Profile) -> Result<Vec<String>> {
    let exec = profile.exec_template();
    template::split(exec).map_err(|source| Error::MalformedTemplate {
        template: exec.to_string(),
        source,
    })
}

fn build<F>(profile: &Profile, input: &Path, resolve: F) -> Result<SynthesizedCommand>
where
    F: FnOnce(&str) -> std::result::Result<PathBuf, which::Error>,
{
    let words = words(profile)?;

    let (name, rest) = words.split_first().ok_or(Error::NoProfileParts)?;
    let program = resolve(name).map_err(|source| Error::ProgramNotFound {
        program: name.clone(),
        source,
    })?;

    Ok(SynthesizedCommand {
        program,
        args: substitute(rest, profile, input),
    })
}
