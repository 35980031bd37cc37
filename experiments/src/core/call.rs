//! Command-line construction for the external experiment script.
//!
//! Flags are always emitted in the same order so that identical specs render
//! identical command lines:
//!
//! ```text
//! <script> -c <config> -s1 <seed> -s2 <seed> -bi1 <path> -bi2 <path> -b1 -b2 -d1 <dir> -d2 <dir> -o <output> > <log>
//! ```
//!
//! Unset parameters are omitted entirely; an empty path counts as unset.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Named arguments for one invocation of the external script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSpec {
    pub config: Option<PathBuf>,
    pub p1_seed: Option<u32>,
    pub p2_seed: Option<u32>,
    pub p1_bin_in: Option<PathBuf>,
    pub p2_bin_in: Option<PathBuf>,
    pub p1_bin_out: bool,
    pub p2_bin_out: bool,
    pub p1_dir: Option<PathBuf>,
    pub p2_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    /// Where the script's stdout goes. Not passed as an argument.
    pub log_path: Option<PathBuf>,
}

/// A single command-line token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Flag(&'static str),
    Value(String),
    Path(&'a Path),
}

impl CallSpec {
    fn tokens(&self) -> Vec<Token<'_>> {
        let mut tokens = Vec::new();
        push_path(&mut tokens, "-c", self.config.as_deref());
        push_seed(&mut tokens, "-s1", self.p1_seed);
        push_seed(&mut tokens, "-s2", self.p2_seed);
        push_path(&mut tokens, "-bi1", self.p1_bin_in.as_deref());
        push_path(&mut tokens, "-bi2", self.p2_bin_in.as_deref());
        if self.p1_bin_out {
            tokens.push(Token::Flag("-b1"));
        }
        if self.p2_bin_out {
            tokens.push(Token::Flag("-b2"));
        }
        push_path(&mut tokens, "-d1", self.p1_dir.as_deref());
        push_path(&mut tokens, "-d2", self.p2_dir.as_deref());
        push_path(&mut tokens, "-o", self.output_path.as_deref());
        tokens
    }

    /// Argument vector for direct spawning (no script, no log redirection).
    pub fn args(&self) -> Vec<OsString> {
        self.tokens()
            .into_iter()
            .map(|token| match token {
                Token::Flag(flag) => OsString::from(flag),
                Token::Value(value) => OsString::from(value),
                Token::Path(path) => path.as_os_str().to_os_string(),
            })
            .collect()
    }

    /// Render the full shell-style command line, including `> <log>`.
    pub fn render(&self, script: &Path) -> String {
        let mut parts = vec![script.display().to_string()];
        for token in self.tokens() {
            parts.push(match token {
                Token::Flag(flag) => flag.to_string(),
                Token::Value(value) => value,
                Token::Path(path) => path.display().to_string(),
            });
        }
        if let Some(log) = non_empty(self.log_path.as_deref()) {
            parts.push(format!("> {}", log.display()));
        }
        parts.join(" ")
    }

    /// Log redirection target, if set and non-empty.
    pub fn log_target(&self) -> Option<&Path> {
        non_empty(self.log_path.as_deref())
    }
}

fn push_seed<'a>(tokens: &mut Vec<Token<'a>>, flag: &'static str, seed: Option<u32>) {
    if let Some(seed) = seed {
        tokens.push(Token::Flag(flag));
        tokens.push(Token::Value(seed.to_string()));
    }
}

fn push_path<'a>(tokens: &mut Vec<Token<'a>>, flag: &'static str, path: Option<&'a Path>) {
    if let Some(path) = non_empty(path) {
        tokens.push(Token::Flag(flag));
        tokens.push(Token::Path(path));
    }
}

fn non_empty(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}
