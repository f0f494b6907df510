//! Exclude pattern compiler.
//!
//! Patterns use a tiny glob grammar over `/`-separated path strings:
//!
//! | token | meaning                                         | regex            |
//! |-------|-------------------------------------------------|------------------|
//! | `**`  | any characters, separators included             | `[\s\S]*`        |
//! | `*`   | any run of characters within one segment        | `[^/]*`          |
//! | `?`   | zero or one character within one segment       | `[^/]?`          |
//! | other | itself                                          | escaped literal  |
//!
//! `**` is recognised before `*`, and `*` before `?`. A pattern that does not
//! start with `**` gets an implicit leading-directories prefix, so `dist`
//! excludes `dist`, `plugin/dist` and everything below either. Compiled
//! patterns match a path exactly or as a directory prefix of it.

use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, VishopError};

pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(char),
    /// Zero or more whole leading directories; only ever inserted implicitly.
    LeadingDirs,
    DoubleStar,
    Star,
    Question,
}

impl Token {
    fn fragment(&self) -> String {
        match self {
            Token::Literal(c) => regex::escape(c.encode_utf8(&mut [0; 4])),
            Token::LeadingDirs => r"(?:[\s\S]*/)?".to_string(),
            Token::DoubleStar => r"[\s\S]*".to_string(),
            Token::Star => format!("[^{SEPARATOR}]*"),
            Token::Question => format!("[^{SEPARATOR}]?"),
        }
    }
}

/// Split a pattern into tokens, longest wildcard first.
pub fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        let token = match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                Token::DoubleStar
            }
            '*' => Token::Star,
            '?' => Token::Question,
            other => Token::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

/// Concatenate the regex fragments of `tokens`.
pub fn translate(tokens: &[Token]) -> String {
    tokens.iter().map(Token::fragment).collect()
}

/// One compiled exclude (or search) pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile an anchored exclude pattern. Empty patterns are rejected.
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(VishopError::Config("empty exclude pattern".into()));
        }
        let mut tokens = tokenize(pattern);
        if tokens.first() != Some(&Token::DoubleStar) {
            tokens.insert(0, Token::LeadingDirs);
        }
        let body = translate(&tokens);
        Self::build(pattern, &format!("^(?:{body}{SEPARATOR}|{body}$)"))
    }

    /// Compile an unanchored pattern that matches anywhere inside a name.
    pub fn search(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(VishopError::Config("empty search pattern".into()));
        }
        Self::build(pattern, &translate(&tokenize(pattern)))
    }

    fn build(source: &str, expr: &str) -> Result<Self> {
        let regex = Regex::new(expr)
            .map_err(|e| VishopError::Config(format!("invalid pattern '{source}': {e}")))?;
        debug!(pattern = source, regex = expr, "Compiled pattern");
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &str {
        self.regex.as_str()
    }
}

/// Ordered set of compiled exclude patterns, built once per build.
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    patterns: Vec<Pattern>,
}

impl ExcludeFilter {
    /// Compile every non-empty pattern, keeping their order.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter(|p| !p.as_ref().is_empty())
            .map(|p| Pattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// The first pattern matching `path`, if any.
    pub fn first_match(&self, path: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.matches(path))
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.first_match(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Read exclude patterns from a gitignore-style file.
///
/// Blank lines and `#` comments are skipped, leading and trailing separators
/// are trimmed. Negated (`!`) lines are not supported and are ignored.
pub fn read_ignore_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let mut patterns = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('!') {
            warn!(path = %path.display(), line, "Negated ignore patterns are not supported, skipping");
            continue;
        }
        let trimmed = line.trim_matches(SEPARATOR);
        if !trimmed.is_empty() {
            patterns.push(trimmed.to_string());
        }
    }
    debug!(path = %path.display(), count = patterns.len(), "Read ignore file");
    Ok(patterns)
}
