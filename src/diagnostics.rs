//! Error extractor for `tsc`-style diagnostic lines:
//!
//! ```text
//! src/server.ts(12,7): error TS2339: Property 'del' does not exist on type 'Express'.
//! ```
//!
//! Lines in any other shape are ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static DIAGNOSTIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<path>[^\s(][^(]*)\((?P<line>\d+),(?P<col>\d+)\)",
        r": error (?P<code>[A-Za-z]*\d+): (?P<message>.*?)\r?$",
    ))
    .expect("diagnostic pattern is valid")
});

/// One structured compiler error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub file_path: String,
    pub line: usize,
    pub column: usize,
    pub code: String,
    pub message: String,
}

impl ErrorRecord {
    /// Parse a single diagnostic line, `None` if it is not one
    pub fn parse_line(line: &str) -> Option<Self> {
        let caps = DIAGNOSTIC_RE.captures(line)?;
        Some(Self {
            file_path: caps["path"].trim_end().to_string(),
            line: caps["line"].parse().ok()?,
            column: caps["col"].parse().ok()?,
            code: caps["code"].to_string(),
            message: caps["message"].to_string(),
        })
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{}): error {}: {}",
            self.file_path, self.line, self.column, self.code, self.message
        )
    }
}

/// Diagnostics found in a build log. Borrowed and re-scannable: every call to
/// [`Diagnostics::iter`] starts over from the first line.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics<'a> {
    raw: &'a str,
}

impl<'a> Diagnostics<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self { raw }
    }

    pub fn iter(&self) -> impl Iterator<Item = ErrorRecord> + 'a {
        self.raw.lines().filter_map(ErrorRecord::parse_line)
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for Diagnostics<'a> {
    type Item = ErrorRecord;
    type IntoIter = Box<dyn Iterator<Item = ErrorRecord> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
