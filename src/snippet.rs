use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::diagnostics::ErrorRecord;

/// Source lines around a diagnostic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snippet {
    /// 1-based number of the first line, 0 when empty
    pub start_line: usize,
    pub lines: Vec<String>,
}

impl Snippet {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 1-based number of the last line, 0 when empty
    pub fn end_line(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.start_line + self.lines.len() - 1
        }
    }

    /// Cut `line - radius ..= line + radius` out of `source`, clamped to its bounds
    pub fn from_source(source: &str, line: usize, radius: usize) -> Self {
        let all: Vec<&str> = source.lines().collect();
        if line == 0 || line > all.len() {
            return Self::default();
        }
        let start = line.saturating_sub(radius).max(1);
        let end = (line + radius).min(all.len());
        Self {
            start_line: start,
            lines: all[start - 1..end].iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl fmt::Display for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Read the file named by `record` and return the lines around it.
///
/// An unreadable file gives an empty snippet: the file may have moved since
/// the build ran, and the prompt is still worth sending without code.
pub fn locate(project_dir: &Path, record: &ErrorRecord, radius: usize) -> Snippet {
    let path = project_dir.join(&record.file_path);
    match fs::read_to_string(&path) {
        Ok(source) => {
            let snippet = Snippet::from_source(&source, record.line, radius);
            if snippet.is_empty() {
                warn!("Line {} is outside {}", record.line, path.display());
            } else {
                debug!(
                    "Context for {}: lines {}-{}",
                    record.file_path,
                    snippet.start_line,
                    snippet.end_line()
                );
            }
            snippet
        }
        Err(e) => {
            warn!("Could not read {} for context: {}", path.display(), e);
            Snippet::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {}\n", i)).collect()
    }

    fn record(file: &str, line: usize) -> ErrorRecord {
        ErrorRecord {
            file_path: file.to_string(),
            line,
            column: 1,
            code: "TS2339".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_window_centered_on_line() {
        let snippet = Snippet::from_source(&numbered(20), 10, 2);
        assert_eq!(snippet.start_line, 8);
        assert_eq!(snippet.end_line(), 12);
        assert_eq!(snippet.lines.first().unwrap(), "line 8");
        assert_eq!(snippet.lines.last().unwrap(), "line 12");
    }

    #[test]
    fn test_window_clamped_to_bounds() {
        let top = Snippet::from_source(&numbered(4), 1, 5);
        assert_eq!(top.start_line, 1);
        assert_eq!(top.lines.len(), 4);

        let bottom = Snippet::from_source(&numbered(10), 10, 3);
        assert_eq!(bottom.start_line, 7);
        assert_eq!(bottom.end_line(), 10);
    }

    #[test]
    fn test_out_of_range_line_is_empty() {
        assert!(Snippet::from_source(&numbered(3), 4, 2).is_empty());
        assert!(Snippet::from_source(&numbered(3), 0, 2).is_empty());
        assert!(Snippet::from_source("", 1, 2).is_empty());
        assert_eq!(Snippet::default().end_line(), 0);
    }

    #[test]
    fn test_display_joins_lines() {
        let snippet = Snippet::from_source("a\nb\nc\n", 2, 1);
        assert_eq!(snippet.to_string(), "a\nb\nc");
    }

    #[test]
    fn test_locate_reads_relative_to_project() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/server.ts"), numbered(30)).unwrap();

        let snippet = locate(dir.path(), &record("src/server.ts", 15), 5);
        assert_eq!(snippet.start_line, 10);
        assert_eq!(snippet.lines.len(), 11);
        assert!(snippet.lines.contains(&"line 15".to_string()));
    }

    #[test]
    fn test_locate_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let snippet = locate(dir.path(), &record("src/gone.ts", 3), 5);
        assert!(snippet.is_empty());
    }
}
