//! Error taxonomy.
//!
//! [`RunError`] aborts the run. [`SuggestionError`] only ever affects the
//! suggestion for a single diagnostic; the run reports it and moves on.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of the setup phase (upgrade, build launch) or of the output stream.
#[derive(Error, Debug)]
pub enum RunError {
    /// `package.json` is missing, unreadable, not JSON, or not a JSON object
    #[error("manifest error at {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },

    /// The package manager failed while listing or installing packages
    #[error("dependency upgrade failed: {reason}{}", stderr_suffix(.stderr))]
    Upgrade { reason: String, stderr: String },

    /// A child process could not be started or did not finish in time
    #[error("failed to launch `{command}`: {reason}")]
    Launch { command: String, reason: String },

    /// A stage running on the blocking thread pool panicked
    #[error("{stage} stage panicked: {reason}")]
    Panicked { stage: &'static str, reason: String },

    /// The report could not be written
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

/// Why a suggestion could not be obtained for one diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuggestionError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("local model unavailable: {0}")]
    ModelLoad(String),

    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("backend returned no suggestion text")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_error_includes_stderr() {
        let err = RunError::Upgrade {
            reason: "`npm install` exited with status 1".to_string(),
            stderr: "npm ERR! ERESOLVE could not resolve\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exited with status 1"));
        assert!(msg.ends_with("npm ERR! ERESOLVE could not resolve"));
    }

    #[test]
    fn test_upgrade_error_without_stderr() {
        let err = RunError::Upgrade {
            reason: "bad output".to_string(),
            stderr: "  \n".to_string(),
        };
        assert_eq!(err.to_string(), "dependency upgrade failed: bad output");
    }

    #[test]
    fn test_manifest_error_names_path() {
        let err = RunError::Manifest {
            path: PathBuf::from("/tmp/app/package.json"),
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(err.to_string().contains("/tmp/app/package.json"));
    }

    #[test]
    fn test_panicked_names_stage() {
        let err = RunError::Panicked {
            stage: "build",
            reason: "task 7 panicked".to_string(),
        };
        assert_eq!(err.to_string(), "build stage panicked: task 7 panicked");
    }

    #[test]
    fn test_output_error_from_io() {
        let err: RunError = io::Error::new(io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, RunError::Output(_)));
    }

    #[test]
    fn test_suggestion_error_messages() {
        assert_eq!(
            SuggestionError::Api {
                status: 500,
                body: "boom".to_string()
            }
            .to_string(),
            "backend returned 500: boom"
        );
        assert!(SuggestionError::Auth("GEMINI_API_KEY is not set".to_string())
            .to_string()
            .contains("GEMINI_API_KEY"));
    }
}
