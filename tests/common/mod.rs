//! Shared fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bumpfix::error::{RunError, SuggestionError};
use bumpfix::llm::LlmClient;
use bumpfix::process::{ProcessOutput, ProcessRunner};
use bumpfix::util::display_command;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

pub const SERVER_DIAGNOSTIC: &str =
    "src/server.ts(18,5): error TS2339: Property 'del' does not exist on type 'Express'.";

/// Answers commands from a script keyed by the rendered command line.
/// Unscripted commands fail to launch.
#[derive(Default)]
pub struct FakeRunner {
    script: HashMap<String, ProcessOutput>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, command: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.script.insert(
            command.to_string(),
            ProcessOutput {
                exit_code: Some(exit_code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str], _cwd: &Path) -> Result<ProcessOutput, RunError> {
        let command = display_command(program, args);
        self.calls.lock().unwrap().push(command.clone());
        self.script
            .get(&command)
            .cloned()
            .ok_or_else(|| RunError::Launch {
                command,
                reason: "No such file or directory (os error 2)".to_string(),
            })
    }
}

/// Returns scripted answers in order and records every prompt it receives
#[derive(Default)]
pub struct StubClient {
    answers: Mutex<VecDeque<Result<String, SuggestionError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubClient {
    pub fn new(answers: Vec<Result<String, SuggestionError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for StubClient {
    async fn complete(&self, prompt: &str) -> Result<String, SuggestionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("stub suggestion".to_string()))
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample-nodejs")
}

/// Copy the sample project into a scratch directory the test may mutate
pub fn scratch_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    copy_dir(&fixture_dir(), dir.path());
    dir
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}
