use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::RunError;
use crate::process::ProcessRunner;
use crate::util::display_command;

/// Outcome of one build invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub succeeded: bool,
    /// stdout followed by stderr
    pub raw_output: String,
}

pub struct BuildRunner<'a> {
    runner: &'a dyn ProcessRunner,
    package_manager: String,
    script: String,
    error_log: Option<String>,
}

impl<'a> BuildRunner<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        package_manager: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            package_manager: package_manager.into(),
            script: script.into(),
            error_log: None,
        }
    }

    /// Also write the output of a failed build to this path (relative to the project)
    pub fn with_error_log(mut self, error_log: Option<String>) -> Self {
        self.error_log = error_log;
        self
    }

    /// Run the build script. A failing build is a normal result; only a launch
    /// failure is an error.
    pub fn build(&self, project_dir: &Path) -> Result<BuildResult, RunError> {
        let args = ["run", self.script.as_str()];
        info!("Building with `{}`", display_command(&self.package_manager, &args));

        let output = self.runner.run(&self.package_manager, &args, project_dir)?;
        let result = BuildResult {
            succeeded: output.success(),
            raw_output: output.combined(),
        };

        if result.succeeded {
            info!("Build succeeded");
        } else {
            info!("Build failed with {}", output.status_label());
            self.write_error_log(project_dir, &result.raw_output);
        }
        Ok(result)
    }

    fn write_error_log(&self, project_dir: &Path, raw_output: &str) {
        let Some(ref log) = self.error_log else {
            return;
        };
        let path = project_dir.join(log);
        match fs::write(&path, raw_output) {
            Ok(()) => info!("Build output written to {}", path.display()),
            Err(e) => warn!("Could not write build log {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutput;
    use std::sync::Mutex;

    struct ScriptedRunner {
        output: ProcessOutput,
        calls: Mutex<Vec<String>>,
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(
            &self,
            program: &str,
            args: &[&str],
            _cwd: &Path,
        ) -> Result<ProcessOutput, RunError> {
            self.calls.lock().unwrap().push(display_command(program, args));
            Ok(self.output.clone())
        }
    }

    fn runner(exit_code: i32, stdout: &str, stderr: &str) -> ScriptedRunner {
        ScriptedRunner {
            output: ProcessOutput {
                exit_code: Some(exit_code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_successful_build() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = runner(0, "> tsc\n", "");
        let result = BuildRunner::new(&runner, "npm", "build")
            .build(dir.path())
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(runner.calls.lock().unwrap().as_slice(), ["npm run build"]);
    }

    #[test]
    fn test_failed_build_is_not_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = runner(2, "src/a.ts(1,1): error TS1005: ';' expected.\n", "npm ERR! exit 2\n");
        let result = BuildRunner::new(&runner, "pnpm", "compile")
            .build(dir.path())
            .unwrap();
        assert!(!result.succeeded);
        assert!(result.raw_output.contains("TS1005"));
        assert!(result.raw_output.contains("npm ERR!"));
        assert_eq!(runner.calls.lock().unwrap().as_slice(), ["pnpm run compile"]);
    }

    #[test]
    fn test_error_log_written_only_on_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = Some("build_errors.log".to_string());

        let ok = runner(0, "done\n", "");
        BuildRunner::new(&ok, "npm", "build")
            .with_error_log(log.clone())
            .build(dir.path())
            .unwrap();
        assert!(!dir.path().join("build_errors.log").exists());

        let failing = runner(1, "broken\n", "");
        BuildRunner::new(&failing, "npm", "build")
            .with_error_log(log)
            .build(dir.path())
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("build_errors.log")).unwrap(),
            "broken\n"
        );
    }
}
