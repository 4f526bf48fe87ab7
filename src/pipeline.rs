//! One pass of the tool: upgrade, build, then diagnose every reported error.
//!
//! Failures before the per-error loop are fatal. Inside the loop a failure
//! only affects the suggestion for that error. Package-manager commands block
//! until the child exits, so they run on tokio's blocking pool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::{self, JoinError};
use tracing::{info, warn};

use crate::build::{BuildResult, BuildRunner};
use crate::config::ProjectConfig;
use crate::diagnostics::Diagnostics;
use crate::error::RunError;
use crate::llm::LlmClient;
use crate::process::ProcessRunner;
use crate::prompt::build_prompt;
use crate::report::Reporter;
use crate::snippet;
use crate::upgrade::{Upgrade, Upgrader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    BuildSucceeded,
    /// Build failed but no line matched the diagnostic shape
    FailedWithoutDiagnostics,
    Diagnosed { errors: usize, unavailable: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub upgrades: Vec<Upgrade>,
    pub outcome: Outcome,
}

pub struct Pipeline<'a> {
    project_dir: PathBuf,
    project: &'a ProjectConfig,
    runner: Arc<dyn ProcessRunner>,
    client: &'a dyn LlmClient,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        project_dir: impl AsRef<Path>,
        project: &'a ProjectConfig,
        runner: Arc<dyn ProcessRunner>,
        client: &'a dyn LlmClient,
    ) -> Self {
        Self {
            project_dir: project_dir.as_ref().to_path_buf(),
            project,
            runner,
            client,
        }
    }

    pub async fn run<W: Write>(&self, reporter: &mut Reporter<W>) -> Result<RunSummary, RunError> {
        let upgrades = if self.project.skip_upgrade {
            info!("Skipping dependency upgrade");
            Vec::new()
        } else {
            info!("Upgrading dependencies in {}", self.project_dir.display());
            let upgrades = self.upgrade().await?;
            reporter.upgrades(&upgrades)?;
            upgrades
        };

        let build = self.build().await?;

        if build.succeeded {
            reporter.build_succeeded()?;
            return Ok(RunSummary {
                upgrades,
                outcome: Outcome::BuildSucceeded,
            });
        }

        let diagnostics = Diagnostics::parse(&build.raw_output);
        if diagnostics.is_empty() {
            warn!("Build failed without any recognizable diagnostics");
            reporter.build_failed_raw(&build.raw_output)?;
            return Ok(RunSummary {
                upgrades,
                outcome: Outcome::FailedWithoutDiagnostics,
            });
        }

        let mut errors = 0;
        let mut unavailable = 0;
        for record in diagnostics {
            errors += 1;
            let snippet = snippet::locate(&self.project_dir, &record, self.project.snippet_radius);
            let prompt = build_prompt(&record, &snippet);

            info!("Requesting suggestion for {}:{}", record.file_path, record.line);
            let suggestion = self.client.complete(&prompt).await;
            if let Err(ref e) = suggestion {
                warn!("No suggestion for {}:{}: {}", record.file_path, record.line, e);
                unavailable += 1;
            }

            reporter.error_block(&record, &prompt, &suggestion)?;
        }

        reporter.summary(errors, unavailable)?;
        Ok(RunSummary {
            upgrades,
            outcome: Outcome::Diagnosed {
                errors,
                unavailable,
            },
        })
    }

    async fn upgrade(&self) -> Result<Vec<Upgrade>, RunError> {
        let runner = Arc::clone(&self.runner);
        let package_manager = self.project.package_manager.clone();
        let project_dir = self.project_dir.clone();
        task::spawn_blocking(move || {
            Upgrader::new(runner.as_ref(), package_manager).upgrade(&project_dir)
        })
        .await
        .map_err(|e| panicked("upgrade", e))?
    }

    async fn build(&self) -> Result<BuildResult, RunError> {
        let runner = Arc::clone(&self.runner);
        let package_manager = self.project.package_manager.clone();
        let script = self.project.build_script.clone();
        let error_log = self.project.error_log.clone();
        let project_dir = self.project_dir.clone();
        task::spawn_blocking(move || {
            BuildRunner::new(runner.as_ref(), package_manager, script)
                .with_error_log(error_log)
                .build(&project_dir)
        })
        .await
        .map_err(|e| panicked("build", e))?
    }
}

fn panicked(stage: &'static str, err: JoinError) -> RunError {
    RunError::Panicked {
        stage,
        reason: err.to_string(),
    }
}
