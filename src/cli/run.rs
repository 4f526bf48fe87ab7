use anyhow::{bail, Result};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{Backend, Config};
use crate::llm::factory;
use crate::pipeline::{Pipeline, RunSummary};
use crate::process::SystemRunner;
use crate::report::Reporter;

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub local: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub build_script: Option<String>,
    pub skip_upgrade: bool,
    pub error_log: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if self.local {
            info!("CLI override: backend = local");
            config.llm.backend = Backend::Local;
        }
        if let Some(ref provider) = self.provider {
            info!("CLI override: provider = {}", provider);
            config.llm.selected_mut().provider = provider.clone();
        }
        if let Some(ref model) = self.model {
            info!("CLI override: model = {}", model);
            config.llm.selected_mut().model = model.clone();
        }
        if let Some(ref script) = self.build_script {
            info!("CLI override: build_script = {}", script);
            config.project.build_script = script.clone();
        }
        if self.skip_upgrade {
            info!("CLI override: skip_upgrade = true");
            config.project.skip_upgrade = true;
        }
        if let Some(ref log) = self.error_log {
            info!("CLI override: error_log = {}", log);
            config.project.error_log = Some(log.clone());
        }
    }
}

pub async fn run(
    path: String,
    config_path: Option<String>,
    overrides: Overrides,
    dry_run: bool,
) -> Result<RunSummary> {
    let project_dir = Path::new(&path);
    if !project_dir.is_dir() {
        bail!("Project directory not found: {}", path);
    }

    info!("Project: {}", project_dir.display());
    if let Some(ref cfg) = config_path {
        info!("Config: {}", cfg);
    }
    info!("Dry run: {}", dry_run);

    let mut config = Config::load_with_path(config_path.as_deref(), project_dir)?;
    overrides.apply(&mut config);

    let client = factory::create_client(&config.llm, dry_run)?;
    let runner = Arc::new(SystemRunner::new(Duration::from_secs(
        config.project.command_timeout_secs,
    )));

    let stdout = io::stdout();
    let mut reporter = Reporter::new(stdout.lock());
    let summary = Pipeline::new(project_dir, &config.project, runner, client.as_ref())
        .run(&mut reporter)
        .await?;

    info!("Finished: {:?}", summary.outcome);
    Ok(summary)
}
