//! Trigger for the external fine-tuning job
//!
//! The job runs out of process with inherited stdio. Its exit status is the
//! only feedback: a new model only becomes active after the operator points
//! `llm.generate_model` at the produced artifact and restarts.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::config::FineTuneConfig;
use crate::error::{Error, Result};

const DATA_PLACEHOLDER: &str = "{data}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// How a fine-tuning run ended
#[derive(Debug, Clone)]
pub struct FineTuneOutcome {
    /// Process exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Whether the job exited with status 0
    pub success: bool,
    /// Directory the job was asked to write the new model to
    pub artifact_dir: PathBuf,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl FineTuneOutcome {
    /// Operator guidance for this outcome
    pub fn next_steps(&self) -> String {
        if self.success {
            format!(
                "Fine-tuning finished. The new model was written to '{}'. \
                 Point llm.generate_model at it and restart to use it.",
                self.artifact_dir.display()
            )
        } else {
            let code = self
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "none (terminated by signal)".to_string());
            format!(
                "Fine-tuning failed with exit code {}. Check the job output above for details.",
                code
            )
        }
    }
}

/// One invocation of the configured fine-tuning program
pub struct FineTuneJob {
    program: String,
    args: Vec<String>,
    data_path: PathBuf,
    output_dir: PathBuf,
}

impl FineTuneJob {
    /// Create a job reading `data_path`
    pub fn new(config: &FineTuneConfig, data_path: impl Into<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            data_path: data_path.into(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Arguments with `{data}` and `{output}` substituted
    pub fn resolved_args(&self) -> Vec<String> {
        let data = self.data_path.to_string_lossy();
        let output = self.output_dir.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(DATA_PLACEHOLDER, &data)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }

    /// Run the job to completion.
    ///
    /// Fails without launching anything when the learning data file is
    /// missing or empty. A job that starts and exits nonzero is reported
    /// through [`FineTuneOutcome`], not as an error.
    pub async fn run(&self) -> Result<FineTuneOutcome> {
        self.check_data().await?;

        let args = self.resolved_args();
        tracing::info!("Launching fine-tuning job: {} {}", self.program, args.join(" "));

        let start = Instant::now();
        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Error::fine_tune(format!("Failed to launch '{}': {}", self.program, e)))?;

        let outcome = FineTuneOutcome {
            exit_code: status.code(),
            success: status.success(),
            artifact_dir: self.output_dir.clone(),
            duration: start.elapsed(),
        };

        if outcome.success {
            tracing::info!(
                "Fine-tuning job finished in {:?}, artifact at {}",
                outcome.duration,
                outcome.artifact_dir.display()
            );
        } else {
            tracing::warn!("Fine-tuning job exited with {:?}", outcome.exit_code);
        }

        Ok(outcome)
    }

    async fn check_data(&self) -> Result<()> {
        let metadata = tokio::fs::metadata(&self.data_path).await.map_err(|_| {
            Error::fine_tune(format!(
                "Learning data file '{}' not found; add learning data first",
                self.data_path.display()
            ))
        })?;

        if metadata.len() == 0 {
            return Err(Error::fine_tune(format!(
                "Learning data file '{}' is empty; add learning data first",
                self.data_path.display()
            )));
        }
        Ok(())
    }
}
