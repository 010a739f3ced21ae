// Flowsmith: Optional n8n import check
//
// Runs `n8n import:workflow` against a throwaway user folder so n8n itself
// judges the written file.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

const MAX_OUTPUT_CHARS: usize = 10_000;
const FALLBACK_ENCRYPTION_KEY: &str = "test-encryption-key-32chars!!";

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub success: bool,
    /// Combined stdout and stderr, truncated.
    pub output: String,
}

pub struct ImportChecker {
    program: String,
    base_args: Vec<String>,
    user_folder: PathBuf,
    timeout: Duration,
}

impl ImportChecker {
    /// `npx --yes n8n import:workflow --input <file>` with a `.n8n_tmp` user folder.
    pub fn n8n() -> Self {
        Self::new(
            "npx",
            ["--yes", "n8n", "import:workflow", "--input"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    /// A checker running `program base_args... <file>`.
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
            user_folder: PathBuf::from(".n8n_tmp"),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_user_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.user_folder = folder.into();
        self
    }

    pub async fn check(&self, workflow_path: &Path) -> anyhow::Result<ImportReport> {
        let user_folder = if self.user_folder.is_absolute() {
            self.user_folder.clone()
        } else {
            std::env::current_dir()
                .context("cannot resolve current directory")?
                .join(&self.user_folder)
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg(workflow_path)
            .env("N8N_USER_FOLDER", &user_folder)
            .kill_on_drop(true);
        if std::env::var_os("N8N_ENCRYPTION_KEY").is_none() {
            cmd.env("N8N_ENCRYPTION_KEY", FALLBACK_ENCRYPTION_KEY);
        }

        tracing::info!(
            program = %self.program,
            workflow = %workflow_path.display(),
            user_folder = %user_folder.display(),
            "Running n8n import check"
        );

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| anyhow::anyhow!("import check timed out after {:?}", self.timeout))?
            .with_context(|| format!("failed to run '{}'", self.program))?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            text.push('\n');
            text.push_str(&stderr);
        }
        let mut text = text.trim().to_string();

        // Truncate very large outputs
        if let Some((cut, _)) = text.char_indices().nth(MAX_OUTPUT_CHARS) {
            let extra = text[cut..].chars().count();
            text.truncate(cut);
            text.push_str(&format!("\n... (truncated, {} more chars)", extra));
        }

        Ok(ImportReport {
            success: output.status.success(),
            output: text,
        })
    }
}
