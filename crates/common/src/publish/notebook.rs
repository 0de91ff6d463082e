use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("notebook conversion exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("converter produced no page at {0}")]
    MissingOutput(PathBuf),
    #[error("not a notebook path: {0}")]
    InvalidPath(PathBuf),
}

/// Renders a notebook into a standalone HTML page.
#[async_trait::async_trait]
pub trait NotebookConverter: Send + Sync + Debug {
    /// Convert `notebook`, writing the page into `output_dir` and returning its path.
    async fn convert(&self, notebook: &Path, output_dir: &Path) -> Result<PathBuf, ConvertError>;
}

/// Converts with `jupyter nbconvert`, images embedded so the page is self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nbconvert {
    /// Executable providing the `nbconvert` subcommand
    pub program: String,
    pub template: String,
}

impl Default for Nbconvert {
    fn default() -> Self {
        Self {
            program: "jupyter".to_string(),
            template: "classic".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl NotebookConverter for Nbconvert {
    async fn convert(&self, notebook: &Path, output_dir: &Path) -> Result<PathBuf, ConvertError> {
        let stem = notebook
            .file_stem()
            .ok_or_else(|| ConvertError::InvalidPath(notebook.to_path_buf()))?;
        let page = output_dir.join(format!("{}.html", stem.to_string_lossy()));

        tracing::debug!(notebook = %notebook.display(), program = %self.program, "converting notebook");
        let output = tokio::process::Command::new(&self.program)
            .arg("nbconvert")
            .args(["--to", "html"])
            .arg("--template")
            .arg(&self.template)
            .arg("--embed-images")
            .arg("--output-dir")
            .arg(output_dir)
            .arg(notebook)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !tokio::fs::try_exists(&page).await.unwrap_or(false) {
            return Err(ConvertError::MissingOutput(page));
        }
        Ok(page)
    }
}
