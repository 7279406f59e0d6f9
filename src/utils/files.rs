//! Shell and filesystem helpers.
//!
//! None of these validate their arguments: filenames are joined as given and
//! shell strings are handed to `sh -c` untouched.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::Result;

/// Combined result of a shell invocation
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub success: bool,
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

/// Run `cmd` through `sh -c`
pub async fn run_shell(cmd: &str) -> Result<ShellOutput> {
    debug!("Running shell command: {}", cmd);

    let output = Command::new("sh").arg("-c").arg(cmd).output().await?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(ShellOutput {
        success: output.status.success(),
        code: output.status.code(),
        output: combined,
    })
}

/// Append `message` to `filename` using the shell
pub async fn log_to_file(filename: &str, message: &str) -> Result<()> {
    let result = run_shell(&format!("echo '{}' >> {}", message, filename)).await?;
    if !result.success {
        warn!("Log append to {} failed: {}", filename, result.output);
        return Err(std::io::Error::other(result.output).into());
    }
    Ok(())
}

/// Read any file as text (invalid UTF-8 is replaced)
pub async fn read_file(path: impl AsRef<Path>) -> Result<String> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write an uploaded file to `dir/filename`, creating `dir` if needed
pub async fn save_upload(dir: impl AsRef<Path>, filename: &str, contents: &[u8]) -> Result<PathBuf> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(filename);
    tokio::fs::write(&path, contents).await?;
    debug!("Saved upload to {}", path.display());

    Ok(path)
}
