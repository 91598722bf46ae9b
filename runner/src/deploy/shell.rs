//! Shell command wrapper

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::RunnerError;

/// Run `program` in `cwd` and return its stdout.
///
/// Stdout lines are forwarded to the debug log; a non-zero exit is an error.
pub async fn run(
    program: &str,
    args: &[&str],
    cwd: &Path,
    envs: &[(&str, String)],
) -> Result<String, RunnerError> {
    debug!("Running {} {} in {}", program, args.join(" "), cwd.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(envs.iter().map(|(key, value)| (*key, value.as_str())))
        .output()
        .await
        .map_err(|e| RunnerError::ShellError(format!("Failed to run {}: {}", program, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    for line in stdout.lines() {
        debug!("[{}] {}", program, line);
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{} {} failed: {}", program, args.join(" "), stderr.trim());
        return Err(RunnerError::ShellError(format!(
            "{} {} exited with {}: {}",
            program,
            args.join(" "),
            output.status,
            stderr.trim()
        )));
    }

    Ok(stdout)
}
