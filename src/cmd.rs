use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tokio::time;

/// Runs an external command under a hard time budget. `None` when the binary
/// cannot be spawned or the budget runs out; a timed-out child is killed on
/// drop.
pub async fn run(program: &str, args: &[&str], budget: Duration) -> Option<Output> {
    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output();
    match time::timeout(budget, output).await {
        Ok(Ok(output)) => Some(output),
        Ok(Err(_)) | Err(_) => None,
    }
}

/// Trimmed stdout of a command that exited 0; spawn failure, timeout and
/// nonzero exits all collapse to `None`.
pub async fn capture_stdout(program: &str, args: &[&str], budget: Duration) -> Option<String> {
    let output = run(program, args, budget).await?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
