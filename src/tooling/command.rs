use crate::error::ToolError;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a successful tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Resolve `root` against the current directory.
///
/// Tools run with the project root as their working directory and receive
/// paths built from it, so a relative root would be applied twice.
pub fn absolute_root(root: PathBuf) -> PathBuf {
    std::path::absolute(&root).unwrap_or(root)
}

/// Run an external program to completion with a hard timeout.
///
/// The child is killed if the timeout fires. Missing binaries are reported
/// as [`ToolError::NotFound`] so callers can treat optional tools leniently.
pub async fn run_tool<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!("Running {} (timeout {:?})", program, timeout);
    let child = command.spawn().map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ToolError::NotFound {
                program: program.to_string(),
            }
        } else {
            ToolError::Spawn {
                program: program.to_string(),
                source,
            }
        }
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ToolError::Timeout {
                program: program.to_string(),
                timeout,
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            stdout: stdout.trim().to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let out = run_tool("sh", &["-c", "echo ready"], None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "ready");
    }

    #[tokio::test]
    async fn reports_exit_code_and_stderr() {
        let err = run_tool("sh", &["-c", "echo boom >&2; exit 3"], None, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn failure_keeps_stdout() {
        let err = run_tool(
            "sh",
            &["-c", "echo '--- FAIL: TestCreate'; exit 1"],
            None,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            ToolError::Failed { stdout, stderr, .. } => {
                assert_eq!(stdout, "--- FAIL: TestCreate");
                assert!(stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let err = run_tool::<&str>("gameops-no-such-tool", &[], None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[tokio::test]
    async fn slow_program_times_out() {
        let err = run_tool("sleep", &["5"], None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[test]
    fn relative_root_is_resolved_against_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_root(PathBuf::from("necpgame")), cwd.join("necpgame"));
        assert_eq!(absolute_root(PathBuf::from("/srv/necpgame")), PathBuf::from("/srv/necpgame"));
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let out = run_tool("ls", &["marker.txt"], Some(dir.path()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "marker.txt");
    }
}
