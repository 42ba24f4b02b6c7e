//! Running the tool under test

use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{RunnerError, RunnerResult};

/// Captured result of one tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `tool` with `args` and wait for it. Both output streams are always
/// captured and stdin is closed.
pub fn run_tool(tool: &Path, args: &[String]) -> RunnerResult<ToolOutput> {
    debug!("Spawning {} with {} argument(s)", tool.display(), args.len());

    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;

    Ok(ToolOutput {
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Shell-style rendering of a command line, for logs.
pub fn command_line(tool: &Path, args: &[String]) -> String {
    std::iter::once(tool.to_string_lossy().into_owned())
        .chain(args.iter().map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fail unless `path` is a regular file the current user may execute.
pub fn ensure_executable(path: &Path) -> RunnerResult<()> {
    if !path.is_file() || !is_executable(path) {
        return Err(RunnerError::NotExecutable(path.to_path_buf()));
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};

    access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

/// Fail unless the test directory exists.
pub fn ensure_directory(path: &Path) -> RunnerResult<()> {
    if !path.exists() {
        return Err(RunnerError::MissingTestDir(path.to_path_buf()));
    }
    Ok(())
}
