//! Wrappers around the FSL / FreeSurfer command line tools
//!
//! Every tool is spawned directly (no shell) and waited on. Stdout is
//! returned to the caller; anything on stderr is logged.

pub mod params;
pub mod preproc;
pub mod slicer;

use crate::error::{Error, Result};
use std::process::Command;
use tracing::{debug, warn};

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().to_string()
}

/// Run `cmd` to completion and return its trimmed stdout.
pub fn run(cmd: &mut Command) -> Result<String> {
    let tool = program_name(cmd);
    debug!("running {:?}", cmd);

    let output = cmd.output().map_err(|e| Error::Tool {
        tool: tool.clone(),
        message: format!("could not start: {e}"),
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!("{}: {}", tool, stderr.trim());
    }

    if !output.status.success() {
        return Err(Error::Tool {
            tool,
            message: format!("exited with {}", output.status),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_tool_error() {
        let err = run(&mut Command::new("definitely-not-a-real-tool-1234")).unwrap_err();
        match err {
            Error::Tool { tool, .. } => assert_eq!(tool, "definitely-not-a-real-tool-1234"),
            other => panic!("expected tool error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_trimmed() {
        let out = run(Command::new("echo").arg("  2.000000  ")).unwrap();
        assert_eq!(out, "2.000000");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_error() {
        assert!(run(&mut Command::new("false")).is_err());
    }
}
