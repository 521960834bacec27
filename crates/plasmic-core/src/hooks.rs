//! Post-sync commands
//!
//! `postSyncCommands` in plasmic.json run after a successful sync, in the
//! project root, through the platform shell. They typically format the
//! generated code.

use std::collections::HashMap;
use std::process::Command;

use plasmic_fs::NormalizedPath;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Variables exported to every command.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub vars: HashMap<String, String>,
}

impl HookContext {
    /// Context for the commands following a sync of `project_ids`.
    pub fn for_sync(project_ids: &[&str]) -> Self {
        let mut vars = HashMap::new();
        vars.insert("PLASMIC_HOOK_EVENT".to_string(), "post-sync".to_string());
        vars.insert("PLASMIC_SYNCED_PROJECTS".to_string(), project_ids.join(","));
        Self { vars }
    }
}

/// Outcome of one command.
#[derive(Debug)]
pub struct HookResult {
    pub command: String,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Run `commands` in order inside `root`.
///
/// Stops at the first command that exits with a non-zero status.
pub fn run_post_sync(commands: &[String], context: &HookContext, root: &NormalizedPath) -> Result<Vec<HookResult>> {
    let mut results = Vec::new();

    for command in commands.iter().filter(|c| !c.trim().is_empty()) {
        info!(command = %command, "running post-sync command");
        let result = execute(command, context, root)?;
        if !result.success {
            let stderr = result.stderr.trim();
            let message = if stderr.is_empty() {
                format!("exited with non-zero status (exit code: {:?})", result.exit_code)
            } else {
                format!(
                    "exited with non-zero status (exit code: {:?}): {}",
                    result.exit_code, stderr
                )
            };
            return Err(Error::HookFailed {
                command: command.clone(),
                message,
            });
        }
        debug!(command = %command, "post-sync command finished");
        results.push(result);
    }

    Ok(results)
}

fn execute(command: &str, context: &HookContext, root: &NormalizedPath) -> Result<HookResult> {
    let output = shell(command)
        .current_dir(root.to_native())
        .envs(&context.vars)
        .output()
        .map_err(|e| Error::HookFailed {
            command: command.to_string(),
            message: e.to_string(),
        })?;

    Ok(HookResult {
        command: command.to_string(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code(),
    })
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root() -> (TempDir, NormalizedPath) {
        let dir = TempDir::new().unwrap();
        let path = NormalizedPath::new(dir.path());
        (dir, path)
    }

    #[test]
    fn commands_run_in_order_in_root() {
        let (_dir, root) = root();
        let commands = vec!["echo one > out.txt".to_string(), "echo two >> out.txt".to_string()];

        let results = run_post_sync(&commands, &HookContext::default(), &root).unwrap();

        assert_eq!(results.len(), 2);
        let out = std::fs::read_to_string(root.join("out.txt").to_native()).unwrap();
        assert_eq!(out, "one\ntwo\n");
    }

    #[test]
    fn context_is_exported() {
        let (_dir, root) = root();
        let commands = vec!["printf \"$PLASMIC_SYNCED_PROJECTS\"".to_string()];

        let results = run_post_sync(&commands, &HookContext::for_sync(&["p1", "p2"]), &root).unwrap();

        assert_eq!(results[0].stdout, "p1,p2");
    }

    #[test]
    fn failure_stops_the_chain() {
        let (_dir, root) = root();
        let commands = vec![
            "echo oops >&2; exit 3".to_string(),
            "touch never.txt".to_string(),
        ];

        let err = run_post_sync(&commands, &HookContext::default(), &root).unwrap_err();

        match err {
            Error::HookFailed { command, message } => {
                assert!(command.contains("exit 3"));
                assert!(message.contains("oops"), "got: {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!root.join("never.txt").exists());
    }

    #[test]
    fn blank_commands_are_skipped() {
        let (_dir, root) = root();
        let results = run_post_sync(&["  ".to_string()], &HookContext::default(), &root).unwrap();
        assert!(results.is_empty());
    }
}
