//! SafeCommandExecutor: Type-safe build tool invocation with injection prevention
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only pre-approved commands can execute
//! - **Injection prevention**: Uses `std::process::Command` which prevents shell injection
//! - **Argument sanitization**: Arguments passed as a slice, never interpolated into shell strings
//! - **Explicit environment**: Extra variables are set per invocation, never leaked globally
//! - **Working directory validation**: Validates existence before execution

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;

/// Allowed commands whitelist for security.
///
/// Only these commands can be executed via SafeCommandExecutor. The
/// republisher never needs anything beyond the JVM and the build tools
/// themselves.
const ALLOWED_COMMANDS: &[&str] = &["java", "gradle", "mvn", "npm"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., binary not found, permission denied)
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),
}

/// Captured result of a finished subprocess
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the orchestrator and the subprocesses it spawns.
///
/// Production runs go through [`SafeCommandExecutor`]; tests substitute a
/// scripted runner.
pub trait CommandRunner {
    fn run(
        &self,
        command: &str,
        args: &[&str],
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, CommandError>;
}

impl CommandRunner for SafeCommandExecutor {
    fn run(
        &self,
        command: &str,
        args: &[&str],
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, CommandError> {
        let output = self.execute_with_env(command, args, env)?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Safe command executor with security controls
///
/// Commands run in a validated working directory with an explicit set of
/// extra environment variables layered over the inherited environment.
#[derive(Debug)]
pub struct SafeCommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does
    /// not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.exists() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self { working_dir })
    }

    /// Execute a whitelisted command and capture its output.
    ///
    /// A non-zero exit status is not an error at this level; callers inspect
    /// the returned `Output` and decide what a failure means for them.
    pub fn execute(&self, command: &str, args: &[&str]) -> Result<Output, CommandError> {
        self.execute_with_env(command, args, &HashMap::new())
    }

    /// Execute a whitelisted command with extra environment variables.
    ///
    /// The extra variables are layered over the inherited environment for
    /// this invocation only.
    pub fn execute_with_env(
        &self,
        command: &str,
        args: &[&str],
        env: &HashMap<String, String>,
    ) -> Result<Output, CommandError> {
        // Whitelist validation: only pre-approved commands
        if !ALLOWED_COMMANDS.contains(&command) {
            return Err(CommandError::CommandNotAllowed(command.to_string()));
        }

        // Windows-specific: gradle and npm are .cmd/.bat launchers, not .exe
        #[cfg(target_os = "windows")]
        let command_name = match command {
            "npm" => format!("{}.cmd", command),
            "gradle" | "mvn" => format!("{}.bat", command),
            _ => command.to_string(),
        };

        #[cfg(not(target_os = "windows"))]
        let command_name = command.to_string();

        // Arguments are passed as a slice, never interpolated into shell strings
        let output = Command::new(&command_name)
            .args(args)
            .envs(env)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|e| CommandError::ExecutionFailed(e.to_string()))?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_dir() -> String {
        std::env::temp_dir()
            .to_str()
            .expect("Failed to get temp directory")
            .to_string()
    }

    #[test]
    fn test_rejected_command_rm() {
        let executor = SafeCommandExecutor::new(get_test_dir()).unwrap();
        let result = executor.execute("rm", &["-rf", "/"]);
        assert!(
            matches!(result, Err(CommandError::CommandNotAllowed(_))),
            "rm should be rejected as not in whitelist"
        );
    }

    #[test]
    fn test_rejected_command_shell() {
        let executor = SafeCommandExecutor::new(get_test_dir()).unwrap();
        let result = executor.execute("sh", &["-c", "echo injected"]);
        assert!(
            matches!(result, Err(CommandError::CommandNotAllowed(_))),
            "shells should be rejected for security"
        );
    }

    #[test]
    fn test_whitelist_is_exact_match() {
        let executor = SafeCommandExecutor::new(get_test_dir()).unwrap();
        let result = executor.execute("gradlew", &["--version"]);
        assert!(matches!(result, Err(CommandError::CommandNotAllowed(_))));
    }

    #[test]
    fn test_invalid_working_directory() {
        let result = SafeCommandExecutor::new("/nonexistent/directory/that/does/not/exist");
        assert!(
            matches!(result, Err(CommandError::InvalidWorkingDirectory(_))),
            "Should reject non-existent working directory"
        );
    }

    #[test]
    fn test_whitelist_checked_before_spawn() {
        // A rejected command never reaches process spawn, so even a command
        // that does not exist on the machine fails with CommandNotAllowed.
        let executor = SafeCommandExecutor::new(get_test_dir()).unwrap();
        let result = executor.execute("definitely-not-a-real-binary", &[]);
        assert!(matches!(result, Err(CommandError::CommandNotAllowed(_))));
    }
}
