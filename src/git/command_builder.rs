//! Type-safe Git command builder for consistent command execution
//!
//! Every git process WAM starts goes through [`GitCommand`], so timeouts, logging
//! under the `git` target and error classification are handled in one place.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::WamError;
use crate::utils::platform::get_git_command;

/// Builder for a single git invocation.
///
/// ```rust,no_run
/// use wam_cli::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let head = GitCommand::current_commit()
///     .current_dir("/path/to/AddOns/RepoAddon")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: Some(Duration::from_secs(300)),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs git as if started in `dir` (passed as `-C dir`).
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Label included in log lines, usually the add-on folder.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let mut cmd = Command::new(git_command);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        cmd.args(&full_args);

        let label = self.context.as_deref().unwrap_or("-");
        tracing::debug!(target: "git", "({}) Executing command: {} {}", label, git_command, full_args.join(" "));

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        // Never block on a credential prompt
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => {
                    result.with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?
                }
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(WamError::GitCommandError {
                        operation: self.operation(),
                        stderr: format!(
                            "Git command timed out after {} seconds. Check network connectivity \
                             or run it manually: git {}",
                            duration.as_secs(),
                            full_args.join(" ")
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future
                .await
                .with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!(
                target: "git",
                "({}) Command failed with exit code {:?}: {}",
                label,
                output.status.code(),
                stderr.trim()
            );

            let error = if self.args.first().is_some_and(|arg| arg == "clone") {
                WamError::GitCloneFailed {
                    url: self.clone_url.clone().unwrap_or_else(|| "unknown".to_string()),
                    reason: stderr,
                }
            } else {
                WamError::GitCommandError {
                    operation: self.operation(),
                    stderr,
                }
            };
            return Err(error.into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stdout.trim().is_empty() {
            tracing::trace!(target: "git", "({}) {}", label, stdout.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "({}) Git {} took {:.2}s", label, self.operation(), elapsed.as_secs_f64());
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Executes and returns trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

// Convenience builders for the operations WAM needs

impl GitCommand {
    /// `git clone --depth 1` of the default branch.
    pub fn shallow_clone(url: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new().args(["clone", "--depth", "1", "--recurse-submodules"]);
        cmd.args.push(url.to_string());
        cmd.args.push(target.as_ref().display().to_string());
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// `git ls-remote <url> HEAD`.
    pub fn ls_remote_head(url: &str) -> Self {
        Self::new().args(["ls-remote", url, "HEAD"])
    }

    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }

    pub fn remote_url() -> Self {
        Self::new().args(["remote", "get-url", "origin"])
    }

    pub fn init() -> Self {
        Self::new().args(["init", "--initial-branch=main"])
    }

    pub fn add(pathspec: &str) -> Self {
        Self::new().args(["add", pathspec])
    }

    /// Commits with a fixed identity so it works without user git config.
    pub fn commit(message: &str) -> Self {
        Self::new().args([
            "-c",
            "user.name=WAM",
            "-c",
            "user.email=wam@localhost",
            "commit",
            "--no-gpg-sign",
            "-m",
            message,
        ])
    }
}
