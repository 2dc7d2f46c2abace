//! Invocation of the `git` executable
//!
//! Everything the library needs from git goes through the [`GitRunner`]
//! trait so hosts and tests can substitute a scripted implementation.
//! [`GitCli`] is the real one, built on `tokio::process`.

use crate::config::AnnotationConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Operations the annotation pipeline needs from git.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// `git blame --line-porcelain [<revision>] -- <file_path>` run inside `repo_path`.
    async fn blame(
        &self,
        repo_path: &Path,
        file_path: &str,
        revision: Option<&str>,
    ) -> Result<String>;

    /// `git blame --line-porcelain --contents - -- <file_path>` with `contents` on stdin.
    ///
    /// Lines that differ from `HEAD` come back as the uncommitted revision.
    async fn blame_contents(
        &self,
        repo_path: &Path,
        file_path: &str,
        contents: &str,
    ) -> Result<String>;

    /// URL of the `origin` remote, `None` when it is not configured.
    async fn remote_url(&self, repo_path: &Path) -> Result<Option<String>>;

    /// First parent of `revision`, `None` for a root commit.
    async fn parent_revision(&self, repo_path: &Path, revision: &str) -> Result<Option<String>>;

    /// Contents of `file_path` at `revision`. An empty revision reads the index.
    async fn show_file(&self, repo_path: &Path, revision: &str, file_path: &str)
        -> Result<String>;

    /// Repository root containing `dir`.
    async fn toplevel(&self, dir: &Path) -> Result<PathBuf>;
}

/// Successful output of a git command.
struct GitOutput {
    stdout: String,
}

/// [`GitRunner`] backed by the git command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
    max_output_bytes: usize,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::from_config(&AnnotationConfig::default())
    }
}

impl GitCli {
    pub fn new(binary: impl Into<String>, max_output_bytes: usize) -> Self {
        Self {
            binary: binary.into(),
            max_output_bytes,
        }
    }

    pub fn from_config(config: &AnnotationConfig) -> Self {
        Self::new(config.git_binary.clone(), config.max_output_bytes)
    }

    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput> {
        self.run_with_input(cwd, args, None).await
    }

    /// Run git in `cwd`, failing on spawn errors, non-zero exit, or oversized stdout.
    async fn run_with_input(
        &self,
        cwd: &Path,
        args: &[&str],
        input: Option<&str>,
    ) -> Result<GitOutput> {
        let command = args.first().copied().unwrap_or_default().to_string();
        tracing::debug!(cwd = %cwd.display(), ?args, stdin = input.is_some(), "Running git");

        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(cwd)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Git {
                command: command.clone(),
                message: format!("failed to spawn {}: {}", self.binary, e),
            })?;

        // Feed stdin from its own task; git may start writing before it has read everything.
        let stdin_task = match (child.stdin.take(), input) {
            (Some(mut stdin), Some(input)) => {
                let bytes = input.as_bytes().to_vec();
                Some(tokio::spawn(async move {
                    let result = stdin.write_all(&bytes).await;
                    drop(stdin);
                    result
                }))
            }
            _ => None,
        };

        // Drain stderr alongside stdout so a chatty child cannot block on a full pipe.
        let stderr_task = child.stderr.take().map(|mut err| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf).await;
                buf
            })
        });

        let mut stdout = Vec::new();
        if let Some(out) = child.stdout.take() {
            // Read one byte past the ceiling so overflow is detectable without buffering it all.
            let mut limited = out.take(self.max_output_bytes as u64 + 1);
            limited.read_to_end(&mut stdout).await?;
        }
        if stdout.len() > self.max_output_bytes {
            let _ = child.kill().await;
            return Err(Error::OutputTooLarge {
                limit: self.max_output_bytes,
            });
        }

        let status = child.wait().await?;
        if let Some(task) = stdin_task {
            if let Ok(Err(e)) = task.await {
                tracing::debug!(error = %e, "git closed stdin early");
            }
        }
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };
        if !status.success() {
            return Err(Error::Git {
                command,
                message: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(GitOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
        })
    }
}

#[async_trait]
impl GitRunner for GitCli {
    async fn blame(
        &self,
        repo_path: &Path,
        file_path: &str,
        revision: Option<&str>,
    ) -> Result<String> {
        let mut args = vec!["blame", "--line-porcelain"];
        if let Some(revision) = revision {
            args.push(revision);
        }
        args.push("--");
        args.push(file_path);

        Ok(self.run(repo_path, &args).await?.stdout)
    }

    async fn blame_contents(
        &self,
        repo_path: &Path,
        file_path: &str,
        contents: &str,
    ) -> Result<String> {
        let args = [
            "blame",
            "--line-porcelain",
            "--contents",
            "-",
            "--",
            file_path,
        ];
        Ok(self
            .run_with_input(repo_path, &args, Some(contents))
            .await?
            .stdout)
    }

    async fn remote_url(&self, repo_path: &Path) -> Result<Option<String>> {
        // `git config --get` exits 1 when the key is unset.
        match self
            .run(repo_path, &["config", "--get", "remote.origin.url"])
            .await
        {
            Ok(output) => {
                let url = output.stdout.trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            Err(Error::Git { message, .. }) if message.is_empty() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn parent_revision(&self, repo_path: &Path, revision: &str) -> Result<Option<String>> {
        let parent_ref = format!("{}^", revision);
        match self
            .run(repo_path, &["rev-parse", "--verify", "--quiet", &parent_ref])
            .await
        {
            Ok(output) => {
                let parent = output.stdout.trim();
                Ok((!parent.is_empty()).then(|| parent.to_string()))
            }
            // --quiet suppresses the message for a missing parent, leaving stderr empty.
            Err(Error::Git { message, .. }) if message.is_empty() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn show_file(
        &self,
        repo_path: &Path,
        revision: &str,
        file_path: &str,
    ) -> Result<String> {
        let object = format!("{}:{}", revision, file_path);
        Ok(self.run(repo_path, &["show", &object]).await?.stdout)
    }

    async fn toplevel(&self, dir: &Path) -> Result<PathBuf> {
        let output = self.run(dir, &["rev-parse", "--show-toplevel"]).await?;
        Ok(PathBuf::from(output.stdout.trim()))
    }
}
