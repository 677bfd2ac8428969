//! Git executable invocation via [`tokio::process::Command`].
//!
//! All repository work is delegated to the git binary. One-shot calls
//! capture stdout; the stateless-rpc bridge gets a pipe-mode command and
//! drives the child itself. The binary path is injected so tests can
//! substitute a stand-in executable.

use crate::{GitError, Result, Service};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Invokes the git executable against a repository.
#[derive(Debug, Clone)]
pub struct GitRunner {
    bin: PathBuf,
}

impl GitRunner {
    /// Creates a runner for the given git binary path.
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// The configured binary path.
    pub fn binary(&self) -> &Path {
        &self.bin
    }

    /// Runs git with the given arguments, working directory = `repo`, and
    /// returns captured stdout. Non-zero exit is an error carrying stderr.
    pub async fn run(&self, repo: &Path, args: &[&str]) -> Result<Vec<u8>> {
        debug!(repo = %repo.display(), ?args, "running git");

        let output = Command::new(&self.bin)
            .args(args)
            .current_dir(repo)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(GitError::Exit {
                command: args.first().unwrap_or(&"git").to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Reads a repository config value.
    ///
    /// An unset key (git exits non-zero with empty output) yields the empty
    /// string; the trailing newline git prints is trimmed.
    pub async fn config(&self, repo: &Path, key: &str) -> String {
        match self.run(repo, &["config", key]).await {
            Ok(out) => String::from_utf8_lossy(&out)
                .trim_end_matches('\n')
                .to_string(),
            Err(_) => String::new(),
        }
    }

    /// Regenerates the dumb-protocol metadata files (`info/refs`,
    /// `objects/info/packs`). Failure is reported to the caller; there is
    /// no response to amend by the time this runs.
    pub async fn update_server_info(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["update-server-info"]).await.map(|_| ())
    }

    /// Produces raw ref-advertisement bytes for the given service.
    pub async fn advertise_refs(&self, repo: &Path, service: Service) -> Result<Vec<u8>> {
        self.run(repo, &[service.name(), "--stateless-rpc", "--advertise-refs", "."])
            .await
    }

    /// Builds the pipe-mode command for a stateless-rpc exchange. The
    /// caller owns spawning, stdin writing, and reaping.
    pub fn stateless_rpc_command(&self, repo: &Path, service: Service) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg(service.name())
            .arg("--stateless-rpc")
            .arg(repo)
            .current_dir(repo)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped());
        cmd
    }
}
