use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::types::{DispatchError, ProcessExit};

/// Everything needed to start the deployment command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Build a launch description from a `[program, args...]` vector
    pub fn from_command<P: AsRef<Path>>(
        command: &[String],
        working_dir: P,
        env: Vec<(String, String)>,
    ) -> Result<Self, DispatchError> {
        let (program, args) = command.split_first().ok_or(DispatchError::EmptyCommand)?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_dir: working_dir.as_ref().to_path_buf(),
            env,
        })
    }

    /// Command line for log messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A started process
#[async_trait::async_trait]
pub trait ProcessHandle: Send {
    /// OS process id, if the platform reports one
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> std::io::Result<ProcessExit>;
}

/// Starts processes. Abstracted so the HTTP layer can be tested without
/// running real deployment scripts.
pub trait ProcessLauncher: Send + Sync {
    /// Start the process and return as soon as it is running.
    /// Must not wait for the process to finish.
    fn start(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, DispatchError>;
}

/// Launcher backed by `tokio::process`
///
/// The child inherits stdout and stderr, gets no stdin and is placed in its
/// own process group so a Ctrl-C aimed at the listener does not reach it.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessLauncher;

impl ProcessLauncher for TokioProcessLauncher {
    fn start(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, DispatchError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| DispatchError::StartFailed {
            command: spec.command_line(),
            source,
        })?;

        debug!(
            command = %spec.command_line(),
            working_dir = %spec.working_dir.display(),
            pid = ?child.id(),
            "Process started"
        );

        Ok(Box::new(TokioChildHandle { child }))
    }
}

struct TokioChildHandle {
    child: Child,
}

#[async_trait::async_trait]
impl ProcessHandle for TokioChildHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> std::io::Result<ProcessExit> {
        let status = self.child.wait().await?;
        Ok(status.into())
    }
}
