//! Deployment dispatch
//!
//! Turns an accepted push into a running deployment process. Dispatch never
//! waits for the process: with [`Lifecycle::Detached`] the handle is dropped
//! immediately, with [`Lifecycle::Observed`] a background task waits for the
//! exit and logs it.
//!
//! Deployments are not serialized. Two accepted pushes in quick succession
//! start two overlapping processes; the deploy script is expected to cope.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, warn};

use crate::config::DeployConfig;
use crate::execution::{LaunchSpec, ProcessLauncher};
use crate::logging;
use crate::types::{DeploymentRequest, DispatchError, Lifecycle, ProcessExit};

/// Environment variables passed to the deployment command
pub mod env {
    pub const BRANCH: &str = "DEPLOY_BRANCH";
    pub const COMMIT: &str = "DEPLOY_COMMIT";
    pub const ID: &str = "DEPLOY_ID";
}

/// A process that was started for a deployment
#[derive(Debug)]
pub struct Dispatched {
    pub pid: Option<u32>,
    /// Background task waiting for the exit; only set for observed processes.
    /// Dropping it does not stop the observation.
    pub observer: Option<JoinHandle<Option<ProcessExit>>>,
}

/// Starts the configured deployment command for accepted pushes
pub struct Dispatcher {
    launcher: Arc<dyn ProcessLauncher>,
    command: Vec<String>,
    app_dir: PathBuf,
    lifecycle: Lifecycle,
}

impl Dispatcher {
    pub fn new(config: &DeployConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            command: config.command.clone(),
            app_dir: PathBuf::from(&config.app_dir),
            lifecycle: config.lifecycle,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Build the launch description for a deployment request
    pub fn launch_spec(&self, request: &DeploymentRequest) -> Result<LaunchSpec, DispatchError> {
        LaunchSpec::from_command(
            &self.command,
            &self.app_dir,
            vec![
                (env::BRANCH.to_string(), request.branch.clone()),
                (env::COMMIT.to_string(), request.commit.clone()),
                (env::ID.to_string(), request.deploy_id.clone()),
            ],
        )
    }

    /// Start the deployment process and return without waiting for it
    pub fn dispatch(&self, request: &DeploymentRequest) -> Result<Dispatched, DispatchError> {
        let span = logging::deployment_span(&request.deploy_id);
        let _guard = span.enter();

        let spec = self.launch_spec(request)?;

        info!(
            branch = %request.branch,
            commit = %request.commit,
            delivery_id = ?request.delivery_id,
            command = %spec.command_line(),
            working_dir = %spec.working_dir.display(),
            "Starting deployment"
        );

        let mut handle = match self.launcher.start(&spec) {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Failed to start deployment process");
                return Err(e);
            }
        };

        let pid = handle.id();
        info!(pid = ?pid, lifecycle = ?self.lifecycle, "Deployment process started");

        let observer = match self.lifecycle {
            Lifecycle::Detached => None,
            Lifecycle::Observed => {
                let task = async move {
                    match handle.wait().await {
                        Ok(exit) if exit.success => {
                            info!(pid = ?pid, exit_code = ?exit.code, "Deployment finished");
                            Some(exit)
                        }
                        Ok(exit) => {
                            warn!(
                                pid = ?pid,
                                exit_code = ?exit.code,
                                "Deployment process exited unsuccessfully"
                            );
                            Some(exit)
                        }
                        Err(e) => {
                            error!(pid = ?pid, error = %e, "Failed to wait for deployment process");
                            None
                        }
                    }
                };
                Some(tokio::spawn(task.instrument(span.clone())))
            }
        };

        Ok(Dispatched { pid, observer })
    }
}
