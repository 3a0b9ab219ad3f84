//! In-memory launchers for tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::launcher::{LaunchSpec, ProcessHandle, ProcessLauncher};
use crate::types::{DispatchError, ProcessExit};

/// Records every `LaunchSpec` it is asked to start and hands back a process that
/// exits with `exit_code` after `run_for`
#[derive(Clone)]
pub struct RecordingLauncher {
    started: Arc<Mutex<Vec<LaunchSpec>>>,
    exit_code: i32,
    run_for: Duration,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::exiting_with(0)
    }

    pub fn exiting_with(exit_code: i32) -> Self {
        Self {
            started: Arc::new(Mutex::new(Vec::new())),
            exit_code,
            run_for: Duration::ZERO,
        }
    }

    pub fn running_for(mut self, run_for: Duration) -> Self {
        self.run_for = run_for;
        self
    }

    pub fn started(&self) -> Vec<LaunchSpec> {
        self.started.lock().unwrap().clone()
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn start(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, DispatchError> {
        let mut started = self.started.lock().unwrap();
        started.push(spec.clone());

        Ok(Box::new(FakeHandle {
            pid: 40_000 + started.len() as u32,
            exit_code: self.exit_code,
            run_for: self.run_for,
        }))
    }
}

struct FakeHandle {
    pid: u32,
    exit_code: i32,
    run_for: Duration,
}

#[async_trait::async_trait]
impl ProcessHandle for FakeHandle {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn wait(&mut self) -> std::io::Result<ProcessExit> {
        if !self.run_for.is_zero() {
            tokio::time::sleep(self.run_for).await;
        }
        Ok(ProcessExit {
            code: Some(self.exit_code),
            success: self.exit_code == 0,
        })
    }
}

/// Launcher whose every start fails as if the executable were missing
#[derive(Clone, Default)]
pub struct FailingLauncher {
    attempts: Arc<Mutex<usize>>,
}

impl FailingLauncher {
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl ProcessLauncher for FailingLauncher {
    fn start(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, DispatchError> {
        *self.attempts.lock().unwrap() += 1;
        Err(DispatchError::StartFailed {
            command: spec.command_line(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        })
    }
}
