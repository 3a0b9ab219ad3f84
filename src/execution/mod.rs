//! Process launching for the deployment command

#[cfg(test)]
pub(crate) mod fakes;
pub mod launcher;

pub use launcher::{LaunchSpec, ProcessLauncher, TokioProcessLauncher};
