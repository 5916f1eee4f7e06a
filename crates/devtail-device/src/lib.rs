//! Device logging process collaborators for devtail
//!
//! This crate owns every shell-out: locating and spawning `adb logcat`,
//! resolving an application id to a pid, and spawning the simulator's
//! unified log stream. Everything here runs before or outside the streaming
//! core; failures are surfaced as distinguished errors so session setup can
//! abort before any streaming begins.

mod adb;
mod simulator;

pub use adb::{adb_path, application_pid, spawn_logcat};
pub use simulator::spawn_simulator_log;

/// Failure while talking to a device logging tool.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// `adb logcat -c` failed; streaming from a stale buffer would replay
    /// old entries, so the spawn is aborted.
    #[error("cannot clear logcat buffer: {0}")]
    ClearBuffer(String),

    /// The logcat process could not be started.
    #[error("cannot start logcat: {0}")]
    StartLogcat(String),

    /// The simulator log process could not be started.
    #[error("cannot start simulator log stream: {0}")]
    StartSimulatorLog(String),

    /// The `pidof` shell-out failed outright.
    #[error("cannot get pid for application '{app_id}': {reason}")]
    PidLookup { app_id: String, reason: String },

    /// The `pidof` shell-out produced something that is not a pid.
    #[error("unprocessable pid for application '{app_id}': {output:?}")]
    UnprocessablePid { app_id: String, output: String },
}
