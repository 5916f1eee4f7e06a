//! Simulator unified log spawning

use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::DeviceError;

/// Spawn `xcrun simctl spawn booted log stream --type log` with piped stdio.
///
/// The command itself starts fine without a booted simulator; the "No
/// devices are booted." condition arrives on stderr and is handled by the
/// streaming session as a fatal source error.
pub fn spawn_simulator_log() -> Result<Child, DeviceError> {
    tracing::debug!("starting simulator log stream");
    Command::new("xcrun")
        .args(["simctl", "spawn", "booted", "log", "stream", "--type", "log"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DeviceError::StartSimulatorLog(e.to_string()))
}
