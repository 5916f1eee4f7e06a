//! adb shell-outs: path resolution, logcat spawning, pid lookup

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::DeviceError;

/// Resolve the adb binary: explicit override, then the SDK env vars, then
/// whatever `adb` the PATH provides.
pub fn adb_path(custom: Option<&Path>) -> PathBuf {
    if let Some(path) = custom {
        return path.to_path_buf();
    }
    sdk_root()
        .map(|root| root.join("platform-tools").join("adb"))
        .unwrap_or_else(|| PathBuf::from("adb"))
}

fn sdk_root() -> Option<PathBuf> {
    std::env::var_os("ANDROID_SDK_ROOT")
        .or_else(|| std::env::var_os("ANDROID_HOME"))
        .map(PathBuf::from)
}

/// Clear the logcat buffer, then spawn `adb logcat -v time process tag`
/// with piped stdio for the streaming session.
pub async fn spawn_logcat(custom_path: Option<&Path>) -> Result<Child, DeviceError> {
    let adb = adb_path(custom_path);

    let cleared = Command::new(&adb)
        .args(["logcat", "-c"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| DeviceError::ClearBuffer(e.to_string()))?;
    if !cleared.success() {
        return Err(DeviceError::ClearBuffer(format!(
            "adb logcat -c exited with {cleared}"
        )));
    }

    tracing::debug!(adb = %adb.display(), "starting logcat");
    Command::new(&adb)
        .args(["logcat", "-v", "time", "process", "tag"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DeviceError::StartLogcat(e.to_string()))
}

/// Resolve an application id to its running pid via `adb shell pidof -s`.
pub async fn application_pid(
    app_id: &str,
    custom_path: Option<&Path>,
) -> Result<i32, DeviceError> {
    let adb = adb_path(custom_path);
    let output = Command::new(&adb)
        .args(["shell", "pidof", "-s", app_id])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| DeviceError::PidLookup {
            app_id: app_id.to_string(),
            reason: e.to_string(),
        })?;

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim()
        .parse()
        .map_err(|_| DeviceError::UnprocessablePid {
            app_id: app_id.to_string(),
            output: text.trim().to_string(),
        })
}
