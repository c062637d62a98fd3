use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// What the host offers for running the Playwright bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeProbe {
    pub node_available: bool,
    pub node_version: Option<String>,
    pub playwright_package_available: bool,
    pub chromium_cache_detected: bool,
    pub ready: bool,
    pub notes: Vec<String>,
}

impl RuntimeProbe {
    fn empty() -> Self {
        Self {
            node_available: false,
            node_version: None,
            playwright_package_available: false,
            chromium_cache_detected: false,
            ready: false,
            notes: Vec::new(),
        }
    }
}

/// Probe `node_program` and the `playwright` package as resolved from `cwd`.
pub async fn probe_runtime(node_program: &str, cwd: Option<&Path>) -> Result<RuntimeProbe> {
    let mut probe = RuntimeProbe::empty();

    let node_probe =
        run_command_capture(node_program, &["--version".to_string()], cwd, 10).await;

    if let Ok(output) = node_probe
        && output.exit_code == 0
    {
        probe.node_available = true;
        probe.node_version = Some(output.stdout.trim().to_string());
    }

    if probe.node_available {
        let playwright_probe = run_command_capture(
            node_program,
            &[
                "-e".to_string(),
                "try { require.resolve('playwright'); process.exit(0); } catch (_) { process.exit(1); }"
                    .to_string(),
            ],
            cwd,
            15,
        )
        .await;
        probe.playwright_package_available = playwright_probe
            .map(|output| output.exit_code == 0)
            .unwrap_or(false);
    }

    probe.chromium_cache_detected = detect_chromium_cache();
    probe.ready = probe.node_available && probe.playwright_package_available;

    if !probe.node_available {
        probe
            .notes
            .push("Node.js not found. Install Node.js 20+ to enable the browser bridge.".to_string());
    }

    if probe.node_available && !probe.playwright_package_available {
        probe
            .notes
            .push("Playwright npm package not found. Run: npm i playwright".to_string());
    }

    if probe.ready && !probe.chromium_cache_detected {
        probe.notes.push(
            "Chromium browser binary not found in Playwright cache. Run: npx playwright install chromium".to_string(),
        );
    }

    Ok(probe)
}

pub fn ensure_probe_ready(probe: &RuntimeProbe) -> Result<()> {
    if !probe.node_available {
        bail!("Node.js is required for browser automation");
    }
    if !probe.playwright_package_available {
        bail!("Playwright npm package is not available. Install it with: npm i playwright");
    }
    Ok(())
}

struct CommandCapture {
    exit_code: i32,
    stdout: String,
    stderr: String,
}

async fn run_command_capture(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout_secs: u64,
) -> Result<CommandCapture> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let output = match timeout(Duration::from_secs(timeout_secs), command.output()).await {
        Ok(result) => result?,
        Err(_) => bail!("Command timed out after {} seconds", timeout_secs),
    };

    Ok(CommandCapture {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn detect_chromium_cache() -> bool {
    if let Ok(path) = std::env::var("PLAYWRIGHT_BROWSERS_PATH") {
        let parsed = PathBuf::from(path);
        if parsed.exists() {
            return true;
        }
    }

    let mut candidates = Vec::new();

    if let Ok(home) = std::env::var("HOME") {
        candidates.push(PathBuf::from(&home).join(".cache/ms-playwright"));
        candidates.push(PathBuf::from(&home).join("Library/Caches/ms-playwright"));
    }

    if let Ok(user_profile) = std::env::var("USERPROFILE") {
        candidates.push(PathBuf::from(user_profile).join("AppData/Local/ms-playwright"));
    }

    candidates.into_iter().any(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_node_binary_is_reported_not_raised() {
        let probe = probe_runtime("pblink-definitely-not-node", None)
            .await
            .unwrap();
        assert!(!probe.node_available);
        assert!(!probe.ready);
        assert!(probe.notes.iter().any(|note| note.contains("Node.js")));
        assert!(ensure_probe_ready(&probe).is_err());
    }

    #[test]
    fn ready_probe_passes() {
        let probe = RuntimeProbe {
            node_available: true,
            node_version: Some("v22.0.0".to_string()),
            playwright_package_available: true,
            chromium_cache_detected: true,
            ready: true,
            notes: Vec::new(),
        };
        assert!(ensure_probe_ready(&probe).is_ok());
    }
}
