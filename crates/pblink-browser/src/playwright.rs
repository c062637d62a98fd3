use crate::bridge::{
    Command as BridgeCommand, Envelope, HANDSHAKE_ID, Response, build_bridge_script,
    parse_response_line,
};
use crate::probe::{ensure_probe_ready, probe_runtime};
use crate::{
    BrowserCookie, BrowserLauncher, ElementState, LaunchOptions, PageDriver, WaitUntil,
};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

const DEFAULT_LAUNCH_TIMEOUT_SECS: u64 = 60;
/// Added on top of a command's own timeout to cover process round-trips.
const TRANSPORT_GRACE: Duration = Duration::from_secs(5);
/// Budget for commands that carry no timeout of their own.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches Chromium through a Node.js Playwright bridge process.
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    node_program: String,
    cwd: Option<PathBuf>,
    launch_timeout: Duration,
}

impl Default for PlaywrightLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaywrightLauncher {
    pub fn new() -> Self {
        Self {
            node_program: "node".to_string(),
            cwd: None,
            launch_timeout: Duration::from_secs(DEFAULT_LAUNCH_TIMEOUT_SECS),
        }
    }

    pub fn with_node_program(mut self, program: impl Into<String>) -> Self {
        self.node_program = program.into();
        self
    }

    /// Directory whose `node_modules` provides the `playwright` package.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_launch_timeout(mut self, launch_timeout: Duration) -> Self {
        self.launch_timeout = launch_timeout;
        self
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn PageDriver>> {
        let probe = probe_runtime(&self.node_program, self.cwd.as_deref()).await?;
        ensure_probe_ready(&probe)?;

        let workdir = tempfile::Builder::new()
            .prefix("pblink-bridge-")
            .tempdir()?;
        let script_path = workdir.path().join("bridge.mjs");
        std::fs::write(&script_path, build_bridge_script())?;

        let mut command = Command::new(&self.node_program);
        command
            .arg(&script_path)
            .arg(serde_json::to_string(options)?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &self.cwd {
            if !cwd.is_dir() {
                bail!("Invalid working directory: {}", cwd.display());
            }
            command.current_dir(cwd);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.node_program))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Bridge stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Bridge stdout unavailable"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "pblink_browser::bridge", "{}", line);
                }
            });
        }

        let mut io = BridgeIo {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: HANDSHAKE_ID + 1,
            closed: false,
        };

        let ready = io
            .read_response(HANDSHAKE_ID, Instant::now() + self.launch_timeout)
            .await
            .context("Browser bridge did not become ready")?;
        if !ready.ok {
            let _ = io.child.kill().await;
            bail!(
                "Browser launch failed: {}",
                ready.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        debug!(value = ?ready.value, "Playwright bridge ready");

        Ok(Box::new(PlaywrightDriver {
            io: Mutex::new(io),
            _workdir: workdir,
        }))
    }
}

struct BridgeIo {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: i64,
    closed: bool,
}

impl BridgeIo {
    async fn send(&mut self, command: BridgeCommand<'_>) -> Result<Value> {
        if self.closed {
            bail!("Browser session is already closed");
        }

        let id = self.next_id;
        self.next_id += 1;
        let op = command.name();
        let budget = command
            .own_timeout_ms()
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT)
            + TRANSPORT_GRACE;

        let mut line = serde_json::to_string(&Envelope { id, command })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let response = self.read_response(id, Instant::now() + budget).await?;
        if response.ok {
            Ok(response.value.unwrap_or(Value::Null))
        } else {
            Err(anyhow!(
                "{} failed: {}",
                op,
                response.error.unwrap_or_else(|| "unknown error".to_string())
            ))
        }
    }

    async fn read_response(&mut self, id: i64, deadline: Instant) -> Result<Response> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let next = match timeout(remaining, self.stdout.next_line()).await {
                Ok(result) => result?,
                Err(_) => bail!("Bridge did not answer request {} in time", id),
            };

            let Some(line) = next else {
                self.closed = true;
                bail!("Browser bridge exited unexpectedly");
            };

            match parse_response_line(&line) {
                Some(response) if response.id == id => return Ok(response),
                Some(response) => {
                    warn!(expected = id, received = response.id, "Discarding stale bridge answer");
                }
                None => debug!(target: "pblink_browser::bridge", "{}", line),
            }
        }
    }
}

/// [`PageDriver`] backed by one Playwright bridge process.
pub struct PlaywrightDriver {
    io: Mutex<BridgeIo>,
    _workdir: tempfile::TempDir,
}

impl PlaywrightDriver {
    async fn send(&self, command: BridgeCommand<'_>) -> Result<Value> {
        let mut io = self.io.lock().await;
        io.send(command).await
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn add_init_script(&self, source: &str, arg: Value) -> Result<()> {
        self.send(BridgeCommand::InitScript { source, arg: &arg })
            .await
            .map(|_| ())
    }

    async fn add_cookies(&self, cookies: &[BrowserCookie]) -> Result<()> {
        self.send(BridgeCommand::AddCookies { cookies })
            .await
            .map(|_| ())
    }

    async fn goto(&self, url: &str, wait_until: WaitUntil, timeout: Duration) -> Result<()> {
        self.send(BridgeCommand::Goto {
            url,
            wait_until,
            timeout_ms: millis(timeout),
        })
        .await
        .map(|_| ())
    }

    async fn current_url(&self) -> Result<String> {
        let value = self.send(BridgeCommand::Url).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Bridge returned a non-string URL"))
    }

    async fn wait_for(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> Result<()> {
        self.send(BridgeCommand::WaitFor {
            selector,
            state,
            timeout_ms: millis(timeout),
        })
        .await
        .map(|_| ())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.send(BridgeCommand::Click {
            selector,
            timeout_ms: millis(timeout),
        })
        .await
        .map(|_| ())
    }

    async fn hover(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.send(BridgeCommand::Hover {
            selector,
            timeout_ms: millis(timeout),
        })
        .await
        .map(|_| ())
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<()> {
        self.send(BridgeCommand::Fill {
            selector,
            text,
            timeout_ms: millis(timeout),
        })
        .await
        .map(|_| ())
    }

    async fn press(&self, key: &str) -> Result<()> {
        self.send(BridgeCommand::Press { key }).await.map(|_| ())
    }

    async fn evaluate(&self, source: &str, arg: Value) -> Result<Value> {
        self.send(BridgeCommand::Evaluate { source, arg: &arg }).await
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.send(BridgeCommand::Screenshot {
            path: path.display().to_string(),
            full_page,
        })
        .await
        .map(|_| ())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let value = self.send(BridgeCommand::Cookies).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn local_storage(&self) -> Result<BTreeMap<String, String>> {
        let value = self.send(BridgeCommand::LocalStorage).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn close(&self) -> Result<()> {
        let mut io = self.io.lock().await;
        if io.closed {
            return Ok(());
        }

        let result = io.send(BridgeCommand::Close).await;
        io.closed = true;

        match timeout(TRANSPORT_GRACE, io.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Playwright bridge exited"),
            Ok(Err(err)) => warn!("Failed to reap Playwright bridge: {}", err),
            Err(_) => {
                warn!("Playwright bridge did not exit after close, killing it");
                let _ = io.child.kill().await;
            }
        }

        result.map(|_| ())
    }
}
