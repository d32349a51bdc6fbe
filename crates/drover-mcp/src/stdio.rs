//! Stdio transport: JSON-RPC over a spawned child process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use drover_core::{DroverError, RequestContext, Result};

use crate::jsonrpc::{Request, Response};

/// Configuration for a stdio MCP server.
#[derive(Debug, Clone, Default)]
pub struct StdioServerConfig {
    /// Program to spawn. Must resolve on `PATH` (or be a path to an
    /// executable file).
    pub command: String,
    /// Arguments passed literally.
    pub args: Vec<String>,
    /// Extra environment entries as `(key, value)` pairs.
    pub env: Vec<(String, String)>,
}

struct Pipes {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// A child process speaking newline-delimited JSON-RPC on stdin/stdout.
///
/// The pipe pair sits behind a mutex: the transport allows one in-flight
/// call at a time per connection, which is what keeps request/response
/// pairing trivial on a byte stream.
pub(crate) struct StdioTransport {
    child: Mutex<Option<Child>>,
    pipes: Mutex<Option<Pipes>>,
    command: String,
}

impl StdioTransport {
    /// Spawn the configured command with piped stdio.
    pub(crate) fn spawn(config: &StdioServerConfig) -> Result<Self> {
        let program = resolve_program(&config.command)?;
        debug!(command = %config.command, program = %program.display(), "spawning MCP server process");

        let mut cmd = Command::new(&program);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| DroverError::Transport(format!("failed to spawn '{}': {e}", config.command)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DroverError::Transport("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DroverError::Transport("child stdout unavailable".into()))?;

        Ok(Self {
            child: Mutex::new(Some(child)),
            pipes: Mutex::new(Some(Pipes {
                stdin,
                stdout: BufReader::new(stdout),
            })),
            command: config.command.clone(),
        })
    }

    /// Send one request and read its response. Notifications return `None`
    /// without waiting for a reply.
    pub(crate) async fn call(
        &self,
        ctx: &RequestContext,
        request: &Request,
    ) -> Result<Option<Response>> {
        ctx.ensure_active()?;

        let mut guard = self.pipes.lock().await;
        let pipes = guard
            .as_mut()
            .ok_or_else(|| DroverError::Transport("MCP connection is closed".into()))?;

        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        pipes.stdin.write_all(line.as_bytes()).await?;
        pipes.stdin.flush().await?;

        if request.id.is_none() {
            return Ok(None);
        }

        // Skip server-initiated notifications until the reply for our id
        // arrives.
        loop {
            let mut buf = String::new();
            let read = tokio::select! {
                read = pipes.stdout.read_line(&mut buf) => read?,
                _ = ctx.cancellation().cancelled() => return Err(DroverError::Cancelled),
            };
            if read == 0 {
                return Err(DroverError::Transport(format!(
                    "MCP server '{}' closed its stdout",
                    self.command
                )));
            }

            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            let response: Response = serde_json::from_str(trimmed).map_err(|e| {
                DroverError::MalformedResponse(format!("invalid JSON-RPC frame: {e}"))
            })?;
            if response.id == request.id {
                return Ok(Some(response));
            }
            debug!(command = %self.command, "skipping unsolicited JSON-RPC frame");
        }
    }

    /// Kill and reap the child. Idempotent.
    pub(crate) async fn shutdown(&self) -> Result<()> {
        // Dropping the pipes first cancels any blocked reader.
        self.pipes.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.start_kill() {
                warn!(command = %self.command, error = %e, "failed to kill MCP server process");
            }
            let _ = child.wait().await;
        }
        Ok(())
    }
}

/// Resolve a command the way the shell would: explicit paths must point at
/// an executable regular file; bare names are searched on `PATH`.
pub(crate) fn resolve_program(command: &str) -> Result<PathBuf> {
    if command.is_empty() {
        return Err(DroverError::Config("MCP server command cannot be empty".into()));
    }

    if command.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(command);
        if is_executable_file(path) {
            return Ok(path.to_path_buf());
        }
        return Err(DroverError::Config(format!(
            "invalid MCP server command '{command}': not an executable file"
        )));
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(command);
        if is_executable_file(&candidate) {
            return Ok(candidate);
        }
    }

    Err(DroverError::Config(format!(
        "invalid MCP server command '{command}': not found on PATH"
    )))
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
