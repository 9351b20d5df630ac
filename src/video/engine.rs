use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::VideoConfig;
use crate::error::{FramerError, Result, VideoError};
use crate::video::program::EngineProgram;

/// Flags placed before every program's own arguments
const GLOBAL_ARGS: [&str; 6] = ["-hide_banner", "-nostdin", "-y", "-progress", "pipe:1", "-nostats"];

/// Lifecycle of a media engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loading,
    Ready,
    Busy,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Busy => "busy",
        }
    }
}

/// Notifications emitted while a program runs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Fraction of the clip processed, 0.0 to 1.0
    Progress(f64),

    /// One line of engine diagnostics
    Log(String),
}

/// Ring of the most recent engine log lines
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// All retained lines joined with newlines
    pub fn contents(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Error out if cancellation was requested
pub fn check_cancelled(cancel: &CancellationToken) -> std::result::Result<(), VideoError> {
    if cancel.is_cancelled() {
        Err(VideoError::Cancelled)
    } else {
        Ok(())
    }
}

/// Parse `HH:MM:SS.ss` into seconds
pub fn parse_ffmpeg_time(time: &str) -> Option<f64> {
    let parts: Vec<&str> = time.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours = parts[0].parse::<f64>().ok()?;
    let minutes = parts[1].parse::<f64>().ok()?;
    let seconds = parts[2].parse::<f64>().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Clip duration from an engine log, e.g. `Duration: 00:00:05.03, start: ...`
pub fn parse_ffmpeg_duration(log: &str) -> Option<f64> {
    log.lines().find_map(|line| {
        let rest = line.split("Duration:").nth(1)?;
        let value = rest.split(',').next()?;
        parse_ffmpeg_time(value).filter(|seconds| *seconds > 0.0)
    })
}

/// Progress fraction from a `-progress` key/value line
pub fn parse_progress_line(line: &str, duration: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "progress" if value == "end" => Some(1.0),
        "out_time_us" | "out_time_ms" => {
            let duration = duration.filter(|d| *d > 0.0)?;
            let micros = value.parse::<i64>().ok()?;
            Some((micros as f64 / 1_000_000.0 / duration).clamp(0.0, 1.0))
        }
        _ => None,
    }
}

/// Whether the given ffmpeg binary runs
pub fn is_ffmpeg_available(ffmpeg: &Path) -> bool {
    std::process::Command::new(ffmpeg)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Exclusive session with an external ffmpeg binary
///
/// The session owns a private workspace directory that stands in for the
/// engine's file system. Every operation takes `&mut self`, so only one
/// program runs at a time. `reset` discards the workspace; the next `load`
/// acquires a fresh one.
pub struct MediaEngine {
    ffmpeg: PathBuf,
    state: SessionState,
    workspace: Option<TempDir>,
    log: LogBuffer,
}

impl MediaEngine {
    pub fn new(config: &VideoConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            state: SessionState::Unloaded,
            workspace: None,
            log: LogBuffer::new(config.log_capacity),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Diagnostics retained from the current session
    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Probe the binary and create the workspace. No-op when already ready.
    pub async fn load(&mut self) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Unloaded => {}
            other => {
                return Err(VideoError::InvalidState {
                    state: other.as_str(),
                    expected: SessionState::Unloaded.as_str(),
                }
                .into())
            }
        }

        self.state = SessionState::Loading;
        match self.acquire().await {
            Ok(workspace) => {
                info!("Media engine ready, workspace {}", workspace.path().display());
                self.workspace = Some(workspace);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Unloaded;
                Err(e.into())
            }
        }
    }

    async fn acquire(&self) -> std::result::Result<TempDir, VideoError> {
        let output = Command::new(&self.ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| VideoError::EngineUnavailable {
                reason: format!("{}: {}", self.ffmpeg.display(), e),
            })?;

        if !output.status.success() {
            return Err(VideoError::EngineUnavailable {
                reason: format!("{} -version exited with {}", self.ffmpeg.display(), output.status),
            });
        }

        if let Some(banner) = String::from_utf8_lossy(&output.stdout).lines().next() {
            debug!("{}", banner);
        }

        tempfile::Builder::new()
            .prefix("device-framer-")
            .tempdir()
            .map_err(|e| VideoError::EngineUnavailable {
                reason: format!("cannot create workspace: {}", e),
            })
    }

    /// Discard the session and its files
    pub fn reset(&mut self) {
        if self.workspace.take().is_some() {
            debug!("Media engine session discarded");
        }
        self.log.clear();
        self.state = SessionState::Unloaded;
    }

    fn workspace(&self) -> std::result::Result<&Path, VideoError> {
        match (&self.workspace, self.state) {
            (Some(dir), SessionState::Ready) => Ok(dir.path()),
            (_, state) => Err(VideoError::InvalidState {
                state: state.as_str(),
                expected: SessionState::Ready.as_str(),
            }),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let plain = Path::new(name).file_name() == Some(std::ffi::OsStr::new(name));
        if !plain {
            return Err(FramerError::generic(format!("invalid workspace file name: {:?}", name)));
        }
        Ok(self.workspace()?.join(name))
    }

    pub async fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes).await?;
        debug!("Wrote {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    pub async fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(VideoError::OutputMissing {
                name: name.to_string(),
                log: self.log.contents(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_file(&mut self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Run a program to completion
    ///
    /// Progress and log lines go to `events` when given; the sender is
    /// dropped on return, which closes the channel. Failures carry the
    /// retained log and are never retried.
    pub async fn exec(
        &mut self,
        program: &EngineProgram,
        duration: Option<f64>,
        events: Option<mpsc::UnboundedSender<EngineEvent>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let workspace = self.workspace()?.to_path_buf();
        check_cancelled(cancel)?;

        for input in &program.inputs {
            if !workspace.join(input).is_file() {
                return Err(VideoError::EngineFailed {
                    reason: format!("input file {} was not written", input),
                    log: self.log.contents(),
                }
                .into());
            }
        }

        self.state = SessionState::Busy;
        let result = self.run(&workspace, program, duration, events.as_ref(), cancel).await;
        self.state = SessionState::Ready;
        result?;

        if !workspace.join(&program.output).is_file() {
            return Err(VideoError::OutputMissing {
                name: program.output.clone(),
                log: self.log.contents(),
            }
            .into());
        }
        Ok(())
    }

    async fn run(
        &mut self,
        workspace: &Path,
        program: &EngineProgram,
        duration: Option<f64>,
        events: Option<&mpsc::UnboundedSender<EngineEvent>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        debug!("Executing: {} {}", self.ffmpeg.display(), program.args.join(" "));

        let mut child = Command::new(&self.ffmpeg)
            .args(GLOBAL_ARGS)
            .args(&program.args)
            .current_dir(workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VideoError::EngineUnavailable {
                reason: format!("{}: {}", self.ffmpeg.display(), e),
            })?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => return Err(FramerError::generic("engine output pipes unavailable")),
        };
        let mut progress_lines = BufReader::new(stdout).lines();
        let mut log_lines = BufReader::new(stderr).lines();
        let (mut progress_done, mut log_done) = (false, false);

        while !(progress_done && log_done) {
            tokio::select! {
                _ = cancel.cancelled() => return Self::abort(&mut child).await,
                line = progress_lines.next_line(), if !progress_done => match line {
                    Ok(Some(line)) => {
                        if let Some(fraction) = parse_progress_line(&line, duration) {
                            send(events, EngineEvent::Progress(fraction));
                        }
                    }
                    _ => progress_done = true,
                },
                line = log_lines.next_line(), if !log_done => match line {
                    Ok(Some(line)) => self.record(line, events),
                    _ => log_done = true,
                },
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => return Self::abort(&mut child).await,
            status = child.wait() => status?,
        };

        if !status.success() {
            warn!("ffmpeg exited with {}", status);
            return Err(VideoError::EngineFailed {
                reason: format!("ffmpeg exited with {}", status),
                log: self.log.contents(),
            }
            .into());
        }

        send(events, EngineEvent::Progress(1.0));
        Ok(())
    }

    async fn abort(child: &mut Child) -> Result<()> {
        if let Err(e) = child.kill().await {
            warn!("Failed to stop ffmpeg: {}", e);
        }
        info!("Media engine job cancelled");
        Err(VideoError::Cancelled.into())
    }

    fn record(&mut self, line: String, events: Option<&mpsc::UnboundedSender<EngineEvent>>) {
        debug!(target: "ffmpeg", "{}", line);
        send(events, EngineEvent::Log(line.clone()));
        self.log.push(line);
    }
}

fn send(events: Option<&mpsc::UnboundedSender<EngineEvent>>, event: EngineEvent) {
    if let Some(tx) = events {
        // receiver may have gone away; the job carries on regardless
        let _ = tx.send(event);
    }
}
