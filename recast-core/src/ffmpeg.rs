use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;

use crate::command::synthesize;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::profile::Profile;
use crate::transcoder::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE, Transcoder, forward};

/// How much encoder stderr is kept for error reports.
const STDERR_TAIL: usize = 4 * 1024;

/// How long to wait for the stderr reader once the encoder has exited.
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// Runs the profile's command as a child process and streams its stdout.
///
/// Named for the encoder the built-in profiles use; any program a profile
/// names works the same way.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    chunk_size: usize,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Read size for the encoder's stdout, at least 4 KiB.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(MIN_CHUNK_SIZE);
        self
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        ctx: &Context,
        profile: &Profile,
        input: &Path,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let cmd = synthesize(profile, input)?;
        log::info!(
            "Transcoding {} to {} at {}k",
            input.display(),
            profile.suffix(),
            profile.bitrate()
        );
        log::debug!("Executing: {cmd}");

        let start = Instant::now();
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                program: cmd.program.clone(),
                source,
            })?;
        log::debug!("Encoder started, pid={:?}", child.id());

        let stderr = child.stderr.take().map(|s| tokio::spawn(read_tail(s)));

        match pump(ctx, &mut child, out, self.chunk_size).await {
            Ok((status, bytes)) if status.success() => {
                log::info!(
                    "Transcode finished: {} bytes from {} in {:?}",
                    bytes,
                    input.display(),
                    start.elapsed()
                );
                Ok(())
            }
            Ok((status, _)) => {
                let stderr = collect_tail(stderr).await;
                log::error!("Encoder failed with {status}: {stderr}");
                Err(Error::ProcessExit { status, stderr })
            }
            Err(err) => {
                if err.is_cancellation() {
                    log::warn!("Transcode of {} stopped: {err}", input.display());
                }
                kill(&mut child).await;
                if let Some(task) = stderr {
                    task.abort();
                }
                Err(err)
            }
        }
    }
}

/// Forward the child's stdout, then wait for it to exit.
async fn pump(
    ctx: &Context,
    child: &mut Child,
    out: &mut (dyn AsyncWrite + Unpin + Send),
    chunk_size: usize,
) -> Result<(ExitStatus, u64)> {
    let mut stdout = child.stdout.take().ok_or_else(|| {
        Error::Stream(std::io::Error::other("encoder stdout was not captured"))
    })?;
    let bytes = forward(ctx, &mut stdout, out, chunk_size).await?;
    drop(stdout);

    tokio::select! {
        biased;
        err = ctx.done() => Err(err),
        status = child.wait() => Ok((status.map_err(Error::Stream)?, bytes)),
    }
}

/// Kill the child and reap it so no zombie is left behind.
async fn kill(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        log::debug!("Failed to kill encoder: {e}");
    }
    if let Err(e) = child.wait().await {
        log::debug!("Failed to reap encoder: {e}");
    }
}

/// Keep the last [`STDERR_TAIL`] bytes the encoder writes to stderr.
async fn read_tail(mut stderr: ChildStderr) -> Vec<u8> {
    let mut tail = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > STDERR_TAIL {
                    let excess = tail.len() - STDERR_TAIL;
                    tail.drain(..excess);
                }
            }
        }
    }
    tail
}

async fn collect_tail(task: Option<JoinHandle<Vec<u8>>>) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match tokio::time::timeout(STDERR_GRACE, &mut task).await {
        Ok(Ok(tail)) => String::from_utf8_lossy(&tail).trim().to_string(),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            // A grandchild may still hold stderr open
            task.abort();
            String::new()
        }
    }
}
