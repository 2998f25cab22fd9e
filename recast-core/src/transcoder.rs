//! The transcode capability and its backends.
//!
//! A [`Transcoder`] runs a profile against an input and streams the result
//! into a caller-supplied sink, stopping as soon as the [`Context`] is done.
//! Backends:
//!
//! - [`FfmpegTranscoder`](crate::FfmpegTranscoder): spawns the profile's
//!   command and forwards its stdout
//! - [`NoopTranscoder`]: streams the input file unchanged

use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::profile::Profile;

/// Default read size when forwarding output.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Smallest read size a backend will accept.
pub const MIN_CHUNK_SIZE: usize = 4 * 1024;

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `input` with `profile`, writing the encoded bytes to `out`
    /// as they are produced.
    ///
    /// Bitrate and seek must already be set on `profile`. On cancellation
    /// the bytes already written stay written and a cancellation error
    /// ([`Error::is_cancellation`]) is returned.
    async fn transcode(
        &self,
        ctx: &Context,
        profile: &Profile,
        input: &Path,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()>;
}

/// Copy `reader` into `out` until EOF, returning the byte count.
///
/// Cancellation is checked before every read and every write, so once the
/// context is done nothing more reaches `out`.
pub(crate) async fn forward<R>(
    ctx: &Context,
    reader: &mut R,
    out: &mut (dyn AsyncWrite + Unpin + Send),
    chunk_size: usize,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        let n = tokio::select! {
            biased;
            err = ctx.done() => return Err(err),
            read = reader.read(&mut buf) => read.map_err(Error::Stream)?,
        };
        if n == 0 {
            break;
        }

        tokio::select! {
            biased;
            err = ctx.done() => return Err(err),
            written = out.write_all(&buf[..n]) => written.map_err(Error::Sink)?,
        }
        total += n as u64;
    }

    tokio::select! {
        biased;
        err = ctx.done() => return Err(err),
        flushed = out.flush() => flushed.map_err(Error::Sink)?,
    }

    Ok(total)
}

/// Streams the input file through untouched, ignoring the profile.
#[derive(Debug, Clone)]
pub struct NoopTranscoder {
    chunk_size: usize,
}

impl NoopTranscoder {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(MIN_CHUNK_SIZE);
        self
    }
}

impl Default for NoopTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for NoopTranscoder {
    async fn transcode(
        &self,
        ctx: &Context,
        _profile: &Profile,
        input: &Path,
        out: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let mut file = tokio::fs::File::open(input)
            .await
            .map_err(|source| Error::Input {
                path: input.to_path_buf(),
                source,
            })?;

        let bytes = forward(ctx, &mut file, out, self.chunk_size).await?;
        log::debug!("passed through {bytes} bytes of {}", input.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context as TaskContext, Poll};

    /// Sink that records each write and can cancel a context on first write.
    #[derive(Default)]
    struct RecordingSink {
        data: Vec<u8>,
        writes: usize,
        cancel_on_write: Option<Context>,
        fail: bool,
    }

    impl AsyncWrite for RecordingSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.fail {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")));
            }
            self.data.extend_from_slice(buf);
            self.writes += 1;
            if let Some(ctx) = &self.cancel_on_write {
                ctx.cancel();
            }
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn forward_copies_everything_in_order() {
        let input: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
        let mut reader = &input[..];
        let mut sink = RecordingSink::default();

        let n = forward(&Context::new(), &mut reader, &mut sink, MIN_CHUNK_SIZE)
            .await
            .unwrap();

        assert_eq!(n, 20_000);
        assert_eq!(sink.data, input);
        assert_eq!(sink.writes, 5);
    }

    #[tokio::test]
    async fn forward_stops_writing_after_cancel() {
        let input = vec![7u8; 3 * MIN_CHUNK_SIZE];
        let mut reader = &input[..];
        let ctx = Context::new();
        let mut sink = RecordingSink {
            cancel_on_write: Some(ctx.clone()),
            ..Default::default()
        };

        let err = forward(&ctx, &mut reader, &mut sink, MIN_CHUNK_SIZE)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(sink.writes, 1);
        assert_eq!(sink.data.len(), MIN_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn forward_reports_sink_failure() {
        let mut reader = &b"payload"[..];
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let err = forward(&Context::new(), &mut reader, &mut sink, MIN_CHUNK_SIZE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sink(_)), "{err}");
    }

    #[tokio::test]
    async fn noop_passes_file_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.flac");
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &payload).unwrap();

        let profile = Profile::new("audio/flac", "flac", 0, "");
        let mut out = Vec::new();
        NoopTranscoder::new()
            .transcode(&Context::new(), &profile, &path, &mut out)
            .await
            .unwrap();

        assert_eq!(out, payload);
    }

    #[tokio::test]
    async fn noop_reports_missing_input() {
        let profile = Profile::new("audio/flac", "flac", 0, "");
        let mut out = Vec::new();
        let err = NoopTranscoder::new()
            .transcode(&Context::new(), &profile, Path::new("/nonexistent/recast.flac"), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input { .. }), "{err}");
    }

    #[tokio::test]
    async fn noop_honours_prior_cancellation() {
        let ctx = Context::new();
        ctx.cancel();
        let mut out = Vec::new();
        let err = NoopTranscoder::new()
            .transcode(&ctx, &Profile::new("a", "b", 0, ""), Path::new("/dev/null"), &mut out)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn trait_objects_are_interchangeable() {
        let backends: Vec<Arc<dyn Transcoder>> = vec![
            Arc::new(NoopTranscoder::new().with_chunk_size(1)),
            Arc::new(crate::FfmpegTranscoder::new()),
        ];
        let ctx = Context::new();
        ctx.cancel();
        for backend in backends {
            let mut out = Vec::new();
            let err = backend
                .transcode(&ctx, &Profile::new("a", "b", 0, "cat <file>"), Path::new("x"), &mut out)
                .await
                .unwrap_err();
            assert!(err.is_cancellation());
        }
    }
}
