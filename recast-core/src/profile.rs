use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Target bitrate in kilobits per second.
pub type BitRate = u32;

/// One transcoding target: codec output, default bitrate, seek offset and the
/// command template that produces it.
///
/// Profiles are values. The `with_*` methods hand back a modified copy and
/// leave the receiver alone, so a shared base profile can be specialised per
/// request without locking. Cloning only bumps reference counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    bitrate: BitRate,
    seek: Duration,
    mime: Arc<str>,
    suffix: Arc<str>,
    exec: Arc<str>,
}

impl Profile {
    /// Build a profile starting at the beginning of the input.
    ///
    /// The template is not checked here; problems surface when a command is
    /// synthesized from it.
    pub fn new(
        mime: impl Into<Arc<str>>,
        suffix: impl Into<Arc<str>>,
        bitrate: BitRate,
        exec_template: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            bitrate,
            seek: Duration::ZERO,
            mime: mime.into(),
            suffix: suffix.into(),
            exec: exec_template.into(),
        }
    }

    /// Copy of this profile encoding at `bitrate` instead.
    pub fn with_bitrate(&self, bitrate: BitRate) -> Self {
        Self {
            bitrate,
            ..self.clone()
        }
    }

    /// Copy of this profile starting `seek` into the input.
    pub fn with_seek(&self, seek: Duration) -> Self {
        Self {
            seek,
            ..self.clone()
        }
    }

    /// Bitrate in kbit/s; zero means the caller still has to pick one.
    pub fn bitrate(&self) -> BitRate {
        self.bitrate
    }

    pub fn seek(&self) -> Duration {
        self.seek
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn exec_template(&self) -> &str {
        &self.exec
    }

    /// Rough output size in bytes for a track of `length`, e.g. for a
    /// `Content-Length` estimate. Partial seconds count as a whole second.
    pub fn guess_expected_size(&self, length: Duration) -> u64 {
        let mut secs = length.as_secs();
        if length.subsec_nanos() > 0 {
            secs = secs.saturating_add(1);
        }
        let bytes_per_sec = u64::from(self.bitrate) * 1000 / 8;
        bytes_per_sec.saturating_mul(secs)
    }
}

/// A profile as written in a configuration file.
///
/// ```toml
/// mimetype = "audio/flac"
/// ext = "flac"
/// bitrate = 0
/// ffcmd = "ffmpeg -v 0 -i <file> -ss <seek> -c:a flac -f flac -"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(rename = "mimetype")]
    pub mime: String,
    pub ext: String,
    #[serde(default)]
    pub bitrate: BitRate,
    pub ffcmd: String,
}

impl From<ProfileConfig> for Profile {
    fn from(config: ProfileConfig) -> Self {
        Profile::new(config.mime, config.ext, config.bitrate, config.ffcmd)
    }
}
