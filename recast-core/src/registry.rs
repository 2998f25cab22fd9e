use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::profile::{BitRate, Profile};

const MP3_MIME: &str = "audio/mpeg";
const OPUS_MIME: &str = "audio/ogg";

/// Blanks tags that would make players apply gain a second time.
const CLEAR_GAIN_TAGS: &str = "-metadata replaygain_album_gain= -metadata replaygain_album_peak= \
     -metadata replaygain_track_gain= -metadata replaygain_track_peak= \
     -metadata r128_album_gain= -metadata r128_track_gain=";

const RG_FILTER: &str = "volume=replaygain=track:replaygain_preamp=6dB:replaygain_noclip=0, \
     alimiter=level=disabled, asidedata=mode=delete:type=REPLAYGAIN";

const RG_LOUD_FILTER: &str = "volume=replaygain=track:replaygain_preamp=15dB:replaygain_noclip=0, \
     acompressor=threshold=0.125:ratio=4:attack=20:release=200:makeup=2, \
     alimiter=level=disabled, asidedata=mode=delete:type=REPLAYGAIN";

/// Profiles compiled into the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinProfile {
    /// MP3 at 128 kbit/s
    Mp3,
    /// MP3 at 128 kbit/s with track replay gain applied
    Mp3ReplayGain,
    /// Opus at 96 kbit/s
    Opus,
    /// Opus at 96 kbit/s with track replay gain applied
    OpusReplayGain,
    /// Opus at 96 kbit/s, boosted and compressed for noisy rooms and cars
    OpusCar,
    /// Opus at 128 kbit/s
    Opus128,
    /// Opus at 128 kbit/s with track replay gain applied
    Opus128ReplayGain,
    /// Opus at 128 kbit/s, boosted and compressed for noisy rooms and cars
    Opus128Car,
    /// Opus at 192 kbit/s
    Opus192,
}

impl BuiltinProfile {
    pub const ALL: [BuiltinProfile; 9] = [
        BuiltinProfile::Mp3,
        BuiltinProfile::Mp3ReplayGain,
        BuiltinProfile::Opus,
        BuiltinProfile::OpusReplayGain,
        BuiltinProfile::OpusCar,
        BuiltinProfile::Opus128,
        BuiltinProfile::Opus128ReplayGain,
        BuiltinProfile::Opus128Car,
        BuiltinProfile::Opus192,
    ];

    /// Registry key for this profile.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinProfile::Mp3 => "mp3",
            BuiltinProfile::Mp3ReplayGain => "mp3_rg",
            BuiltinProfile::Opus => "opus",
            BuiltinProfile::OpusReplayGain => "opus_rg",
            BuiltinProfile::OpusCar => "opus_car",
            BuiltinProfile::Opus128 => "opus_128",
            BuiltinProfile::Opus128ReplayGain => "opus_128_rg",
            BuiltinProfile::Opus128Car => "opus_128_car",
            BuiltinProfile::Opus192 => "opus_192",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            BuiltinProfile::Mp3 => "MP3, 128 kbit/s",
            BuiltinProfile::Mp3ReplayGain => "MP3, 128 kbit/s, replay gain applied",
            BuiltinProfile::Opus => "Opus, 96 kbit/s",
            BuiltinProfile::OpusReplayGain => "Opus, 96 kbit/s, replay gain applied",
            BuiltinProfile::OpusCar => "Opus, 96 kbit/s, loud replay gain with compression",
            BuiltinProfile::Opus128 => "Opus, 128 kbit/s",
            BuiltinProfile::Opus128ReplayGain => "Opus, 128 kbit/s, replay gain applied",
            BuiltinProfile::Opus128Car => "Opus, 128 kbit/s, loud replay gain with compression",
            BuiltinProfile::Opus192 => "Opus, 192 kbit/s",
        }
    }

    /// Build the profile value.
    pub fn profile(&self) -> Profile {
        match self {
            BuiltinProfile::Mp3 => mp3(None),
            BuiltinProfile::Mp3ReplayGain => mp3(Some(RG_FILTER)),
            BuiltinProfile::Opus => opus(96, None),
            BuiltinProfile::OpusReplayGain => opus(96, Some(RG_FILTER)),
            BuiltinProfile::OpusCar => opus(96, Some(RG_LOUD_FILTER)),
            BuiltinProfile::Opus128 => opus(128, None),
            BuiltinProfile::Opus128ReplayGain => opus(128, Some(RG_FILTER)),
            BuiltinProfile::Opus128Car => opus(128, Some(RG_LOUD_FILTER)),
            BuiltinProfile::Opus192 => opus(192, None),
        }
    }
}

fn mp3(gain_filter: Option<&str>) -> Profile {
    Profile::new(MP3_MIME, "mp3", 128, ffmpeg_command("-c:a libmp3lame", gain_filter, "mp3"))
}

fn opus(bitrate: BitRate, gain_filter: Option<&str>) -> Profile {
    Profile::new(
        OPUS_MIME,
        "opus",
        bitrate,
        ffmpeg_command("-c:a libopus -vbr on", gain_filter, "opus"),
    )
}

/// Shared ffmpeg invocation: first audio stream only, encoded to stdout.
fn ffmpeg_command(codec: &str, gain_filter: Option<&str>, format: &str) -> String {
    let mut cmd = format!("ffmpeg -v 0 -i <file> -ss <seek> -map 0:a:0 -vn -b:a <bitrate> {codec}");
    if let Some(filter) = gain_filter {
        cmd.push_str(&format!(" -af \"{filter}\" {CLEAR_GAIN_TAGS}"));
    }
    cmd.push_str(&format!(" -f {format} -"));
    cmd
}

/// Named profiles a host can pick from.
///
/// Built once and then only read; share it behind an `Arc` if several tasks
/// need it. Hosts merge their own profiles in before sharing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileRegistry {
    /// Registry with no profiles at all.
    pub fn new() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Registry holding every [`BuiltinProfile`].
    pub fn builtin() -> Self {
        BuiltinProfile::ALL
            .into_iter()
            .map(|p| (p.name().to_string(), p.profile()))
            .collect()
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, name: impl Into<String>, profile: Profile) -> Option<Profile> {
        self.profiles.insert(name.into(), profile)
    }

    pub fn with_profile(mut self, name: impl Into<String>, profile: Profile) -> Self {
        self.insert(name, profile);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Like [`get`](Self::get) but reports a missing name as an error.
    pub fn require(&self, name: &str) -> Result<&Profile> {
        self.get(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Profile names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<N: Into<String>> Extend<(N, Profile)> for ProfileRegistry {
    fn extend<I: IntoIterator<Item = (N, Profile)>>(&mut self, iter: I) {
        for (name, profile) in iter {
            self.insert(name, profile);
        }
    }
}

impl<N: Into<String>> FromIterator<(N, Profile)> for ProfileRegistry {
    fn from_iter<I: IntoIterator<Item = (N, Profile)>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}
