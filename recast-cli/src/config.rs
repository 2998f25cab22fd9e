use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use recast_core::{Profile, ProfileConfig, ProfileRegistry};

/// Contents of the `--config` TOML file.
///
/// ```toml
/// chunk_size = 65536
/// timeout = 600
///
/// [profiles.flac]
/// mimetype = "audio/flac"
/// ext = "flac"
/// ffcmd = "ffmpeg -v 0 -i <file> -ss <seek> -map 0:a:0 -c:a flac -f flac -"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Read size for encoder output, in bytes.
    pub chunk_size: Option<usize>,
    /// Give up on a transcode after this many seconds.
    pub timeout: Option<u64>,
    /// Extra profiles; a name shared with a built-in replaces it.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Built-in profiles with the configured ones merged on top.
    pub fn registry(&self) -> ProfileRegistry {
        let mut registry = ProfileRegistry::builtin();
        for (name, profile) in &self.profiles {
            if registry.contains(name) {
                log::info!("Config profile {} replaces the built-in one", name);
            }
            registry.insert(name.clone(), Profile::from(profile.clone()));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_builtin_only() {
        let config = Config::parse("").unwrap();
        assert!(config.chunk_size.is_none());
        assert!(config.timeout.is_none());
        assert_eq!(config.registry(), ProfileRegistry::builtin());
    }

    #[test]
    fn profiles_merge_over_builtins() {
        let config = Config::parse(
            r#"
            chunk_size = 8192
            timeout = 30

            [profiles.flac]
            mimetype = "audio/flac"
            ext = "flac"
            ffcmd = "ffmpeg -v 0 -i <file> -ss <seek> -c:a flac -f flac -"

            [profiles.mp3]
            mimetype = "audio/mpeg"
            ext = "mp3"
            bitrate = 320
            ffcmd = "lame --silent -b <bitrate> <file> -"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunk_size, Some(8192));
        assert_eq!(config.timeout, Some(30));

        let registry = config.registry();
        let flac = registry.get("flac").unwrap();
        assert_eq!(flac.mime(), "audio/flac");
        assert_eq!(flac.suffix(), "flac");
        assert_eq!(flac.bitrate(), 0);

        let mp3 = registry.get("mp3").unwrap();
        assert_eq!(mp3.bitrate(), 320);
        assert_eq!(mp3.exec_template(), "lame --silent -b <bitrate> <file> -");

        assert!(registry.contains("opus_192"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("chunksize = 1").is_err());
    }

    #[test]
    fn profile_without_command_is_rejected() {
        let err = Config::parse(
            r#"
            [profiles.broken]
            mimetype = "audio/flac"
            ext = "flac"
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recast.toml");
        std::fs::write(&path, "timeout = 5\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().timeout, Some(5));
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }
}
