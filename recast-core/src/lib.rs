//! Recast Core - profile-driven audio transcoding through external encoders
//!
//! A profile names a target encoding (MIME type, file suffix, default
//! bitrate) and carries a shell-quoted command template. This library:
//! - Ships built-in MP3 and Opus profiles, including replay gain and loud
//!   "car" variants, in a [`ProfileRegistry`]
//! - Synthesizes a resolved program path and argument list from a profile,
//!   substituting the `<file>`, `<seek>` and `<bitrate>` placeholders
//! - Runs the command and streams its stdout into any async writer, with
//!   cancellation and deadlines through [`Context`]

pub mod command;
pub mod context;
pub mod error;
pub mod ffmpeg;
pub mod profile;
pub mod registry;
pub mod template;
pub mod transcoder;

// Re-export commonly used types at the crate root
pub use command::{Placeholder, SynthesizedCommand, placeholders, synthesize, synthesize_in};
pub use context::Context;
pub use error::{Error, Result};
pub use ffmpeg::FfmpegTranscoder;
pub use profile::{BitRate, Profile, ProfileConfig};
pub use registry::{BuiltinProfile, ProfileRegistry};
pub use template::TemplateError;
pub use transcoder::{NoopTranscoder, Transcoder};
