use anyhow::{Context as _, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWrite;

use recast_core::{
    BuiltinProfile, Context, FfmpegTranscoder, Placeholder, Profile, ProfileRegistry, Transcoder,
    placeholders, synthesize,
};

mod config;
mod seek;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "recast")]
#[command(about = "Stream audio through an external encoder using named transcoding profiles")]
#[command(version)]
struct Args {
    /// Input audio file path
    #[arg(short, long, required_unless_present = "list_profiles")]
    input: Option<PathBuf>,

    /// Output file path, or "-" for stdout (default: input name with the profile's suffix)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Transcoding profile to use
    #[arg(short, long, default_value = "mp3")]
    profile: String,

    /// Bitrate in kbit/s, overriding the profile default
    #[arg(short, long)]
    bitrate: Option<u32>,

    /// Start offset, in seconds or as [hh:]mm:ss
    #[arg(long, value_parser = seek::parse_seek)]
    seek: Option<Duration>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// TOML file with extra profiles and defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read size for encoder output in bytes
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Print the resolved command instead of running it
    #[arg(long)]
    print_command: bool,

    /// List available profiles
    #[arg(long)]
    list_profiles: bool,

    /// Print the profile list as JSON
    #[arg(long, requires = "list_profiles")]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct ProfileListing<'a> {
    name: &'a str,
    mime: &'a str,
    suffix: &'a str,
    bitrate: u32,
    builtin: bool,
    command: &'a str,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let registry = config.registry();

    if args.list_profiles {
        return list_profiles(&registry, args.json);
    }

    let input = args
        .input
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Input file required"))?;

    let base = registry.get(&args.profile).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown profile: {}. Use --list-profiles to see available options.",
            args.profile
        )
    })?;
    let profile = customize(base, &args)?;

    if args.print_command {
        let cmd = synthesize(&profile, &input)
            .with_context(|| format!("Profile {} cannot be run", args.profile))?;
        println!("{cmd}");
        return Ok(());
    }

    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let mut ctx = Context::new();
    if let Some(secs) = args.timeout.or(config.timeout) {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    // Ctrl-C stops the encoder instead of leaving it behind
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping transcode");
            interrupt.cancel();
        }
    });

    let mut transcoder = FfmpegTranscoder::new();
    if let Some(chunk_size) = args.chunk_size.or(config.chunk_size) {
        transcoder = transcoder.with_chunk_size(chunk_size);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&input, &profile));

    log::info!("Profile: {} ({}, {}k)", args.profile, profile.mime(), profile.bitrate());
    log::info!("Input: {:?}", input);
    log::info!("Output: {:?}", output);

    if output == Path::new("-") {
        let mut stdout = tokio::io::stdout();
        transcoder.transcode(&ctx, &profile, &input, &mut stdout).await?;
        return Ok(());
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    let file = tokio::fs::File::create(&output)
        .await
        .with_context(|| format!("Failed to create output file {:?}", output))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {binary_bytes} written ({binary_bytes_per_sec})")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut sink = pb.wrap_async_write(file);
    let result = transcode_to(&transcoder, &ctx, &profile, &input, &mut sink).await;
    pb.finish_and_clear();

    if let Err(e) = result {
        // Leave no half-written file behind
        if let Err(remove) = std::fs::remove_file(&output) {
            log::debug!("Failed to remove partial output {:?}: {}", output, remove);
        }
        return Err(e);
    }

    println!("\n✅ Transcode completed successfully!");
    println!("📁 Output saved to: {:?}", output);

    Ok(())
}

/// Apply command-line overrides to the selected profile.
fn customize(base: &Profile, args: &Args) -> Result<Profile> {
    let mut profile = base.clone();

    if let Some(bitrate) = args.bitrate {
        profile = profile.with_bitrate(bitrate);
    }
    if profile.bitrate() == 0 && placeholders(&profile)?.contains(&Placeholder::Bitrate) {
        anyhow::bail!(
            "Profile {} has no default bitrate, pass one with --bitrate",
            args.profile
        );
    }

    if let Some(seek) = args.seek {
        profile = profile.with_seek(seek);
    }

    Ok(profile)
}

async fn transcode_to(
    transcoder: &dyn Transcoder,
    ctx: &Context,
    profile: &Profile,
    input: &Path,
    sink: &mut (dyn AsyncWrite + Unpin + Send),
) -> Result<()> {
    transcoder
        .transcode(ctx, profile, input, sink)
        .await
        .with_context(|| format!("Failed to transcode {:?}", input))
}

/// `song.flac` + opus profile -> `song.opus` in the current directory.
fn default_output(input: &Path, profile: &Profile) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    PathBuf::from(stem).with_extension(profile.suffix())
}

fn list_profiles(registry: &ProfileRegistry, json: bool) -> Result<()> {
    if json {
        let listing: Vec<ProfileListing<'_>> = registry
            .iter()
            .map(|(name, profile)| ProfileListing {
                name,
                mime: profile.mime(),
                suffix: profile.suffix(),
                bitrate: profile.bitrate(),
                builtin: BuiltinProfile::from_name(name).is_some_and(|b| b.profile() == *profile),
                command: profile.exec_template(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("\nAvailable profiles:");
    println!("{:-<60}", "");
    for (name, profile) in registry.iter() {
        let description = match BuiltinProfile::from_name(name) {
            Some(builtin) if builtin.profile() == *profile => builtin.description().to_string(),
            _ => format!("{} ({}), {}k", profile.suffix(), profile.mime(), profile.bitrate()),
        };
        println!("{:<15} - {}", name, description);
    }
    println!("\nUsage: recast -i track.flac --profile opus_128 -o track.opus");
    Ok(())
}
