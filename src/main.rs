mod branding;
mod components;
mod config;
mod contexts;
mod ffmpeg_configs;
mod gni;
mod media;
mod patches;
mod render;
mod report;
mod templates;
mod verify;

use crate::config::Config;
use crate::patches::WriteMode;
use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error};

#[derive(Parser)]
#[command(version, about = "Enable extra proprietary codecs in a Chromium checkout")]
struct Cli {
    /// Config file (defaults to the built-in config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Print the summary as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CheckArg {
    /// Validate and report without writing
    #[arg(long = "check", visible_alias = "dry-run")]
    check: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Add codecs to the Chrome branding flags of build_ffmpeg.py
    Branding {
        #[command(flatten)]
        check: CheckArg,
        /// build_ffmpeg.py to patch (defaults to the configured path)
        path: Option<PathBuf>,
    },
    /// Enable codecs in the pre-generated FFmpeg configs and ffmpeg_generated.gni
    FfmpegConfigs {
        #[command(flatten)]
        check: CheckArg,
        /// Chromium src/ directory
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Patch Chromium's media sources to accept the extra codecs
    Media {
        #[command(flatten)]
        check: CheckArg,
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Search the patched tree for the expected settings
    Verify {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let summary = match &cli.command {
        Command::Branding { check, path } => {
            let path = path.clone().unwrap_or_else(|| config.branding.path.clone());
            let mode = WriteMode {
                dry_run: check.check,
                backup: true,
            };
            branding::run(&config.branding, &path, mode)?
        }
        Command::FfmpegConfigs { check, root } => {
            let mode = WriteMode {
                dry_run: check.check,
                backup: false,
            };
            ffmpeg_configs::run(&config.ffmpeg, root, mode)?
        }
        Command::Media { check, root } => {
            let mode = WriteMode {
                dry_run: check.check,
                backup: true,
            };
            media::run(root, mode)?
        }
        Command::Verify { root } => verify::run(&config, root)?,
    };

    summary.print(cli.json)?;
    if !summary.failures.is_empty() {
        bail!("verification failed: {} check(s) did not pass", summary.failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dry_run_is_an_alias_of_check() {
        let cli = Cli::parse_from([
            "chromium_codec_patch",
            "branding",
            "--dry-run",
            "build_ffmpeg.py",
        ]);
        match cli.command {
            Command::Branding { check, path } => {
                assert!(check.check);
                assert_eq!(path, Some(PathBuf::from("build_ffmpeg.py")));
            }
            _ => panic!("expected branding"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::parse_from(["chromium_codec_patch", "verify", "--root", "src", "--json"]);
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Command::Verify { ref root } if root == &PathBuf::from("src")
        ));
    }
}
