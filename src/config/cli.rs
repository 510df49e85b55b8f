use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::infra::guard::OutputCleanup;

/// Command-line arguments for the stillframe binary.
#[derive(Debug, Parser)]
#[command(
    name = "stillframe",
    version,
    about = "Render a still image and an audio track into an MP4 over HTTP"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "STILLFRAME_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Serve options used when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The requested command, defaulting to `serve` with the top-level overrides.
    pub fn resolved_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Serve(Box::new(self.serve.clone())))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP render service.
    Serve(Box<ServeArgs>),
    /// Render local files once, without starting the server.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the encoder executable.
    #[arg(long = "ffmpeg-path", value_name = "PATH")]
    pub ffmpeg_path: Option<PathBuf>,

    /// When to delete a successful render's output (after_response|external_reaper).
    #[arg(long = "output-cleanup", value_name = "POLICY")]
    pub output_cleanup: Option<OutputCleanup>,

    /// Kill the encoder after this many seconds; 0 disables the limit.
    #[arg(long = "render-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    /// Override the scratch directory for temporary artifacts.
    #[arg(long = "storage-directory", value_name = "PATH")]
    pub storage_directory: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Override the listener host.
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Still image to loop for the length of the audio.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub image: PathBuf,

    /// Audio track.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// Optional subtitle file to burn in.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub subtitles: Option<PathBuf>,

    /// Where to write the rendered MP4.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}
