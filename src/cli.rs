//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "smokewave", about = "Audio-reactive smoke-wave visualizer")]
pub struct Args {
    /// Audio file to play (mp3, flac, wav, aac)
    #[arg(long, default_value = "assets/sample.mp3")]
    pub audio: PathBuf,

    /// Asset directory holding shaders and the background image
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    /// Window width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Start in borderless fullscreen
    #[arg(long)]
    pub fullscreen: bool,
}
