// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "space-scene")]
#[command(about = "Interactive 3D space scene", long_about = None)]
pub struct Cli {
    /// Disable UI elements and console output
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,

    /// Directory holding the scene textures (space.jpg, profile.jpg,
    /// moon.jpg, normal.jpg)
    #[arg(long = "assets", default_value = "assets")]
    pub assets: PathBuf,
}
