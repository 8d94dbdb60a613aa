//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "ui5-watch", version)]
#[command(about = "Discover UI5 projects in a workspace and keep them live")]
#[command(styles = clap_cargo_style())]
pub struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up .ui5-watch/settings.toml in the current directory
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// List the projects found in the workspace
    Scan {
        /// Workspace root (defaults to the configured root)
        path: Option<PathBuf>,

        /// Output one JSON object per project
        #[arg(long)]
        json: bool,
    },

    /// Watch the workspace and print project events until Ctrl-C
    Watch {
        /// Workspace root (defaults to the configured root)
        path: Option<PathBuf>,

        /// Output events as JSON lines
        #[arg(long)]
        json: bool,
    },
}
