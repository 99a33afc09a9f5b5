use crate::bspc::parse_window_id;
use crate::protocol::{self, WindowId};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run as daemon (default if no command specified)
    Daemon,
    /// Check that the daemon is alive
    Hello,
    /// Print the currently focused window
    Current,
    /// Add the focused window to the scratchpad
    Add,
    /// Remove the focused window from the scratchpad
    Remove,
    /// Show the next tracked window
    Next,
    /// Show the previous tracked window
    Prev,
    /// Show every tracked window at once
    ShowAll,
    /// Show or hide any window by id, tracked or not
    SetVisibility {
        /// Window id, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_window_id)]
        id: WindowId,
        /// true to show the window, false to hide it
        #[arg(action = clap::ArgAction::Set)]
        visible: bool,
    },
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bspwm-scratchpad")]
#[command(about = "Rotating scratchpad daemon for bspwm", long_about = None)]
pub struct Config {
    /// Path to the daemon socket
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn parse() -> Self {
        <Config as Parser>::parse()
    }

    /// Get the command, defaulting to Daemon if none specified
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Daemon)
    }

    /// The socket path to use: the override if given, the well-known
    /// location otherwise.
    pub fn socket_path(&self) -> Result<PathBuf> {
        match &self.socket {
            Some(path) => Ok(path.clone()),
            None => protocol::get_socket_path(),
        }
    }
}
