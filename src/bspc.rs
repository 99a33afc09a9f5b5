//! bspwm control abstraction for testability.
//!
//! The state machine drives window visibility through the [`ControlPort`]
//! trait; the production implementation shells out to `bspc`, and tests
//! substitute a recording mock.

use crate::protocol::{WindowId, WindowInfo};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlPortError {
    #[error("error running command '{command}': {stderr}")]
    Command { command: String, stderr: String },

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("unexpected output from '{command}': {details}")]
    BadOutput { command: String, details: String },
}

/// Trait for the window-manager query/mutate operations the core consumes.
///
/// All calls are synchronous and may fail; failures surface to the client
/// as error responses, never as connection faults.
pub trait ControlPort {
    /// Get the id of the currently focused window.
    fn focused_window_id(&mut self) -> Result<WindowId, ControlPortError>;

    /// Get a window's metadata by id.
    fn window_info(&mut self, id: WindowId) -> Result<WindowInfo, ControlPortError>;

    /// Set or clear a window's hidden flag.
    fn set_hidden(&mut self, id: WindowId, hidden: bool) -> Result<(), ControlPortError>;

    /// Make a window visible.
    fn show(&mut self, id: WindowId) -> Result<(), ControlPortError> {
        self.set_hidden(id, false)
    }

    /// Hide a window.
    fn hide(&mut self, id: WindowId) -> Result<(), ControlPortError> {
        self.set_hidden(id, true)
    }
}

/// Parse a window id as printed by `bspc query -N` (`0x`-prefixed hex) or
/// given on a command line (hex or decimal).
pub fn parse_window_id(s: &str) -> Result<WindowId, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        WindowId::from_str_radix(hex, 16).map_err(|e| format!("invalid window id '{s}': {e}"))
    } else {
        s.parse()
            .map_err(|e| format!("invalid window id '{s}': {e}"))
    }
}

/// Real implementation invoking the `bspc` CLI.
pub struct BspcClient;

impl BspcClient {
    fn run(&self, args: &[&str]) -> Result<String, ControlPortError> {
        let rendered = format!("bspc {}", args.join(" "));

        let output = Command::new("bspc")
            .args(args)
            .output()
            .map_err(|source| ControlPortError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ControlPortError::Command {
                command: rendered,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches('\n').to_string())
    }
}

impl ControlPort for BspcClient {
    fn focused_window_id(&mut self) -> Result<WindowId, ControlPortError> {
        let out = self.run(&["query", "-N", "-n", "@focused:/#focused"])?;
        parse_window_id(&out).map_err(|details| ControlPortError::BadOutput {
            command: "bspc query -N -n @focused:/#focused".into(),
            details,
        })
    }

    fn window_info(&mut self, id: WindowId) -> Result<WindowInfo, ControlPortError> {
        let command = format!("bspc query -T -n {id}");
        let out = self.run(&["query", "-T", "-n", &id.to_string()])?;
        serde_json::from_str(&out).map_err(|e| ControlPortError::BadOutput {
            command,
            details: e.to_string(),
        })
    }

    fn set_hidden(&mut self, id: WindowId, hidden: bool) -> Result<(), ControlPortError> {
        let flag = if hidden { "hidden=on" } else { "hidden=off" };
        self.run(&["node", &id.to_string(), "--flag", flag])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_id_hex() {
        assert_eq!(parse_window_id("0x1C00006").unwrap(), 0x1c00006);
        assert_eq!(parse_window_id("0x0"), Ok(0));
    }

    #[test]
    fn test_parse_window_id_decimal() {
        assert_eq!(parse_window_id("29360134").unwrap(), 29360134);
    }

    #[test]
    fn test_parse_window_id_trims_whitespace() {
        assert_eq!(parse_window_id("0x1c00006\n").unwrap(), 0x1c00006);
    }

    #[test]
    fn test_parse_window_id_rejects_garbage() {
        assert!(parse_window_id("").is_err());
        assert!(parse_window_id("0x").is_err());
        assert!(parse_window_id("not-an-id").is_err());
    }
}
