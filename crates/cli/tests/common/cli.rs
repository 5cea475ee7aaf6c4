//! CLI command execution helpers with automatic timing
//!
//! This module wraps the `gl` binary, measures execution time and
//! provides assertion helpers.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// CLI command builder with timing
pub struct GlCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl GlCommand {
    /// Create a new command in the given working directory
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_gl")),
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Execute command and return result with timing
    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .current_dir(&self.working_dir)
            // Keep user-level config out of the runs
            .env("XDG_CONFIG_HOME", self.working_dir.join(".no-user-config"))
            .env_remove("RUST_LOG")
            .envs(&self.env)
            .output()
            .context("Failed to execute command")?;

        Ok(CommandResult {
            stdout: strip_ansi(&String::from_utf8_lossy(&output.stdout)),
            stderr: strip_ansi(&String::from_utf8_lossy(&output.stderr)),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect a specific failure code
    pub fn assert_exit(&self, code: i32) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.exit_code != code {
            anyhow::bail!(
                "Expected exit code {} but got {}:\nArgs: {:?}\nStdout: {}\nStderr: {}",
                code,
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Check if stdout contains text
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    /// Check if stderr contains text
    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// Value printed after `label` on a `Label:   value` line
    pub fn field(&self, label: &str) -> Option<String> {
        let prefix = format!("{}:", label);
        self.stdout
            .lines()
            .map(str::trim_start)
            .find_map(|line| line.strip_prefix(&prefix))
            .map(|rest| rest.trim().to_string())
    }

    /// Parse the first run ID (ULID) from output
    pub fn parse_run_id(&self) -> Option<String> {
        self.stdout.lines().find_map(extract_ulid)
    }
}

/// Extract a ULID from a line of text
pub fn extract_ulid(line: &str) -> Option<String> {
    // 26 Crockford base32 characters starting with 0-7
    let bytes = line.as_bytes();
    for (i, window) in bytes.windows(26).enumerate() {
        let bounded = (i == 0 || !bytes[i - 1].is_ascii_alphanumeric())
            && bytes.get(i + 26).map_or(true, |b| !b.is_ascii_alphanumeric());
        if bounded && (b'0'..=b'7').contains(&window[0]) && window.iter().all(u8::is_ascii_alphanumeric) {
            return Some(line[i..i + 26].to_string());
        }
    }

    None
}

/// Remove terminal color sequences
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // CSI: ESC [ params final-byte
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// gl!(dir, "build", "src", "-o", "graph.json").assert_success()?;
/// ```
#[macro_export]
macro_rules! gl {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::GlCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ulid_extraction() {
        let line = "Latest run:    01HXKJ7NVQW3Y2YMZK5VFZX3G8";
        let id = extract_ulid(line);
        assert_eq!(id, Some("01HXKJ7NVQW3Y2YMZK5VFZX3G8".to_string()));
        assert_eq!(extract_ulid("no id here"), None);
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[33m3\x1b[39m files"), "3 files");
        assert_eq!(strip_ansi("\x1b[1m\x1b[32mok\x1b[39m\x1b[0m"), "ok");
    }

    #[test]
    fn test_field_lookup() {
        let result = CommandResult {
            stdout: "Files:\n  Changed:     2\n  New:         0\nMode:          incremental\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            duration: Duration::from_millis(10),
        };

        assert_eq!(result.field("Changed").as_deref(), Some("2"));
        assert_eq!(result.field("Mode").as_deref(), Some("incremental"));
        assert_eq!(result.field("Deleted"), None);
    }
}
