use super::defaults::{MAX_DIMENSION, MAX_TERMINAL_ARGS, MAX_TERMINAL_ARG_BYTES};
use super::{AppConfig, TerminalCommand};
use crate::animation::MAX_SPEED;
use crate::hotkey::Hotkey;
use anyhow::{bail, Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;

impl AppConfig {
    /// Parse process arguments and validate them right away.
    ///
    /// Validation failures come back as clap usage errors so the caller can
    /// print them the same way as parse errors.
    pub fn parse_args() -> Result<Self, clap::Error> {
        Self::parse_args_from(std::env::args_os())
    }

    pub fn parse_args_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut config = Self::try_parse_from(args)?;
        config
            .validate()
            .map_err(|err| Self::command().error(ErrorKind::ValueValidation, format!("{err:#}")))?;
        Ok(config)
    }

    /// Check CLI values and resolve the terminal command and hotkey.
    pub fn validate(&mut self) -> Result<()> {
        if !(1..=MAX_DIMENSION).contains(&self.height) {
            bail!("illegal height value -- {}", self.height);
        }
        if !(1..=i64::from(MAX_SPEED)).contains(&self.speed) {
            bail!("speed must be between 1 and {MAX_SPEED}, got {}", self.speed);
        }
        if let Some(width) = self.width {
            if !(1..=MAX_DIMENSION).contains(&width) {
                bail!("illegal width value -- {width}");
            }
        }

        if let Some(display) = &self.display {
            if display.trim().is_empty() {
                bail!("--display cannot be empty");
            }
        }

        self.binding = Hotkey::parse(&self.hotkey)
            .with_context(|| format!("invalid --hotkey '{}'", self.hotkey))?;

        self.terminal = split_terminal_command(&self.terminal_cmd)?;
        if self.terminal.args.len() > MAX_TERMINAL_ARGS {
            bail!(
                "--terminal has too many arguments (max {MAX_TERMINAL_ARGS}, got {})",
                self.terminal.args.len()
            );
        }
        let total_arg_bytes: usize = self.terminal.args.iter().map(|arg| arg.len()).sum();
        if total_arg_bytes > MAX_TERMINAL_ARG_BYTES {
            bail!("combined --terminal arguments exceed {MAX_TERMINAL_ARG_BYTES} bytes");
        }

        // Both values end up in argv, so reject anything exec cannot carry.
        check_argv_word(&self.name, "--name")?;
        check_argv_word(&self.embed_flag, "--embed-flag")?;
        if !self.embed_flag.starts_with('-') {
            bail!("--embed-flag must start with '-', got '{}'", self.embed_flag);
        }

        Ok(())
    }
}

/// Split a terminal command line into program and leading arguments.
pub(super) fn split_terminal_command(raw: &str) -> Result<TerminalCommand> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("--terminal cannot be empty");
    }
    let mut parts = shell_words::split(trimmed)
        .with_context(|| format!("--terminal has unbalanced quoting: {trimmed}"))?;
    if parts.is_empty() {
        bail!("--terminal cannot be empty");
    }
    for part in &parts {
        if part.contains('\0') {
            bail!("--terminal contains a NUL byte");
        }
    }
    let program = parts.remove(0);
    Ok(TerminalCommand {
        program,
        args: parts,
    })
}

fn check_argv_word(value: &str, flag: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if value.len() > 256 || value.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        bail!("{flag} must be <=256 characters with no whitespace or control characters");
    }
    Ok(())
}
