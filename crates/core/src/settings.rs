#![allow(missing_docs)]

//! Per-channel bomb settings and the `settings` command.

use std::{collections::HashMap, fmt, str::FromStr};

use parking_lot::RwLock;
use thiserror::Error;

use crate::models::ChannelId;

/// How a bomb is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    /// No timer pressure; `status` says so.
    Zen,
}

impl Mode {
    /// Every mode, as accepted by `settings set mode`.
    pub const ALL: [Mode; 2] = [Mode::Normal, Mode::Zen];
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Normal => "Normal",
            Mode::Zen => "Zen",
        })
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.to_string().eq_ignore_ascii_case(value))
            .ok_or(())
    }
}

/// Settings a bomb copies when it is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BombSettings {
    pub mode: Mode,
}

/// Source of per-channel settings.
pub trait SettingsProvider: Send + Sync {
    /// Current settings for `channel`, defaults if never changed.
    fn get(&self, channel: &ChannelId) -> BombSettings;

    /// Replace the settings for `channel`.
    fn set(&self, channel: &ChannelId, settings: BombSettings);
}

/// Settings kept in process memory.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    channels: RwLock<HashMap<ChannelId, BombSettings>>,
}

impl InMemorySettings {
    /// Store where every channel starts with default settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsProvider for InMemorySettings {
    fn get(&self, channel: &ChannelId) -> BombSettings {
        self.channels
            .read()
            .get(channel)
            .copied()
            .unwrap_or_default()
    }

    fn set(&self, channel: &ChannelId, settings: BombSettings) {
        self.channels.write().insert(channel.clone(), settings);
    }
}

/// One user-editable field.
pub struct SettingField {
    pub name: &'static str,
    pub values: fn() -> Vec<String>,
    read: fn(&BombSettings) -> String,
    write: fn(&mut BombSettings, &str) -> bool,
}

/// Everything `settings` can read or change.
pub static SCHEMA: [SettingField; 1] = [SettingField {
    name: "mode",
    values: || Mode::ALL.iter().map(ToString::to_string).collect(),
    read: |settings| settings.mode.to_string(),
    write: |settings, value| match value.parse() {
        Ok(mode) => {
            settings.mode = mode;
            true
        }
        Err(()) => false,
    },
}];

fn field(name: &str) -> Option<&'static SettingField> {
    SCHEMA.iter().find(|field| field.name == name)
}

fn backticked(values: &[String]) -> String {
    format!("`{}`", values.join("`, `"))
}

/// Rejected `settings` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error(
        "Usage:\n`{prefix}settings set <setting name> <value>`\n`{prefix}settings get <setting name>`\nAvailable settings: {}\nTo see available values, run `{prefix}settings set <setting name>`",
        backticked(&SCHEMA.iter().map(|f| f.name.to_string()).collect::<Vec<_>>())
    )]
    Usage { prefix: String },
    #[error("Invalid value! Available values: {}", backticked(.available))]
    InvalidValue { available: Vec<String> },
}

/// Handle `settings get|set ...` for a channel.
pub fn settings_command(
    provider: &dyn SettingsProvider,
    channel: &ChannelId,
    args: &[String],
    prefix: &str,
) -> Result<String, SettingsError> {
    let usage = || SettingsError::Usage {
        prefix: prefix.to_string(),
    };
    let action = args.first().map(|a| a.to_lowercase()).ok_or_else(usage)?;
    let field = args
        .get(1)
        .and_then(|name| field(&name.to_lowercase()))
        .ok_or_else(usage)?;
    let mut settings = provider.get(channel);

    match action.as_str() {
        "get" => Ok(format!(
            "Current value of `{}`: `{}`",
            field.name,
            (field.read)(&settings)
        )),
        "set" => {
            let Some(value) = args.get(2) else {
                return Ok(format!("Available values: {}", backticked(&(field.values)())));
            };
            if !(field.write)(&mut settings, value) {
                return Err(SettingsError::InvalidValue {
                    available: (field.values)(),
                });
            }
            provider.set(channel, settings);
            Ok("Value changed successfully!".to_string())
        }
        _ => Err(usage()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn set_and_get_mode() {
        let settings = InMemorySettings::new();
        let channel = ChannelId::new("bombs");
        assert_eq!(settings.get(&channel).mode, Mode::Normal);

        let reply = settings_command(&settings, &channel, &args("set mode zEN"), "!");
        assert_eq!(reply.as_deref(), Ok("Value changed successfully!"));
        assert_eq!(settings.get(&channel).mode, Mode::Zen);
        assert_eq!(settings.get(&ChannelId::new("other")).mode, Mode::Normal);

        let reply = settings_command(&settings, &channel, &args("GET mode"), "!");
        assert_eq!(reply.as_deref(), Ok("Current value of `mode`: `Zen`"));
    }

    #[test]
    fn invalid_values_and_usage() {
        let settings = InMemorySettings::new();
        let channel = ChannelId::new("bombs");

        let err = settings_command(&settings, &channel, &args("set mode hard"), "!")
            .expect_err("hard is not a mode");
        assert_eq!(
            err.to_string(),
            "Invalid value! Available values: `Normal`, `Zen`"
        );

        let reply = settings_command(&settings, &channel, &args("set mode"), "!");
        assert_eq!(reply.as_deref(), Ok("Available values: `Normal`, `Zen`"));

        for line in ["", "get", "get colour", "toggle mode"] {
            let err = settings_command(&settings, &channel, &args(line), "!")
                .expect_err("usage");
            assert!(err.to_string().starts_with("Usage:\n`!settings set"), "{line}");
        }
    }
}
