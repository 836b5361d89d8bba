//! The two mutually exclusive deck universes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which deck universe is active: the live ruleset or the public beta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Main,
    Pbe,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Main, Mode::Pbe];

    /// The other mode.
    pub fn toggle(self) -> Self {
        match self {
            Self::Main => Self::Pbe,
            Self::Pbe => Self::Main,
        }
    }

    /// Stable lowercase key, used for storage and CLI arguments.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Pbe => "pbe",
        }
    }

    /// Human-facing label shown in chat.
    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "main mode",
            Self::Pbe => "pbe mode",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown mode \"{0}\" (expected \"main\" or \"pbe\")")]
pub struct ModeParseError(String);

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "pbe" => Ok(Self::Pbe),
            _ => Err(ModeParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_between_modes() {
        assert_eq!(Mode::Main.toggle(), Mode::Pbe);
        assert_eq!(Mode::Pbe.toggle(), Mode::Main);
        assert_eq!(Mode::Main.toggle().toggle(), Mode::Main);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("PBE".parse::<Mode>().unwrap(), Mode::Pbe);
        assert_eq!(" main ".parse::<Mode>().unwrap(), Mode::Main);
        assert!("beta".parse::<Mode>().is_err());
    }

    #[test]
    fn default_is_main() {
        assert_eq!(Mode::default(), Mode::Main);
    }
}
