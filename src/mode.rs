use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First season of the "modern era" filter.
pub const MODERN_MIN_START_YEAR: i32 = 2011;
/// Minimum number of seasons for a modern-era player.
pub const MODERN_MIN_CAREER_LENGTH: u32 = 5;

/// Roster filtering policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum GameMode {
    /// Players who started in 2011 or later with at least five seasons.
    #[default]
    #[serde(rename = "modern")]
    #[value(name = "modern")]
    Modern,
    /// Every player the server knows about.
    #[serde(rename = "all")]
    #[value(name = "all")]
    AllTime,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::AllTime => "all",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Modern => "Modern Era",
            Self::AllTime => "All Time",
        }
    }

    /// Whether this mode narrows the roster by player attributes.
    pub fn filters_by_attributes(self) -> bool {
        matches!(self, Self::Modern)
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Modern => Self::AllTime,
            Self::AllTime => Self::Modern,
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "modern" | "recent" => Ok(Self::Modern),
            "all" | "all-time" | "alltime" => Ok(Self::AllTime),
            other => Err(format!("unknown game mode '{other}' (expected 'modern' or 'all')")),
        }
    }
}
