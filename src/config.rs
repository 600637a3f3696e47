use crate::api::{HttpGameApi, RosterSource};
use crate::cli::Cli;
use crate::error::{GameError, Result};
use crate::mode::GameMode;
use crate::roster::{builtin_roster, load_names_from_file};
use crate::session::SessionSettings;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://nba-mantle-6-5.onrender.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ROSTER_SOURCES: [RosterSource; 2] = [RosterSource::Players, RosterSource::PlayerAwards];

/// Runtime settings, usually built from the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub api_base: String,
    pub mode: GameMode,
    /// `None` lets requests wait indefinitely.
    pub request_timeout: Option<Duration>,
    pub roster_sources: Vec<RosterSource>,
    /// Newline-delimited list replacing the bundled fallback roster.
    pub fallback_roster: Option<PathBuf>,
    pub remote_random: bool,
    pub seed: Option<u64>,
    pub plain: bool,
    pub check_health: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            mode: GameMode::default(),
            request_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            roster_sources: DEFAULT_ROSTER_SOURCES.to_vec(),
            fallback_roster: None,
            remote_random: true,
            seed: None,
            plain: false,
            check_health: true,
        }
    }
}

impl GameConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let roster_sources = if cli.roster_sources.is_empty() {
            DEFAULT_ROSTER_SOURCES.to_vec()
        } else {
            cli.roster_sources.clone()
        };

        Self {
            api_base: cli.api_base.clone(),
            mode: cli.mode,
            request_timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
            roster_sources,
            fallback_roster: cli.fallback_roster.clone(),
            remote_random: !cli.no_remote_random,
            seed: cli.seed,
            plain: cli.plain,
            check_health: !cli.skip_health_check,
        }
    }

    /// The terminal fallback roster: the configured file, or the bundled list.
    pub fn fallback_names(&self) -> Result<Vec<String>> {
        let Some(path) = &self.fallback_roster else {
            return Ok(builtin_roster());
        };
        let names = load_names_from_file(path)?;
        if names.is_empty() {
            return Err(GameError::Config(format!(
                "fallback roster '{}' contains no names",
                path.display()
            )));
        }
        Ok(names)
    }

    pub fn session_settings(&self) -> Result<SessionSettings> {
        Ok(SessionSettings {
            mode: self.mode,
            sources: self.roster_sources.clone(),
            fallback: self.fallback_names()?,
            remote_random: self.remote_random,
            seed: self.seed,
        })
    }

    pub fn build_api(&self) -> Result<HttpGameApi> {
        HttpGameApi::new(self.api_base.clone(), self.request_timeout)
    }
}
