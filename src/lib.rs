// Library interface for nba-mantle
// This allows integration tests to access internal modules

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod game_state;
pub mod guess;
pub mod history;
pub mod logging;
pub mod mode;
pub mod reveal;
pub mod roster;
pub mod session;
pub mod suggestions;
pub mod tui;

#[cfg(test)]
mod test_support;

// Re-export commonly used items for easier testing
pub use api::{GameApi, GuessRequest, GuessResponse, HttpGameApi, RosterSource};
pub use error::{GameError, Result};
pub use game_state::{GameDriver, GameInterface, UserAction, game_loop};
pub use guess::{ScoredGuess, SimilarEntity, score_guess};
pub use history::{GuessResult, History};
pub use mode::GameMode;
pub use reveal::fetch_similar;
pub use roster::{RosterLoad, RosterOrigin, load_roster};
pub use session::{Phase, Session, SessionController, SessionSettings};
pub use suggestions::{NavKey, SuggestionEngine};
