// In-memory GameApi used by unit tests

use crate::api::{GameApi, GuessRequest, GuessResponse, RosterSource};
use crate::error::{GameError, Result};
use crate::mode::GameMode;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeApi {
    rosters: HashMap<RosterSource, Value>,
    random_player: Option<String>,
    scores: HashMap<String, Value>,
    offline_guesses: bool,
    roster_calls: Mutex<Vec<RosterSource>>,
    guess_calls: Mutex<Vec<GuessRequest>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(mut self, source: RosterSource, payload: Value) -> Self {
        self.rosters.insert(source, payload);
        self
    }

    pub fn with_random_player(mut self, name: &str) -> Self {
        self.random_player = Some(name.to_string());
        self
    }

    /// Respond to `guess` with `response`, a `/guess` JSON body.
    pub fn with_score(mut self, guess: &str, response: Value) -> Self {
        self.scores.insert(guess.to_string(), response);
        self
    }

    pub fn offline_guesses(mut self) -> Self {
        self.offline_guesses = true;
        self
    }

    pub fn roster_calls(&self) -> Vec<RosterSource> {
        self.roster_calls.lock().unwrap().clone()
    }

    pub fn guess_calls(&self) -> Vec<GuessRequest> {
        self.guess_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameApi for FakeApi {
    async fn fetch_roster(&self, source: RosterSource, _mode: GameMode) -> Result<Value> {
        self.roster_calls.lock().unwrap().push(source);
        self.rosters
            .get(&source)
            .cloned()
            .ok_or_else(|| GameError::remote(503, None))
    }

    async fn random_player(&self, _mode: GameMode) -> Result<String> {
        self.random_player
            .clone()
            .ok_or_else(|| GameError::remote(404, Some("no random player".to_string())))
    }

    async fn guess(&self, request: &GuessRequest) -> Result<GuessResponse> {
        self.guess_calls.lock().unwrap().push(request.clone());
        if self.offline_guesses {
            return Err(GameError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        let body = self
            .scores
            .get(&request.guess)
            .cloned()
            .ok_or_else(|| GameError::remote(404, Some(format!("Player not found: {}", request.guess))))?;
        serde_json::from_value(body).map_err(|e| GameError::InvalidResponse(e.to_string()))
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}
