//! HTTP access to the game server.
//!
//! [`GameApi`] is the seam between the session controller and the network.
//! [`HttpGameApi`] is the production implementation backed by `reqwest`;
//! tests plug in their own in-memory implementation.
//!
//! Response bodies are decoded into loose wire structs here and converted into
//! the internal schema by the adapters in `roster` and `guess`.

use crate::error::{GameError, Result};
use crate::info_log;
use crate::mode::GameMode;
use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Server endpoints that can supply the roster, in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum RosterSource {
    /// `GET /players`
    #[value(name = "players")]
    Players,
    /// `GET /player_awards`
    #[value(name = "player-awards")]
    PlayerAwards,
    /// `GET /players_data`, a map of name to attributes.
    #[value(name = "players-data")]
    PlayersData,
    /// `POST /player_names {mode}`, already filtered by the server.
    #[value(name = "player-names")]
    PlayerNames,
}

impl RosterSource {
    pub fn path(self) -> &'static str {
        match self {
            Self::Players => "/players",
            Self::PlayerAwards => "/player_awards",
            Self::PlayersData => "/players_data",
            Self::PlayerNames => "/player_names",
        }
    }

    /// Whether the server applies the mode filter itself.
    pub fn filters_server_side(self) -> bool {
        matches!(self, Self::PlayerNames)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GuessRequest {
    pub guess: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<GameMode>,
}

/// Raw `/guess` response. Validated by `guess::adapt_response`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GuessResponse {
    pub score: Option<serde_json::Number>,
    #[serde(default)]
    pub matched_name: Option<String>,
    #[serde(default)]
    pub breakdown: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub top_5: Option<Vec<Value>>,
}

#[derive(Serialize)]
struct ModeRequest {
    mode: GameMode,
}

#[derive(Deserialize)]
struct RandomPlayerResponse {
    #[serde(default)]
    player: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Remote collaborators of the game session.
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Fetch the raw roster payload from one source.
    async fn fetch_roster(&self, source: RosterSource, mode: GameMode) -> Result<Value>;

    /// Ask the server to pick the target for a round.
    async fn random_player(&self, mode: GameMode) -> Result<String>;

    /// Score a guess against the target.
    async fn guess(&self, request: &GuessRequest) -> Result<GuessResponse>;

    async fn health(&self) -> Result<()>;
}

pub struct HttpGameApi {
    client: Client,
    base_url: String,
}

impl HttpGameApi {
    /// Create a client for `base_url`, e.g. `https://example.com/api`.
    ///
    /// `timeout` bounds every request; `None` waits indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GameError::Config("API base URL is empty".to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        log::warn!("Server returned {status}: {body}");
        Err(GameError::remote(status.as_u16(), message))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GameError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn fetch_roster(&self, source: RosterSource, mode: GameMode) -> Result<Value> {
        let url = self.url(source.path());
        info_log!("Fetching roster from {}", url);

        let request = if source.filters_server_side() {
            self.client.post(&url).json(&ModeRequest { mode })
        } else {
            self.client.get(&url)
        };

        let response = Self::check_status(request.send().await?).await?;
        Self::decode(response).await
    }

    async fn random_player(&self, mode: GameMode) -> Result<String> {
        let response = self
            .client
            .post(self.url("/random_player"))
            .json(&ModeRequest { mode })
            .send()
            .await?;

        let body: RandomPlayerResponse = Self::decode(Self::check_status(response).await?).await?;
        body.player
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| GameError::InvalidResponse("missing 'player' field".to_string()))
    }

    async fn guess(&self, request: &GuessRequest) -> Result<GuessResponse> {
        let response = self
            .client
            .post(self.url("/guess"))
            .header(CONTENT_TYPE, JSON_UTF8)
            .json(request)
            .send()
            .await?;

        Self::decode(Self::check_status(response).await?).await
    }

    async fn health(&self) -> Result<()> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
