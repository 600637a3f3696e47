//! Game session state machine.
//!
//! [`SessionController`] is the only owner of the session record, the roster
//! and the suggestion engine. Every remote step is split in two: a `begin_*`
//! method validates the transition and returns a ticket describing the work,
//! and a `complete_*` method adopts the result. The work itself is done by
//! free async functions ([`prepare_round`], [`score_guess`], [`fetch_similar`])
//! so it can run on another task while the UI keeps going.
//!
//! # State Machine
//! - `Loading` → `Active` once a roster and target are available
//! - `Active` → `Won` on a score of 100
//! - `Active` → `Revealed` when the player gives up
//! - any state → `Loading` on new game or mode switch
//!
//! Tickets carry the generation they were issued in. Completions from an older
//! generation are dropped so a late response never clobbers a newer round.

use crate::api::{GameApi, RosterSource};
use crate::error::Result;
use crate::guess::{ScoredGuess, SimilarEntity, score_guess};
use crate::history::{History, Insertion};
use crate::mode::GameMode;
use crate::reveal::fetch_similar;
use crate::roster::{RosterLoad, RosterOrigin, load_roster};
use crate::suggestions::{KeyOutcome, NavKey, SuggestionEngine};
use crate::{debug_log, info_log};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::time::Instant;

pub const DUPLICATE_GUESS: &str = "You have already guessed this player!";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Active,
    Won,
    Revealed,
}

impl Phase {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Revealed)
    }
}

/// Per-round state. Replaced wholesale on new game and mode switch.
#[derive(Clone, Debug)]
pub struct Session {
    pub target: Option<String>,
    pub mode: GameMode,
    pub phase: Phase,
    pub guess_count: u32,
    pub history: History,
    /// The single advisory slot shown to the player.
    pub advisory: Option<String>,
    /// Most similar players, filled on a win or a reveal.
    pub similar: Vec<SimilarEntity>,
    /// A guess or reveal request is in flight.
    pub pending: bool,
}

impl Session {
    fn loading(mode: GameMode) -> Self {
        Self {
            target: None,
            mode,
            phase: Phase::Loading,
            guess_count: 0,
            history: History::new(),
            advisory: None,
            similar: Vec::new(),
            pending: false,
        }
    }
}

/// Roster acquisition settings for the controller.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub mode: GameMode,
    pub sources: Vec<RosterSource>,
    /// Terminal fallback roster; must not be empty.
    pub fallback: Vec<String>,
    /// Ask the server to pick the target before choosing locally.
    pub remote_random: bool,
    pub seed: Option<u64>,
}

/// Work needed to set up a round.
#[derive(Clone, Debug)]
pub struct RoundRequest {
    pub generation: u64,
    pub mode: GameMode,
    /// Roster to reuse; `None` reloads it for `mode`.
    pub roster: Option<Vec<String>>,
    pub sources: Vec<RosterSource>,
    pub fallback: Vec<String>,
    pub remote_random: bool,
    pub seed: u64,
}

#[derive(Clone, Debug)]
pub struct RoundSetup {
    pub generation: u64,
    /// Present when the roster was reloaded.
    pub roster: Option<RosterLoad>,
    pub target: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuessTicket {
    pub generation: u64,
    pub guess: String,
    pub target: String,
    pub mode: GameMode,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RevealTicket {
    pub generation: u64,
    pub target: String,
    pub mode: GameMode,
}

#[derive(Debug, PartialEq)]
pub enum SubmitOutcome {
    /// The round changed while the request was in flight.
    Stale,
    Recorded { won: bool },
    Duplicate,
    Failed,
}

/// Pick the round's target.
///
/// The server's pick wins when `remote_random` is set and the call succeeds;
/// otherwise a uniform choice over `roster`.
pub async fn select_target(
    api: &dyn GameApi,
    mode: GameMode,
    roster: &[String],
    remote_random: bool,
    seed: u64,
) -> Option<String> {
    if remote_random {
        match api.random_player(mode).await {
            Ok(name) => return Some(name),
            Err(e) => log::warn!("Random player request failed, choosing locally: {e}"),
        }
    }
    let mut rng = StdRng::seed_from_u64(seed);
    roster.choose(&mut rng).cloned()
}

/// Load (or reuse) the roster and choose a target.
pub async fn prepare_round(api: &dyn GameApi, request: &RoundRequest) -> RoundSetup {
    let load = match request.roster {
        Some(_) => None,
        None => Some(load_roster(api, request.mode, &request.sources, &request.fallback).await),
    };

    let names: &[String] = match (&load, &request.roster) {
        (Some(load), _) => &load.names,
        (None, Some(names)) => names,
        (None, None) => &request.fallback,
    };

    let target = select_target(api, request.mode, names, request.remote_random, request.seed).await;
    RoundSetup {
        generation: request.generation,
        roster: load,
        target,
    }
}

pub struct SessionController {
    session: Session,
    roster: Vec<String>,
    /// Mode the cached roster was filtered for.
    roster_mode: Option<GameMode>,
    roster_origin: Option<RosterOrigin>,
    suggestions: SuggestionEngine,
    generation: u64,
    revision: u64,
    rng: StdRng,
    sources: Vec<RosterSource>,
    fallback: Vec<String>,
    remote_random: bool,
}

impl SessionController {
    pub fn new(settings: SessionSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            session: Session::loading(settings.mode),
            roster: Vec::new(),
            roster_mode: None,
            roster_origin: None,
            suggestions: SuggestionEngine::new(),
            generation: 0,
            revision: 0,
            rng,
            sources: settings.sources,
            fallback: settings.fallback,
            remote_random: settings.remote_random,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn mode(&self) -> GameMode {
        self.session.mode
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn roster_origin(&self) -> Option<RosterOrigin> {
        self.roster_origin
    }

    pub fn suggestions(&self) -> &SuggestionEngine {
        &self.suggestions
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Increases on every state change; interfaces redraw when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn accepts_input(&self) -> bool {
        self.session.phase == Phase::Active && !self.session.pending
    }

    // ---- rounds ----

    fn reset_round(&mut self, reuse_roster: bool) -> RoundRequest {
        self.generation += 1;
        self.session = Session::loading(self.session.mode);
        self.suggestions.reset();
        self.touch();

        let reusable = reuse_roster
            && !self.roster.is_empty()
            && self.roster_mode == Some(self.session.mode);
        let roster = reusable.then(|| self.roster.clone());
        info_log!(
            "Round {} starting in {} mode ({})",
            self.generation,
            self.session.mode,
            if roster.is_some() { "cached roster" } else { "reloading roster" }
        );
        RoundRequest {
            generation: self.generation,
            mode: self.session.mode,
            roster,
            sources: self.sources.clone(),
            fallback: self.fallback.clone(),
            remote_random: self.remote_random,
            seed: self.rng.next_u64(),
        }
    }

    /// First round after startup; always loads the roster.
    pub fn begin_start(&mut self) -> RoundRequest {
        self.reset_round(false)
    }

    /// New round in the current mode, reusing the loaded roster when it was
    /// loaded for that mode.
    pub fn begin_new_game(&mut self) -> RoundRequest {
        self.reset_round(true)
    }

    /// New round in `mode`. `None` when already in that mode.
    pub fn begin_switch_mode(&mut self, mode: GameMode) -> Option<RoundRequest> {
        if mode == self.session.mode {
            return None;
        }
        self.session.mode = mode;
        Some(self.reset_round(false))
    }

    /// Adopt a prepared round. Returns `false` for a stale setup.
    pub fn complete_round(&mut self, setup: RoundSetup) -> bool {
        if setup.generation != self.generation {
            debug_log!(
                "Dropping stale round setup {} (current {})",
                setup.generation,
                self.generation
            );
            return false;
        }

        if let Some(load) = setup.roster {
            self.roster = load.names;
            self.roster_mode = Some(self.session.mode);
            self.roster_origin = Some(load.origin);
            self.session.advisory = load.warning;
        }

        match setup.target {
            Some(target) => {
                info_log!("Round {} target selected", self.generation);
                self.session.target = Some(target);
                self.session.phase = Phase::Active;
            }
            None => {
                log::error!("No target could be selected for round {}", self.generation);
                self.session.advisory = Some("No players available. Try a new game.".to_string());
            }
        }
        self.touch();
        true
    }

    // ---- input ----

    /// Replace the guess text. Ignored unless a guess can be made.
    pub fn edit_input(&mut self, text: &str) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.suggestions.set_input(text, &self.roster);
        self.session.advisory = None;
        self.touch();
        true
    }

    /// Handle a navigation key; Enter may start a submission.
    pub fn handle_key(&mut self, key: NavKey) -> Option<GuessTicket> {
        if !self.accepts_input() {
            return None;
        }
        match self.suggestions.handle_key(key) {
            KeyOutcome::Submit(_) => self.begin_submit(),
            KeyOutcome::Accepted(_) | KeyOutcome::Handled => {
                self.touch();
                None
            }
        }
    }

    /// Pointer selection of a suggestion.
    pub fn commit_suggestion(&mut self, index: usize) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let accepted = matches!(self.suggestions.commit_at(index), KeyOutcome::Accepted(_));
        self.touch();
        accepted
    }

    pub fn blur(&mut self, now: Instant) {
        self.suggestions.blur(now);
    }

    /// Apply time-based transitions. Returns `true` when state changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let changed = self.suggestions.tick(now);
        if changed {
            self.touch();
        }
        changed
    }

    // ---- guesses ----

    /// Start submitting the current input.
    ///
    /// `None` when the input is blank, a request is already pending, or the
    /// round is not active.
    pub fn begin_submit(&mut self) -> Option<GuessTicket> {
        let guess = self.suggestions.input().trim().to_string();
        if guess.is_empty() {
            return None;
        }
        if !self.accepts_input() {
            debug_log!("Ignoring submission in {:?} (pending={})", self.session.phase, self.session.pending);
            return None;
        }
        let target = self.session.target.clone()?;

        self.suggestions.close();
        self.session.advisory = None;
        self.session.pending = true;
        self.touch();

        Some(GuessTicket {
            generation: self.generation,
            guess,
            target,
            mode: self.session.mode,
        })
    }

    /// Adopt the outcome of a guess request.
    pub fn complete_submit(&mut self, ticket: &GuessTicket, outcome: Result<ScoredGuess>) -> SubmitOutcome {
        if ticket.generation != self.generation {
            debug_log!("Dropping stale guess '{}'", ticket.guess);
            return SubmitOutcome::Stale;
        }
        self.session.pending = false;
        self.touch();

        let scored = match outcome {
            Ok(scored) => scored,
            Err(e) => {
                log::warn!("Guess '{}' failed: {e}", ticket.guess);
                self.session.advisory = Some(e.to_string());
                return SubmitOutcome::Failed;
            }
        };

        self.suggestions.reset();
        let won = scored.result.is_win();
        match self.session.history.insert(scored.result) {
            Insertion::Duplicate => {
                self.session.advisory = Some(DUPLICATE_GUESS.to_string());
                SubmitOutcome::Duplicate
            }
            Insertion::Inserted => {
                self.session.guess_count += 1;
                if won {
                    info_log!("Target found after {} guesses", self.session.guess_count);
                    self.session.phase = Phase::Won;
                    self.session.similar = scored.similar;
                }
                SubmitOutcome::Recorded { won }
            }
        }
    }

    // ---- reveal ----

    pub fn begin_reveal(&mut self) -> Option<RevealTicket> {
        if !self.accepts_input() {
            return None;
        }
        let target = self.session.target.clone()?;
        self.suggestions.close();
        self.session.pending = true;
        self.touch();
        Some(RevealTicket {
            generation: self.generation,
            target,
            mode: self.session.mode,
        })
    }

    pub fn complete_reveal(&mut self, ticket: &RevealTicket, similar: Vec<SimilarEntity>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.session.pending = false;
        self.session.similar = similar;
        self.session.phase = Phase::Revealed;
        self.touch();
        true
    }

    // ---- async conveniences ----

    /// Load the roster and start the first round.
    pub async fn start(&mut self, api: &dyn GameApi) {
        let request = self.begin_start();
        let setup = prepare_round(api, &request).await;
        self.complete_round(setup);
    }

    pub async fn new_game(&mut self, api: &dyn GameApi) {
        let request = self.begin_new_game();
        let setup = prepare_round(api, &request).await;
        self.complete_round(setup);
    }

    pub async fn switch_mode(&mut self, api: &dyn GameApi, mode: GameMode) {
        if let Some(request) = self.begin_switch_mode(mode) {
            let setup = prepare_round(api, &request).await;
            self.complete_round(setup);
        }
    }

    /// Set the input to `text` and submit it.
    pub async fn guess(&mut self, api: &dyn GameApi, text: &str) -> Option<SubmitOutcome> {
        self.edit_input(text);
        self.submit(api).await
    }

    pub async fn submit(&mut self, api: &dyn GameApi) -> Option<SubmitOutcome> {
        let ticket = self.begin_submit()?;
        let outcome = score_guess(api, &ticket.guess, &ticket.target, ticket.mode).await;
        Some(self.complete_submit(&ticket, outcome))
    }

    pub async fn reveal(&mut self, api: &dyn GameApi) -> bool {
        let Some(ticket) = self.begin_reveal() else {
            return false;
        };
        let similar = fetch_similar(api, &ticket.target, ticket.mode).await;
        self.complete_reveal(&ticket, similar)
    }
}
