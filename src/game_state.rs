//! Event loop connecting an interface to the session controller.
//!
//! Interfaces turn raw input into [`UserAction`]s. The [`GameDriver`] applies
//! them to the [`SessionController`] and runs any resulting network work on
//! the tokio runtime; finished work comes back as [`Completion`]s over a
//! channel, so the interface thread never waits on the network.

use crate::api::GameApi;
use crate::error::Result;
use crate::guess::{ScoredGuess, SimilarEntity, score_guess};
use crate::mode::GameMode;
use crate::reveal::fetch_similar;
use crate::session::{
    GuessTicket, RevealTicket, RoundRequest, RoundSetup, SessionController, prepare_round,
};
use crate::suggestions::NavKey;
use crate::{debug_log, info_log};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

#[derive(Clone, Debug, PartialEq)]
pub enum UserAction {
    /// The guess text changed.
    Edit(String),
    Key(NavKey),
    /// A suggestion was picked with the pointer.
    PickSuggestion(usize),
    /// The input lost focus.
    Blur,
    /// Replace the input with this text and submit it.
    Guess(String),
    NewGame,
    SwitchMode(GameMode),
    ToggleMode,
    Reveal,
    Exit,
}

/// Front end of the game.
pub trait GameInterface {
    /// Show the current state. Called once per loop iteration.
    fn render(&mut self, controller: &SessionController);

    /// The next user action, or `None` if nothing happened.
    fn next_action(&mut self, controller: &SessionController) -> Option<UserAction>;

    /// Line-based interfaces wait for in-flight requests before reading more
    /// input; interactive ones keep polling.
    fn waits_for_responses(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub enum Completion {
    Round(RoundSetup),
    Guess(GuessTicket, Result<ScoredGuess>),
    Reveal(RevealTicket, Vec<SimilarEntity>),
}

pub struct GameDriver {
    controller: SessionController,
    api: Arc<dyn GameApi>,
    runtime: Handle,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl GameDriver {
    pub fn new(controller: SessionController, api: Arc<dyn GameApi>, runtime: Handle) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            controller,
            api,
            runtime,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Kick off the first round.
    pub fn start(&mut self) {
        let request = self.controller.begin_start();
        self.spawn_round(request);
    }

    fn spawn_round(&mut self, request: RoundRequest) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let setup = prepare_round(api.as_ref(), &request).await;
            let _ = tx.send(Completion::Round(setup));
        });
    }

    fn spawn_guess(&mut self, ticket: GuessTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let outcome = score_guess(api.as_ref(), &ticket.guess, &ticket.target, ticket.mode).await;
            let _ = tx.send(Completion::Guess(ticket, outcome));
        });
    }

    fn spawn_reveal(&mut self, ticket: RevealTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let similar = fetch_similar(api.as_ref(), &ticket.target, ticket.mode).await;
            let _ = tx.send(Completion::Reveal(ticket, similar));
        });
    }

    /// Apply a user action. Returns `false` when the player wants to quit.
    pub fn dispatch(&mut self, action: UserAction) -> bool {
        debug_log!("dispatch({:?})", action);
        match action {
            UserAction::Edit(text) => {
                self.controller.edit_input(&text);
            }
            UserAction::Key(key) => {
                if let Some(ticket) = self.controller.handle_key(key) {
                    self.spawn_guess(ticket);
                }
            }
            UserAction::PickSuggestion(index) => {
                self.controller.commit_suggestion(index);
            }
            UserAction::Blur => self.controller.blur(Instant::now()),
            UserAction::Guess(text) => {
                if self.controller.edit_input(&text)
                    && let Some(ticket) = self.controller.begin_submit()
                {
                    self.spawn_guess(ticket);
                }
            }
            UserAction::NewGame => {
                let request = self.controller.begin_new_game();
                self.spawn_round(request);
            }
            UserAction::SwitchMode(mode) => {
                if let Some(request) = self.controller.begin_switch_mode(mode) {
                    self.spawn_round(request);
                }
            }
            UserAction::ToggleMode => {
                let mode = self.controller.mode().toggled();
                if let Some(request) = self.controller.begin_switch_mode(mode) {
                    self.spawn_round(request);
                }
            }
            UserAction::Reveal => {
                if let Some(ticket) = self.controller.begin_reveal() {
                    self.spawn_reveal(ticket);
                }
            }
            UserAction::Exit => {
                info_log!("Exit requested");
                return false;
            }
        }
        true
    }

    fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Round(setup) => {
                self.controller.complete_round(setup);
            }
            Completion::Guess(ticket, outcome) => {
                let result = self.controller.complete_submit(&ticket, outcome);
                debug_log!("Guess '{}' -> {:?}", ticket.guess, result);
            }
            Completion::Reveal(ticket, similar) => {
                self.controller.complete_reveal(&ticket, similar);
            }
        }
    }

    /// Apply every completion that has already arrived.
    pub fn poll_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Block until every in-flight request has completed.
    ///
    /// Must not be called from inside the tokio runtime.
    pub fn wait_for_completions(&mut self) {
        while self.in_flight > 0 {
            match self.rx.blocking_recv() {
                Some(completion) => self.apply(completion),
                None => break,
            }
        }
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        self.controller.tick(now)
    }
}

/// Run the game until the interface asks to exit.
pub fn game_loop<I: GameInterface>(driver: &mut GameDriver, interface: &mut I) {
    driver.start();

    loop {
        if interface.waits_for_responses() {
            driver.wait_for_completions();
        } else {
            driver.poll_completions();
        }
        driver.tick(Instant::now());
        interface.render(driver.controller());

        if let Some(action) = interface.next_action(driver.controller())
            && !driver.dispatch(action)
        {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RosterSource;
    use crate::roster::builtin_roster;
    use crate::session::{Phase, SessionSettings};
    use crate::test_support::FakeApi;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::runtime::Runtime;

    /// Replays scripted actions, waiting for responses between them.
    struct ScriptedInterface {
        actions: VecDeque<UserAction>,
        renders: usize,
    }

    impl ScriptedInterface {
        fn new(actions: Vec<UserAction>) -> Self {
            Self {
                actions: actions.into(),
                renders: 0,
            }
        }
    }

    impl GameInterface for ScriptedInterface {
        fn render(&mut self, _controller: &SessionController) {
            self.renders += 1;
        }

        fn next_action(&mut self, _controller: &SessionController) -> Option<UserAction> {
            Some(self.actions.pop_front().unwrap_or(UserAction::Exit))
        }

        fn waits_for_responses(&self) -> bool {
            true
        }
    }

    fn driver(runtime: &Runtime) -> GameDriver {
        let api = FakeApi::new()
            .with_roster(RosterSource::Players, json!(["Kevin Durant", "Stephen Curry"]))
            .with_random_player("Kevin Durant")
            .with_score("Stephen Curry", json!({"score": 42, "matched_name": "Stephen Curry"}))
            .with_score("Kevin Durant", json!({"score": 100, "top_5": [["James Harden", 91]]}));
        let controller = SessionController::new(SessionSettings {
            mode: GameMode::AllTime,
            sources: vec![RosterSource::Players],
            fallback: builtin_roster(),
            remote_random: true,
            seed: Some(1),
        });
        GameDriver::new(controller, Arc::new(api), runtime.handle().clone())
    }

    #[test]
    fn test_game_loop_immediate_exit() {
        let runtime = Runtime::new().unwrap();
        let mut driver = driver(&runtime);
        let mut interface = ScriptedInterface::new(vec![UserAction::Exit]);

        game_loop(&mut driver, &mut interface);
        assert_eq!(driver.controller().phase(), Phase::Active);
        assert_eq!(interface.renders, 1);
    }

    #[test]
    fn test_game_loop_plays_to_win() {
        let runtime = Runtime::new().unwrap();
        let mut driver = driver(&runtime);
        let mut interface = ScriptedInterface::new(vec![
            UserAction::Guess("Stephen Curry".to_string()),
            UserAction::Edit("kev".to_string()),
            UserAction::Key(NavKey::Down),
            UserAction::Key(NavKey::Enter),
            UserAction::Key(NavKey::Enter),
        ]);

        game_loop(&mut driver, &mut interface);
        let session = driver.controller().session();
        assert_eq!(session.phase, Phase::Won);
        assert_eq!(session.guess_count, 2);
        assert_eq!(session.similar[0].name, "James Harden");
        assert_eq!(driver.in_flight(), 0);
    }

    #[test]
    fn test_game_loop_pointer_pick_then_reveal_ignored_after_win() {
        let runtime = Runtime::new().unwrap();
        let mut driver = driver(&runtime);
        let mut interface = ScriptedInterface::new(vec![
            UserAction::Edit("durant".to_string()),
            UserAction::PickSuggestion(0),
            UserAction::Key(NavKey::Enter),
            UserAction::Reveal,
        ]);

        game_loop(&mut driver, &mut interface);
        assert_eq!(driver.controller().phase(), Phase::Won);
    }

    #[test]
    fn test_game_loop_toggle_mode_starts_new_round() {
        let runtime = Runtime::new().unwrap();
        let mut driver = driver(&runtime);
        let mut interface = ScriptedInterface::new(vec![
            UserAction::Guess("Stephen Curry".to_string()),
            UserAction::ToggleMode,
        ]);

        game_loop(&mut driver, &mut interface);
        let controller = driver.controller();
        assert_eq!(controller.mode(), GameMode::Modern);
        assert_eq!(controller.phase(), Phase::Active);
        assert_eq!(controller.session().guess_count, 0);
        assert_eq!(controller.generation(), 2);
    }

    #[test]
    fn test_game_loop_reveal() {
        let runtime = Runtime::new().unwrap();
        let mut driver = driver(&runtime);
        let mut interface = ScriptedInterface::new(vec![UserAction::Reveal, UserAction::NewGame]);

        game_loop(&mut driver, &mut interface);
        let controller = driver.controller();
        assert_eq!(controller.phase(), Phase::Active);
        assert_eq!(controller.generation(), 2);
    }
}
