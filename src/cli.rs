use crate::api::RosterSource;
use crate::config::{DEFAULT_API_BASE, DEFAULT_TIMEOUT_SECS};
use crate::game_state::{GameInterface, UserAction};
use crate::guess::SimilarEntity;
use crate::mode::GameMode;
use crate::roster::RosterOrigin;
use crate::session::{Phase, SessionController};
use crate::suggestions::NavKey;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Guess the hidden NBA player by similarity score
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the game server API
    #[arg(long, env = "NBA_MANTLE_API", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Player pool to play with
    #[arg(short, long, value_enum, default_value_t = GameMode::Modern)]
    pub mode: GameMode,

    /// Request timeout in seconds (0 waits forever)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Roster endpoint to try, in order; repeat to build a fallback chain
    #[arg(long = "roster-source", value_enum)]
    pub roster_sources: Vec<RosterSource>,

    /// Path to a newline-delimited player list used when the server is unreachable
    #[arg(short = 'i', long)]
    pub fallback_roster: Option<PathBuf>,

    /// Always choose the target locally instead of asking the server
    #[arg(long)]
    pub no_remote_random: bool,

    /// Seed for local target selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Use the line-based interface instead of the full-screen TUI
    #[arg(long)]
    pub plain: bool,

    /// Skip the server health check at startup
    #[arg(long)]
    pub skip_health_check: bool,
}

#[must_use]
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Commands understood by the line interface.
#[derive(Debug, PartialEq)]
pub enum LineCommand {
    Action(UserAction),
    Invalid(String),
}

/// Interpret one line of input.
///
/// Plain text is a guess. `?text` only updates suggestions, `:pick N` takes
/// the Nth suggestion and an empty line acts like Enter.
pub fn parse_command(line: &str) -> LineCommand {
    let line = line.trim();
    let lower = line.to_lowercase();

    let action = match lower.as_str() {
        "" => UserAction::Key(NavKey::Enter),
        "exit" | "quit" => UserAction::Exit,
        "next" | ":new" => UserAction::NewGame,
        ":reveal" | ":giveup" => UserAction::Reveal,
        ":up" => UserAction::Key(NavKey::Up),
        ":down" => UserAction::Key(NavKey::Down),
        ":close" => UserAction::Key(NavKey::Escape),
        ":mode" => UserAction::ToggleMode,
        _ => {
            if let Some(rest) = line.strip_prefix('?') {
                UserAction::Edit(rest.trim_start().to_string())
            } else if let Some(mode) = lower.strip_prefix(":mode ") {
                match mode.trim().parse::<GameMode>() {
                    Ok(mode) => UserAction::SwitchMode(mode),
                    Err(e) => return LineCommand::Invalid(e),
                }
            } else if let Some(index) = lower.strip_prefix(":pick ") {
                match index.trim().parse::<usize>() {
                    Ok(n) if n > 0 => UserAction::PickSuggestion(n - 1),
                    _ => return LineCommand::Invalid(format!("Invalid suggestion number '{}'.", index.trim())),
                }
            } else if line.starts_with(':') {
                return LineCommand::Invalid(format!("Unknown command '{line}'."));
            } else {
                UserAction::Guess(line.to_string())
            }
        }
    };
    LineCommand::Action(action)
}

pub fn win_message(target: &str, guess_count: u32) -> String {
    let noun = if guess_count == 1 { "guess" } else { "guesses" };
    format!("Congratulations! You found {target} in {guess_count} {noun}!")
}

pub fn reveal_message(target: &str) -> String {
    format!("The answer was {target}.")
}

/// What the line interface last printed, so it only prints changes.
#[derive(Default)]
struct Printed {
    revision: Option<u64>,
    announced_generation: u64,
    advisory: Option<String>,
    guess_count: u32,
    history_len: usize,
    suggestions: Vec<String>,
    selected: Option<usize>,
    finished: bool,
}

/// Line-based front end reading commands from `reader`.
pub struct CliInterface<R: BufRead, W: Write = io::Stdout> {
    reader: R,
    out: W,
    printed: Printed,
}

impl<R: BufRead> CliInterface<R> {
    pub fn new(reader: R) -> Self {
        Self::with_writer(reader, io::stdout())
    }
}

impl<R: BufRead, W: Write> CliInterface<R, W> {
    pub fn with_writer(reader: R, out: W) -> Self {
        Self {
            reader,
            out,
            printed: Printed::default(),
        }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn print_round_start(&mut self, controller: &SessionController) -> io::Result<()> {
        let mode = controller.mode();
        writeln!(
            self.out,
            "\nNew game started in {} mode. {} players loaded.",
            mode.label(),
            controller.roster().len()
        )?;
        if controller.roster_origin() == Some(RosterOrigin::Builtin) {
            writeln!(self.out, "(Using the built-in player list.)")?;
        }
        Ok(())
    }

    fn print_history(&mut self, controller: &SessionController) -> io::Result<()> {
        let history = &controller.session().history;
        writeln!(self.out, "Guesses: {}", controller.session().guess_count)?;
        for (rank, entry) in history.entries().iter().enumerate() {
            write!(self.out, "{:>2}. {:<28} {:>3}", rank + 1, entry.matched_name, entry.score)?;
            let factors: Vec<String> = entry
                .contributing_factors()
                .map(|(name, value)| format!("{}: {value:.0}", name.replace('_', " ")))
                .collect();
            if !factors.is_empty() {
                write!(self.out, "  ({})", factors.join(", "))?;
            }
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn print_similar(&mut self, similar: &[SimilarEntity]) -> io::Result<()> {
        if similar.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "Most similar players:")?;
        for (rank, entity) in similar.iter().enumerate() {
            writeln!(self.out, "{}. {} ({})", rank + 1, entity.name, entity.score)?;
        }
        Ok(())
    }

    fn print_suggestions(&mut self, controller: &SessionController) -> io::Result<()> {
        let engine = controller.suggestions();
        if !engine.is_open() {
            return Ok(());
        }
        if engine.suggestions().is_empty() {
            return writeln!(self.out, "No matching players.");
        }
        writeln!(self.out, "Suggestions:")?;
        for (i, name) in engine.suggestions().iter().enumerate() {
            let marker = if engine.selected() == Some(i) { '>' } else { ' ' };
            writeln!(self.out, "{marker}{}. {name}", i + 1)?;
        }
        Ok(())
    }

    fn render_changes(&mut self, controller: &SessionController) -> io::Result<()> {
        let session = controller.session();

        if session.phase != Phase::Loading && self.printed.announced_generation != controller.generation() {
            self.printed = Printed {
                announced_generation: controller.generation(),
                ..Printed::default()
            };
            self.print_round_start(controller)?;
        }

        if session.advisory != self.printed.advisory {
            if let Some(advisory) = &session.advisory {
                writeln!(self.out, "! {advisory}")?;
            }
            self.printed.advisory.clone_from(&session.advisory);
        }

        let engine = controller.suggestions();
        let listed: &[String] = if engine.is_open() { engine.suggestions() } else { &[] };
        if listed != self.printed.suggestions.as_slice() || engine.selected() != self.printed.selected {
            self.print_suggestions(controller)?;
            self.printed.suggestions = listed.to_vec();
            self.printed.selected = engine.selected();
        }

        if session.guess_count != self.printed.guess_count || session.history.len() != self.printed.history_len {
            self.print_history(controller)?;
            self.printed.guess_count = session.guess_count;
            self.printed.history_len = session.history.len();
        }

        if session.phase.is_finished() && !self.printed.finished {
            let target = session.target.as_deref().unwrap_or("?");
            let message = match session.phase {
                Phase::Won => win_message(target, session.guess_count),
                _ => reveal_message(target),
            };
            writeln!(self.out, "{message}")?;
            self.print_similar(&session.similar)?;
            self.printed.finished = true;
        }
        Ok(())
    }

    fn prompt(&mut self, controller: &SessionController) -> io::Result<()> {
        let text = match controller.phase() {
            Phase::Active => {
                "\nEnter a player name ('?name' for suggestions, ':pick N', ':reveal', ':mode all|modern', 'next', 'exit'):"
            }
            Phase::Won | Phase::Revealed => "\nType 'next' for a new game, ':mode all|modern' to switch, or 'exit' to quit:",
            Phase::Loading => "\nWaiting for a round. Type 'next' to retry or 'exit' to quit:",
        };
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }
}

impl<R: BufRead, W: Write> GameInterface for CliInterface<R, W> {
    fn render(&mut self, controller: &SessionController) {
        if self.printed.revision == Some(controller.revision()) {
            return;
        }
        if let Err(e) = self.render_changes(controller) {
            log::error!("Failed to write game output: {e}");
        }
        self.printed.revision = Some(controller.revision());
    }

    fn next_action(&mut self, controller: &SessionController) -> Option<UserAction> {
        if let Err(e) = self.prompt(controller) {
            log::error!("Failed to write prompt: {e}");
        }

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => return Some(UserAction::Exit),
            Ok(_) => {}
            Err(e) => {
                log::error!("Failed to read input: {e}");
                return Some(UserAction::Exit);
            }
        }

        match parse_command(&line) {
            LineCommand::Action(action) => {
                if action == UserAction::Exit {
                    let _ = writeln!(self.out, "Exiting.");
                }
                Some(action)
            }
            LineCommand::Invalid(message) => {
                let _ = writeln!(self.out, "{message}");
                None
            }
        }
    }

    fn waits_for_responses(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::builtin_roster;
    use crate::session::SessionSettings;
    use crate::test_support::FakeApi;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_parse_cli_defaults() {
        let cli = Cli::parse_from(["nba-mantle"]);
        assert_eq!(cli.mode, GameMode::Modern);
        assert_eq!(cli.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(cli.roster_sources.is_empty());
        assert!(cli.fallback_roster.is_none());
        assert!(!cli.plain);
    }

    #[test]
    fn test_parse_cli_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["nba-mantle", "--mode", "classic"]).is_err());
    }

    #[test]
    fn test_parse_cli_fallback_short_flag() {
        let cli = Cli::parse_from(["nba-mantle", "-i", "players.txt", "-m", "all"]);
        assert_eq!(cli.fallback_roster, Some(PathBuf::from("players.txt")));
        assert_eq!(cli.mode, GameMode::AllTime);
    }

    #[test]
    fn test_parse_command_guess() {
        assert_eq!(
            parse_command("  Kevin Durant \n"),
            LineCommand::Action(UserAction::Guess("Kevin Durant".to_string()))
        );
    }

    #[test]
    fn test_parse_command_keywords() {
        assert_eq!(parse_command("EXIT"), LineCommand::Action(UserAction::Exit));
        assert_eq!(parse_command("quit"), LineCommand::Action(UserAction::Exit));
        assert_eq!(parse_command("next"), LineCommand::Action(UserAction::NewGame));
        assert_eq!(parse_command(":new"), LineCommand::Action(UserAction::NewGame));
        assert_eq!(parse_command(":reveal"), LineCommand::Action(UserAction::Reveal));
        assert_eq!(parse_command(":mode"), LineCommand::Action(UserAction::ToggleMode));
        assert_eq!(parse_command("\n"), LineCommand::Action(UserAction::Key(NavKey::Enter)));
        assert_eq!(parse_command(":down"), LineCommand::Action(UserAction::Key(NavKey::Down)));
    }

    #[test]
    fn test_parse_command_mode_switch() {
        assert_eq!(
            parse_command(":mode all"),
            LineCommand::Action(UserAction::SwitchMode(GameMode::AllTime))
        );
        assert_eq!(
            parse_command(":MODE Modern"),
            LineCommand::Action(UserAction::SwitchMode(GameMode::Modern))
        );
        assert!(matches!(parse_command(":mode classic"), LineCommand::Invalid(_)));
    }

    #[test]
    fn test_parse_command_suggestions() {
        assert_eq!(
            parse_command("?LeB"),
            LineCommand::Action(UserAction::Edit("LeB".to_string()))
        );
        assert_eq!(
            parse_command(":pick 2"),
            LineCommand::Action(UserAction::PickSuggestion(1))
        );
        assert!(matches!(parse_command(":pick 0"), LineCommand::Invalid(_)));
        assert!(matches!(parse_command(":pick x"), LineCommand::Invalid(_)));
        assert!(matches!(parse_command(":bogus"), LineCommand::Invalid(_)));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            win_message("Kevin Durant", 3),
            "Congratulations! You found Kevin Durant in 3 guesses!"
        );
        assert_eq!(
            win_message("Kevin Durant", 1),
            "Congratulations! You found Kevin Durant in 1 guess!"
        );
        assert_eq!(reveal_message("Kevin Durant"), "The answer was Kevin Durant.");
    }

    fn controller() -> SessionController {
        SessionController::new(SessionSettings {
            mode: GameMode::AllTime,
            sources: vec![RosterSource::Players],
            fallback: builtin_roster(),
            remote_random: true,
            seed: Some(3),
        })
    }

    #[tokio::test]
    async fn test_render_prints_round_history_and_win() {
        let api = FakeApi::new()
            .with_roster(RosterSource::Players, json!(["Kevin Durant", "Stephen Curry"]))
            .with_random_player("Kevin Durant")
            .with_score(
                "Stephen Curry",
                json!({"score": 40, "breakdown": {"teammate_years": 12, "total": 40}}),
            )
            .with_score("Kevin Durant", json!({"score": 100, "top_5": [["James Harden", 91]]}));
        let mut controller = controller();
        let mut interface = CliInterface::with_writer(Cursor::new(""), Vec::new());

        controller.start(&api).await;
        interface.render(&controller);
        controller.guess(&api, "Stephen Curry").await;
        interface.render(&controller);
        controller.guess(&api, "Kevin Durant").await;
        interface.render(&controller);

        let output = String::from_utf8(interface.writer().clone()).unwrap();
        assert!(output.contains("New game started in All Time mode. 2 players loaded."));
        assert!(output.contains("teammate years: 12"));
        assert!(output.contains("Congratulations! You found Kevin Durant in 2 guesses!"));
        assert!(output.contains("1. James Harden (91)"));
    }

    #[tokio::test]
    async fn test_render_prints_advisory_once() {
        let api = FakeApi::new()
            .with_roster(RosterSource::Players, json!(["Kevin Durant"]))
            .with_random_player("Kevin Durant")
            .with_score("Kevin Durant", json!({"score": 55}));
        let mut controller = controller();
        let mut interface = CliInterface::with_writer(Cursor::new(""), Vec::new());

        controller.start(&api).await;
        controller.guess(&api, "Nobody").await;
        interface.render(&controller);
        interface.render(&controller);

        let output = String::from_utf8(interface.writer().clone()).unwrap();
        assert_eq!(output.matches("! Player not found: Nobody").count(), 1);
    }

    #[test]
    fn test_next_action_eof_exits() {
        let mut interface = CliInterface::with_writer(Cursor::new(""), Vec::new());
        assert_eq!(interface.next_action(&controller()), Some(UserAction::Exit));
    }

    #[test]
    fn test_next_action_invalid_command_reports() {
        let mut interface = CliInterface::with_writer(Cursor::new(":pick zero\n"), Vec::new());
        assert_eq!(interface.next_action(&controller()), None);
        let output = String::from_utf8(interface.writer().clone()).unwrap();
        assert!(output.contains("Invalid suggestion number 'zero'."));
    }
}
