use nba_mantle::api::GameApi;
use nba_mantle::cli::{CliInterface, parse_cli};
use nba_mantle::config::GameConfig;
use nba_mantle::game_state::{GameDriver, game_loop};
use nba_mantle::logging::init_logging;
use nba_mantle::session::SessionController;
use nba_mantle::tui::TuiInterface;
use nba_mantle::info_log;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn main() -> ExitCode {
    let cli = parse_cli();
    let log_path = init_logging();
    let config = GameConfig::from_cli(&cli);
    log::info!("Starting with {config:?} (log file: {log_path:?})");

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let api = match config.build_api() {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let settings = match config.session_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load fallback roster: {e}");
            return ExitCode::FAILURE;
        }
    };

    if config.check_health {
        match runtime.block_on(api.health()) {
            Ok(()) => info_log!("Server at {} is healthy", config.api_base),
            Err(e) => log::warn!("Health check against {} failed: {e}", config.api_base),
        }
    }

    let api: Arc<dyn GameApi> = Arc::new(api);
    let mut driver = GameDriver::new(
        SessionController::new(settings),
        api,
        runtime.handle().clone(),
    );

    if config.plain {
        let mut interface = CliInterface::new(io::stdin().lock());
        game_loop(&mut driver, &mut interface);
    } else {
        match TuiInterface::new() {
            Ok(mut interface) => game_loop(&mut driver, &mut interface),
            Err(e) => {
                eprintln!("Failed to start the terminal UI ({e}); falling back to plain mode.");
                let mut interface = CliInterface::new(io::stdin().lock());
                game_loop(&mut driver, &mut interface);
            }
        }
    }

    ExitCode::SUCCESS
}
