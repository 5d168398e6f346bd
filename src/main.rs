use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam::channel::{Receiver, unbounded};
use sonify::{Command, USAGE, engine, parse_args};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Sends a shutdown request when Enter is pressed. On EOF the sender is
/// dropped and the live loop keeps running until the process is killed.
fn watch_stdin() -> Receiver<()> {
    let (tx, rx) = unbounded();
    std::thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = std::io::stdin().read_line(&mut line) {
            if n > 0 {
                let _ = tx.send(());
            }
        }
    });
    rx
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    let command = match parse_args(std::env::args().skip(1), now) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let result = match command {
        Command::Help => {
            println!("{USAGE}");
            Ok(())
        }
        Command::Live(settings) => {
            info!("press Enter to stop");
            engine::live(&settings, &watch_stdin())
        }
        Command::Generate(settings) => engine::generate(&settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
