use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type InputLines = mpsc::Receiver<String>;

pub type Interrupts = mpsc::UnboundedReceiver<()>;

// A plain thread, not the blocking pool: a pending stdin read cannot be
// cancelled and must not hold up process exit.
pub fn spawn_stdin_reader() -> InputLines {
    let (tx, rx) = mpsc::channel(1);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "failed to read stdin");
                    break;
                }
            }
        }
        debug!("stdin reader finished");
    });
    rx
}

pub fn listen_for_interrupts() -> Interrupts {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for Ctrl-C");
                break;
            }
            debug!("received interrupt");
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

pub fn read_piped_stdin() -> io::Result<Option<String>> {
    use std::io::{IsTerminal, Read};

    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut piped = String::new();
    stdin.lock().read_to_string(&mut piped)?;
    Ok(Some(piped))
}

pub fn attach_piped_input(message: &str, piped: Option<&str>) -> String {
    match piped.map(|text| text.trim_end_matches(['\r', '\n'])) {
        Some(text) if !text.trim().is_empty() => format!("{message}\n\n```\n{text}\n```"),
        _ => message.to_string(),
    }
}
