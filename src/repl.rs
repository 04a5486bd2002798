use anyhow::{Context, Result, anyhow};
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::gateway::ChatBackend;
use crate::input::{InputLines, Interrupts};
use crate::session::ChatSession;
use crate::terminal::Terminal;
use crate::turn::{CancelReason, TurnOutcome};

const HELP_TEXT: &str = "commands:
  /help     show this help
  /history  print the conversation so far
  /quit     exit (also /exit, Ctrl-D, or Ctrl-C at the prompt)
Ctrl-C while a reply is streaming stops that reply.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Help,
    History,
    Quit,
}

fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }
    match input.to_ascii_lowercase().as_str() {
        "/help" => Some(Command::Help),
        "/history" => Some(Command::History),
        "/quit" | "/exit" => Some(Command::Quit),
        _ => None,
    }
}

async fn drive_turn<B, W>(
    session: &mut ChatSession<B>,
    input: &str,
    sink: &mut W,
    interrupts: &mut Interrupts,
) -> TurnOutcome
where
    B: ChatBackend,
    W: Write + ?Sized,
{
    let cancel = CancellationToken::new();
    let turn = session.run_turn(input, sink, &cancel);
    tokio::pin!(turn);

    loop {
        let finished = tokio::select! {
            outcome = &mut turn => Some(outcome),
            Some(()) = interrupts.recv() => {
                debug!("interrupt received while streaming");
                cancel.cancel();
                None
            }
        };
        if let Some(outcome) = finished {
            return outcome;
        }
    }
}

fn cancel_notice(reason: CancelReason) -> &'static str {
    match reason {
        CancelReason::Interrupted => "(reply interrupted)",
        CancelReason::TimedOut => {
            "(reply abandoned: no data from the model within MODEL_TIMEOUT_SECS)"
        }
    }
}

pub async fn run_repl<B, O, E>(
    session: &mut ChatSession<B>,
    lines: &mut InputLines,
    term: &mut Terminal<O, E>,
    interrupts: &mut Interrupts,
) -> Result<()>
where
    B: ChatBackend,
    O: Write,
    E: Write,
{
    term.banner(session.model())
        .context("Failed to write to stdout")?;

    loop {
        // Ctrl-C presses left over from a cancelled reply must not end the session.
        while interrupts.try_recv().is_ok() {}
        term.prompt().context("Failed to write to stdout")?;

        let line = tokio::select! {
            line = lines.recv() => line,
            Some(()) = interrupts.recv() => None,
        };
        let Some(line) = line else {
            writeln!(term.out).context("Failed to write to stdout")?;
            break;
        };

        match parse_command(&line) {
            Some(Command::Quit) => break,
            Some(Command::Help) => {
                term.help(HELP_TEXT).context("Failed to write to stdout")?;
                continue;
            }
            Some(Command::History) => {
                term.history(session.transcript().snapshot())
                    .context("Failed to write to stdout")?;
                continue;
            }
            None => {}
        }

        term.assistant_header()
            .context("Failed to write to stdout")?;
        let outcome = drive_turn(session, &line, &mut term.out, interrupts).await;
        term.end_reply().context("Failed to write to stdout")?;

        match outcome {
            TurnOutcome::Completed(_) => {}
            TurnOutcome::Failed(err) => {
                term.error(&err).context("Failed to write to stderr")?;
            }
            TurnOutcome::Cancelled(reason) => {
                term.notice(cancel_notice(reason))
                    .context("Failed to write to stderr")?;
            }
        }
    }

    info!(
        messages = session.transcript().message_count(),
        "interactive session ended"
    );
    Ok(())
}

pub async fn run_once<B, O, E>(
    session: &mut ChatSession<B>,
    message: &str,
    term: &mut Terminal<O, E>,
    interrupts: &mut Interrupts,
) -> Result<()>
where
    B: ChatBackend,
    O: Write,
    E: Write,
{
    let outcome = drive_turn(session, message, &mut term.out, interrupts).await;
    writeln!(term.out).context("Failed to write to stdout")?;

    match outcome {
        TurnOutcome::Completed(_) => Ok(()),
        TurnOutcome::Failed(err) => Err(anyhow::Error::new(err)),
        TurnOutcome::Cancelled(reason) => Err(anyhow!("{}", cancel_notice(reason))),
    }
}
