use futures::StreamExt;
use std::fmt;
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::gateway::ChatBackend;
use crate::model::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Interrupted,
    TimedOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::TimedOut => write!(f, "timed out waiting for the model"),
        }
    }
}

#[derive(Debug)]
pub enum TurnOutcome {
    Completed(String),
    Failed(ChatError),
    Cancelled(CancelReason),
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl TurnState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

fn transition(state: &mut TurnState, next: TurnState) {
    debug!(from = state.as_str(), to = next.as_str(), "turn state changed");
    *state = next;
}

fn emit<W: Write + ?Sized>(sink: &mut W, fragment: &str) -> std::io::Result<()> {
    sink.write_all(fragment.as_bytes())?;
    sink.flush()
}

pub struct TurnExecutor<B> {
    backend: B,
    model: String,
    idle_timeout: Duration,
}

impl<B> TurnExecutor<B>
where
    B: ChatBackend,
{
    pub fn new(backend: B, model: impl Into<String>, idle_timeout: Duration) -> Self {
        Self {
            backend,
            model: model.into(),
            idle_timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Streams a reply to `transcript`, writing each fragment to `sink` as it
    /// arrives.
    ///
    /// Partial content is dropped unless the stream completes. Cancelling
    /// `cancel` or waiting longer than the idle timeout for a chunk ends the
    /// turn as `Cancelled`.
    pub async fn run<W>(
        &self,
        transcript: &[Message],
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> TurnOutcome
    where
        W: Write + ?Sized,
    {
        let mut state = TurnState::Idle;
        let mut reply = String::new();
        let mut fragments = 0usize;

        transition(&mut state, TurnState::Requesting);
        let mut stream = self.backend.stream_chat(&self.model, transcript);

        let outcome = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = tokio::time::timeout(self.idle_timeout, stream.next()) => Some(next),
            };

            let Some(next) = next else {
                break TurnOutcome::Cancelled(CancelReason::Interrupted);
            };
            let Ok(next) = next else {
                break TurnOutcome::Cancelled(CancelReason::TimedOut);
            };

            match next {
                None => break TurnOutcome::Completed(std::mem::take(&mut reply)),
                Some(Err(err)) => break TurnOutcome::Failed(err),
                Some(Ok(chunk)) => {
                    if state == TurnState::Requesting {
                        transition(&mut state, TurnState::Streaming);
                    }
                    let Some(fragment) = chunk.content.filter(|content| !content.is_empty())
                    else {
                        continue;
                    };
                    if let Err(err) = emit(sink, &fragment) {
                        break TurnOutcome::Failed(ChatError::Io(err));
                    }
                    reply.push_str(&fragment);
                    fragments += 1;
                }
            }
        };
        drop(stream);

        match &outcome {
            TurnOutcome::Completed(content) => {
                transition(&mut state, TurnState::Completed);
                debug!(
                    model = %self.model,
                    fragments,
                    reply_len = content.len(),
                    "turn completed"
                );
            }
            TurnOutcome::Failed(err) => {
                transition(&mut state, TurnState::Failed);
                warn!(
                    model = %self.model,
                    fragments,
                    discarded_len = reply.len(),
                    error = %err,
                    "turn failed"
                );
            }
            TurnOutcome::Cancelled(reason) => {
                transition(&mut state, TurnState::Cancelled);
                warn!(
                    model = %self.model,
                    fragments,
                    discarded_len = reply.len(),
                    reason = %reason,
                    "turn cancelled"
                );
            }
        }
        outcome
    }
}
