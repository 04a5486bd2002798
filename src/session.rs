use std::io::Write;
use tokio_util::sync::CancellationToken;

use crate::gateway::ChatBackend;
use crate::model::TurnRole;
use crate::transcript::Transcript;
use crate::turn::{TurnExecutor, TurnOutcome};

pub struct ChatSession<B> {
    transcript: Transcript,
    executor: TurnExecutor<B>,
}

impl<B> ChatSession<B>
where
    B: ChatBackend,
{
    pub fn new(system_prompt: impl Into<String>, executor: TurnExecutor<B>) -> Self {
        Self {
            transcript: Transcript::new(system_prompt),
            executor,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn model(&self) -> &str {
        self.executor.model()
    }

    pub async fn run_turn<W>(
        &mut self,
        input: &str,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> TurnOutcome
    where
        W: Write + ?Sized,
    {
        self.transcript.append(TurnRole::User, input);

        let outcome = self
            .executor
            .run(self.transcript.snapshot(), sink, cancel)
            .await;

        if let TurnOutcome::Completed(reply) = &outcome {
            self.transcript.append(TurnRole::Assistant, reply.clone());
        }
        outcome
    }
}
