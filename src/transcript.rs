use crate::model::{Message, MessageRole, TurnRole};

/// Ordered conversation history for one session.
///
/// The first message is always the system message given at construction.
/// Only user and assistant messages can be appended afterwards, and nothing
/// is ever removed or rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) {
        self.messages.push(Message {
            role: MessageRole::from(role),
            content: content.into(),
        });
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}
