use futures::Stream;
use std::pin::Pin;

use crate::error::ChatError;
use crate::model::Message;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamChunk {
    pub content: Option<String>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }

    pub fn empty() -> Self {
        Self { content: None }
    }
}

pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<StreamChunk, ChatError>> + 'a>>;

pub trait ChatBackend {
    fn stream_chat<'a>(&'a self, model: &'a str, messages: &'a [Message]) -> ChunkStream<'a>;
}

impl<B> ChatBackend for &B
where
    B: ChatBackend + ?Sized,
{
    fn stream_chat<'a>(&'a self, model: &'a str, messages: &'a [Message]) -> ChunkStream<'a> {
        (**self).stream_chat(model, messages)
    }
}
