use async_stream::try_stream;
use futures::{Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ChatError;
use crate::gateway::{ChatBackend, ChunkStream, StreamChunk};
use crate::model::Message;
use crate::providers::http_errors::model_api_request_error;
use crate::providers::sse;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedChunk {
    content: Option<String>,
    finished: bool,
}

fn parse_chunk(data: &str) -> Result<ParsedChunk, ChatError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;

    if let Some(error) = chunk.error {
        let kind = error.kind.as_deref().unwrap_or("error");
        return Err(ChatError::protocol(format!(
            "provider reported {kind} mid-stream: {}",
            error.message
        )));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(ParsedChunk {
            content: None,
            finished: false,
        });
    };
    Ok(ParsedChunk {
        content: choice.delta.content,
        finished: choice.finish_reason.is_some(),
    })
}

fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    api_url: String,
    connect_timeout_secs: u64,
}

impl OpenAiBackend {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.api_key.clone(),
            api_url: chat_url(&cfg.base_url),
            connect_timeout_secs: cfg.connect_timeout_secs,
        }
    }

    fn chunk_stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [Message],
    ) -> impl Stream<Item = Result<StreamChunk, ChatError>> + 'a {
        try_stream! {
            let body = ChatCompletionRequest {
                model,
                messages,
                stream: true,
            };
            debug!(
                api_url = %self.api_url,
                model = %model,
                message_count = messages.len(),
                "sending streaming chat request"
            );

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
                .json(&body)
                .send()
                .await
                .map_err(|err| {
                    warn!(
                        api_url = %self.api_url,
                        model = %model,
                        error = %err,
                        "chat request failed"
                    );
                    model_api_request_error(err, &self.api_url, self.connect_timeout_secs)
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let response_body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read response body>".to_string());
                warn!(
                    api_url = %self.api_url,
                    model = %model,
                    status = %status,
                    response_body_len = response_body.len(),
                    "model API returned non-success status"
                );
                return Err(ChatError::Api {
                    status,
                    body: response_body,
                })?;
            }

            let api_url = self.api_url.clone();
            let timeout_secs = self.connect_timeout_secs;
            let bytes = response.bytes_stream().map(move |chunk| {
                chunk.map_err(|err| model_api_request_error(err, &api_url, timeout_secs))
            });
            let mut events = Box::pin(sse::decode(bytes));

            let mut finished = false;
            while let Some(data) = events.next().await {
                let data = data?;
                if data.trim() == DONE_MARKER {
                    finished = true;
                    break;
                }

                let chunk = parse_chunk(&data)?;
                yield StreamChunk {
                    content: chunk.content,
                };
                if chunk.finished {
                    finished = true;
                    break;
                }
            }

            if !finished {
                return Err(ChatError::protocol(
                    "stream ended before the model finished its reply",
                ))?;
            }
            debug!(model = %model, "chat stream completed");
        }
    }
}

impl ChatBackend for OpenAiBackend {
    fn stream_chat<'a>(&'a self, model: &'a str, messages: &'a [Message]) -> ChunkStream<'a> {
        Box::pin(self.chunk_stream(model, messages))
    }
}
