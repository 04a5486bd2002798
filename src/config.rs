use std::env;
use std::fmt;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::ChatError;

const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_SYSTEM_PROMPT: &str = "you're a helpful assistant";
const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    SingleMessage(String),
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::SingleMessage(_) => "single-message",
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub system_prompt: String,
    pub stream_idle_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub mode: Mode,
    pub use_color: bool,
    pub quiet: bool,
    pub verbose: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("system_prompt", &self.system_prompt)
            .field("stream_idle_timeout_secs", &self.stream_idle_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("mode", &self.mode)
            .field("use_color", &self.use_color)
            .field("quiet", &self.quiet)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ChatError> {
        Self::resolve(cli, |key| env::var(key).ok())
    }

    fn resolve(cli: Cli, mut get_var: impl FnMut(&str) -> Option<String>) -> Result<Self, ChatError> {
        let api_key = cli
            .api_key
            .or_else(|| get_var("OPENAI_API_KEY"))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ChatError::configuration(
                    "API key is required. Pass --api-key or set OPENAI_API_KEY.",
                )
            })?;

        let model = non_blank(cli.model)
            .or_else(|| non_blank(get_var("MODEL")))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = non_blank(cli.base_url)
            .or_else(|| non_blank(get_var("OPENAI_BASE_URL")))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ChatError::configuration(format!(
                "base URL '{base_url}' must start with http:// or https://"
            )));
        }
        let system_prompt = cli
            .system_prompt
            .or_else(|| get_var("SYSTEM_PROMPT"))
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let stream_idle_timeout_secs = parse_positive_u64(
            get_var("MODEL_TIMEOUT_SECS").as_deref(),
            DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
        );
        let connect_timeout_secs = parse_positive_u64(
            get_var("CONNECT_TIMEOUT_SECS").as_deref(),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        );
        let no_color_env = get_var("NO_COLOR").is_some_and(|value| !value.is_empty());

        let mode = match cli.single_message {
            Some(message) => Mode::SingleMessage(message),
            None => Mode::Interactive,
        };

        Ok(Self {
            api_key,
            model,
            base_url,
            system_prompt,
            stream_idle_timeout_secs,
            connect_timeout_secs,
            mode,
            use_color: !cli.no_color && !no_color_env,
            quiet: cli.quiet,
            verbose: cli.verbose,
        })
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
