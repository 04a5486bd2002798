use clap::Parser;

/// Chat with an OpenAI-compatible model from the terminal.
#[derive(Debug, Default, Parser)]
#[command(name = "ai", version, about, long_about = None)]
pub struct Cli {
    /// The API key (default: $OPENAI_API_KEY)
    #[arg(short = 'a', long)]
    pub api_key: Option<String>,

    /// The model to use (default: $MODEL or gpt-4o)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Override the system prompt (default: $SYSTEM_PROMPT or a helpful-assistant persona)
    #[arg(short = 'p', long)]
    pub system_prompt: Option<String>,

    /// Send a single message, print the reply and exit
    #[arg(short, long)]
    pub single_message: Option<String>,

    /// Base URL of the chat API (default: $OPENAI_BASE_URL or https://api.openai.com/v1)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Disable color output
    #[arg(short, long)]
    pub no_color: bool,

    /// Disable prompts and headers
    #[arg(short, long)]
    pub quiet: bool,

    /// Log debug details to stderr when RUST_LOG is unset
    #[arg(short, long)]
    pub verbose: bool,
}
