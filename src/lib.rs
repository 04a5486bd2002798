pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod input;
pub mod logging;
pub mod model;
pub mod providers;
pub mod repl;
pub mod session;
pub mod terminal;
pub mod transcript;
pub mod turn;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use tracing::info;

use cli::Cli;
use config::{Config, Mode};
use providers::openai::OpenAiBackend;
use session::ChatSession;
use terminal::Terminal;
use turn::TurnExecutor;

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = Config::from_cli(cli)?;
    info!(
        model = %cfg.model,
        base_url = %cfg.base_url,
        mode = cfg.mode.as_str(),
        stream_idle_timeout_secs = cfg.stream_idle_timeout_secs,
        "loaded runtime configuration"
    );

    let client = Client::builder()
        .connect_timeout(cfg.connect_timeout())
        .build()
        .context("Failed to initialize HTTP client")?;
    let backend = OpenAiBackend::new(client, &cfg);
    let executor = TurnExecutor::new(backend, cfg.model.clone(), cfg.stream_idle_timeout());
    let mut session = ChatSession::new(cfg.system_prompt.clone(), executor);

    let mut term = Terminal::stdio(cfg.use_color, cfg.quiet);

    match &cfg.mode {
        Mode::SingleMessage(message) => {
            // Read before Ctrl-C is captured: SIGINT must still end a blocked read.
            let piped = input::read_piped_stdin().context("Failed to read piped stdin")?;
            let message = input::attach_piped_input(message, piped.as_deref());
            let mut interrupts = input::listen_for_interrupts();
            repl::run_once(&mut session, &message, &mut term, &mut interrupts).await
        }
        Mode::Interactive => {
            let mut interrupts = input::listen_for_interrupts();
            let mut lines = input::spawn_stdin_reader();
            repl::run_repl(&mut session, &mut lines, &mut term, &mut interrupts).await
        }
    }
}
