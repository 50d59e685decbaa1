//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod model_list;
pub mod persona_list;
pub mod say;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cli::chat::run_chat;
use crate::cli::model_list::list_models;
use crate::cli::persona_list::list_personas;
use crate::cli::say::run_say;
use crate::core::catalog::ModelCatalog;
use crate::core::config::{path_display, Config};
use crate::core::session::ChatSession;
use crate::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "aihub")]
#[command(version)]
#[command(about = "Chat with several LLM families from one terminal")]
#[command(
    long_about = "AI Hub is a line-oriented chat client for a catalog of OpenAI, Anthropic and \
Google models reached through a single gateway. Replies stream in as they are generated.\n\n\
Free accounts get a small number of premium-model requests; free models are unlimited.\n\n\
Environment Variables:\n\
  AIHUB_BASE_URL          Gateway base URL (defaults to https://www.create.xyz)\n\
  AIHUB_PROJECT_ID        Project identifier sent to /integrations/ endpoints\n\
  AIHUB_PROJECT_GROUP_ID  Project group identifier sent to /integrations/ endpoints\n\
  RUST_LOG                Log filter for diagnostics written to stderr\n\n\
Commands:\n\
  /help             List chat commands\n\
  /model <id>       Switch model\n\
  /persona <name>   Switch persona\n\
  /stop             Cancel the reply being streamed"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Persona to chat with, by id or name
    #[arg(short = 'b', long = "bot", global = true, value_name = "PERSONA")]
    pub persona: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send a single prompt and stream the reply to stdout
    Say {
        /// Prompt to send (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List the model catalog
    Models,
    /// List available personas
    Personas,
    /// Show the effective configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(args))
}

fn build_session(args: &Args, config: &Config) -> Result<ChatSession, Box<dyn Error>> {
    let catalog = ModelCatalog::builtin()?;
    let mut session = ChatSession::new(config, catalog)?;

    if let Some(model) = args.model.as_deref() {
        session.select_model(model)?;
    }
    if let Some(persona) = args.persona.as_deref() {
        session.select_persona(persona)?;
    }
    Ok(session)
}

async fn async_main(mut args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(args.config.as_deref())?;
    debug!(
        model = %config.default_model_id(),
        personas = config.personas.len(),
        "configuration loaded"
    );

    let command = args.command.take().unwrap_or(Commands::Chat);
    let session = build_session(&args, &config)?;

    match command {
        Commands::Chat => run_chat(session).await,
        Commands::Say { prompt } => run_say(session, prompt).await,
        Commands::Models => list_models(session.catalog(), &session.selected_model().id),
        Commands::Personas => list_personas(
            session.personas().list_personas(),
            session.active_persona().map(|persona| persona.id),
        ),
        Commands::Config => {
            match args.config.clone().or_else(Config::get_config_path) {
                Some(path) => println!("Config file: {}\n", path_display(&path)),
                None => println!("Config file: (no config directory)\n"),
            }
            config.print_all();
            Ok(())
        }
    }
}
