//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod ask;
pub mod chat;
pub mod client;
pub mod settings;

use std::error::Error;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ratatui::crossterm::terminal;

use crate::cli::settings::{SetContext, SettingError, SettingRegistry};
use crate::core::chat_stream::ServerConnection;
use crate::core::config::data::{path_display, Config};
use crate::core::config::ConfigOrchestrator;
use crate::ui::theme::Theme;
use crate::ui::transcript::{TranscriptOptions, DEFAULT_WIDTH};
use crate::utils::telemetry;
use crate::utils::url::validate_server_url;

#[derive(Parser)]
#[command(name = "a2ui-term")]
#[command(about = "A terminal client for A2UI chat servers")]
#[command(
    long_about = "a2ui-term talks to a chat server that answers with streamed text and \
server-driven widget surfaces (cards, forms, buttons, charts) and draws both in the \
terminal.\n\n\
Configuration:\n\
  Settings live in config.toml under the platform config directory. Use \
'a2ui-term set' to list them and 'a2ui-term set <key> <value>' to change one.\n\
  RUST_LOG overrides the log-filter setting for diagnostics on stderr.\n\n\
Commands inside a chat session:\n\
  /press <n>        Run the action of button [n]\n\
  /set <n> <value>  Edit text field [n]\n\
  /fields           List text fields and their values\n\
  /store            Show the data store\n\
  /log <filename>   Enable logging to specified file\n\
  /log              Toggle logging pause/resume\n\
  /quit             Exit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server base URL (overrides server-url from the config file)
    #[arg(short = 's', long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Ask the server for text-only replies
    #[arg(long, global = true)]
    pub no_widgets: bool,

    /// Wait for whole replies instead of streaming them
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Show narrative text literally instead of rendering markdown
    #[arg(long, global = true)]
    pub plain: bool,

    /// Enable logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,

    /// Theme to use (dark, light, monochrome)
    #[arg(short = 't', long, global = true)]
    pub theme: Option<String>,

    /// Read and write settings in this file instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive session (default)
    Chat,
    /// Send one prompt, print the reply and exit
    Ask {
        /// The prompt; several words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Set configuration values, or list them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

/// Config file values with command-line flags applied.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub connection: ServerConnection,
    pub stream: bool,
    pub transcript: TranscriptOptions,
    pub log: Option<String>,
}

impl RunSettings {
    pub fn resolve(args: &Args, config: &Config) -> Result<Self, Box<dyn Error>> {
        let base_url = validate_server_url(args.server.as_deref().unwrap_or(config.server_url()))?;
        let theme_name = args.theme.as_deref().unwrap_or(config.theme());
        let theme = Theme::from_name(theme_name).ok_or_else(|| {
            format!("Unknown theme: {theme_name}. Available themes: dark, light, monochrome")
        })?;

        let mut connection = ServerConnection::new(base_url);
        connection.accept_widgets = config.accept_widgets() && !args.no_widgets;
        connection.action_text = config.action_text.clone();

        Ok(Self {
            connection,
            stream: config.stream() && !args.no_stream,
            transcript: TranscriptOptions {
                theme,
                markdown: config.markdown() && !args.plain,
                width: terminal_width(),
                styled: io::stdout().is_terminal(),
            },
            log: args.log.clone(),
        })
    }
}

/// Current terminal columns, or [`DEFAULT_WIDTH`] when stdout is not a terminal.
pub(crate) fn terminal_width() -> usize {
    terminal::size()
        .ok()
        .map(|(width, _)| width as usize)
        .filter(|width| *width > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

fn config_path(args: &Args) -> Result<PathBuf, Box<dyn Error>> {
    match args.config.clone().or_else(Config::default_config_path) {
        Some(path) => Ok(path),
        None => Err("Could not determine a config directory; pass --config <FILE>".into()),
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let orchestrator = ConfigOrchestrator::new(config_path(&args)?);
    let config = orchestrator.load()?;
    telemetry::init(config.log_filter.as_deref());

    match &args.command {
        None | Some(Commands::Chat) => chat::run_chat(RunSettings::resolve(&args, &config)?).await,
        Some(Commands::Ask { prompt }) => {
            ask::run_ask(prompt.clone(), RunSettings::resolve(&args, &config)?).await
        }
        Some(Commands::Set { key, value }) => {
            let registry = SettingRegistry::new();
            let Some(key) = key else {
                print_settings(&registry, &config, &orchestrator);
                return Ok(());
            };
            let ctx = SetContext {
                config: &config,
                orchestrator: &orchestrator,
            };
            report(
                registry
                    .get(key)
                    .ok_or_else(|| SettingError::UnknownKey(key.clone()))
                    .and_then(|handler| handler.set(value, &ctx)),
            );
            Ok(())
        }
        Some(Commands::Unset { key }) => {
            let registry = SettingRegistry::new();
            let ctx = SetContext {
                config: &config,
                orchestrator: &orchestrator,
            };
            report(
                registry
                    .get(key)
                    .ok_or_else(|| SettingError::UnknownKey(key.clone()))
                    .and_then(|handler| handler.unset(&ctx)),
            );
            Ok(())
        }
    }
}

fn print_settings(registry: &SettingRegistry, config: &Config, orchestrator: &ConfigOrchestrator) {
    println!("Configuration ({}):", path_display(orchestrator.path()));
    for line in settings_lines(registry, config) {
        println!("{line}");
    }
}

fn settings_lines(registry: &SettingRegistry, config: &Config) -> Vec<String> {
    registry
        .keys_display_order()
        .iter()
        .filter_map(|key| registry.get(key))
        .map(|handler| handler.format(config))
        .collect()
}

fn report(result: Result<String, SettingError>) {
    match result {
        Ok(message) => println!("{message}"),
        Err(err) => {
            err.print();
            std::process::exit(err.exit_code());
        }
    }
}
