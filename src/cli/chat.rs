//! Interactive line-based session.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::client::ChatClient;
use crate::cli::{terminal_width, RunSettings};
use crate::ui::transcript::Transcript;

const PROMPT: &str = "> ";

const HELP: &str = "\
Type a message and press Enter to send it.
  /press <n>          Run the action of button [n]
  /set <n> <value>    Edit text field [n]
  /fields             List text fields and their values
  /store              Show the data store
  /log <file>         Log the transcript to <file>
  /log                Pause or resume logging
  /help               Show this help
  /quit               Exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Prompt(String),
    Press(usize),
    SetField { index: usize, value: String },
    Fields,
    Store,
    Log(Option<String>),
    Help,
    Quit,
    /// A slash command that could not be understood; carries the reason.
    Invalid(String),
}

pub fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Prompt(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));
    match name {
        "press" | "p" => match rest.parse() {
            Ok(index) => ChatInput::Press(index),
            Err(_) => ChatInput::Invalid("Usage: /press <n>".into()),
        },
        "set" => {
            let (index, value) = rest
                .split_once(char::is_whitespace)
                .map(|(index, value)| (index, value.trim()))
                .unwrap_or((rest, ""));
            match index.parse() {
                Ok(index) => ChatInput::SetField {
                    index,
                    value: value.to_string(),
                },
                Err(_) => ChatInput::Invalid("Usage: /set <n> <value>".into()),
            }
        }
        "fields" => ChatInput::Fields,
        "store" => ChatInput::Store,
        "log" if rest.is_empty() => ChatInput::Log(None),
        "log" => ChatInput::Log(Some(rest.to_string())),
        "help" | "?" => ChatInput::Help,
        "quit" | "exit" | "q" => ChatInput::Quit,
        other => ChatInput::Invalid(format!("Unknown command: /{other}. Type /help for commands.")),
    }
}

pub async fn run_chat(settings: RunSettings) -> Result<(), Box<dyn Error>> {
    let mut transcript = Transcript::new(io::stdout(), settings.transcript.clone());
    if let Some(path) = &settings.log {
        let message = transcript.set_log_file(path)?;
        transcript.system(&message);
    }
    transcript.system(&format!(
        "Server: {}. Type /help for commands, /quit to exit.",
        settings.connection.base_url
    ));

    let mut client = ChatClient::new(&settings, transcript);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        client.transcript_mut().set_width(terminal_width());
        if handle_input(&mut client, parse_input(&line)).await == LoopControl::Quit {
            break;
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Quit,
}

async fn handle_input<W: Write>(client: &mut ChatClient<W>, input: ChatInput) -> LoopControl {
    match input {
        ChatInput::Empty => {}
        ChatInput::Prompt(text) => client.prompt(&text).await,
        ChatInput::Press(index) => {
            if let Err(message) = client.press(index).await {
                client.transcript_mut().system(&message);
            }
        }
        ChatInput::SetField { index, value } => {
            let message = client
                .set_field(index, &value)
                .unwrap_or_else(|message| message);
            client.transcript_mut().system(&message);
        }
        ChatInput::Fields => {
            let summary = client.field_summary();
            client.transcript_mut().system(&summary);
        }
        ChatInput::Store => {
            let summary = client.store_summary();
            client.transcript_mut().system(&summary);
        }
        ChatInput::Log(Some(path)) => {
            let transcript = client.transcript_mut();
            let message = match transcript.set_log_file(&path) {
                Ok(message) => message,
                Err(err) => format!("Error setting log file: {err}"),
            };
            transcript.system(&message);
        }
        ChatInput::Log(None) => {
            let transcript = client.transcript_mut();
            let message = transcript.toggle_log().unwrap_or_else(|message| message);
            transcript.system(&message);
        }
        ChatInput::Help => client.transcript_mut().system(HELP),
        ChatInput::Invalid(message) => client.transcript_mut().system(&message),
        ChatInput::Quit => return LoopControl::Quit,
    }
    LoopControl::Continue
}
