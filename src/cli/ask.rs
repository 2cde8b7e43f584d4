//! TUI-less "ask" command

use std::error::Error;
use std::io;

use crate::cli::client::ChatClient;
use crate::cli::RunSettings;
use crate::ui::transcript::Transcript;

pub async fn run_ask(prompt: Vec<String>, settings: RunSettings) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: a2ui-term ask <prompt>");
        std::process::exit(1);
    }

    let mut transcript = Transcript::new(io::stdout(), settings.transcript.clone());
    if let Some(path) = &settings.log {
        transcript.set_log_file(path)?;
    }

    let mut client = ChatClient::new(&settings, transcript);
    client.prompt(prompt.trim()).await;
    Ok(())
}
