//! Non-interactive "say" command

use std::error::Error;

use crate::cli::chat::ReplyPrinter;
use crate::core::session::ChatSession;

pub async fn run_say(mut session: ChatSession, prompt: Vec<String>) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: aihub say <prompt>");
        std::process::exit(1);
    }

    let mut printer = ReplyPrinter::default();
    let result = session
        .run_turn(&prompt, |text| {
            let _ = printer.update(text);
        })
        .await;

    match result {
        Ok(()) => {
            // Replies that arrive without deltas are only in the transcript.
            if let Some(reply) = session.transcript().last().filter(|m| m.is_assistant()) {
                printer.update(&reply.content)?;
            }
            printer.finish_line();
            Ok(())
        }
        Err(err) => {
            printer.finish_line();
            eprintln!("❌ {}", err);
            std::process::exit(1);
        }
    }
}
