//! Interactive line-oriented chat loop

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::{process_input, CommandResult};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::session::{ChatSession, TurnState};

/// Writes a cumulative reply to stdout, printing only the part not yet shown.
#[derive(Debug, Default)]
pub struct ReplyPrinter {
    printed: usize,
    mid_line: bool,
}

impl ReplyPrinter {
    pub fn reset(&mut self) {
        self.printed = 0;
        self.mid_line = false;
    }

    /// The unseen tail of `text`, advancing the printed position
    pub fn next_chunk<'a>(&mut self, text: &'a str) -> &'a str {
        if self.printed > text.len() || !text.is_char_boundary(self.printed) {
            // The text was replaced rather than extended; start over.
            self.printed = 0;
        }
        let chunk = &text[self.printed..];
        self.printed = text.len();
        if !chunk.is_empty() {
            self.mid_line = true;
        }
        chunk
    }

    pub fn update(&mut self, text: &str) -> io::Result<()> {
        let chunk = self.next_chunk(text);
        let mut stdout = io::stdout();
        stdout.write_all(chunk.as_bytes())?;
        stdout.flush()
    }

    /// End the current output line if a reply left it open
    pub fn finish_line(&mut self) {
        if self.mid_line {
            println!();
        }
        self.reset();
    }
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(b"> ")?;
    stdout.flush()
}

fn print_banner(session: &ChatSession) {
    let model = session.selected_model();
    println!("AI Hub: {} ({})", model.display_name, model.provider);
    if let Some(persona) = session.active_persona() {
        println!("Persona: {}", persona.name);
    }
    println!("{}", session.usage().status_line());
    println!("Type /help for commands, /quit to leave.\n");
}

pub async fn run_chat(mut session: ChatSession) -> Result<(), Box<dyn Error>> {
    print_banner(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (service, mut rx) = ChatStreamService::new();
    let mut printer = ReplyPrinter::default();

    prompt()?;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match process_input(&mut session, &line) {
                    CommandResult::Quit => break,
                    CommandResult::Notice(text) => {
                        printer.finish_line();
                        println!("{text}");
                    }
                    CommandResult::ProcessAsMessage(text) => {
                        if session.is_busy() {
                            println!("(still answering; type /stop to cancel)");
                            continue;
                        }
                        match session.send_message(&text) {
                            Ok(Some(params)) => {
                                printer.reset();
                                service.spawn_stream(params);
                            }
                            Ok(None) => {}
                            Err(err) => eprintln!("❌ {}", err.user_message()),
                        }
                    }
                }

                if !session.is_busy() {
                    prompt()?;
                }
            }
            Some((message, stream_id)) = rx.recv() => {
                let is_partial = matches!(message, StreamMessage::Partial(_));
                if !session.apply_stream_message(message, stream_id) {
                    continue;
                }

                if is_partial {
                    printer.update(session.streaming_text())?;
                    continue;
                }

                match session.state() {
                    TurnState::Idle => {
                        if let Some(reply) = session.transcript().last() {
                            printer.update(&reply.content)?;
                        }
                        printer.finish_line();
                        prompt()?;
                    }
                    TurnState::Errored => {
                        printer.finish_line();
                        if let Some(err) = session.error() {
                            debug!("turn failed: {err}");
                            eprintln!("❌ {}", err.user_message());
                        }
                        prompt()?;
                    }
                    TurnState::AwaitingResponse | TurnState::Streaming => {}
                }
            }
        }
    }

    session.cancel_turn();
    printer.finish_line();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printer_emits_only_new_text() {
        let mut printer = ReplyPrinter::default();
        assert_eq!(printer.next_chunk("He"), "He");
        assert_eq!(printer.next_chunk("Hello"), "llo");
        assert_eq!(printer.next_chunk("Hello"), "");
        assert_eq!(printer.next_chunk("Hello, wörld"), ", wörld");
    }

    #[test]
    fn printer_restarts_when_text_shrinks() {
        let mut printer = ReplyPrinter::default();
        printer.next_chunk("a long reply");
        assert_eq!(printer.next_chunk("new"), "new");

        printer.reset();
        assert_eq!(printer.next_chunk("fresh"), "fresh");
    }
}
