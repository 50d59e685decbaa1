mod registry;

pub use registry::{all_commands, find_command, CommandInvocation};

use crate::cli::model_list::render_model_list;
use crate::cli::persona_list::render_persona_list;
use crate::core::session::ChatSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Handled; show this text to the user.
    Notice(String),
    /// Not a command; send it as a chat message.
    ProcessAsMessage(String),
    Quit,
}

pub fn process_input(session: &mut ChatSession, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, ' ');
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match find_command(command_name) {
        Some(command) => {
            (command.handler)(session, CommandInvocation { args })
        }
        None => CommandResult::Notice(format!(
            "Unknown command: /{command_name}. Type /help for a list of commands."
        )),
    }
}

pub(super) fn handle_help(
    _session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);
    let lines: Vec<String> = all_commands()
        .iter()
        .map(|command| format!("  {:width$}  {}", command.usage, command.help))
        .collect();
    CommandResult::Notice(format!("Commands:\n{}", lines.join("\n")))
}

pub(super) fn handle_models(
    session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    CommandResult::Notice(render_model_list(
        session.catalog(),
        Some(&session.selected_model().id),
    ))
}

pub(super) fn handle_model(
    session: &mut ChatSession,
    invocation: CommandInvocation<'_>,
) -> CommandResult {
    if invocation.args.is_empty() {
        let model = session.selected_model();
        return CommandResult::Notice(format!(
            "Current model: {} ({}, {})",
            model.display_name,
            model.provider,
            model.tier.as_str()
        ));
    }

    match session.select_model(invocation.args) {
        Ok(model) => {
            let mut notice = format!("Switched to {}", model.display_name);
            if model.is_premium() {
                notice.push_str(" (premium)");
            }
            CommandResult::Notice(notice)
        }
        Err(err) => CommandResult::Notice(err.to_string()),
    }
}

pub(super) fn handle_personas(
    session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    let active = session.active_persona().map(|p| p.id);
    CommandResult::Notice(render_persona_list(
        session.personas().list_personas(),
        active,
    ))
}

pub(super) fn handle_persona(
    session: &mut ChatSession,
    invocation: CommandInvocation<'_>,
) -> CommandResult {
    match invocation.args {
        "" => match session.active_persona() {
            Some(persona) => CommandResult::Notice(format!("Active persona: {}", persona.name)),
            None => CommandResult::Notice("No persona active".to_string()),
        },
        "none" | "off" => {
            session.clear_persona();
            CommandResult::Notice("Persona cleared".to_string())
        }
        key => match session.select_persona(key) {
            Ok(persona) => CommandResult::Notice(format!("Persona set to {}", persona.name)),
            Err(err) => CommandResult::Notice(err),
        },
    }
}

pub(super) fn handle_bot(
    session: &mut ChatSession,
    invocation: CommandInvocation<'_>,
) -> CommandResult {
    let mut fields = invocation.args.splitn(3, '|').map(str::trim);
    let name = fields.next().unwrap_or_default();
    let personality = fields.next().unwrap_or_default();
    let instructions = fields.next().unwrap_or_default();

    match session.create_persona(name, personality, instructions) {
        Some(id) => CommandResult::Notice(format!(
            "Created persona {name} ({id}). Use /persona {id} to activate it."
        )),
        None => CommandResult::Notice(
            "Usage: /bot <name> | <personality> | [instructions] (name and personality are required)"
                .to_string(),
        ),
    }
}

pub(super) fn handle_clear(
    session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    session.clear_conversation();
    CommandResult::Notice("Conversation cleared".to_string())
}

pub(super) fn handle_usage(
    session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    CommandResult::Notice(session.usage().status_line())
}

pub(super) fn handle_upgrade(
    session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    session.upgrade();
    CommandResult::Notice("Upgraded to Premium".to_string())
}

pub(super) fn handle_stop(
    session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    if session.cancel_turn() {
        CommandResult::Notice("Stopped".to_string())
    } else {
        CommandResult::Notice("Nothing to stop".to_string())
    }
}

pub(super) fn handle_quit(
    _session: &mut ChatSession,
    _invocation: CommandInvocation<'_>,
) -> CommandResult {
    CommandResult::Quit
}
