use super::CommandResult;
use crate::core::session::ChatSession;

pub type CommandHandler = fn(&mut ChatSession, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                .and_then(|(_, target)| all_commands().iter().find(|c| c.name == *target))
        })
}

const ALIASES: &[(&str, &str)] = &[("exit", "quit"), ("bots", "personas")];

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "models",
        usage: "/models",
        help: "List the model catalog.",
        handler: super::handle_models,
    },
    Command {
        name: "model",
        usage: "/model [id]",
        help: "Show or switch the selected model.",
        handler: super::handle_model,
    },
    Command {
        name: "personas",
        usage: "/personas",
        help: "List available personas.",
        handler: super::handle_personas,
    },
    Command {
        name: "persona",
        usage: "/persona [id|name|none]",
        help: "Show, select, or clear the active persona.",
        handler: super::handle_persona,
    },
    Command {
        name: "bot",
        usage: "/bot <name> | <personality> | [instructions]",
        help: "Create a persona for this session.",
        handler: super::handle_bot,
    },
    Command {
        name: "clear",
        usage: "/clear",
        help: "Clear the conversation.",
        handler: super::handle_clear,
    },
    Command {
        name: "usage",
        usage: "/usage",
        help: "Show the access tier and remaining premium uses.",
        handler: super::handle_usage,
    },
    Command {
        name: "upgrade",
        usage: "/upgrade",
        help: "Switch to the premium tier.",
        handler: super::handle_upgrade,
    },
    Command {
        name: "stop",
        usage: "/stop",
        help: "Stop the reply that is streaming in.",
        handler: super::handle_stop,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave the chat.",
        handler: super::handle_quit,
    },
];
