//! AI Hub is a terminal chat client for a catalog of LLMs from several
//! providers, reached through one HTTP gateway.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the model catalog, personas, the free/premium usage
//!   meter, streaming response decoding, and the chat session state machine.
//! - [`commands`] implements slash-command parsing and execution used by the
//!   interactive chat loop.
//! - [`api`] defines the chat request payloads sent to model endpoints.
//! - [`utils`] holds gateway routing and tracing setup.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which loads configuration, builds a
//! [`core::session::ChatSession`], and dispatches the selected subcommand.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;
