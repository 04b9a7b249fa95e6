//! Command registry and dispatcher
//!
//! Maps verbs onto handlers. The table is built once and shared read-only by
//! every session.

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;

use crate::client::ClientState;
use crate::protocol::handlers;
use crate::protocol::responses;
use crate::protocol::{Command, CommandResult};
use crate::server::ServerContext;

/// A handler for one control verb.
///
/// Handlers mutate session state or register a data connection operation;
/// they never move bytes themselves.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult;

    /// Whether the verb is refused until the session is authorized.
    fn requires_auth(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in verb.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        handlers::register_defaults(&mut registry);
        registry
    }

    /// Adds `handler` under `verb`, replacing an existing entry.
    pub fn register(&mut self, verb: &'static str, handler: impl CommandHandler + 'static) {
        self.handlers.insert(verb, Box::new(handler));
    }

    pub fn contains(&self, verb: &str) -> bool {
        self.handlers.contains_key(verb)
    }

    pub fn verbs(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Runs the handler registered for the command's verb.
    pub async fn dispatch(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        command: &Command,
    ) -> CommandResult {
        let Some(handler) = self.handlers.get(command.verb()) else {
            debug!("No handler for verb {:?}", command.verb());
            return CommandResult::new(responses::NOT_IMPLEMENTED, "Command not implemented.");
        };

        if handler.requires_auth() && ctx.use_authorization() && !state.is_authorized() {
            return CommandResult::new(responses::NOT_LOGGED_IN, "Not logged in.");
        }

        handler.invoke(state, ctx, command.argument()).await
    }
}
