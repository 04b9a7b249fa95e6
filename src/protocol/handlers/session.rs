//! Session handlers: login, logout and server information.

use async_trait::async_trait;
use log::{info, warn};

use crate::auth::{validate_password, validate_user};
use crate::client::ClientState;
use crate::protocol::registry::CommandHandler;
use crate::protocol::responses;
use crate::protocol::CommandResult;
use crate::server::ServerContext;

pub struct User;

#[async_trait]
impl CommandHandler for User {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let Some(username) = argument else {
            return CommandResult::new(responses::SYNTAX_ERROR_ARGS, "Username required.");
        };

        if !ctx.use_authorization() {
            state.authorize(Some(username.to_string()));
            return CommandResult::new(responses::LOGIN_SUCCESS, "User logged in, proceed.");
        }

        match validate_user(ctx.authorization.as_ref(), username) {
            Ok(()) => {
                state.set_pending_username(Some(username.to_string()));
                CommandResult::new(responses::PASSWORD_REQUIRED, "User name okay, need password.")
            }
            Err(e) => {
                warn!("[{}] USER rejected: {}", state.remote_addr(), e);
                state.set_pending_username(None);
                CommandResult::new(responses::NOT_LOGGED_IN, "Not logged in.")
            }
        }
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

pub struct Pass;

#[async_trait]
impl CommandHandler for Pass {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        if !ctx.use_authorization() {
            return CommandResult::new(responses::LOGIN_SUCCESS, "User logged in, proceed.");
        }

        let Some(username) = state.pending_username().map(str::to_string) else {
            return CommandResult::new(responses::BAD_SEQUENCE, "Login with USER first.");
        };

        match validate_password(ctx.authorization.as_ref(), &username, argument.unwrap_or("")) {
            Ok(()) => {
                info!("[{}] User {} logged in", state.remote_addr(), username);
                state.authorize(Some(username));
                CommandResult::new(responses::LOGIN_SUCCESS, "User logged in, proceed.")
            }
            Err(e) => {
                warn!("[{}] PASS rejected: {}", state.remote_addr(), e);
                state.set_pending_username(None);
                CommandResult::new(responses::NOT_LOGGED_IN, "Not logged in.")
            }
        }
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

pub struct Quit;

#[async_trait]
impl CommandHandler for Quit {
    async fn invoke(
        &self,
        _state: &mut ClientState,
        _ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        CommandResult::new(responses::CLOSING, "Service closing control connection.")
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

pub struct Noop;

#[async_trait]
impl CommandHandler for Noop {
    async fn invoke(
        &self,
        _state: &mut ClientState,
        _ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        CommandResult::new(responses::OK, "Command okay.")
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

pub struct Syst;

#[async_trait]
impl CommandHandler for Syst {
    async fn invoke(
        &self,
        _state: &mut ClientState,
        _ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        CommandResult::new(responses::SYSTEM_TYPE, "UNIX Type: L8")
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

const FEATURES: [&str; 6] = ["AUTH TLS", "PASV", "EPSV", "REST STREAM", "SIZE", "UTF8"];

pub struct Feat;

#[async_trait]
impl CommandHandler for Feat {
    async fn invoke(
        &self,
        _state: &mut ClientState,
        _ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        CommandResult::multiline(
            responses::SYSTEM_STATUS,
            "Features:",
            FEATURES.iter().map(|f| f.to_string()),
            "End",
        )
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::handlers::test_support::{authorized_context, context, state};

    #[tokio::test]
    async fn user_and_pass_log_in() {
        let (_dir, ctx) = authorized_context();
        let mut state = state();

        assert_eq!(User.invoke(&mut state, &ctx, Some("alice")).await.code, 331);
        assert!(!state.is_authorized());
        assert_eq!(Pass.invoke(&mut state, &ctx, Some("alice123")).await.code, 230);
        assert!(state.is_authorized());
        assert_eq!(state.username(), Some("alice"));
    }

    #[tokio::test]
    async fn wrong_password_and_bad_sequence() {
        let (_dir, ctx) = authorized_context();
        let mut state = state();

        assert_eq!(Pass.invoke(&mut state, &ctx, Some("x")).await.code, 503);
        User.invoke(&mut state, &ctx, Some("alice")).await;
        assert_eq!(Pass.invoke(&mut state, &ctx, Some("wrong")).await.code, 530);
        assert!(!state.is_authorized());
        assert_eq!(User.invoke(&mut state, &ctx, Some("mallory")).await.code, 530);
    }

    #[tokio::test]
    async fn user_logs_in_directly_without_authorization() {
        let (_dir, ctx) = context();
        let mut state = state();
        assert_eq!(User.invoke(&mut state, &ctx, Some("bob")).await.code, 230);
        assert!(state.is_authorized());
    }

    #[tokio::test]
    async fn quit_always_closes() {
        let (_dir, ctx) = context();
        let result = Quit.invoke(&mut state(), &ctx, Some("whatever")).await;
        assert!(result.is_closing());
    }

    #[tokio::test]
    async fn feat_lists_extensions() {
        let (_dir, ctx) = context();
        let line = Feat.invoke(&mut state(), &ctx, None).await.to_line();
        assert!(line.starts_with("211-Features:\r\n"));
        assert!(line.contains(" AUTH TLS\r\n"));
        assert!(line.ends_with("211 End\r\n"));
    }
}
