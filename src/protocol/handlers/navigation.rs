//! Working directory handlers.

use async_trait::async_trait;
use log::info;

use crate::client::ClientState;
use crate::navigate::{change_directory, paths};
use crate::protocol::registry::CommandHandler;
use crate::protocol::responses;
use crate::protocol::CommandResult;
use crate::server::ServerContext;

pub struct Pwd;

#[async_trait]
impl CommandHandler for Pwd {
    async fn invoke(
        &self,
        state: &mut ClientState,
        _ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        CommandResult::new(
            responses::PATH_CREATED,
            format!("\"{}\" is the current directory.", state.current_directory()),
        )
    }
}

pub struct Cwd;

#[async_trait]
impl CommandHandler for Cwd {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let target = argument.unwrap_or("");
        match change_directory(
            ctx.storage.as_ref(),
            state.session(),
            state.current_directory(),
            target,
        )
        .await
        {
            Ok(path) => {
                info!("[{}] CWD -> {}", state.remote_addr(), path);
                state.set_current_directory(path);
                CommandResult::new(
                    responses::FILE_ACTION_OK,
                    "Requested file action okay, completed.",
                )
            }
            Err(_) => CommandResult::new(responses::FILE_UNAVAILABLE, "Directory not found."),
        }
    }
}

pub struct Cdup;

#[async_trait]
impl CommandHandler for Cdup {
    async fn invoke(
        &self,
        state: &mut ClientState,
        _ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        let parent = paths::normalize(paths::parent(state.current_directory()));
        state.set_current_directory(parent);
        CommandResult::new(
            responses::FILE_ACTION_OK,
            "Requested file action okay, completed.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::handlers::test_support::{context, state};

    #[tokio::test]
    async fn cwd_prefers_relative_then_absolute() {
        let (dir, ctx) = context();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        let mut state = state();

        assert_eq!(Cwd.invoke(&mut state, &ctx, Some("a")).await.code, 250);
        assert_eq!(state.current_directory(), "/a");
        assert_eq!(Cwd.invoke(&mut state, &ctx, Some("b")).await.code, 250);
        assert_eq!(state.current_directory(), "/a/b");
        assert_eq!(Cwd.invoke(&mut state, &ctx, Some("/b")).await.code, 250);
        assert_eq!(state.current_directory(), "/b");
    }

    #[tokio::test]
    async fn cwd_failures_leave_directory_unchanged() {
        let (_dir, ctx) = context();
        let mut state = state();
        let missing = Cwd.invoke(&mut state, &ctx, Some("missing")).await;
        assert_eq!(missing, CommandResult::new(550, "Directory not found."));
        assert_eq!(Cwd.invoke(&mut state, &ctx, None).await.code, 550);
        assert_eq!(Cwd.invoke(&mut state, &ctx, Some("   ")).await.code, 550);
        assert_eq!(state.current_directory(), "/");
    }

    #[tokio::test]
    async fn pwd_and_cdup() {
        let (dir, ctx) = context();
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        let mut state = state();
        Cwd.invoke(&mut state, &ctx, Some("x/y")).await;

        let pwd = Pwd.invoke(&mut state, &ctx, None).await;
        assert_eq!(pwd.to_line(), "257 \"/x/y\" is the current directory.\r\n");

        Cdup.invoke(&mut state, &ctx, None).await;
        assert_eq!(state.current_directory(), "/x");
        Cdup.invoke(&mut state, &ctx, None).await;
        Cdup.invoke(&mut state, &ctx, None).await;
        assert_eq!(state.current_directory(), "/");
    }
}
