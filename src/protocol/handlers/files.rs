//! File and directory management handlers.

use async_trait::async_trait;
use log::{info, warn};

use crate::client::ClientState;
use crate::error::storage_error_code;
use crate::navigate::{resolve_directory, resolve_file, resolve_upload_target};
use crate::protocol::registry::CommandHandler;
use crate::protocol::responses;
use crate::protocol::CommandResult;
use crate::server::ServerContext;

fn completed() -> CommandResult {
    CommandResult::new(
        responses::FILE_ACTION_OK,
        "Requested file action okay, completed.",
    )
}

fn not_found() -> CommandResult {
    CommandResult::new(responses::FILE_UNAVAILABLE, "File not found.")
}

pub struct Dele;

#[async_trait]
impl CommandHandler for Dele {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let storage = ctx.storage.as_ref();
        let Ok(path) =
            resolve_file(storage, state.session(), state.current_directory(), argument.unwrap_or("")).await
        else {
            return not_found();
        };
        match storage.delete_file(state.session(), &path).await {
            Ok(()) => {
                info!("[{}] Deleted {}", state.remote_addr(), path);
                completed()
            }
            Err(e) => {
                warn!("[{}] DELE {} failed: {}", state.remote_addr(), path, e);
                CommandResult::new(storage_error_code(&e), "Requested action not taken.")
            }
        }
    }
}

pub struct Mkd;

#[async_trait]
impl CommandHandler for Mkd {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let storage = ctx.storage.as_ref();
        let arg = argument.unwrap_or("");
        let Ok(path) =
            resolve_upload_target(storage, state.session(), state.current_directory(), arg).await
        else {
            return CommandResult::new(responses::FILE_UNAVAILABLE, "Directory not found.");
        };
        match storage.create_directory(state.session(), &path).await {
            Ok(()) => CommandResult::new(responses::PATH_CREATED, format!("\"{}\" created.", path)),
            Err(e) => {
                warn!("[{}] MKD {} failed: {}", state.remote_addr(), path, e);
                CommandResult::new(storage_error_code(&e), "Requested action not taken.")
            }
        }
    }
}

pub struct Rmd;

#[async_trait]
impl CommandHandler for Rmd {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let storage = ctx.storage.as_ref();
        let arg = argument.unwrap_or("");
        let Ok(path) =
            resolve_directory(storage, state.session(), state.current_directory(), arg).await
        else {
            return CommandResult::new(responses::FILE_UNAVAILABLE, "Directory not found.");
        };
        match storage.remove_directory(state.session(), &path).await {
            Ok(()) => completed(),
            Err(e) => {
                warn!("[{}] RMD {} failed: {}", state.remote_addr(), path, e);
                CommandResult::new(storage_error_code(&e), "Requested action not taken.")
            }
        }
    }
}

pub struct Rnfr;

#[async_trait]
impl CommandHandler for Rnfr {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let storage = ctx.storage.as_ref();
        let arg = argument.unwrap_or("");
        let cwd = state.current_directory();
        let source = match resolve_file(storage, state.session(), cwd, arg).await {
            Ok(path) => path,
            Err(_) => match resolve_directory(storage, state.session(), cwd, arg).await {
                Ok(path) => path,
                Err(_) => {
                    state.set_rename_from(None);
                    return not_found();
                }
            },
        };
        state.set_rename_from(Some(source));
        CommandResult::new(
            responses::PENDING_FURTHER_INFO,
            "Requested file action pending further information.",
        )
    }
}

pub struct Rnto;

#[async_trait]
impl CommandHandler for Rnto {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let Some(source) = state.take_rename_from() else {
            return CommandResult::new(responses::BAD_SEQUENCE, "RNFR required first.");
        };
        let storage = ctx.storage.as_ref();
        let arg = argument.unwrap_or("");
        let Ok(target) =
            resolve_upload_target(storage, state.session(), state.current_directory(), arg).await
        else {
            return CommandResult::new(responses::FILE_UNAVAILABLE, "Directory not found.");
        };
        match storage.rename(state.session(), &source, &target).await {
            Ok(()) => {
                info!("[{}] Renamed {} -> {}", state.remote_addr(), source, target);
                completed()
            }
            Err(e) => {
                warn!("[{}] RNTO {} failed: {}", state.remote_addr(), target, e);
                CommandResult::new(storage_error_code(&e), "Requested action not taken.")
            }
        }
    }
}

pub struct Size;

#[async_trait]
impl CommandHandler for Size {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let storage = ctx.storage.as_ref();
        let arg = argument.unwrap_or("");
        let Ok(path) = resolve_file(storage, state.session(), state.current_directory(), arg).await
        else {
            return not_found();
        };
        match storage.file_size(state.session(), &path).await {
            Ok(size) => CommandResult::new(responses::FILE_STATUS, size.to_string()),
            Err(e) => CommandResult::new(storage_error_code(&e), "Could not get file size."),
        }
    }
}
