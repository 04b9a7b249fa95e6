//! Transfer parameter and data connection handlers.
//!
//! RETR, STOR, APPE, LIST and NLST only schedule a `DataConnectionOperation`
//! and answer 150; the session opens the data channel and runs it.

use std::net::IpAddr;

use async_trait::async_trait;
use log::{info, warn};

use crate::client::ClientState;
use crate::navigate::{resolve_directory, resolve_file, resolve_upload_target};
use crate::protocol::registry::CommandHandler;
use crate::protocol::responses;
use crate::protocol::CommandResult;
use crate::server::ServerContext;
use crate::transfer::{
    DataConnectionOperation, FileStructure, TransferKind, TransferType, bind_passive,
    format_pasv_address, parse_port_argument,
};

/// The 150 reply announcing a scheduled data transfer.
pub(crate) fn opening(state: &ClientState, kind: TransferKind) -> CommandResult {
    CommandResult::new(
        responses::OPENING_DATA_CONNECTION,
        format!(
            "Opening {} mode data connection for {}.",
            state.connection_mode(),
            kind.verb()
        ),
    )
}

fn schedule(state: &mut ClientState, kind: TransferKind, path: String) -> CommandResult {
    let operation = DataConnectionOperation::new(kind, path);
    info!("[{}] Scheduled {}", state.remote_addr(), operation);
    state.set_pending_operation(operation);
    opening(state, kind)
}

pub struct Type;

#[async_trait]
impl CommandHandler for Type {
    async fn invoke(
        &self,
        state: &mut ClientState,
        _ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let arg = argument.unwrap_or("").to_ascii_uppercase();
        let mut parts = arg.split_whitespace();
        let transfer_type = match (parts.next(), parts.next()) {
            (Some("A"), None | Some("N")) => TransferType::Ascii,
            (Some("I"), None) | (Some("L"), Some("8")) => TransferType::Binary,
            _ => {
                return CommandResult::new(
                    responses::PARAMETER_NOT_IMPLEMENTED,
                    "Command not implemented for that parameter.",
                );
            }
        };
        state.set_transfer_type(transfer_type);
        CommandResult::new(responses::OK, format!("Type set to {}.", transfer_type))
    }
}

pub struct Stru;

#[async_trait]
impl CommandHandler for Stru {
    async fn invoke(
        &self,
        state: &mut ClientState,
        _ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        match argument.map(str::to_ascii_uppercase).as_deref() {
            Some("F") => {
                state.set_file_structure(FileStructure::File);
                CommandResult::new(responses::OK, "Structure set to File.")
            }
            Some("R") | Some("P") => CommandResult::new(
                responses::PARAMETER_NOT_IMPLEMENTED,
                "Only File structure is supported.",
            ),
            _ => CommandResult::new(responses::SYNTAX_ERROR_ARGS, "Unknown structure."),
        }
    }
}

pub struct Mode;

#[async_trait]
impl CommandHandler for Mode {
    async fn invoke(
        &self,
        _state: &mut ClientState,
        _ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        match argument.map(str::to_ascii_uppercase).as_deref() {
            Some("S") => CommandResult::new(responses::OK, "Mode set to Stream."),
            _ => CommandResult::new(
                responses::PARAMETER_NOT_IMPLEMENTED,
                "Only Stream mode is supported.",
            ),
        }
    }
}

pub struct Port;

#[async_trait]
impl CommandHandler for Port {
    async fn invoke(
        &self,
        state: &mut ClientState,
        _ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        match parse_port_argument(argument.unwrap_or("")) {
            Ok(endpoint) => {
                info!("[{}] Active mode, data endpoint {}", state.remote_addr(), endpoint);
                state.set_active(endpoint);
                CommandResult::new(responses::OK, "PORT command successful.")
            }
            Err(e) => {
                warn!("[{}] {}", state.remote_addr(), e);
                CommandResult::new(responses::SYNTAX_ERROR_ARGS, "Invalid PORT command.")
            }
        }
    }
}

async fn open_passive(state: &mut ClientState, ctx: &ServerContext) -> Result<u16, CommandResult> {
    let settings = &ctx.settings;
    let listener = bind_passive(settings.passive_ip, settings.passive_ports)
        .await
        .map_err(|e| {
            warn!("[{}] {}", state.remote_addr(), e);
            CommandResult::new(responses::CANT_OPEN_DATA_CONNECTION, "Can't open data connection.")
        })?;
    let port = listener
        .local_addr()
        .map_err(|_| {
            CommandResult::new(responses::CANT_OPEN_DATA_CONNECTION, "Can't open data connection.")
        })?
        .port();
    info!("[{}] Passive listener on port {}", state.remote_addr(), port);
    state.set_passive(listener);
    Ok(port)
}

pub struct Pasv;

#[async_trait]
impl CommandHandler for Pasv {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        let IpAddr::V4(ip) = ctx.settings.passive_ip else {
            return CommandResult::new(
                responses::CANT_OPEN_DATA_CONNECTION,
                "PASV needs an IPv4 address, use EPSV.",
            );
        };
        match open_passive(state, ctx).await {
            Ok(port) => CommandResult::new(
                responses::ENTERING_PASSIVE,
                format!("Entering Passive Mode ({}).", format_pasv_address(ip, port)),
            ),
            Err(result) => result,
        }
    }
}

pub struct Epsv;

#[async_trait]
impl CommandHandler for Epsv {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        _argument: Option<&str>,
    ) -> CommandResult {
        match open_passive(state, ctx).await {
            Ok(port) => CommandResult::new(
                responses::ENTERING_EXTENDED_PASSIVE,
                format!("Entering Extended Passive Mode (|||{}|).", port),
            ),
            Err(result) => result,
        }
    }
}

pub struct Rest;

#[async_trait]
impl CommandHandler for Rest {
    async fn invoke(
        &self,
        state: &mut ClientState,
        _ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        match argument.and_then(|a| a.parse::<u64>().ok()) {
            Some(offset) => {
                state.set_rest_offset(offset);
                CommandResult::new(
                    responses::PENDING_FURTHER_INFO,
                    format!("Restarting at {}. Send STOR or RETR.", offset),
                )
            }
            None => CommandResult::new(responses::SYNTAX_ERROR_ARGS, "Invalid restart offset."),
        }
    }
}

pub struct Retr;

#[async_trait]
impl CommandHandler for Retr {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        let arg = argument.unwrap_or("");
        match resolve_file(ctx.storage.as_ref(), state.session(), state.current_directory(), arg)
            .await
        {
            Ok(path) => schedule(state, TransferKind::Retrieve, path),
            Err(_) => CommandResult::new(responses::FILE_UNAVAILABLE, "File not found."),
        }
    }
}

/// Shared body of STOR and APPE.
async fn schedule_upload(
    state: &mut ClientState,
    ctx: &ServerContext,
    argument: Option<&str>,
    kind: TransferKind,
) -> CommandResult {
    let Some(arg) = argument else {
        return CommandResult::new(
            responses::FILE_ACTION_NOT_TAKEN,
            "Requested file action not taken.",
        );
    };
    match resolve_upload_target(
        ctx.storage.as_ref(),
        state.session(),
        state.current_directory(),
        arg,
    )
    .await
    {
        Ok(path) => schedule(state, kind, path),
        Err(_) => CommandResult::new(responses::FILE_UNAVAILABLE, "Directory not found."),
    }
}

pub struct Stor;

#[async_trait]
impl CommandHandler for Stor {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        schedule_upload(state, ctx, argument, TransferKind::Store).await
    }
}

pub struct Appe;

#[async_trait]
impl CommandHandler for Appe {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        schedule_upload(state, ctx, argument, TransferKind::Append).await
    }
}

/// Directory argument of LIST/NLST with option flags such as `-la` removed.
fn listing_target(argument: Option<&str>) -> Option<&str> {
    let arg = argument?.trim();
    let mut rest = arg;
    while rest.starts_with('-') {
        rest = match rest.split_once(char::is_whitespace) {
            Some((_, tail)) => tail.trim_start(),
            None => "",
        };
    }
    if rest.is_empty() { None } else { Some(rest) }
}

async fn schedule_listing(
    state: &mut ClientState,
    ctx: &ServerContext,
    argument: Option<&str>,
    kind: TransferKind,
) -> CommandResult {
    let path = match listing_target(argument) {
        None => state.current_directory().to_string(),
        Some(target) => match resolve_directory(
            ctx.storage.as_ref(),
            state.session(),
            state.current_directory(),
            target,
        )
        .await
        {
            Ok(path) => path,
            Err(_) => {
                return CommandResult::new(responses::FILE_UNAVAILABLE, "Directory not found.");
            }
        },
    };
    schedule(state, kind, path)
}

pub struct List;

#[async_trait]
impl CommandHandler for List {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        schedule_listing(state, ctx, argument, TransferKind::List).await
    }
}

pub struct Nlst;

#[async_trait]
impl CommandHandler for Nlst {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        schedule_listing(state, ctx, argument, TransferKind::NameList).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::handlers::test_support::{context, state};
    use crate::transfer::{DataChannel, DataConnectionMode};

    #[tokio::test]
    async fn stor_without_argument_is_refused() {
        let (_dir, ctx) = context();
        let mut state = state();
        let result = Stor.invoke(&mut state, &ctx, None).await;
        assert_eq!(result.code, 450);
        assert!(state.pending_operation().is_none());
    }

    #[tokio::test]
    async fn stor_schedules_resolved_target() {
        let (dir, ctx) = context();
        std::fs::create_dir_all(dir.path().join("up")).unwrap();
        let mut state = state();

        let result = Stor.invoke(&mut state, &ctx, Some("up/file.bin")).await;
        assert_eq!(
            result,
            CommandResult::new(150, "Opening Active mode data connection for STOR.")
        );
        let op = state.pending_operation().unwrap();
        assert_eq!(op.kind, TransferKind::Store);
        assert_eq!(op.path, "/up/file.bin");
    }

    #[tokio::test]
    async fn stor_into_missing_directory_fails() {
        let (_dir, ctx) = context();
        let mut state = state();
        let result = Stor.invoke(&mut state, &ctx, Some("nowhere/file.bin")).await;
        assert_eq!(result.code, 550);
        assert!(state.pending_operation().is_none());
    }

    #[tokio::test]
    async fn retr_needs_existing_file() {
        let (dir, ctx) = context();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let mut state = state();
        assert_eq!(Retr.invoke(&mut state, &ctx, Some("missing.txt")).await.code, 550);
        assert_eq!(Retr.invoke(&mut state, &ctx, Some("a.txt")).await.code, 150);
        assert_eq!(state.pending_operation().unwrap().path, "/a.txt");
    }

    #[tokio::test]
    async fn list_ignores_option_flags() {
        let (dir, ctx) = context();
        std::fs::create_dir_all(dir.path().join("pub")).unwrap();
        let mut state = state();

        assert_eq!(List.invoke(&mut state, &ctx, Some("-la")).await.code, 150);
        assert_eq!(state.pending_operation().unwrap().path, "/");
        assert_eq!(List.invoke(&mut state, &ctx, Some("-l pub")).await.code, 150);
        assert_eq!(state.pending_operation().unwrap().path, "/pub");
        assert_eq!(Nlst.invoke(&mut state, &ctx, Some("nope")).await.code, 550);
    }

    #[tokio::test]
    async fn type_stru_mode() {
        let (_dir, ctx) = context();
        let mut state = state();
        assert_eq!(Type.invoke(&mut state, &ctx, Some("I")).await.code, 200);
        assert_eq!(state.transfer_type(), TransferType::Binary);
        assert_eq!(Type.invoke(&mut state, &ctx, Some("a")).await.code, 200);
        assert_eq!(state.transfer_type(), TransferType::Ascii);
        assert_eq!(Type.invoke(&mut state, &ctx, Some("E")).await.code, 504);
        assert_eq!(Stru.invoke(&mut state, &ctx, Some("F")).await.code, 200);
        assert_eq!(Stru.invoke(&mut state, &ctx, Some("R")).await.code, 504);
        assert_eq!(Mode.invoke(&mut state, &ctx, Some("S")).await.code, 200);
        assert_eq!(Mode.invoke(&mut state, &ctx, Some("B")).await.code, 504);
    }

    #[tokio::test]
    async fn port_switches_to_active() {
        let (_dir, ctx) = context();
        let mut state = state();
        assert_eq!(Port.invoke(&mut state, &ctx, Some("127,0,0,1,4,1")).await.code, 200);
        assert_eq!(state.connection_mode(), DataConnectionMode::Active);
        assert_eq!(Port.invoke(&mut state, &ctx, Some("garbage")).await.code, 501);
    }

    #[tokio::test]
    async fn pasv_opens_listener() {
        let (_dir, ctx) = context();
        let mut state = state();
        let result = Pasv.invoke(&mut state, &ctx, None).await;
        assert_eq!(result.code, 227);
        assert!(result.text.starts_with("Entering Passive Mode (127,0,0,1,"));
        assert_eq!(state.connection_mode(), DataConnectionMode::Passive);
        assert!(matches!(state.take_data_channel(), Some(DataChannel::Passive(..))));

        let epsv = Epsv.invoke(&mut state, &ctx, None).await;
        assert_eq!(epsv.code, 229);
        assert!(epsv.text.contains("(|||"));
    }

    #[tokio::test]
    async fn rest_sets_offset() {
        let (_dir, ctx) = context();
        let mut state = state();
        assert_eq!(Rest.invoke(&mut state, &ctx, Some("100")).await.code, 350);
        assert_eq!(state.resume_offset(), 100);
        assert_eq!(Rest.invoke(&mut state, &ctx, Some("-5")).await.code, 501);
    }

    #[test]
    fn strips_listing_flags() {
        assert_eq!(listing_target(None), None);
        assert_eq!(listing_target(Some("-la")), None);
        assert_eq!(listing_target(Some("-l -a dir")), Some("dir"));
        assert_eq!(listing_target(Some("dir")), Some("dir"));
    }
}
