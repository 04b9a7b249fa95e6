//! Security handlers: `AUTH`, `PBSZ`, `PROT`.
//!
//! `AUTH` only decides; the session writes the 234 reply in plaintext and
//! then runs the handshake on the same socket.

use async_trait::async_trait;

use crate::client::ClientState;
use crate::protocol::registry::CommandHandler;
use crate::protocol::responses;
use crate::protocol::CommandResult;
use crate::server::ServerContext;

pub struct Auth;

#[async_trait]
impl CommandHandler for Auth {
    async fn invoke(
        &self,
        state: &mut ClientState,
        ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        match argument.map(str::to_ascii_uppercase).as_deref() {
            Some("TLS") | Some("TLS-C") | Some("SSL") => {}
            _ => {
                return CommandResult::new(
                    responses::PARAMETER_NOT_IMPLEMENTED,
                    "Unsupported security mechanism.",
                );
            }
        }
        if state.is_tls_active() {
            return CommandResult::new(responses::BAD_SEQUENCE, "TLS already active.");
        }
        if ctx.tls.is_none() {
            return CommandResult::new(responses::COMMAND_NOT_IMPLEMENTED, "TLS not configured.");
        }
        state.request_tls();
        CommandResult::new(responses::AUTH_OK, "Enabling TLS connection.")
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

pub struct Pbsz;

#[async_trait]
impl CommandHandler for Pbsz {
    async fn invoke(
        &self,
        _state: &mut ClientState,
        _ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        match argument {
            Some("0") => CommandResult::new(responses::OK, "PBSZ=0"),
            _ => CommandResult::new(responses::SYNTAX_ERROR_ARGS, "Only PBSZ 0 is supported."),
        }
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

pub struct Prot;

#[async_trait]
impl CommandHandler for Prot {
    async fn invoke(
        &self,
        _state: &mut ClientState,
        _ctx: &ServerContext,
        argument: Option<&str>,
    ) -> CommandResult {
        match argument.map(str::to_ascii_uppercase).as_deref() {
            Some("C") => CommandResult::new(responses::OK, "Protection level set to Clear."),
            Some("P") | Some("S") | Some("E") => CommandResult::new(
                responses::PROTECTION_LEVEL_NOT_SUPPORTED,
                "Data channel protection is not offered.",
            ),
            _ => CommandResult::new(
                responses::PARAMETER_NOT_IMPLEMENTED,
                "Unknown protection level.",
            ),
        }
    }

    fn requires_auth(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::handlers::test_support::{context, state};

    #[tokio::test]
    async fn auth_without_certificates_is_refused() {
        let (_dir, ctx) = context();
        let mut state = state();
        let result = Auth.invoke(&mut state, &ctx, Some("TLS")).await;
        assert_eq!(result, CommandResult::new(502, "TLS not configured."));
        assert!(!state.take_tls_request());
    }

    #[tokio::test]
    async fn auth_rejects_unknown_mechanism() {
        let (_dir, ctx) = context();
        assert_eq!(Auth.invoke(&mut state(), &ctx, Some("KERBEROS")).await.code, 504);
        assert_eq!(Auth.invoke(&mut state(), &ctx, None).await.code, 504);
    }

    #[tokio::test]
    async fn pbsz_and_prot() {
        let (_dir, ctx) = context();
        let mut state = state();
        assert_eq!(Pbsz.invoke(&mut state, &ctx, Some("0")).await.code, 200);
        assert_eq!(Prot.invoke(&mut state, &ctx, Some("C")).await.code, 200);
        assert_eq!(Prot.invoke(&mut state, &ctx, Some("P")).await.code, 536);
    }
}
