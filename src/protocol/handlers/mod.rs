//! Built-in command handlers
//!
//! One unit struct per verb, grouped by concern.

pub mod files;
pub mod navigation;
pub mod security;
pub mod session;
pub mod transfer;

use crate::protocol::registry::CommandRegistry;

/// Installs every built-in verb into `registry`.
pub fn register_defaults(registry: &mut CommandRegistry) {
    registry.register("USER", session::User);
    registry.register("PASS", session::Pass);
    registry.register("QUIT", session::Quit);
    registry.register("NOOP", session::Noop);
    registry.register("SYST", session::Syst);
    registry.register("FEAT", session::Feat);

    registry.register("PWD", navigation::Pwd);
    registry.register("XPWD", navigation::Pwd);
    registry.register("CWD", navigation::Cwd);
    registry.register("CDUP", navigation::Cdup);

    registry.register("TYPE", transfer::Type);
    registry.register("STRU", transfer::Stru);
    registry.register("MODE", transfer::Mode);
    registry.register("PORT", transfer::Port);
    registry.register("PASV", transfer::Pasv);
    registry.register("EPSV", transfer::Epsv);
    registry.register("REST", transfer::Rest);
    registry.register("RETR", transfer::Retr);
    registry.register("STOR", transfer::Stor);
    registry.register("APPE", transfer::Appe);
    registry.register("LIST", transfer::List);
    registry.register("NLST", transfer::Nlst);

    registry.register("DELE", files::Dele);
    registry.register("MKD", files::Mkd);
    registry.register("RMD", files::Rmd);
    registry.register("RNFR", files::Rnfr);
    registry.register("RNTO", files::Rnto);
    registry.register("SIZE", files::Size);

    registry.register("AUTH", security::Auth);
    registry.register("PBSZ", security::Pbsz);
    registry.register("PROT", security::Prot);
}
