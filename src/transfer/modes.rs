//! FTP Transfer modes
//!
//! Connection mode, representation type and file structure negotiated on the
//! control connection.

use std::fmt;

/// How the data channel is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataConnectionMode {
    /// Server dials the endpoint announced by PORT.
    #[default]
    Active,
    /// Server accepts on the listener opened by PASV/EPSV.
    Passive,
}

impl fmt::Display for DataConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataConnectionMode::Active => write!(f, "Active"),
            DataConnectionMode::Passive => write!(f, "Passive"),
        }
    }
}

/// Representation type set by TYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    #[default]
    Ascii,
    Binary,
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferType::Ascii => write!(f, "ASCII"),
            TransferType::Binary => write!(f, "BINARY"),
        }
    }
}

/// File structure set by STRU. Only `File` is accepted by the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileStructure {
    #[default]
    File,
    Record,
    Page,
}
