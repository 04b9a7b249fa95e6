//! Data connection operations
//!
//! A handler never moves bytes itself. It registers one of these on the
//! session and the session runs it once the data channel is open.

use std::fmt;

use crate::transfer::engine::LineDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Retrieve,
    Store,
    Append,
    List,
    NameList,
}

impl TransferKind {
    pub fn verb(&self) -> &'static str {
        match self {
            TransferKind::Retrieve => "RETR",
            TransferKind::Store => "STOR",
            TransferKind::Append => "APPE",
            TransferKind::List => "LIST",
            TransferKind::NameList => "NLST",
        }
    }

    /// Which way ASCII line endings are rewritten.
    pub fn direction(&self) -> LineDirection {
        match self {
            TransferKind::Store | TransferKind::Append => LineDirection::ToStorage,
            TransferKind::Retrieve | TransferKind::List | TransferKind::NameList => {
                LineDirection::ToNetwork
            }
        }
    }

    /// Whether an interrupted attempt can be resumed from an offset.
    pub fn is_resumable(&self) -> bool {
        !matches!(self, TransferKind::List | TransferKind::NameList)
    }
}

/// Deferred transfer bound to a resolved virtual path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConnectionOperation {
    pub kind: TransferKind,
    pub path: String,
}

impl DataConnectionOperation {
    pub fn new(kind: TransferKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl fmt::Display for DataConnectionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.verb(), self.path)
    }
}
