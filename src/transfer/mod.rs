//! Transfer module for FTP server
//!
//! Data channel establishment, deferred data connection operations and the
//! chunked copy engine that moves bytes between storage and the network.

pub mod data_channel;
pub mod engine;
pub mod modes;
pub mod operation;

pub use data_channel::{DataChannel, bind_passive, format_pasv_address, parse_port_argument};
pub use engine::{CopyOptions, CopyOutcome, LineDirection, copy_stream};
pub use modes::{DataConnectionMode, FileStructure, TransferType};
pub use operation::{DataConnectionOperation, TransferKind};
