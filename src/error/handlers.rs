//! Error handlers
//!
//! Maps domain errors onto FTP reply codes.

use std::io::ErrorKind;

use crate::error::types::{FtpServerError, StorageError, TransferError};
use crate::protocol::responses;

/// Convert error to FTP response code
pub fn error_to_ftp_code(err: &FtpServerError) -> u16 {
    match err {
        FtpServerError::Auth(_) => responses::NOT_LOGGED_IN,
        FtpServerError::Storage(e) => storage_error_code(e),
        FtpServerError::Transfer(e) => transfer_error_code(e),
        FtpServerError::Navigate(_) => responses::FILE_UNAVAILABLE,
        FtpServerError::Tls(_) => responses::LOCAL_ERROR,
        FtpServerError::Session(_) => responses::SERVICE_UNAVAILABLE,
        FtpServerError::Config(_) | FtpServerError::Server(_) => responses::SERVICE_UNAVAILABLE,
        FtpServerError::IoError(_) => responses::LOCAL_ERROR,
    }
}

/// Reply code for a storage failure
pub fn storage_error_code(err: &StorageError) -> u16 {
    match err {
        StorageError::FileNotFound(_)
        | StorageError::DirectoryNotFound(_)
        | StorageError::PermissionDenied(_)
        | StorageError::PathTraversal(_)
        | StorageError::FileAlreadyExists(_) => responses::FILE_UNAVAILABLE,
        StorageError::InvalidOffset(..) => responses::INVALID_RESTART,
        StorageError::IoError(e) => match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => responses::FILE_UNAVAILABLE,
            _ => responses::FILE_ACTION_NOT_TAKEN,
        },
    }
}

/// Reply code for a data channel failure
pub fn transfer_error_code(err: &TransferError) -> u16 {
    match err {
        TransferError::InvalidPortCommand(_) => responses::SYNTAX_ERROR_ARGS,
        TransferError::TransferFailed(_) => responses::TRANSFER_ABORTED,
        _ => responses::CANT_OPEN_DATA_CONNECTION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn maps_storage_errors_to_file_codes() {
        let err = FtpServerError::from(StorageError::FileNotFound("/a".into()));
        assert_eq!(error_to_ftp_code(&err), 550);

        let busy = StorageError::IoError(io::Error::new(ErrorKind::WouldBlock, "busy"));
        assert_eq!(storage_error_code(&busy), 450);

        let past_end = StorageError::InvalidOffset("/a".into(), 10);
        assert_eq!(storage_error_code(&past_end), 554);
    }

    #[test]
    fn maps_transfer_errors_to_data_codes() {
        assert_eq!(transfer_error_code(&TransferError::NoAvailablePort), 425);
        assert_eq!(
            transfer_error_code(&TransferError::InvalidPortCommand("x".into())),
            501
        );
    }
}
