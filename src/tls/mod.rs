//! TLS support
//!
//! Loads PEM certificate material into a rustls acceptor used by the
//! `AUTH TLS` upgrade of the control connection.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::CertificateDer;

use crate::error::TlsError;

/// Builds an acceptor from a PEM certificate chain and private key.
pub fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor, TlsError> {
    let cert_file = fs::File::open(cert_path)
        .map_err(|e| TlsError::CertificateLoad(format!("{}: {}", cert_path.display(), e)))?;
    let mut cert_reader = BufReader::new(cert_file);
    let certs: Vec<CertificateDer> = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::CertificateLoad(e.to_string()))?;

    if certs.is_empty() {
        return Err(TlsError::CertificateLoad(format!(
            "no certificates found in {}",
            cert_path.display()
        )));
    }

    let key_file = fs::File::open(key_path)
        .map_err(|e| TlsError::PrivateKeyLoad(format!("{}: {}", key_path.display(), e)))?;
    let mut key_reader = BufReader::new(key_file);
    let private_key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| TlsError::PrivateKeyLoad(e.to_string()))?
        .ok_or_else(|| {
            TlsError::PrivateKeyLoad(format!("no private key found in {}", key_path.display()))
        })?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, private_key)
        .map_err(|e| TlsError::Config(e.to_string()))?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair};

    #[test]
    fn loads_generated_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let key_pair = KeyPair::generate().unwrap();
        let params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        let cert = params.self_signed(&key_pair).unwrap();

        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        fs::write(&cert_path, cert.pem()).unwrap();
        fs::write(&key_path, key_pair.serialize_pem()).unwrap();

        assert!(load_acceptor(&cert_path, &key_path).is_ok());
    }

    #[test]
    fn reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_acceptor(&dir.path().join("nope.pem"), &dir.path().join("nope.key"));
        assert!(matches!(result, Err(TlsError::CertificateLoad(_))));
    }

    #[test]
    fn rejects_empty_certificate_file() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        fs::write(&cert_path, "").unwrap();
        let result = load_acceptor(&cert_path, &cert_path);
        assert!(matches!(result, Err(TlsError::CertificateLoad(_))));
    }
}
