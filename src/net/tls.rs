//! TLS configuration and certificate loading.

use axum_server::tls_rustls::RustlsConfig;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Check that `cert_path` holds at least one certificate and `key_path` a
/// private key, both PEM encoded.
pub fn check_pem_files(cert_path: &Path, key_path: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(cert_path).map_err(|e| {
        io::Error::new(e.kind(), format!("Certificate file {}: {e}", cert_path.display()))
    })?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(invalid(format!(
            "No certificates found in {}",
            cert_path.display()
        )));
    }

    let mut reader = BufReader::new(File::open(key_path).map_err(|e| {
        io::Error::new(e.kind(), format!("Private key file {}: {e}", key_path.display()))
    })?);
    match rustls_pemfile::private_key(&mut reader)? {
        Some(_) => Ok(()),
        None => Err(invalid(format!(
            "No private key found in {}",
            key_path.display()
        ))),
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> io::Result<RustlsConfig> {
    check_pem_files(cert_path, key_path)?;
    RustlsConfig::from_pem_file(cert_path, key_path).await
}
