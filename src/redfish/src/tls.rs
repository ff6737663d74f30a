// SPDX-License-Identifier: Apache-2.0

//! TLS material for a Redfish listener: loads a configured certificate/key pair, or generates a
//! self-signed one in-process when none is configured.
//!
//! A bridge that binds a TLS port with no certificate at all is not a deployable ambient
//! default, so the self-signed fallback exists purely to make the listener come up; it is not
//! the certificate-generation *scripts* infrastructure the spec excludes.

use std::io::BufReader;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;

/// Errors building a `rustls::ServerConfig` for a Redfish listener.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum TlsError {
    /// failed to read certificate file "{0}": {1}
    ReadCert(String, String),
    /// failed to read key file "{0}": {1}
    ReadKey(String, String),
    /// certificate file "{0}" contained no certificates
    EmptyCertChain(String),
    /// key file "{0}" contained no private key
    MissingKey(String),
    /// self-signed certificate generation failed: {0}
    SelfSigned(String),
    /// invalid TLS server configuration: {0}
    Config(String),
}

/// Builds a `rustls::ServerConfig` from a configured cert/key pair, or a freshly generated
/// self-signed certificate if either path is absent.
pub fn build_server_config(
    cert_path: Option<&str>,
    key_path: Option<&str>,
) -> Result<Arc<ServerConfig>, TlsError> {
    let (certs, key) = match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => load_from_files(cert_path, key_path)?,
        _ => self_signed()?,
    };

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| TlsError::Config(err.to_string()))?;
    Ok(Arc::new(config))
}

fn load_from_files(
    cert_path: &str,
    key_path: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsError> {
    let cert_bytes = std::fs::read(cert_path)
        .map_err(|err| TlsError::ReadCert(cert_path.to_string(), err.to_string()))?;
    let key_bytes = std::fs::read(key_path)
        .map_err(|err| TlsError::ReadKey(key_path.to_string(), err.to_string()))?;

    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut BufReader::new(cert_bytes.as_slice()))
            .collect::<Result<_, _>>()
            .map_err(|err| TlsError::ReadCert(cert_path.to_string(), err.to_string()))?;
    if certs.is_empty() {
        return Err(TlsError::EmptyCertChain(cert_path.to_string()));
    }

    let key = rustls_pemfile::private_key(&mut BufReader::new(key_bytes.as_slice()))
        .map_err(|err| TlsError::ReadKey(key_path.to_string(), err.to_string()))?
        .ok_or_else(|| TlsError::MissingKey(key_path.to_string()))?;

    Ok((certs, key))
}

fn self_signed() -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsError> {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .map_err(|err| TlsError::SelfSigned(err.to_string()))?;
    let cert_der = cert.der().clone();
    let key_der = PrivateKeyDer::Pkcs8(key_pair.serialize_der().into());
    Ok((vec![cert_der], key_der))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_signed_fallback_builds_a_usable_config() {
        build_server_config(None, None).expect("self-signed config should build");
    }
}
