use rcgen::{CertificateParams, CustomExtension, KeyPair};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::ParsedExtension;

use crate::{AcmeError, AcmeResult};

/// Generates a fresh key pair and a CSR for `name`, for callers (and this
/// crate's own tests/demo binary) that don't already have one. The ACME
/// finalize step only ever sees the DER bytes this returns.
pub fn generate_key_and_csr(name: impl AsRef<str>) -> AcmeResult<(String, Vec<u8>)> {
    let key = KeyPair::generate().map_err(to_crypto_error)?;
    let params = CertificateParams::new(vec![name.as_ref().to_string()]).map_err(to_crypto_error)?;
    let csr = params.serialize_request(&key).map_err(to_crypto_error)?;
    Ok((key.serialize_pem(), csr.der().to_vec()))
}

/// Extracts the set of DNS identifiers (CN plus every `dNSName` SAN entry,
/// de-duplicated) a CSR asserts, used to build the `new_order` identifier
/// list.
pub fn identifiers_from_csr(csr_der: &[u8]) -> AcmeResult<Vec<String>> {
    let (_, csr) = X509CertificationRequest::from_der(csr_der)
        .map_err(|e| AcmeError::CryptoError(anyhow::anyhow!("couldn't parse CSR: {e}")))?;

    let mut names = Vec::new();
    if let Some(cn) = csr
        .certification_request_info
        .subject
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
    {
        names.push(cn.to_string());
    }

    if let Some(extensions) = csr.requested_extensions() {
        for ext in extensions {
            if let ParsedExtension::SubjectAlternativeName(san) = ext {
                for name in &san.general_names {
                    if let x509_parser::extensions::GeneralName::DNSName(dns) = name {
                        names.push(dns.to_string());
                    }
                }
            }
        }
    }

    names.sort();
    names.dedup();

    if names.is_empty() {
        return Err(AcmeError::CryptoError(anyhow::anyhow!(
            "CSR carries no CN or SAN dNSName entries"
        )));
    }

    Ok(names)
}

/// Builds a short-lived self-signed certificate carrying the critical
/// `acmeIdentifier` (1.3.6.1.5.5.7.1.31) extension a TLS-ALPN-01 validation
/// handshake must present, returning `(key_der, cert_der)`. Uses
/// `rcgen::CustomExtension::new_acme_identifier`, which wraps the extension
/// value in the OCTET STRING the RFC requires without hand-rolled DER.
pub fn generate_alpn_certificate(domain: &str, key_authorization_sha256: &[u8]) -> AcmeResult<(Vec<u8>, Vec<u8>)> {
    let key = KeyPair::generate().map_err(to_crypto_error)?;
    let mut params = CertificateParams::new(vec![domain.to_string()]).map_err(to_crypto_error)?;
    params
        .custom_extensions
        .push(CustomExtension::new_acme_identifier(key_authorization_sha256));
    let cert = params.self_signed(&key).map_err(to_crypto_error)?;
    Ok((key.serialize_der(), cert.der().to_vec()))
}

fn to_crypto_error(err: rcgen::Error) -> AcmeError {
    AcmeError::CryptoError(anyhow::anyhow!(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_key_and_csr_round_trips_identifiers() {
        let (_key_pem, csr_der) = generate_key_and_csr("example.com").unwrap();
        let names = identifiers_from_csr(&csr_der).unwrap();
        assert_eq!(names, vec!["example.com".to_string()]);
    }

    #[test]
    fn alpn_certificate_smoke_test() {
        let (key_der, cert_der) = generate_alpn_certificate("example.com", &[0u8; 32]).unwrap();
        assert!(!key_der.is_empty());
        assert!(!cert_der.is_empty());
    }
}
