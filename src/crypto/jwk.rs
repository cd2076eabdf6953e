use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The RSA public key as embedded in a JWS protected header's `jwk` field,
/// and as returned from `public_jwk`/parsed back by `from_jwk`.
#[derive(Serialize, Deserialize)]
pub struct RsaJwk<'a> {
    pub kty: &'a str,
    pub n: &'a str,
    pub e: &'a str,
}

/// The private-key form, used only for `private_jwk` export/import.
#[derive(Serialize, Deserialize)]
pub struct RsaPrivateJwk<'a> {
    pub kty: &'a str,
    pub n: &'a str,
    pub e: &'a str,
    pub d: &'a str,
    pub p: &'a str,
    pub q: &'a str,
}

/// The RFC 7638 canonical form: exactly `{"e":...,"kty":"RSA","n":...}`, keys
/// in lexicographic order, no whitespace. A `BTreeMap` gets us the ordering
/// for free instead of relying on callers to declare struct fields in order.
pub fn canonical_rsa_jwk(n_b64: &str, e_b64: &str) -> String {
    let mut fields = BTreeMap::new();
    fields.insert("e", e_b64);
    fields.insert("kty", "RSA");
    fields.insert("n", n_b64);
    serde_json::to_string(&fields).expect("map of &str serializes infallibly")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_lexicographic() {
        let json = canonical_rsa_jwk("n-value", "e-value");
        assert_eq!(json, r#"{"e":"e-value","kty":"RSA","n":"n-value"}"#);
    }
}
