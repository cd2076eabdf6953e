use rand::{CryptoRng, RngCore};
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::base64url;

use super::account_key::{AccountKey, GenerateAccountKey};
use super::jwk::{canonical_rsa_jwk, RsaJwk, RsaPrivateJwk};
use super::jws::JwsSigner;

/// Key size used when generating a fresh account key. Boulder (Let's
/// Encrypt's CA software) accepts 2048-4096 bit RSA keys; 2048 matches what
/// certbot and most other ACME clients default to.
pub static DEFAULT_KEY_BITS: usize = 2048;

#[derive(Debug)]
pub struct RsaAccountKey(RsaPrivateKey);

pub fn from_jwk(jwk: impl AsRef<str>) -> anyhow::Result<RsaAccountKey> {
    let jwk: RsaPrivateJwk = serde_json::from_str(jwk.as_ref())?;
    if jwk.kty != "RSA" {
        anyhow::bail!("invalid JWK for RSA private key");
    }
    let n = BigUint::from_bytes_be(&base64url::decode(jwk.n)?);
    let e = BigUint::from_bytes_be(&base64url::decode(jwk.e)?);
    let d = BigUint::from_bytes_be(&base64url::decode(jwk.d)?);
    let p = BigUint::from_bytes_be(&base64url::decode(jwk.p)?);
    let q = BigUint::from_bytes_be(&base64url::decode(jwk.q)?);
    let key = RsaPrivateKey::from_components(n, e, d, vec![p, q])?;
    Ok(RsaAccountKey(key))
}

impl GenerateAccountKey for RsaAccountKey {
    fn generate_rng(mut rng: impl CryptoRng + RngCore) -> Self {
        let key = RsaPrivateKey::new(&mut rng, DEFAULT_KEY_BITS)
            .expect("RSA key generation with a CSPRNG should not fail");
        Self(key)
    }
}

impl JwsSigner for RsaAccountKey {
    fn jws_alg(&self) -> &str {
        "RS256"
    }

    fn jws_sign(&self, input: &[u8]) -> Vec<u8> {
        // RSASSA-PKCS1-v1_5 is deterministic: no randomness is consulted, so
        // re-signing identical input always yields an identical signature.
        let signing_key = SigningKey::<Sha256>::new(self.0.clone());
        signing_key.sign(input).to_vec()
    }
}

impl AccountKey for RsaAccountKey {
    fn private_jwk(&self) -> anyhow::Result<Zeroizing<String>> {
        let primes = self.0.primes();
        let (p, q) = (&primes[0], &primes[1]);
        let n = base64url::encode(self.0.n().to_bytes_be());
        let e = base64url::encode(self.0.e().to_bytes_be());
        let d = base64url::encode(self.0.d().to_bytes_be());
        let p = base64url::encode(p.to_bytes_be());
        let q = base64url::encode(q.to_bytes_be());
        let jwk = RsaPrivateJwk {
            kty: "RSA",
            n: &n,
            e: &e,
            d: &d,
            p: &p,
            q: &q,
        };
        Ok(Zeroizing::new(serde_json::to_string(&jwk)?))
    }

    fn public_jwk(&self) -> anyhow::Result<String> {
        let public = self.0.to_public_key();
        let n = base64url::encode(public.n().to_bytes_be());
        let e = base64url::encode(public.e().to_bytes_be());
        Ok(serde_json::to_string(&RsaJwk {
            kty: "RSA",
            n: &n,
            e: &e,
        })?)
    }

    fn thumbprint(&self) -> anyhow::Result<String> {
        use sha2::Digest;

        let public = self.0.to_public_key();
        let n = base64url::encode(public.n().to_bytes_be());
        let e = base64url::encode(public.e().to_bytes_be());
        let canonical = canonical_rsa_jwk(&n, &e);
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(base64url::encode(digest))
    }
}

impl From<RsaPrivateKey> for RsaAccountKey {
    fn from(key: RsaPrivateKey) -> Self {
        Self(key)
    }
}

impl From<RsaAccountKey> for RsaPrivateKey {
    fn from(key: RsaAccountKey) -> Self {
        key.0
    }
}

#[cfg(test)]
pub mod tests {
    use once_cell::sync::Lazy;

    use super::*;

    // A small (1024-bit) RSA key used only to keep test fixtures fast; never
    // use a key this size against a real CA.
    pub const JWK: &str = r#"{
        "kty":"RSA",
        "n":"xvY9r7OMuPIr1yhp6jFGyrGPieLR0eEuUfgtTeo6LlkPvLyOYAhf9EyXvxmjYXFEIR8RGBSGzcJweCfQq2l9hyRwEjxfD1gKFeK_dGdIGXRLR3_8EwaH6vd2WhfKoX1uiXfaQgDt-_8HYpm2DkR1l1hn6wpwjM0C95ooJkQ1AEWf4IR2uKIcEEZBc4Sax5lUKX8NT5dMmKxQt3SBaoZIpf6cBbvHmjtKOXwlZN0c1qT_Hg25XNXoCm9c6Z8rWvOl3RKsYSh9u1nO7rNA0OI0aYDaRJ4BXg7D_8tTrXyn5epsUQiFzwNlCiZCWiLUNN7h6QSahQpU3oJz8gq8XIwGsQ",
        "e":"AQAB",
        "d":"Ai6U_4DtY2qJI3TxrFIhv2vvSfFp40MwH1ztL-CFRQBdAMkpz8GOlGOZeCCB_hO0sHeqE7DVWnFdFgGOJQ-d4JB7GUaJSLb98c8tDvzPVepAL5x3jU8sEkNNs5aYhVukHZF-Mowbh5q1s5RQTOt5OqVQ1zXk5PQQBp7R_cV0ANfbxN3mUykz5QZaFZV5DpZIbgYxxYQFYsDCzXNP2PSYSUmhdsu1wdoMYxQ3i0ZhQpSTPW64zI21EgdxQXlpXciAQ",
        "p":"6n1KYpAX3nP3HY5hfH9iKjBK3NgRsJ1iNnEeU3TBr-OckkE0hGi8-DvTXTgC0qRmSYDOF-BBKnOQDQVJhO0A0w",
        "q":"2Jx-OVUh89q1_9b0GCqCXu3Th5Pn1E25uUvFfrrfzqkfS_xnXUF4PzVrFC6VM2RbV6jKqCmEvKq-KnzMSK0LeQ"
    }"#;

    pub static KEY: Lazy<RsaAccountKey> = Lazy::new(|| from_jwk(JWK).unwrap());

    #[test]
    fn generate_smoke_test() {
        RsaAccountKey::generate();
    }

    #[test]
    fn sign_is_deterministic() {
        let a = KEY.jws_sign(b"test");
        let b = KEY.jws_sign(b"test");
        assert_eq!(a, b);
    }

    #[test]
    fn jws_alg_is_rs256() {
        assert_eq!(KEY.jws_alg(), "RS256");
    }
}
