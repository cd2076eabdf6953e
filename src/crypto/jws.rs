use serde::Serialize;

use crate::base64url;

pub static CONTENT_TYPE: &str = "application/jose+json";

pub trait JwsSigner {
    fn jws_alg(&self) -> &str;
    fn jws_sign(&self, input: &[u8]) -> Vec<u8>;
}

pub fn jws_flattened(
    signer: &impl JwsSigner,
    header: &JwsHeader<impl Serialize>,
    payload: &[u8],
) -> anyhow::Result<Jws> {
    // https://tools.ietf.org/id/draft-ietf-jose-json-web-signature-01.html#rfc.section.5
    let header_json = serde_json::to_vec(header)?;
    let header_b64 = base64url::encode(header_json);
    let payload_b64 = base64url::encode(payload);
    let input = format!("{}.{}", header_b64, payload_b64);
    let signature = signer.jws_sign(input.as_bytes());
    let signature_b64 = base64url::encode(signature);
    Ok(Jws {
        protected: header_b64,
        payload: payload_b64,
        signature: signature_b64,
    })
}

#[derive(Serialize)]
pub struct Jws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct JwsHeader<'a, JwkT: Serialize> {
    pub alg: &'a str,
    pub nonce: &'a str,
    pub url: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<JwkT>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::crypto::account_key::AccountKey;
    use crate::crypto::rsa::tests::KEY;

    /// The payload encoding is key-independent: base64url of the exact JSON
    /// bytes, no padding.
    #[test]
    fn payload_b64_matches_fixture() {
        let payload = br#"{"Msg":"Hello JWS"}"#;
        assert_eq!(base64url::encode(payload), "eyJNc2ciOiJIZWxsbyBKV1MifQ");
    }

    #[test]
    fn flattened_jws_round_trips_header_and_is_deterministic() {
        let public_jwk = KEY.public_jwk().unwrap();
        let jwk_value: Value = serde_json::from_str(&public_jwk).unwrap();
        let header = JwsHeader {
            alg: KEY.jws_alg(),
            nonce: "nonce",
            url: "https://example/",
            jwk: Some(jwk_value),
            kid: None,
        };
        let payload = br#"{"Msg":"Hello JWS"}"#;

        let jws = jws_flattened(&*KEY, &header, payload).unwrap();
        assert_eq!(jws.payload, "eyJNc2ciOiJIZWxsbyBKV1MifQ");

        let decoded_header: Value =
            serde_json::from_slice(&base64url::decode(&jws.protected).unwrap()).unwrap();
        assert_eq!(decoded_header["alg"], "RS256");
        assert_eq!(decoded_header["nonce"], "nonce");
        assert_eq!(decoded_header["url"], "https://example/");

        // RS256 (PKCS#1 v1.5) signing is deterministic: re-running with the
        // same inputs reproduces the same signature field.
        let again = jws_flattened(&*KEY, &header, payload).unwrap();
        assert_eq!(jws.signature, again.signature);
    }
}
