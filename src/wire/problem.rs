use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::json::{opt_string_val, string_val};

/// RFC 7807 problem document, scoped to the closed ACME error URN registry.
/// https://datatracker.ietf.org/doc/html/rfc8555#section-6.7
#[derive(Clone, Debug, PartialEq)]
pub struct AcmeProblem {
    pub kind: AcmeProblemType,
    pub detail: Option<String>,
    /// The full decoded problem document, kept alongside `kind`/`detail` so
    /// callers can inspect `subproblems` or CA-specific fields.
    pub raw: Value,
}

impl AcmeProblem {
    pub const CONTENT_TYPE: &'static str = "application/problem+json";

    pub fn has_type(&self, kind: AcmeProblemType) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for AcmeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind.urn(), detail),
            None => write!(f, "{}", self.kind.urn()),
        }
    }
}

impl<'de> Deserialize<'de> for AcmeProblem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let type_uri = string_val(&raw, "type").map_err(serde::de::Error::custom)?;
        let kind = AcmeProblemType::from_type_uri(&type_uri)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown problem type {type_uri}")))?;
        let detail = opt_string_val(&raw, "detail");
        Ok(AcmeProblem { kind, detail, raw })
    }
}

pub static ACME_ERROR_PREFIX: &str = "urn:ietf:params:acme:error:";

/// Closed enumeration over the ACME error URN registry (RFC 8555 §6.7 plus
/// the additions in later errata). Unrecognized type URIs fail to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcmeProblemType {
    AccountDoesNotExist,
    AlreadyRevoked,
    BadCsr,
    BadNonce,
    BadPublicKey,
    BadRevocationReason,
    BadSignatureAlgorithm,
    Caa,
    Connection,
    Dns,
    ExternalAccountRequired,
    IncorrectResponse,
    InvalidContact,
    Malformed,
    OrderNotReady,
    RateLimited,
    RejectedIdentifier,
    ServerInternal,
    Tls,
    Unauthorized,
    UnsupportedContact,
    UnsupportedIdentifier,
    UserActionRequired,
}

impl AcmeProblemType {
    pub fn from_type_uri(type_uri: &str) -> Option<Self> {
        let suffix = type_uri.strip_prefix(ACME_ERROR_PREFIX)?;
        Self::from_suffix(suffix)
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        use AcmeProblemType::*;
        Some(match suffix {
            "accountDoesNotExist" => AccountDoesNotExist,
            "alreadyRevoked" => AlreadyRevoked,
            "badCSR" => BadCsr,
            "badNonce" => BadNonce,
            "badPublicKey" => BadPublicKey,
            "badRevocationReason" => BadRevocationReason,
            "badSignatureAlgorithm" => BadSignatureAlgorithm,
            "caa" => Caa,
            "connection" => Connection,
            "dns" => Dns,
            "externalAccountRequired" => ExternalAccountRequired,
            "incorrectResponse" => IncorrectResponse,
            "invalidContact" => InvalidContact,
            "malformed" => Malformed,
            "orderNotReady" => OrderNotReady,
            "rateLimited" => RateLimited,
            "rejectedIdentifier" => RejectedIdentifier,
            "serverInternal" => ServerInternal,
            "tls" => Tls,
            "unauthorized" => Unauthorized,
            "unsupportedContact" => UnsupportedContact,
            "unsupportedIdentifier" => UnsupportedIdentifier,
            "userActionRequired" => UserActionRequired,
            _ => return None,
        })
    }

    pub fn urn(&self) -> &'static str {
        use AcmeProblemType::*;
        match self {
            AccountDoesNotExist => "urn:ietf:params:acme:error:accountDoesNotExist",
            AlreadyRevoked => "urn:ietf:params:acme:error:alreadyRevoked",
            BadCsr => "urn:ietf:params:acme:error:badCSR",
            BadNonce => "urn:ietf:params:acme:error:badNonce",
            BadPublicKey => "urn:ietf:params:acme:error:badPublicKey",
            BadRevocationReason => "urn:ietf:params:acme:error:badRevocationReason",
            BadSignatureAlgorithm => "urn:ietf:params:acme:error:badSignatureAlgorithm",
            Caa => "urn:ietf:params:acme:error:caa",
            Connection => "urn:ietf:params:acme:error:connection",
            Dns => "urn:ietf:params:acme:error:dns",
            ExternalAccountRequired => "urn:ietf:params:acme:error:externalAccountRequired",
            IncorrectResponse => "urn:ietf:params:acme:error:incorrectResponse",
            InvalidContact => "urn:ietf:params:acme:error:invalidContact",
            Malformed => "urn:ietf:params:acme:error:malformed",
            OrderNotReady => "urn:ietf:params:acme:error:orderNotReady",
            RateLimited => "urn:ietf:params:acme:error:rateLimited",
            RejectedIdentifier => "urn:ietf:params:acme:error:rejectedIdentifier",
            ServerInternal => "urn:ietf:params:acme:error:serverInternal",
            Tls => "urn:ietf:params:acme:error:tls",
            Unauthorized => "urn:ietf:params:acme:error:unauthorized",
            UnsupportedContact => "urn:ietf:params:acme:error:unsupportedContact",
            UnsupportedIdentifier => "urn:ietf:params:acme:error:unsupportedIdentifier",
            UserActionRequired => "urn:ietf:params:acme:error:userActionRequired",
        }
    }
}
