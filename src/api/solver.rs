//! Challenge solvers: the pluggable side channel a caller uses to prove
//! control of an identifier. `sign_certificate` drives exactly one solver
//! per call, picking (per authorization) the first challenge whose type
//! matches `Solver::challenge_type`.

use std::future::Future;
use std::io::Write;
use std::str::FromStr;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{AcmeError, AcmeResult};
use crate::wire::challenge::{CHALLENGE_TYPE_DNS_01, CHALLENGE_TYPE_HTTP_01, CHALLENGE_TYPE_TLS_ALPN_01};
use crate::{base64url, x509};

#[async_trait]
pub trait Solver: Send + Sync {
    /// The challenge type (e.g. `"http-01"`) this solver knows how to satisfy.
    fn challenge_type(&self) -> &str;

    /// Installs the challenge response at this solver's side channel.
    async fn provision(&self, domain: &str, token: &str, key_authorization: &str) -> AcmeResult<()>;

    /// Best-effort removal once an authorization has reached a terminal
    /// status. Failures here are logged by the caller, not propagated.
    async fn cleanup(&self, _domain: &str, _token: &str) -> AcmeResult<()> {
        Ok(())
    }
}

/// `.well-known/acme-challenge/<token>` path prefix, served with
/// `content-type: application/octet-stream` and a body equal to the key
/// authorization.
pub static HTTP_CHALLENGE_PATH_PREFIX: &str = ".well-known/acme-challenge";

pub struct HttpSolver<F> {
    provision: F,
}

/// Builds an HTTP-01 solver from an async callback receiving
/// `(domain, token, key_authorization)`. The callback is responsible for
/// making the key authorization available at
/// `http://<domain>/.well-known/acme-challenge/<token>`.
pub fn http_solver<F, Fut>(provision: F) -> HttpSolver<F>
where
    F: Fn(String, String, String) -> Fut + Send + Sync,
    Fut: Future<Output = AcmeResult<()>> + Send,
{
    HttpSolver { provision }
}

#[async_trait]
impl<F, Fut> Solver for HttpSolver<F>
where
    F: Fn(String, String, String) -> Fut + Send + Sync,
    Fut: Future<Output = AcmeResult<()>> + Send,
{
    fn challenge_type(&self) -> &str {
        CHALLENGE_TYPE_HTTP_01
    }

    async fn provision(&self, domain: &str, token: &str, key_authorization: &str) -> AcmeResult<()> {
        (self.provision)(
            domain.to_string(),
            token.to_string(),
            key_authorization.to_string(),
        )
        .await
    }
}

pub struct DnsSolver<F> {
    provision: F,
}

/// Builds a DNS-01 solver from an async callback receiving
/// `(_acme-challenge.<domain>, base64url(SHA-256(key_authorization)))`; the
/// callback publishes that value as a TXT record.
pub fn dns_solver<F, Fut>(provision: F) -> DnsSolver<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = AcmeResult<()>> + Send,
{
    DnsSolver { provision }
}

/// `base64url(SHA-256(key_authorization))`, the TXT record content DNS-01
/// (direct or via nsupdate) publishes at `_acme-challenge.<domain>`.
pub fn dns01_txt_content(key_authorization: &str) -> String {
    base64url::encode(Sha256::digest(key_authorization.as_bytes()))
}

#[async_trait]
impl<F, Fut> Solver for DnsSolver<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = AcmeResult<()>> + Send,
{
    fn challenge_type(&self) -> &str {
        CHALLENGE_TYPE_DNS_01
    }

    async fn provision(&self, domain: &str, _token: &str, key_authorization: &str) -> AcmeResult<()> {
        let name = format!("_acme-challenge.{domain}");
        let content = dns01_txt_content(key_authorization);
        (self.provision)(name, content).await
    }
}

pub struct AlpnSolver<F> {
    provision: F,
}

/// Builds a TLS-ALPN-01 solver from an async callback receiving
/// `(domain, key_der, cert_der)`. The certificate carries the critical
/// `acmeIdentifier` extension; the caller serves it over TLS when the
/// ClientHello negotiates ALPN `acme-tls/1`.
pub fn alpn_solver<F, Fut>(provision: F) -> AlpnSolver<F>
where
    F: Fn(String, Vec<u8>, Vec<u8>) -> Fut + Send + Sync,
    Fut: Future<Output = AcmeResult<()>> + Send,
{
    AlpnSolver { provision }
}

/// The ALPN protocol name a TLS-ALPN-01 listener must negotiate.
pub static ALPN_PROTOCOL: &str = "acme-tls/1";

#[async_trait]
impl<F, Fut> Solver for AlpnSolver<F>
where
    F: Fn(String, Vec<u8>, Vec<u8>) -> Fut + Send + Sync,
    Fut: Future<Output = AcmeResult<()>> + Send,
{
    fn challenge_type(&self) -> &str {
        CHALLENGE_TYPE_TLS_ALPN_01
    }

    async fn provision(&self, domain: &str, _token: &str, key_authorization: &str) -> AcmeResult<()> {
        let digest = Sha256::digest(key_authorization.as_bytes());
        let (key_der, cert_der) = x509::generate_alpn_certificate(domain, &digest)?;
        (self.provision)(domain.to_string(), key_der, cert_der).await
    }
}

/// DNS-01 satisfied via a TSIG-signed RFC 2136 dynamic update, for callers
/// whose DNS provider exposes nsupdate rather than an HTTP API.
pub struct NsupdateSolver<S, R> {
    id: u16,
    now: u32,
    zone: String,
    key_name: String,
    key: Vec<u8>,
    send: S,
    recv: Option<R>,
}

/// `id`/`now` are supplied by the caller (rather than read from the system
/// clock or a random source) so the update message is reproducible; `send`
/// transmits the signed wire-format message, and an optional `recv` awaits
/// and validates the server's reply.
pub fn nsupdate<S, SFut, R, RFut>(
    id: u16,
    now: u32,
    send: S,
    recv: Option<R>,
    zone: impl Into<String>,
    key_name: impl Into<String>,
    key: impl Into<Vec<u8>>,
) -> NsupdateSolver<S, R>
where
    S: Fn(Vec<u8>) -> SFut + Send + Sync,
    SFut: Future<Output = AcmeResult<()>> + Send,
    R: Fn() -> RFut + Send + Sync,
    RFut: Future<Output = AcmeResult<Vec<u8>>> + Send,
{
    NsupdateSolver {
        id,
        now,
        zone: zone.into(),
        key_name: key_name.into(),
        key: key.into(),
        send,
        recv,
    }
}

#[async_trait]
impl<S, SFut, R, RFut> Solver for NsupdateSolver<S, R>
where
    S: Fn(Vec<u8>) -> SFut + Send + Sync,
    SFut: Future<Output = AcmeResult<()>> + Send,
    R: Fn() -> RFut + Send + Sync,
    RFut: Future<Output = AcmeResult<Vec<u8>>> + Send,
{
    fn challenge_type(&self) -> &str {
        CHALLENGE_TYPE_DNS_01
    }

    async fn provision(&self, domain: &str, _token: &str, key_authorization: &str) -> AcmeResult<()> {
        use hickory_proto::op::{Message, MessageType, OpCode, Query};
        use hickory_proto::rr::rdata::{tsig::TSigner, TXT};
        use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
        use hickory_proto::serialize::binary::BinEncodable;

        let zone = Name::from_str(&self.zone)
            .map_err(|e| AcmeError::SolverError(format!("invalid zone {}: {e}", self.zone)))?;
        let record_name = Name::from_str(&format!("_acme-challenge.{domain}."))
            .map_err(|e| AcmeError::SolverError(format!("invalid record name for {domain}: {e}")))?;
        let key_name = Name::from_str(&self.key_name)
            .map_err(|e| AcmeError::SolverError(format!("invalid TSIG key name: {e}")))?;

        let content = dns01_txt_content(key_authorization);
        let mut record = Record::with(record_name, RecordType::TXT, 120);
        record.set_dns_class(DNSClass::IN);
        record.set_data(Some(RData::TXT(TXT::new(vec![content]))));

        let mut message = Message::new();
        message.set_id(self.id);
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Update);
        message.add_zone(Query::query(zone, RecordType::SOA));
        message.add_update(record);

        let signer = TSigner::new(
            self.key.clone(),
            hickory_proto::rr::rdata::tsig::TsigAlgorithm::HmacSha256,
            key_name,
            300,
        )
        .map_err(|e| AcmeError::SolverError(format!("TSIG signer setup failed: {e}")))?;
        let (tsig_records, _mac) = signer
            .sign_message(&message, &[])
            .map_err(|e| AcmeError::SolverError(format!("TSIG signing failed: {e}")))?;
        for tsig in tsig_records {
            message.add_additional(tsig);
        }

        let wire = message
            .to_bytes()
            .map_err(|e| AcmeError::SolverError(format!("encoding DNS UPDATE failed: {e}")))?;

        (self.send)(wire).await?;

        if let Some(recv) = &self.recv {
            let reply_bytes = recv().await?;
            let reply = Message::from_vec(&reply_bytes)
                .map_err(|e| AcmeError::SolverError(format!("decoding nsupdate reply failed: {e}")))?;
            if reply.response_code() != hickory_proto::op::ResponseCode::NoError {
                return Err(AcmeError::SolverError(format!(
                    "nsupdate rejected: {:?}",
                    reply.response_code()
                )));
            }
        }

        Ok(())
    }
}

macro_rules! interactive_solver {
    ($solver:ident, $ctor:ident, $challenge_type:expr, $instructions:literal) => {
        pub struct $solver;

        /// Prints the challenge content to standard output and blocks on a
        /// standard-input line before returning, for manual provisioning.
        pub fn $ctor() -> $solver {
            $solver
        }

        #[async_trait]
        impl Solver for $solver {
            fn challenge_type(&self) -> &str {
                $challenge_type
            }

            async fn provision(
                &self,
                domain: &str,
                token: &str,
                key_authorization: &str,
            ) -> AcmeResult<()> {
                println!($instructions, domain = domain, token = token, key_authorization = key_authorization);
                print!("Press enter once done: ");
                std::io::stdout().flush().ok();
                let mut line = String::new();
                std::io::stdin()
                    .read_line(&mut line)
                    .map_err(|e| AcmeError::SolverError(format!("reading stdin failed: {e}")))?;
                Ok(())
            }
        }
    };
}

interactive_solver!(
    PrintHttpSolver,
    print_http,
    CHALLENGE_TYPE_HTTP_01,
    "Serve this content at http://{domain}/.well-known/acme-challenge/{token}:\n{key_authorization}\n"
);

interactive_solver!(
    PrintDnsSolver,
    print_dns,
    CHALLENGE_TYPE_DNS_01,
    "Create a TXT record at _acme-challenge.{domain} with this content:\n{key_authorization}\n(challenge token: {token})\n"
);

interactive_solver!(
    PrintAlpnSolver,
    print_alpn,
    CHALLENGE_TYPE_TLS_ALPN_01,
    "Serve a TLS-ALPN-01 certificate for {domain} carrying acmeIdentifier derived from:\n{key_authorization}\n(challenge token: {token})\n"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn http_solver_invokes_callback() {
        let solver = http_solver(|domain, token, key_auth| async move {
            assert_eq!(domain, "example.org");
            assert_eq!(token, "tok");
            assert_eq!(key_auth, "tok.thumb");
            Ok(())
        });
        assert_eq!(solver.challenge_type(), CHALLENGE_TYPE_HTTP_01);
        solver.provision("example.org", "tok", "tok.thumb").await.unwrap();
    }

    #[test]
    fn dns01_content_matches_s6() {
        assert_eq!(
            dns01_txt_content("abc.def"),
            base64url::encode(Sha256::digest(b"abc.def"))
        );
    }

    #[tokio::test]
    async fn dns_solver_builds_prefixed_name() {
        let solver = dns_solver(|name, content| async move {
            assert_eq!(name, "_acme-challenge.example.org");
            assert_eq!(content, dns01_txt_content("abc.def"));
            Ok(())
        });
        solver.provision("example.org", "", "abc.def").await.unwrap();
    }
}
