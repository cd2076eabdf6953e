//! Minimal end-to-end demonstration of the library: binds an account,
//! submits an order for a single DNS name, solves the challenge by printing
//! instructions for the caller to satisfy manually, and writes the issued
//! key and certificate chain to disk.

use std::path::PathBuf;
use std::time::Duration;

use acme_core::crypto::account_key::AccountKey;
use acme_core::crypto::{account_key_from_jwk, generate_account_key};
use acme_core::{print_http, x509, AcmeResult, Client};
use clap::Parser;
use zeroize::Zeroizing;

/// Issue a certificate against an ACME server.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory URL of the ACME server.
    #[arg(long, default_value = "https://acme-staging-v02.api.letsencrypt.org/directory")]
    directory_url: String,

    /// DNS name to request a certificate for.
    #[arg(long)]
    domain: String,

    /// Contact email bound to the account, if one needs to be created.
    #[arg(long)]
    email: Option<String>,

    /// Path to a persisted account key (private JWK). Generated and saved
    /// here on first run if it doesn't exist.
    #[arg(long, default_value = "account-key.jwk")]
    account_key_path: PathBuf,

    /// Directory to write the issued private key and certificate chain into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> AcmeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let account_key = load_or_generate_account_key(&args.account_key_path)?;

    let http = http_client::h1::H1Client::new();
    let (client, account) =
        Client::initialise(http, &args.directory_url, args.email.clone(), account_key).await?;

    if let Some(tos) = client.terms_of_service_uri() {
        tracing::info!(terms_of_service = tos, "account bound");
    }

    let (key_pem, csr_der) = x509::generate_key_and_csr(&args.domain)?;

    let solver = print_http();
    let chain = account
        .sign_certificate(&solver, || tokio::time::sleep(Duration::from_secs(5)), &csr_der)
        .await?;

    std::fs::write(args.out_dir.join("privkey.pem"), &key_pem)
        .map_err(|e| acme_core::AcmeError::CryptoError(anyhow::anyhow!("writing private key: {e}")))?;
    std::fs::write(args.out_dir.join("fullchain.pem"), chain.concat())
        .map_err(|e| acme_core::AcmeError::CryptoError(anyhow::anyhow!("writing certificate chain: {e}")))?;

    tracing::info!(domain = %args.domain, "certificate issued");
    Ok(())
}

fn load_or_generate_account_key(
    path: &PathBuf,
) -> AcmeResult<Box<dyn acme_core::crypto::account_key::AccountKey>> {
    if path.exists() {
        let jwk = std::fs::read_to_string(path)
            .map_err(|e| acme_core::AcmeError::CryptoError(anyhow::anyhow!("reading account key: {e}")))?;
        return account_key_from_jwk(jwk);
    }

    let key = generate_account_key();
    let private_jwk: Zeroizing<String> = key
        .private_jwk()
        .map_err(acme_core::AcmeError::CryptoError)?;
    std::fs::write(path, private_jwk.as_bytes())
        .map_err(|e| acme_core::AcmeError::CryptoError(anyhow::anyhow!("saving account key: {e}")))?;
    Ok(Box::new(key))
}
