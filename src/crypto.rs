pub mod account_key;
pub mod jws;
pub mod rsa;

pub(crate) mod jwk;

use account_key::{AccountKey, GenerateAccountKey};
use rsa::RsaAccountKey;

use crate::{AcmeError, AcmeResult};

pub fn generate_account_key() -> impl AccountKey {
    RsaAccountKey::generate()
}

pub fn account_key_from_jwk(jwk: impl AsRef<str>) -> AcmeResult<Box<dyn AccountKey>> {
    let key = rsa::from_jwk(jwk.as_ref())
        .map_err(|e| AcmeError::CryptoError(anyhow::anyhow!("couldn't decode account key from JWK: {e}")))?;
    Ok(Box::new(key))
}
